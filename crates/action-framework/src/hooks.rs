//! # Global Error Hooks
//!
//! Process-wide observers notified once per failed call, after that call's own
//! completion callback has run. Hooks are for observability only; they never change
//! what the caller receives.
//!
//! The observer list is assembled with [`ErrorHooksBuilder`] during node setup and is
//! frozen afterwards, so dispatch reads it without locking. An observer that panics is
//! isolated: the panic is caught and logged, and the remaining observers still run.

use crate::error::ActError;
use crate::message::CallInfo;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

/// Receives every failed completion.
pub trait ErrorObserver: Send + Sync + 'static {
    fn on_error(&self, error: &ActError, call: &CallInfo);

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl<F> ErrorObserver for F
where
    F: Fn(&ActError, &CallInfo) + Send + Sync + 'static,
{
    fn on_error(&self, error: &ActError, call: &CallInfo) {
        self(error, call)
    }

    fn name(&self) -> &'static str {
        "closure"
    }
}

#[derive(Default)]
pub struct ErrorHooksBuilder {
    observers: Vec<Arc<dyn ErrorObserver>>,
}

impl ErrorHooksBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_error(mut self, observer: impl ErrorObserver) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    pub fn push(&mut self, observer: Arc<dyn ErrorObserver>) {
        self.observers.push(observer);
    }

    pub fn build(self) -> ErrorHooks {
        ErrorHooks {
            observers: self.observers.into(),
        }
    }
}

/// Frozen, cheaply cloneable observer list.
#[derive(Clone)]
pub struct ErrorHooks {
    observers: Arc<[Arc<dyn ErrorObserver>]>,
}

impl Default for ErrorHooks {
    fn default() -> Self {
        ErrorHooksBuilder::new().build()
    }
}

impl ErrorHooks {
    pub fn builder() -> ErrorHooksBuilder {
        ErrorHooksBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Notifies every observer. Panics are caught per observer.
    pub fn emit(&self, err: &ActError, call: &CallInfo) {
        for observer in self.observers.iter() {
            let outcome = catch_unwind(AssertUnwindSafe(|| observer.on_error(err, call)));
            if let Err(panic) = outcome {
                let info = if let Some(msg) = panic.downcast_ref::<&'static str>() {
                    (*msg).to_string()
                } else if let Some(msg) = panic.downcast_ref::<String>() {
                    msg.clone()
                } else {
                    "unknown panic".to_string()
                };
                error!(observer = observer.name(), call_id = %call.id, panic = %info, "Error observer panicked");
            }
        }
    }
}

impl std::fmt::Debug for ErrorHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorHooks")
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::CallId;
    use crate::pattern::Pattern;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn panicking_observer_does_not_stop_others() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();

        let hooks = ErrorHooks::builder()
            .on_error(|_: &ActError, _: &CallInfo| panic!("observer bug"))
            .on_error(move |_: &ActError, _: &CallInfo| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build();

        let call = CallInfo::new(CallId::new(), None, Pattern::parse("cmd:A").unwrap());
        hooks.emit(&ActError::handler("test"), &call);

        assert_eq!(hooks.len(), 2);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
