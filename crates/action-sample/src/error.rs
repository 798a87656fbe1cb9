use crate::scenario::Scenario;
use action_framework::FrameworkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("Setup failed: {0}")]
    Framework(#[from] FrameworkError),
    #[error("Scenario {scenario} ended unexpectedly: {outcome}")]
    Unexpected { scenario: Scenario, outcome: String },
}
