//! # Frame Codec
//!
//! ```text
//! [4-byte length (BE)] [JSON body]
//! ```
//!
//! The length prefix is checked against the configured limit before the body buffer is
//! allocated. Framing carries no meaning beyond byte boundaries; the body is either a
//! [`TransportMessage`](crate::message::TransportMessage) or a
//! [`TransportReply`](crate::message::TransportReply), depending on direction.

use super::TransportFault;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const LENGTH_PREFIX_SIZE: usize = 4;

/// Serializes `value` into a length-prefixed frame.
pub fn encode<T: Serialize>(value: &T, limit: usize) -> Result<Vec<u8>, TransportFault> {
    let body = serde_json::to_vec(value)?;
    let too_large = TransportFault::FrameTooLarge {
        size: body.len(),
        limit,
    };
    if body.len() > limit {
        return Err(too_large);
    }
    let length = u32::try_from(body.len()).map_err(|_| too_large)?;
    let mut frame = Vec::with_capacity(LENGTH_PREFIX_SIZE + body.len());
    frame.extend_from_slice(&length.to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

pub async fn write_frame<W, T>(writer: &mut W, value: &T, limit: usize) -> Result<(), TransportFault>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = encode(value, limit)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame. `Ok(None)` means the peer closed the stream cleanly between frames.
pub async fn read_frame<R, T>(reader: &mut R, limit: usize) -> Result<Option<T>, TransportFault>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    match reader.read_exact(&mut prefix).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let size = u32::from_be_bytes(prefix) as usize;
    if size > limit {
        return Err(TransportFault::FrameTooLarge { size, limit });
    }
    let mut body = vec![0u8; size];
    reader.read_exact(&mut body).await?;
    Ok(Some(serde_json::from_slice(&body)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{CallId, TransportMessage};
    use crate::pattern::Pattern;
    use serde_json::json;

    #[tokio::test]
    async fn frame_survives_a_stream() {
        let request = TransportMessage {
            call_id: CallId::new(),
            parent: None,
            pattern: Pattern::parse("cmd:A").unwrap(),
            payload: json!({"x": 1}),
            budget_ms: Some(250),
        };
        let (mut a, mut b) = tokio::io::duplex(1024);
        write_frame(&mut a, &request, 1024).await.unwrap();
        drop(a);

        let read: Option<TransportMessage> = read_frame(&mut b, 1024).await.unwrap();
        assert_eq!(read, Some(request));
        let eof: Option<TransportMessage> = read_frame(&mut b, 1024).await.unwrap();
        assert!(eof.is_none());
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected_before_reading_body() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(&(10_000u32).to_be_bytes()).await.unwrap();

        let result: Result<Option<serde_json::Value>, _> = read_frame(&mut b, 100).await;
        assert!(matches!(
            result,
            Err(TransportFault::FrameTooLarge { size: 10_000, limit: 100 })
        ));
    }

    #[test]
    fn encode_enforces_limit() {
        let big = json!({"data": "x".repeat(200)});
        assert!(matches!(
            encode(&big, 50),
            Err(TransportFault::FrameTooLarge { .. })
        ));
    }
}
