//! Frame reading and writing on top of any tokio byte stream.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Type byte of a JSON frame. No other frame type exists.
pub const FRAME_TYPE_JSON: u8 = 0x61;
pub const HEADER_LEN: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported frame type: {0:#04x}")]
    UnsupportedType(u8),
    #[error("Frame of {len} bytes exceeds the limit of {max} bytes")]
    TooLarge { len: usize, max: usize },
    #[error("Malformed message body: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reads one frame and returns its body.
///
/// Returns `Ok(None)` when the peer closed the stream before the first header
/// byte. A stream that ends inside a frame is an error.
pub async fn read_frame<R>(reader: &mut R, max_len: usize) -> Result<Option<Vec<u8>>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    let first = reader.read(&mut header[..1]).await?;
    if first == 0 {
        return Ok(None);
    }
    reader.read_exact(&mut header[1..]).await?;

    if header[0] != FRAME_TYPE_JSON {
        return Err(ProtocolError::UnsupportedType(header[0]));
    }
    let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
    if len > max_len {
        return Err(ProtocolError::TooLarge { len, max: max_len });
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

/// Reads one frame and decodes its JSON body.
pub async fn read_message<R, T>(reader: &mut R, max_len: usize) -> Result<Option<T>, ProtocolError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    match read_frame(reader, max_len).await? {
        Some(body) => Ok(Some(serde_json::from_slice(&body)?)),
        None => Ok(None),
    }
}

/// Encodes `message` as JSON and writes it as a single frame.
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize + ?Sized,
{
    let body = serde_json::to_vec(message)?;
    let len = u32::try_from(body.len()).map_err(|_| ProtocolError::TooLarge {
        len: body.len(),
        max: u32::MAX as usize,
    })?;

    let mut frame = Vec::with_capacity(HEADER_LEN + body.len());
    frame.push(FRAME_TYPE_JSON);
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(&body);

    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}
