use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{AppError, AppResult, DistributedError};

use super::types::WireMessage;

/// Longest accepted message line, newline excluded.
pub(in crate::distributed) const MAX_MESSAGE_BYTES: usize = 4 * 1024 * 1024;

const READ_LIMIT: u64 = (MAX_MESSAGE_BYTES as u64).saturating_add(1);

/// Reads one newline-terminated JSON message. At most
/// [`MAX_MESSAGE_BYTES`] + 1 bytes are buffered before an over-long line is
/// rejected.
pub(in crate::distributed) async fn read_message<R>(reader: &mut R) -> AppResult<WireMessage>
where
    R: AsyncBufRead + Unpin,
{
    let mut buffer: Vec<u8> = Vec::with_capacity(1024);
    let bytes = (&mut *reader)
        .take(READ_LIMIT)
        .read_until(b'\n', &mut buffer)
        .await
        .map_err(|err| {
            AppError::distributed(DistributedError::Io {
                context: "read wire message",
                source: err,
            })
        })?;
    if bytes == 0 {
        return Err(AppError::distributed(DistributedError::ConnectionClosed));
    }

    match buffer.last() {
        Some(b'\n') => {
            buffer.pop();
            if buffer.last() == Some(&b'\r') {
                buffer.pop();
            }
        }
        Some(_) if buffer.len() > MAX_MESSAGE_BYTES => {
            return Err(AppError::distributed(
                DistributedError::WireMessageTooLarge {
                    max_bytes: MAX_MESSAGE_BYTES,
                },
            ));
        }
        Some(_) | None => {}
    }

    let line = std::str::from_utf8(&buffer).map_err(|err| {
        AppError::distributed(DistributedError::WireMessageInvalidUtf8 { source: err })
    })?;
    serde_json::from_str::<WireMessage>(line).map_err(|err| {
        AppError::distributed(DistributedError::Deserialize {
            context: "wire message",
            source: err,
        })
    })
}

pub(in crate::distributed) async fn send_message<W>(
    writer: &mut W,
    message: &WireMessage,
) -> AppResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(message).map_err(|err| {
        AppError::distributed(DistributedError::Serialize {
            context: "wire message",
            source: err,
        })
    })?;
    line.push(b'\n');
    writer.write_all(&line).await.map_err(|err| {
        AppError::distributed(DistributedError::Io {
            context: "send wire message",
            source: err,
        })
    })
}
