use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;

use super::capture::CaptureBuffer;

const CHUNK: usize = 8 * 1024;

/// Drains `reader` into `buf` until EOF on its own task.
///
/// Both pipes get a pump before the executor starts waiting on the child, so
/// the child can never block on a full pipe while we block on its exit.
pub fn pump<R>(mut reader: R, buf: CaptureBuffer, stream: &'static str) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunk = vec![0u8; CHUNK];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => buf.push(&chunk[..n]),
                Err(e) => {
                    tracing::debug!(
                        target: "qcheck.executor",
                        stream,
                        error.message = %e,
                        "output pipe read failed"
                    );
                    break;
                }
            }
        }
    })
}
