use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub const DEFAULT_CAPTURE_BYTES: usize = 16 * 1024 * 1024;

/// Shared, bounded capture of one output stream.
///
/// Keeps the most recent `limit` bytes; older bytes are dropped and counted.
/// The pump task writes, the executor takes a snapshot once the process is
/// gone (or killed), so partial output survives a timeout.
#[derive(Clone)]
pub struct CaptureBuffer {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    buf: VecDeque<u8>,
    limit: usize,
    dropped: u64,
}

impl CaptureBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                buf: VecDeque::new(),
                limit: limit.max(1),
                dropped: 0,
            })),
        }
    }

    pub fn push(&self, chunk: &[u8]) {
        let Ok(mut g) = self.inner.lock() else {
            return;
        };
        g.buf.extend(chunk.iter().copied());
        let over = g.buf.len().saturating_sub(g.limit);
        if over > 0 {
            g.buf.drain(..over);
            g.dropped += over as u64;
        }
    }

    pub fn dropped(&self) -> u64 {
        self.inner.lock().map(|g| g.dropped).unwrap_or(0)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.inner
            .lock()
            .map(|g| g.buf.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.to_bytes()).into_owned()
    }
}
