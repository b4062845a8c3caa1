//! The write token: the single permit that serializes all mutations
//! against the writer connection. Reads never take this.

use crate::error::WriteTokenTimeout;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct WriteToken {
    inner: Mutex<()>,
}

impl WriteToken {
    pub fn new() -> Self {
        Self { inner: Mutex::new(()) }
    }

    /// Blocks the calling task (not the connection) until the token is
    /// free or `ACQUIRE_TIMEOUT` elapses, whichever comes first.
    pub async fn acquire(&self) -> Result<MutexGuard<'_, ()>, WriteTokenTimeout> {
        tokio::time::timeout(ACQUIRE_TIMEOUT, self.inner.lock())
            .await
            .map_err(|_| WriteTokenTimeout)
    }
}

impl Default for WriteToken {
    fn default() -> Self {
        Self::new()
    }
}
