//! Request-interval pacing shared by the external clients.
//!
//! Tracks the timestamp of the last call and sleeps off whatever's left
//! of the minimum interval before the next one, since what these
//! clients must not do is saturate a third party with requests.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub struct RequestPacer {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RequestPacer {
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval, last_request: Mutex::new(None) }
    }

    /// Sleeps just long enough that no two calls return less than
    /// `min_interval` apart, then marks the call as having happened now.
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_call_waits_out_the_interval() {
        let pacer = RequestPacer::new(Duration::from_millis(50));
        let start = Instant::now();
        pacer.wait().await;
        pacer.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
