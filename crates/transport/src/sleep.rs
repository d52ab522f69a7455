use std::time::Duration;

use async_trait::async_trait;
use dispatch::Sleeper;

/// Back-off waits on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn sleeps_for_requested_duration() {
        let start = tokio::time::Instant::now();
        TokioSleeper.sleep(Duration::from_millis(1500)).await;
        assert!(start.elapsed() >= Duration::from_millis(1500));
    }
}
