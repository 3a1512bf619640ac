//! Request pacing between work items.

use std::time::Duration;

/// Pause taken after each work item
#[allow(async_fn_in_trait)]
pub trait Pacer {
    async fn pause(&self);
}

/// Sleep a fixed duration after every item
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Pacer for FixedDelay {
    async fn pause(&self) {
        tokio::time::sleep(self.delay).await;
    }
}

/// No pause at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl Pacer for NoDelay {
    async fn pause(&self) {}
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_fixed_delay_sleeps() {
        let pacer = FixedDelay::from_millis(20);
        assert_eq!(pacer.delay(), Duration::from_millis(20));

        let start = Instant::now();
        pacer.pause().await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_no_delay() {
        let start = Instant::now();
        NoDelay.pause().await;
        assert!(start.elapsed() < Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_counting_pacer() {
        let pacer = mock::CountingPacer::default();
        pacer.pause().await;
        pacer.pause().await;
        assert_eq!(pacer.pauses(), 2);
    }
}
