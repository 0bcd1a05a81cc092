//! Time sources
//!
//! Delays and wall-clock reads go through these traits so tests can run the
//! orchestrator without sleeping and with a fixed time of day.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::time::Duration;

/// Suspends the calling task for a while
#[async_trait]
pub trait Timer: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real delays backed by the tokio timer wheel
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTimer;

#[async_trait]
impl Timer for TokioTimer {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Source of the current local time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}
