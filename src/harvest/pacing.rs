//! Bounded random pauses
//!
//! Pauses give client-side rendering time to catch up and keep the request
//! rate human-like. The duration is drawn before awaiting so the random
//! generator never lives across a suspension point.

use crate::config::PauseRange;
use rand::Rng;
use std::time::Duration;

/// Draws a pause length uniformly from `range`
pub fn sample(range: PauseRange) -> Duration {
    if range.max_ms <= range.min_ms {
        return Duration::from_millis(range.min_ms);
    }

    let ms = rand::thread_rng().gen_range(range.min_ms..=range.max_ms);
    Duration::from_millis(ms)
}

/// Sleeps for a random duration within `range`
pub async fn pause(range: PauseRange) {
    let duration = sample(range);
    sleep_for(duration).await;
}

/// Sleeps for `duration`, returning immediately when it is zero
pub async fn sleep_for(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
