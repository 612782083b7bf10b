//! Duplicate suppression for continuous scanning.

use crate::scanner::traits::DetectionEvent;
use chrono::{DateTime, Duration, Utc};

/// Suppresses repeats of the same value within a time window.
///
/// A value is accepted when nothing has been accepted yet, when it differs
/// from the last accepted value, or when strictly more than the window has
/// passed since that value was accepted.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last: Option<(String, DateTime<Utc>)>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}

impl Debouncer {
    pub const DEFAULT_WINDOW_MS: i64 = 2000;

    /// Debouncer with the default two-second window.
    pub fn new() -> Self {
        Self::with_window(Duration::milliseconds(Self::DEFAULT_WINDOW_MS))
    }

    pub fn with_window(window: Duration) -> Self {
        Self { window, last: None }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decide whether `event` should be delivered, recording it if so.
    pub fn accept(&mut self, event: &DetectionEvent) -> bool {
        let fresh = match &self.last {
            None => true,
            Some((value, at)) => {
                *value != event.raw_value || event.observed_at.signed_duration_since(*at) > self.window
            }
        };
        if fresh {
            self.last = Some((event.raw_value.clone(), event.observed_at));
        }
        fresh
    }

    /// Forget the last accepted value.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
