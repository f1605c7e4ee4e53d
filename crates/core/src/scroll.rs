use std::time::{Duration, Instant};

use crate::config::WorkbenchConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

#[derive(Debug, Clone)]
pub struct ScrollAccelerator {
    acceleration: usize,
    threshold: u32,
    timeout: Duration,
    last: Option<(ScrollDirection, Instant)>,
    repeat_count: u32,
}

impl ScrollAccelerator {
    #[must_use]
    pub fn new(acceleration: usize, threshold: u32, timeout: Duration) -> Self {
        Self {
            acceleration: acceleration.max(1),
            threshold,
            timeout,
            last: None,
            repeat_count: 0,
        }
    }

    #[must_use]
    pub fn from_config(config: &WorkbenchConfig) -> Self {
        Self::new(
            config.scroll_acceleration,
            config.scroll_repeat_threshold,
            Duration::from_millis(config.scroll_repeat_timeout_ms),
        )
    }

    pub fn step(&mut self, direction: ScrollDirection, now: Instant) -> usize {
        let is_repeat = matches!(
            self.last,
            Some((previous, at)) if previous == direction
                && now.saturating_duration_since(at) < self.timeout
        );

        if is_repeat {
            self.repeat_count = self.repeat_count.saturating_add(1);
        } else {
            self.repeat_count = 0;
        }
        self.last = Some((direction, now));

        if is_repeat && self.repeat_count > self.threshold {
            self.acceleration
        } else {
            1
        }
    }
}
