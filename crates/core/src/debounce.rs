use std::time::{Duration, Instant};

/// 延遲觸發器：每次排程都會取消前一次。 / Deadline-based debouncer; scheduling again replaces any pending deadline.
///
/// The owner polls with the current instant, so tests can drive time
/// explicitly instead of sleeping.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// 從 `now` 起重新計時。 / Restarts the delay from `now`.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// 到期時回傳 true 並清除排程。 / Returns `true` once the deadline has passed, clearing it.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_after_delay() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(150));
        debouncer.schedule(start);
        assert!(!debouncer.fire_if_due(start + Duration::from_millis(149)));
        assert!(debouncer.fire_if_due(start + Duration::from_millis(150)));
        assert!(!debouncer.fire_if_due(start + Duration::from_millis(400)));
    }

    #[test]
    fn rescheduling_pushes_deadline_back() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(50));
        debouncer.schedule(start);
        debouncer.schedule(start + Duration::from_millis(40));
        assert!(!debouncer.fire_if_due(start + Duration::from_millis(60)));
        assert!(debouncer.fire_if_due(start + Duration::from_millis(90)));
    }

    #[test]
    fn cancel_clears_pending() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(10));
        debouncer.schedule(start);
        debouncer.cancel();
        assert!(!debouncer.is_pending());
        assert!(!debouncer.fire_if_due(start + Duration::from_secs(1)));
    }
}
