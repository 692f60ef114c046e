use super::time::Millis;

/// A cancellable one-shot deadline. Re-arming replaces the due time, so a
/// superseded fire can never happen. `poll` fires at most once per arm.
#[derive(Debug, Clone, Default)]
pub struct Deadline {
    due: Option<Millis>,
}

impl Deadline {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re-)arms the deadline `delay` after `now`.
    pub fn arm(&mut self, now: Millis, delay: Millis) {
        self.due = Some(now.saturating_add(delay));
    }

    pub fn cancel(&mut self) {
        self.due = None;
    }

    pub fn due(&self) -> Option<Millis> {
        self.due
    }

    pub fn is_armed(&self) -> bool {
        self.due.is_some()
    }

    /// Fires (and disarms) if the deadline is at or before `now`.
    /// Returns the scheduled fire time, not `now`.
    pub fn poll(&mut self, now: Millis) -> Option<Millis> {
        match self.due {
            Some(due) if due <= now => {
                self.due = None;
                Some(due)
            }
            _ => None,
        }
    }
}

/// A cancellable repeating timer. The first fire is one period after `start`.
#[derive(Debug, Clone)]
pub struct Interval {
    period: Millis,
    next: Option<Millis>,
}

impl Interval {
    pub fn new(period: Millis) -> Self {
        Self {
            period: period.max(1),
            next: None,
        }
    }

    pub fn start(&mut self, now: Millis) {
        self.next = Some(now.saturating_add(self.period));
    }

    pub fn stop(&mut self) {
        self.next = None;
    }

    pub fn next_fire(&self) -> Option<Millis> {
        self.next
    }

    pub fn is_running(&self) -> bool {
        self.next.is_some()
    }

    pub fn period(&self) -> Millis {
        self.period
    }

    /// Fires once if a period boundary is at or before `now` and schedules
    /// the following one. Call repeatedly to catch up after a late step.
    pub fn poll(&mut self, now: Millis) -> Option<Millis> {
        match self.next {
            Some(at) if at <= now => {
                self.next = Some(at.saturating_add(self.period));
                Some(at)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_fires_once() {
        let mut d = Deadline::new();
        d.arm(100, 50);
        assert_eq!(d.poll(149), None);
        assert_eq!(d.poll(200), Some(150));
        assert_eq!(d.poll(300), None);
    }

    #[test]
    fn rearm_moves_deadline() {
        let mut d = Deadline::new();
        d.arm(0, 2000);
        d.arm(500, 2000);
        assert_eq!(d.poll(2000), None);
        assert_eq!(d.poll(2500), Some(2500));
    }

    #[test]
    fn cancelled_deadline_never_fires() {
        let mut d = Deadline::new();
        d.arm(0, 10);
        d.cancel();
        assert_eq!(d.poll(1_000), None);
        assert!(!d.is_armed());
    }

    #[test]
    fn interval_catches_up() {
        let mut i = Interval::new(270);
        i.start(1000);
        let mut fires = Vec::new();
        while let Some(at) = i.poll(1810) {
            fires.push(at);
        }
        assert_eq!(fires, vec![1270, 1540, 1810]);
        i.stop();
        assert_eq!(i.poll(10_000), None);
    }
}
