//! Frame pacing utilities for bounded-rate draw loops.
//!
//! The export draw loop is cooperative: each iteration does constant-time
//! work and yields. `FramePacer` is the rate gate that decides whether a
//! given instant is due for the next frame. It is parameterized on elapsed
//! nanoseconds rather than reading a clock itself, which keeps it testable
//! and lets callers drive it from any timing source.

/// Rate gate targeting a fixed frame frequency.
#[derive(Debug)]
pub struct FramePacer {
    target_interval_ns: u64,
    last_tick_ns: Option<u64>,
}

impl FramePacer {
    /// Create a pacer targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self {
            target_interval_ns: 1_000_000_000 / target_hz.max(1) as u64,
            last_tick_ns: None,
        }
    }

    /// Check if enough time has passed for the next frame.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_ns: u64) -> bool {
        match self.last_tick_ns {
            None => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            Some(last) if current_ns >= last + self.target_interval_ns => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            _ => false,
        }
    }

    /// Nanoseconds until the next frame is due, zero if already due.
    pub fn ns_until_next(&self, current_ns: u64) -> u64 {
        match self.last_tick_ns {
            None => 0,
            Some(last) => (last + self.target_interval_ns).saturating_sub(current_ns),
        }
    }

    /// Target interval in nanoseconds.
    pub fn interval_ns(&self) -> u64 {
        self.target_interval_ns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_tick_always_fires() {
        let mut pacer = FramePacer::new(30);
        assert!(pacer.should_tick(0));
    }

    #[test]
    fn test_pacing_at_30hz() {
        let mut pacer = FramePacer::new(30);
        assert!(pacer.should_tick(0));
        assert!(!pacer.should_tick(10_000_000)); // 10ms later, too soon
        assert!(pacer.should_tick(34_000_000)); // ~34ms later (30Hz ~ 33.3ms)
    }

    #[test]
    fn test_ns_until_next() {
        let mut pacer = FramePacer::new(100); // 10ms interval
        assert_eq!(pacer.ns_until_next(0), 0);
        assert!(pacer.should_tick(0));
        assert_eq!(pacer.ns_until_next(4_000_000), 6_000_000);
        assert_eq!(pacer.ns_until_next(20_000_000), 0);
    }
}
