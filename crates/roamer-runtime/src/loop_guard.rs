//! [`LoopGuard`] – stall detector for repeatedly blocked actions.
//!
//! A planner that keeps asking for the same move after the navigator has
//! refused or aborted it is stuck: every retry burns a step of the mission
//! budget without changing anything.  The mission loop records each failed
//! action here and interrupts the mission once the same action has failed
//! `threshold` times in a row.  A successful action resets the guard.
//!
//! # Example
//!
//! ```rust
//! use roamer_runtime::loop_guard::LoopGuard;
//! use roamer_types::{Direction, RobotAction};
//!
//! let blocked = RobotAction::new(Direction::North, 400);
//! let mut guard = LoopGuard::new(3);
//!
//! assert!(!guard.record(blocked));
//! assert!(!guard.record(blocked));
//! assert!(guard.record(blocked)); // third identical failure → stalled
//!
//! guard.reset();
//! assert!(!guard.record(blocked));
//! ```

use std::collections::VecDeque;

/// Flags `threshold` consecutive identical entries.
#[derive(Debug, Clone)]
pub struct LoopGuard<T = roamer_types::RobotAction> {
    threshold: usize,
    recent: VecDeque<T>,
}

impl<T: PartialEq> LoopGuard<T> {
    /// A `threshold` of zero is treated as one.
    pub fn new(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            threshold,
            recent: VecDeque::with_capacity(threshold),
        }
    }

    /// Record a failed entry; returns `true` once the last `threshold`
    /// entries are all equal.
    pub fn record(&mut self, entry: T) -> bool {
        if self.recent.len() == self.threshold {
            self.recent.pop_front();
        }
        self.recent.push_back(entry);
        self.is_stalled()
    }

    pub fn is_stalled(&self) -> bool {
        self.recent.len() == self.threshold
            && self.recent.iter().all(|e| Some(e) == self.recent.front())
    }

    /// Number of consecutive identical entries at the tail.
    pub fn streak(&self) -> usize {
        match self.recent.back() {
            Some(last) => self.recent.iter().rev().take_while(|e| *e == last).count(),
            None => 0,
        }
    }

    pub fn reset(&mut self) {
        self.recent.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roamer_types::{Direction, RobotAction};

    fn mv(direction: Direction, distance: i32) -> RobotAction {
        RobotAction::new(direction, distance)
    }

    #[test]
    fn varied_failures_never_stall() {
        let mut guard = LoopGuard::new(3);
        assert!(!guard.record(mv(Direction::North, 100)));
        assert!(!guard.record(mv(Direction::East, 100)));
        assert!(!guard.record(mv(Direction::North, 100)));
    }

    #[test]
    fn same_direction_different_distance_is_not_identical() {
        let mut guard = LoopGuard::new(2);
        assert!(!guard.record(mv(Direction::North, 100)));
        assert!(!guard.record(mv(Direction::North, 200)));
        assert_eq!(guard.streak(), 1);
    }

    #[test]
    fn stall_persists_until_reset() {
        let mut guard = LoopGuard::new(2);
        let a = mv(Direction::West, 50);
        guard.record(a);
        assert!(guard.record(a));
        assert!(guard.record(a));
        assert_eq!(guard.streak(), 2);
        guard.reset();
        assert_eq!(guard.streak(), 0);
        assert!(!guard.is_stalled());
    }

    #[test]
    fn window_slides_past_old_entries() {
        let mut guard = LoopGuard::new(3);
        guard.record(mv(Direction::North, 1));
        guard.record(mv(Direction::South, 1));
        guard.record(mv(Direction::South, 1));
        assert!(guard.record(mv(Direction::South, 1)));
    }

    #[test]
    fn zero_threshold_behaves_like_one() {
        let mut guard: LoopGuard<&str> = LoopGuard::new(0);
        assert!(guard.record("anything"));
    }
}
