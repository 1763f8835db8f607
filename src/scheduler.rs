//! # Scheduler
//!
//! Cooperative periodic task table evaluated against a 32-bit millisecond
//! clock. Each [`Scheduler::tick`] returns the due tasks in priority order,
//! regardless of which became due first.
//!
//! Every enabled task is due on the first tick. A task that fires is
//! rescheduled at `now + interval`. Late ticks are never
//! replayed, so drift accumulates. Clock wraparound after ~49.7 days is not
//! handled.

use std::time::Instant;

/// Intervals below this disable the task permanently
pub const MIN_INTERVAL_MS: u32 = 10;

/// Source of the millisecond clock
pub trait Clock {
    fn now_ms(&self) -> u32;
}

/// Milliseconds since construction, truncated to 32 bits
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

/// One periodic task
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTask<K> {
    pub kind: K,
    pub priority: u8,
    pub interval_ms: u32,
    pub next_fire_at: u32,
}

impl<K> ScheduledTask<K> {
    pub fn is_enabled(&self) -> bool {
        self.interval_ms >= MIN_INTERVAL_MS
    }
}

/// Priority-ordered task table
#[derive(Debug, Clone)]
pub struct Scheduler<K> {
    tasks: Vec<ScheduledTask<K>>,
}

impl<K> Default for Scheduler<K> {
    fn default() -> Self {
        Self { tasks: Vec::new() }
    }
}

impl<K: Copy> Scheduler<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task, due immediately
    ///
    /// Lower `priority` runs first; equal priorities keep insertion order.
    pub fn add(&mut self, kind: K, priority: u8, interval_ms: u32) {
        let task = ScheduledTask {
            kind,
            priority,
            interval_ms,
            next_fire_at: 0,
        };
        let at = self.tasks.partition_point(|t| t.priority <= priority);
        self.tasks.insert(at, task);
    }

    pub fn tasks(&self) -> &[ScheduledTask<K>] {
        &self.tasks
    }

    /// Fire every due task and return them in priority order
    pub fn tick(&mut self, now: u32) -> Vec<K> {
        let mut due = Vec::new();
        for task in self.tasks.iter_mut() {
            if task.is_enabled() && now >= task.next_fire_at {
                task.next_fire_at = now.wrapping_add(task.interval_ms);
                due.push(task.kind);
            }
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct ManualClock {
        now: Cell<u32>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self { now: Cell::new(0) }
        }

        fn advance(&self, ms: u32) {
            self.now.set(self.now.get() + ms);
        }
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> u32 {
            self.now.get()
        }
    }

    #[test]
    fn test_first_tick_fires_every_enabled_task() {
        let mut scheduler = Scheduler::new();
        scheduler.add('a', 0, 100);
        scheduler.add('b', 1, 1_000);

        assert_eq!(scheduler.tick(0), vec!['a', 'b']);
        assert!(scheduler.tick(99).is_empty());
        assert_eq!(scheduler.tick(100), vec!['a']);
    }

    #[test]
    fn test_priority_order_regardless_of_due_time() {
        let mut scheduler = Scheduler::new();
        scheduler.add("poll", 3, 10);
        scheduler.add("send", 1, 50);
        scheduler.add("update", 0, 200);
        scheduler.add("persist", 2, 30);

        // all four became due at different times; order is still by priority
        assert_eq!(scheduler.tick(500), vec!["update", "send", "persist", "poll"]);
    }

    #[test]
    fn test_equal_priority_keeps_insertion_order() {
        let mut scheduler = Scheduler::new();
        scheduler.add(1, 1, 10);
        scheduler.add(2, 0, 10);
        scheduler.add(3, 1, 10);
        scheduler.add(4, 0, 10);

        assert_eq!(scheduler.tick(10), vec![2, 4, 1, 3]);
    }

    #[test]
    fn test_short_interval_never_fires() {
        let mut scheduler = Scheduler::new();
        scheduler.add("fast", 0, MIN_INTERVAL_MS - 1);
        scheduler.add("off", 0, 0);
        scheduler.add("min", 0, MIN_INTERVAL_MS);

        for now in [0, 10, 1_000, 1_000_000] {
            assert!(!scheduler.tick(now).contains(&"fast"));
            assert!(!scheduler.tick(now).contains(&"off"));
        }
        assert!(!scheduler.tasks()[0].is_enabled());
    }

    #[test]
    fn test_missed_firings_are_not_caught_up() {
        let mut scheduler = Scheduler::new();
        scheduler.add('a', 0, 100);

        assert_eq!(scheduler.tick(0), vec!['a']);
        assert_eq!(scheduler.tick(1_050), vec!['a']);
        assert!(scheduler.tick(1_100).is_empty());
        assert_eq!(scheduler.tick(1_150), vec!['a']);
    }

    #[test]
    fn test_reschedules_from_fire_time() {
        let mut scheduler = Scheduler::new();
        scheduler.add('a', 0, 100);

        scheduler.tick(130);
        assert_eq!(scheduler.tasks()[0].next_fire_at, 230);
    }

    #[test]
    fn test_manual_clock_drives_ticks() {
        let clock = ManualClock::new();
        let mut scheduler = Scheduler::new();
        scheduler.add("fast", 0, 10);
        scheduler.add("slow", 1, 25);

        let mut fired = Vec::new();
        for _ in 0..5 {
            clock.advance(10);
            fired.push(scheduler.tick(clock.now_ms()));
        }

        assert_eq!(
            fired,
            vec![
                vec!["fast", "slow"],
                vec!["fast"],
                vec!["fast"],
                vec!["fast", "slow"],
                vec!["fast"],
            ]
        );
    }

    #[test]
    fn test_monotonic_clock_advances() {
        let clock = MonotonicClock::new();
        let first = clock.now_ms();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(clock.now_ms() >= first + 5);
    }
}
