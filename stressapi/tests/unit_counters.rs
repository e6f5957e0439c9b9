use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use stressapi::counters::{Average, Clock, RateAverageCounter, RateCounter};

/// Clock that only moves when told to.
struct MockClock {
    now: Mutex<Instant>,
}

impl MockClock {
    fn new() -> Arc<Self> {
        Arc::new(Self { now: Mutex::new(Instant::now()) })
    }

    fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

#[test]
fn test_rate_counter_value_is_a_pure_read() {
    let counter = RateCounter::new();
    counter.incr();
    counter.incr();
    assert_eq!(counter.value(), 2);
    assert_eq!(counter.value(), 2);
    assert_eq!(counter.total(), 2);
}

#[test]
fn test_rate_counter_reset_moves_baseline() {
    let counter = RateCounter::new();
    for _ in 0..5 {
        counter.incr();
    }
    counter.reset();
    assert_eq!(counter.value(), 0);
    assert_eq!(counter.total(), 5);

    counter.incr();
    assert_eq!(counter.value(), 1);
    assert_eq!(counter.total(), 6);
}

#[test]
fn test_rate_counter_concurrent_increments_are_exact() {
    let counter = Arc::new(RateCounter::new());
    counter.reset();
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                for _ in 0..10_000 {
                    counter.incr();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(counter.value(), 80_000);
}

#[test]
fn test_average_is_zero_without_marks() {
    let clock = MockClock::new();
    let counter = RateAverageCounter::with_clock(clock.clone());
    clock.advance(Duration::from_secs(3));
    assert_eq!(counter.take_average(), Average::default());
}

#[test]
fn test_average_from_mark_spacing() {
    let clock = MockClock::new();
    let counter = RateAverageCounter::with_clock(clock.clone());

    for _ in 0..4 {
        clock.advance(Duration::from_millis(250));
        counter.mark();
    }
    assert_eq!(counter.pending(), 4);

    let average = counter.take_average();
    assert!((average.per_sec - 4.0).abs() < 1e-9, "per_sec {}", average.per_sec);
    assert!((average.secs_per_request - 0.25).abs() < 1e-9);

    // Reading clears the accumulated sums.
    assert_eq!(counter.pending(), 0);
    assert_eq!(counter.take_average(), Average::default());
}

#[test]
fn test_take_average_restarts_the_measurement() {
    let clock = MockClock::new();
    let counter = RateAverageCounter::with_clock(clock.clone());
    clock.advance(Duration::from_millis(100));
    counter.mark();
    counter.take_average();

    // Idle time before the read is not charged to the next mark.
    clock.advance(Duration::from_secs(10));
    counter.take_average();
    clock.advance(Duration::from_millis(500));
    counter.mark();

    let average = counter.take_average();
    assert!((average.secs_per_request - 0.5).abs() < 1e-9);
}

#[test]
fn test_reset_discards_pending_marks() {
    let clock = MockClock::new();
    let counter = RateAverageCounter::with_clock(clock.clone());
    clock.advance(Duration::from_secs(1));
    counter.mark();
    counter.reset();
    assert_eq!(counter.pending(), 0);

    clock.advance(Duration::from_millis(200));
    counter.mark();
    let average = counter.take_average();
    assert!((average.per_sec - 5.0).abs() < 1e-9);
}

#[test]
fn test_concurrent_marks_are_all_counted() {
    let counter = Arc::new(RateAverageCounter::new());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                for _ in 0..1000 {
                    counter.mark();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(counter.pending(), 4000);
}
