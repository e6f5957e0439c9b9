use std::sync::Arc;
use std::thread;
use stressapi::tally::StatusTally;
use stressapi_common::status::SEEDED_CODES;

#[test]
fn test_fresh_tally_is_seeded_at_zero() {
    let tally = StatusTally::new();
    let snapshot = tally.snapshot();
    assert_eq!(snapshot.len(), SEEDED_CODES.len());
    for code in [200, 201, 202, 204, 400, 401, 403, 404, 405, 429, 500, 501, 502, 503, 504] {
        assert_eq!(snapshot.get(&code), Some(&0), "code {code}");
    }
    assert_eq!(tally.total(), 0);
}

#[test]
fn test_save_and_reset() {
    let tally = StatusTally::new();
    for _ in 0..3 {
        tally.save(200);
    }
    tally.save(900);

    assert_eq!(tally.get(200), Some(3));
    assert_eq!(tally.get(900), Some(1));
    assert_eq!(tally.total(), 4);

    tally.reset();
    assert_eq!(tally.get(900), None);
    assert_eq!(tally.get(200), Some(0));
    assert_eq!(tally.snapshot().len(), SEEDED_CODES.len());
}

#[test]
fn test_snapshot_is_a_copy() {
    let tally = StatusTally::new();
    tally.save(404);
    let before = tally.snapshot();
    tally.save(404);
    assert_eq!(before.get(&404), Some(&1));
    assert_eq!(tally.get(404), Some(2));
}

#[test]
fn test_concurrent_saves_are_not_lost() {
    let tally = Arc::new(StatusTally::new());
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let tally = Arc::clone(&tally);
            thread::spawn(move || {
                for _ in 0..2500 {
                    tally.save(if t % 2 == 0 { 200 } else { 901 });
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(tally.get(200), Some(5000));
    assert_eq!(tally.get(901), Some(5000));
    assert_eq!(tally.total(), 10_000);
}
