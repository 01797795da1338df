mod common;

use common::TestDb;
use customer_core::{Customer, CustomerRepository, OpContext};
use std::sync::{Arc, Barrier};
use std::thread;

const WORKERS: usize = 4;
const CUSTOMERS_PER_WORKER: usize = 10;

#[test]
fn concurrent_creators_each_persist_their_rows() {
    let db = Arc::new(TestDb::seeded());
    let barrier = Arc::new(Barrier::new(WORKERS));

    let handles: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let db = Arc::clone(&db);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let repo = db.open_repo();
                let ctx = OpContext::background();
                barrier.wait();
                let mut ids = Vec::new();
                for n in 0..CUSTOMERS_PER_WORKER {
                    let email = format!("worker{worker}-{n}@example.com");
                    let created = repo
                        .create_customer(&ctx, Customer::new(format!("Worker {worker}"), email))
                        .expect("create should succeed");
                    ids.push(created.id);
                }
                repo.close().expect("close should succeed");
                ids
            })
        })
        .collect();

    let mut all_ids: Vec<i64> = handles
        .into_iter()
        .flat_map(|handle| handle.join().expect("worker thread should not panic"))
        .collect();
    all_ids.sort_unstable();
    all_ids.dedup();

    assert_eq!(all_ids.len(), WORKERS * CUSTOMERS_PER_WORKER);
    assert_eq!(db.count_customers(), (WORKERS * CUSTOMERS_PER_WORKER + 1) as i64);
}

#[test]
fn concurrent_duplicate_email_has_exactly_one_winner() {
    let db = Arc::new(TestDb::seeded());
    let barrier = Arc::new(Barrier::new(WORKERS));

    let handles: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let db = Arc::clone(&db);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let repo = db.open_repo();
                barrier.wait();
                repo.create_customer(
                    &OpContext::background(),
                    Customer::new(format!("Racer {worker}"), "race@example.com"),
                )
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("worker thread should not panic"))
        .collect();

    let winners = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(winners, 1);
    for result in results.iter().filter_map(|result| result.as_ref().err()) {
        assert!(result.is_constraint_violation(), "unexpected error: {result}");
    }

    let repo = db.open_repo();
    let stored = repo
        .get_customer_by_email(&OpContext::background(), "race@example.com")
        .expect("lookup should succeed");
    let winner = results.into_iter().find_map(Result::ok).expect("one creator should win");
    assert_eq!(stored, winner);
}
