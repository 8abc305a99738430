use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU32, Ordering},
};
use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;
use tunebridge::error::ProxyError;
use tunebridge::scheduler::{Attempt, RequestScheduler, SchedulerPolicy};

fn scheduler() -> RequestScheduler {
    RequestScheduler::new("test", SchedulerPolicy::default())
}

#[test]
fn test_backoff_adds_padding() {
    let policy = SchedulerPolicy::default();
    assert_eq!(policy.backoff(Some(Duration::from_secs(2))), Duration::from_secs(3));
    assert_eq!(policy.backoff(None), Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn test_call_starts_are_spaced() {
    let scheduler = scheduler();
    let starts = Arc::new(Mutex::new(Vec::new()));

    let jobs = (0..4).map(|_| {
        let starts = Arc::clone(&starts);
        scheduler.enqueue("spacing", move || {
            let starts = Arc::clone(&starts);
            async move {
                starts.lock().unwrap().push(Instant::now());
                Ok::<_, ProxyError>(Attempt::Done(()))
            }
        })
    });
    for result in join_all(jobs).await {
        result.unwrap();
    }

    let starts = starts.lock().unwrap();
    assert_eq!(starts.len(), 4);
    for pair in starts.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(350));
    }
}

#[tokio::test(start_paused = true)]
async fn test_requests_run_in_fifo_order() {
    let scheduler = scheduler();
    let order = Arc::new(Mutex::new(Vec::new()));

    let jobs = (0..5).map(|i| {
        let order = Arc::clone(&order);
        scheduler.enqueue(format!("job-{i}"), move || {
            let order = Arc::clone(&order);
            async move {
                order.lock().unwrap().push(i);
                Ok::<_, ProxyError>(Attempt::Done(i))
            }
        })
    });
    let results: Vec<u32> = join_all(jobs)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(results, vec![0, 1, 2, 3, 4]);
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test(start_paused = true)]
async fn test_throttled_call_is_retried_after_hint() {
    let scheduler = scheduler();
    let calls = Arc::new(AtomicU32::new(0));
    let started = Instant::now();

    let counter = Arc::clone(&calls);
    let value = scheduler
        .enqueue("artists/1", move || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Ok::<_, ProxyError>(Attempt::Throttled {
                        retry_after: Some(Duration::from_secs(2)),
                    })
                } else {
                    Ok(Attempt::Done("ok"))
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(value, "ok");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(started.elapsed() >= Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_retries_are_bounded() {
    let scheduler = scheduler();
    let calls = Arc::new(AtomicU32::new(0));
    let started = Instant::now();

    let counter = Arc::clone(&calls);
    let result = scheduler
        .enqueue("artists/1", move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<Attempt<()>, ProxyError>(Attempt::Throttled { retry_after: None })
            }
        })
        .await;

    match result {
        Err(ProxyError::RateLimitExhausted { path, attempts }) => {
            assert_eq!(path, "artists/1");
            assert_eq!(attempts, 4);
        }
        other => panic!("expected RateLimitExhausted, got {other:?}"),
    }
    // one initial attempt plus three retries, default hint 5 s + 1 s padding
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert!(started.elapsed() >= Duration::from_secs(18));
}

#[tokio::test(start_paused = true)]
async fn test_errors_are_not_retried() {
    let scheduler = scheduler();
    let calls = Arc::new(AtomicU32::new(0));

    let counter = Arc::clone(&calls);
    let result = scheduler
        .enqueue("albums/1", move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<Attempt<()>, _>(ProxyError::upstream(500, "boom"))
            }
        })
        .await;

    assert!(matches!(result, Err(ProxyError::Upstream { status: 500, .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_retry_keeps_the_queue_slot() {
    let scheduler = scheduler();
    let log = Arc::new(Mutex::new(Vec::new()));
    let attempts = Arc::new(AtomicU32::new(0));

    let first = {
        let log = Arc::clone(&log);
        let attempts = Arc::clone(&attempts);
        scheduler.enqueue("first", move || {
            let log = Arc::clone(&log);
            let attempts = Arc::clone(&attempts);
            async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                log.lock().unwrap().push(format!("first#{n}"));
                if n == 0 {
                    Ok::<_, ProxyError>(Attempt::Throttled {
                        retry_after: Some(Duration::from_secs(1)),
                    })
                } else {
                    Ok(Attempt::Done(()))
                }
            }
        })
    };
    let second = {
        let log = Arc::clone(&log);
        scheduler.enqueue("second", move || {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push("second".to_string());
                Ok::<_, ProxyError>(Attempt::Done(()))
            }
        })
    };

    let (a, b) = tokio::join!(first, second);
    a.unwrap();
    b.unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["first#0", "first#1", "second"]);
}
