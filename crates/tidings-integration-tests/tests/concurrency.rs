//! Integration tests for cross-thread posting and subscription churn.

#![allow(clippy::arithmetic_side_effects)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use tidings_events::{
    CenterOptions, NotificationCenter, PanicPolicy, Scheduler, SerialQueue, TokenBag,
};
use tidings_test::{Expectation, OtherEvent, Recorder, TestEvent, setup_test_logging};

const PRODUCERS: usize = 4;
const POSTS_PER_PRODUCER: usize = 250;

#[test]
fn test_concurrent_producers_deliver_every_event() {
    setup_test_logging("tidings_events=warn");

    let center = NotificationCenter::new();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let _token = center.subscribe(move |_: &OtherEvent| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let start = Arc::new(Barrier::new(PRODUCERS));
    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let center = center.clone();
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                for i in 0..POSTS_PER_PRODUCER {
                    center.post(OtherEvent {
                        n: u32::try_from(p * POSTS_PER_PRODUCER + i).unwrap(),
                    });
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }

    assert_eq!(hits.load(Ordering::SeqCst), PRODUCERS * POSTS_PER_PRODUCER);
}

#[test]
fn test_no_delivery_after_unsubscribe_returns() {
    let center = NotificationCenter::new();
    let stop = Arc::new(AtomicBool::new(false));

    let producer = {
        let center = center.clone();
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                center.post(TestEvent::new("spin"));
            }
        })
    };

    for _ in 0..50 {
        let removed = Arc::new(AtomicBool::new(false));
        let late = Arc::new(AtomicUsize::new(0));

        let mut token = {
            let removed = Arc::clone(&removed);
            let late = Arc::clone(&late);
            center.subscribe(move |_: &TestEvent| {
                if removed.load(Ordering::SeqCst) {
                    late.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        thread::sleep(Duration::from_micros(200));
        token.cancel();
        // Any delivery that starts from here on would be a violation. One
        // already past the active check may still be finishing, so give it
        // a moment before flagging.
        thread::sleep(Duration::from_millis(20));
        removed.store(true, Ordering::SeqCst);
        thread::sleep(Duration::from_micros(200));

        assert_eq!(late.load(Ordering::SeqCst), 0);
    }

    stop.store(true, Ordering::SeqCst);
    producer.join().unwrap();
    assert_eq!(center.subscriber_count(), 0);
}

#[test]
fn test_subscription_churn_while_posting() {
    let center = NotificationCenter::new();
    let stable = Recorder::<u32>::new();
    let _stable = center
        .observe::<OtherEvent>()
        .map(|e| e.n)
        .subscribe(stable.sink());

    let posts = 500_u32;
    let producer = {
        let center = center.clone();
        thread::spawn(move || {
            for n in 0..posts {
                center.post(OtherEvent { n });
            }
        })
    };

    let churners: Vec<_> = (0..3)
        .map(|_| {
            let center = center.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    let mut bag = TokenBag::new();
                    bag.insert(center.subscribe(|_: &OtherEvent| {}));
                    bag.insert(center.subscribe(|_: &TestEvent| {}));
                }
            })
        })
        .collect();

    producer.join().unwrap();
    for churner in churners {
        churner.join().unwrap();
    }

    // The stable subscription saw every post, in order.
    assert_eq!(stable.values(), (0..posts).collect::<Vec<_>>());
    assert_eq!(center.subscriber_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_serial_queue_keeps_registration_order() {
    let center = NotificationCenter::new();
    let queue = Arc::new(SerialQueue::current("ordered").unwrap());
    let recorder = Recorder::<String>::new();

    let mut bag = TokenBag::new();
    for label in ["a", "b", "c"] {
        bag.insert(
            center
                .observe::<TestEvent>()
                .on(Arc::clone(&queue) as Arc<dyn Scheduler>)
                .map(move |e| format!("{label}{}", e.value))
                .subscribe(recorder.sink()),
        );
    }

    for i in 0..10 {
        center.post(TestEvent::new(i.to_string()));
    }
    queue.flush().await.unwrap();

    let expected: Vec<String> = (0..10)
        .flat_map(|i| ["a", "b", "c"].map(|label| format!("{label}{i}")))
        .collect();
    assert_eq!(recorder.values(), expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_post_does_not_wait_for_scheduled_handler() {
    let center = NotificationCenter::new();
    let queue = Arc::new(SerialQueue::current("slow").unwrap());
    let done = Expectation::new::<OtherEvent>(&center);

    let release = Arc::new(Barrier::new(2));
    let handler_release = Arc::clone(&release);
    let relay_center = center.clone();
    let relay = center
        .observe::<TestEvent>()
        .on(Arc::clone(&queue) as Arc<dyn Scheduler>)
        .subscribe(move |_| {
            handler_release.wait();
            relay_center.post(OtherEvent { n: 0 });
        });

    // Returns while the handler is parked on the barrier.
    assert_eq!(center.post(TestEvent::new("go")), 1);
    assert!(!done.is_fulfilled());

    tokio::task::spawn_blocking(move || release.wait())
        .await
        .unwrap();
    assert!(done.wait_async(Duration::from_secs(5)).await);
    drop(relay);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_serial_queue_outlives_propagated_panic() {
    let center = NotificationCenter::with_options(
        CenterOptions::new("strict").with_panic_policy(PanicPolicy::Propagate),
    );
    let queue = Arc::new(SerialQueue::current("shared").unwrap());
    let later = Arc::new(AtomicUsize::new(0));

    let mut bag = TokenBag::new();
    bag.insert(
        center
            .observe::<TestEvent>()
            .on(Arc::clone(&queue) as Arc<dyn Scheduler>)
            .subscribe(|_| panic!("handler failed")),
    );
    let counter = Arc::clone(&later);
    bag.insert(
        center
            .observe::<OtherEvent>()
            .on(Arc::clone(&queue) as Arc<dyn Scheduler>)
            .subscribe(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
    );

    // The panic stays inside the queue's job; post itself returns.
    assert_eq!(center.post(TestEvent::new("boom")), 1);
    assert_eq!(center.post(OtherEvent { n: 1 }), 1);

    queue.flush().await.unwrap();
    assert_eq!(later.load(Ordering::SeqCst), 1);
}
