use super::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn after(ms: u64) -> Instant {
    Instant::now() + Duration::from_millis(ms)
}

#[test]
fn fifo_order() {
    let queue = TransportQueue::new(4);
    for i in 1..=4 {
        queue.try_emplace_until(after(10), i).unwrap();
    }
    for i in 1..=4 {
        assert_eq!(queue.try_pop_until(after(10)), Some(i));
    }
    assert!(queue.is_empty());
}

#[test]
fn full_queue_times_out() {
    let queue = TransportQueue::new(1);
    queue.try_emplace_until(after(10), 1).unwrap();
    let start = Instant::now();
    assert_eq!(queue.try_emplace_until(after(30), 2), Err(PushError::Timeout(2)));
    assert!(start.elapsed() >= Duration::from_millis(30));
    assert!(!queue.closed());
}

#[test]
fn empty_queue_times_out() {
    let queue = TransportQueue::<i32>::new(1);
    let start = Instant::now();
    assert_eq!(queue.try_pop_until(after(30)), None);
    assert!(start.elapsed() >= Duration::from_millis(30));
}

#[test]
fn blocked_producer_resumes_after_pop() {
    let queue = Arc::new(TransportQueue::new(1));
    queue.try_emplace_until(after(10), 1).unwrap();
    let producer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.try_emplace_until(after(1000), 2))
    };
    thread::sleep(Duration::from_millis(20));
    assert_eq!(queue.try_pop_until(after(10)), Some(1));
    assert_eq!(producer.join().unwrap(), Ok(()));
    assert_eq!(queue.try_pop_until(after(10)), Some(2));
}

#[test]
fn close_wakes_blocked_consumer() {
    let queue = Arc::new(TransportQueue::<i32>::new(1));
    let consumer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            let start = Instant::now();
            (queue.try_pop_until(after(5000)), start.elapsed())
        })
    };
    thread::sleep(Duration::from_millis(20));
    queue.close();
    let (value, waited) = consumer.join().unwrap();
    assert_eq!(value, None);
    assert!(waited < Duration::from_millis(5000));
}

#[test]
fn close_rejects_push_but_keeps_queued_items() {
    let queue = TransportQueue::new(2);
    queue.try_emplace_until(after(10), 1).unwrap();
    queue.close();
    queue.close();
    assert!(queue.closed());
    assert_eq!(queue.try_emplace_until(after(10), 2), Err(PushError::Closed(2)));
    assert_eq!(queue.try_pop_until(after(10)), Some(1));
    let start = Instant::now();
    assert_eq!(queue.try_pop_until(after(1000)), None);
    assert!(start.elapsed() < Duration::from_millis(1000));
}

#[test]
fn close_wakes_blocked_producer() {
    let queue = Arc::new(TransportQueue::new(1));
    queue.try_emplace_until(after(10), 1).unwrap();
    let producer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.try_emplace_until(after(5000), 2))
    };
    thread::sleep(Duration::from_millis(20));
    queue.close();
    assert_eq!(producer.join().unwrap().unwrap_err().into_inner(), 2);
}

#[test]
fn concurrent_producers_lose_nothing() {
    let queue = Arc::new(TransportQueue::new(3));
    let producers: Vec<_> = (0..4)
        .map(|p| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..50 {
                    queue.try_emplace_until(after(5000), p * 100 + i).unwrap();
                }
            })
        })
        .collect();
    let mut last = [-1i32; 4];
    for _ in 0..200 {
        let value = queue.try_pop_until(after(5000)).unwrap();
        let (p, i) = ((value / 100) as usize, value % 100);
        assert!(i > last[p], "per-producer order must hold");
        last[p] = i;
    }
    for producer in producers {
        producer.join().unwrap();
    }
    assert_eq!(last, [49; 4]);
}
