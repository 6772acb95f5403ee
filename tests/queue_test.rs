/*!
 * Blocking Queue Tests
 * Tests for unbounded and bounded queues and their persisted records
 */

use fastsync::queue::persist;
use fastsync::{BlockingQueue, SyncError};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..5_000 {
        if condition() {
            return;
        }
        thread::sleep(Duration::from_millis(1));
    }
    panic!("condition not reached in time");
}

#[test]
fn test_bounded_push_blocks_when_full() {
    let queue = Arc::new(BlockingQueue::bounded(2).unwrap());
    queue.push(1);
    queue.push(2);

    let producer = {
        let queue = queue.clone();
        thread::spawn(move || queue.push(3))
    };

    wait_for(|| queue.num_waiting() == 1);
    assert_eq!(queue.len(), 2);

    assert_eq!(queue.pop(), 1);
    producer.join().unwrap();
    assert_eq!(queue.to_vec(), vec![2, 3]);
    assert_eq!(queue.num_waiting(), 0);
}

#[test]
fn test_pop_blocks_until_value_arrives() {
    let queue = Arc::new(BlockingQueue::new());

    let consumer = {
        let queue = queue.clone();
        thread::spawn(move || queue.pop())
    };

    wait_for(|| queue.num_waiting() == 1);
    queue.push("job");
    assert_eq!(consumer.join().unwrap(), "job");
    assert!(queue.is_empty());
}

#[test]
fn test_raising_capacity_wakes_one_producer_per_slot() {
    let queue = Arc::new(BlockingQueue::bounded(2).unwrap());
    queue.push(0);
    queue.push(0);

    let producers: Vec<_> = (1..=4)
        .map(|value| {
            let queue = queue.clone();
            thread::spawn(move || queue.push(value))
        })
        .collect();

    wait_for(|| queue.num_waiting() == 4);
    queue.set_capacity(5).unwrap();

    wait_for(|| queue.len() == 5);
    assert_eq!(queue.num_waiting(), 1);

    // Making room lets the last producer through
    assert_eq!(queue.pop(), 0);
    for producer in producers {
        producer.join().unwrap();
    }
    assert_eq!(queue.len(), 5);
    assert_eq!(queue.num_waiting(), 0);
}

#[test]
fn test_clear_wakes_a_single_producer() {
    let queue = Arc::new(BlockingQueue::bounded(2).unwrap());
    queue.push('a');
    queue.push('b');

    let producers: Vec<_> = ['c', 'd']
        .into_iter()
        .map(|value| {
            let queue = queue.clone();
            thread::spawn(move || queue.push(value))
        })
        .collect();

    wait_for(|| queue.num_waiting() == 2);
    queue.clear();

    wait_for(|| queue.len() == 1);
    assert_eq!(queue.num_waiting(), 1);

    queue.pop();
    for producer in producers {
        producer.join().unwrap();
    }
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.num_waiting(), 0);
}

#[test]
fn test_consumers_receive_every_value_once() {
    let queue = Arc::new(BlockingQueue::bounded(4).unwrap());
    let per_producer = 250;

    let producers: Vec<_> = (0..3)
        .map(|id| {
            let queue = queue.clone();
            thread::spawn(move || {
                for n in 0..per_producer {
                    queue.push(id * per_producer + n);
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..3)
        .map(|_| {
            let queue = queue.clone();
            thread::spawn(move || (0..per_producer).map(|_| queue.pop()).collect::<Vec<_>>())
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }
    let mut seen: Vec<usize> = consumers
        .into_iter()
        .flat_map(|consumer| consumer.join().unwrap())
        .collect();
    seen.sort_unstable();

    assert_eq!(seen, (0..3 * per_producer).collect::<Vec<_>>());
    assert!(queue.is_empty());
}

#[test]
fn test_persisted_queue_resumes_where_it_left_off() {
    let queue = BlockingQueue::bounded(3).unwrap();
    queue.push(1u32);
    queue.push(2);
    queue.push(3);

    let record = persist::to_bincode(&queue).unwrap();
    let restored = Arc::new(persist::from_bincode::<u32>(&record).unwrap());

    assert_eq!(restored.capacity(), 3);
    assert_eq!(restored.num_waiting(), 0);
    assert_eq!(restored.pop(), 1);
    assert_eq!(restored.pop(), 2);
    assert_eq!(restored.pop(), 3);
    assert_eq!(restored.try_pop(), Err(SyncError::EmptyQueue));

    let consumer = {
        let restored = restored.clone();
        thread::spawn(move || restored.pop())
    };
    wait_for(|| restored.num_waiting() == 1);
    restored.push(9);
    assert_eq!(consumer.join().unwrap(), 9);
}

#[test]
fn test_json_record_restores_bounded_queue() {
    let restored: BlockingQueue<String> = persist::from_json(r#"[2,"x","y"]"#).unwrap();
    assert_eq!(restored.capacity(), 2);
    assert_eq!(restored.to_vec(), vec!["x".to_string(), "y".to_string()]);

    assert_eq!(persist::to_json(&restored).unwrap(), r#"[2,"x","y"]"#);
}
