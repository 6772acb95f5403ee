/*!
 * fastsync demo - producer/consumer pipeline
 *
 * Runs several producers against a bounded queue drained by a pool of
 * consumers, resizes the queue mid-run, then persists the leftovers.
 *
 * Usage: fastsync-demo [producers] [consumers] [items-per-producer]
 */

use anyhow::{bail, Context, Result};
use fastsync::{init_tracing, queue::persist, BlockingQueue, ConditionVariable, Mutex, SyncConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};

/// Sentinel telling a consumer to stop
const STOP: u64 = u64::MAX;

struct Pipeline {
    queue: BlockingQueue<u64>,
    done_lock: Mutex,
    done: ConditionVariable,
    consumed: AtomicUsize,
    checksum: AtomicUsize,
}

fn parse_arg(args: &[String], index: usize, default: usize) -> Result<usize> {
    match args.get(index) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("argument {} must be a number, got {:?}", index, raw)),
        None => Ok(default),
    }
}

fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let producers = parse_arg(&args, 1, 4)?;
    let consumers = parse_arg(&args, 2, 2)?;
    let per_producer = parse_arg(&args, 3, 1_000)?;
    if consumers == 0 {
        bail!("at least one consumer is required");
    }

    let config = SyncConfig::global();
    info!(
        producers,
        consumers,
        per_producer,
        node_pooling = config.node_pooling,
        "Starting pipeline"
    );

    let pipeline = Arc::new(Pipeline {
        queue: BlockingQueue::with_config(8, config),
        done_lock: Mutex::new(),
        done: ConditionVariable::new(),
        consumed: AtomicUsize::new(0),
        checksum: AtomicUsize::new(0),
    });
    let expected = producers * per_producer;

    let consumer_handles: Vec<_> = (0..consumers)
        .map(|id| {
            let pipeline = pipeline.clone();
            thread::Builder::new()
                .name(format!("consumer-{}", id))
                .spawn(move || loop {
                    let item = pipeline.queue.pop();
                    if item == STOP {
                        break;
                    }
                    pipeline.checksum.fetch_add(item as usize, Ordering::Relaxed);
                    if pipeline.consumed.fetch_add(1, Ordering::AcqRel) + 1 == expected {
                        pipeline.done_lock.synchronize(|| pipeline.done.broadcast());
                    }
                })
        })
        .collect::<std::io::Result<_>>()
        .context("failed to spawn consumer")?;

    let producer_handles: Vec<_> = (0..producers)
        .map(|id| {
            let pipeline = pipeline.clone();
            thread::Builder::new()
                .name(format!("producer-{}", id))
                .spawn(move || {
                    for n in 0..per_producer {
                        pipeline.queue.push((id * per_producer + n) as u64);
                    }
                })
        })
        .collect::<std::io::Result<_>>()
        .context("failed to spawn producer")?;

    // Give producers more room once the pipeline is warm
    pipeline.queue.set_capacity(32)?;
    info!(
        waiting = pipeline.queue.num_waiting(),
        "Raised queue capacity to 32"
    );

    for handle in producer_handles {
        if handle.join().is_err() {
            warn!("Producer panicked");
        }
    }

    pipeline.done_lock.synchronize(|| {
        while pipeline.consumed.load(Ordering::Acquire) < expected {
            if let Err(err) = pipeline.done.wait(&pipeline.done_lock) {
                warn!(error = %err, "Completion wait failed");
                break;
            }
        }
    });

    let checksum = pipeline.checksum.load(Ordering::Relaxed);
    info!(
        consumed = pipeline.consumed.load(Ordering::Relaxed),
        checksum,
        "All items consumed"
    );

    for _ in 0..consumers {
        pipeline.queue.push(STOP);
    }
    for handle in consumer_handles {
        if handle.join().is_err() {
            warn!("Consumer panicked");
        }
    }

    // Consumers are gone; anything pushed now stays queued for the snapshot
    for leftover in 0..3 {
        pipeline.queue.push(leftover);
    }
    let record = persist::to_json(&pipeline.queue)?;
    info!(%record, "Persisted queue snapshot");
    pipeline.queue.clear();

    let restored: BlockingQueue<u64> = persist::from_json(&record)?;
    info!(
        capacity = restored.capacity(),
        len = restored.len(),
        "Restored queue from snapshot"
    );

    Ok(())
}
