/*!
 * Blocking Queues
 *
 * - Unbounded `Queue`: `BlockingQueue::new()`
 * - Bounded `SizedQueue`: `BlockingQueue::bounded(capacity)`
 *
 * Both persist as a record of their capacity followed by their values.
 */

mod blocking;
pub mod persist;

pub use blocking::{BlockingQueue, UNBOUNDED};
