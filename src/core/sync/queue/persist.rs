/*!
 * Queue Persistence
 *
 * A queue is persisted as one ordered record: the capacity as `u64`,
 * followed by the queued values in FIFO order. Waiting tasks are never part
 * of the record.
 */

use super::blocking::BlockingQueue;
use crate::core::bincode;
use crate::core::errors::{SyncError, SyncResult};
use serde::de::{self, DeserializeOwned, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

impl<T: Serialize> Serialize for BlockingQueue<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let state = self.state.lock();
        let mut record = serializer.serialize_seq(Some(state.values.len() + 1))?;
        record.serialize_element(&(state.capacity as u64))?;
        for value in state.values.iter() {
            record.serialize_element(value)?;
        }
        record.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for BlockingQueue<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(RecordVisitor(PhantomData))
    }
}

struct RecordVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for RecordVisitor<T> {
    type Value = BlockingQueue<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a queue record: capacity followed by the queued values")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut record: A) -> Result<Self::Value, A::Error> {
        let capacity: u64 = record
            .next_element()?
            .ok_or_else(|| de::Error::custom("missing capacity value"))?;
        let capacity = usize::try_from(capacity).map_err(de::Error::custom)?;

        let queue = BlockingQueue::with_config(capacity, crate::core::config::SyncConfig::global());
        {
            let mut state = queue.state.lock();
            while let Some(value) = record.next_element()? {
                state.values.push(value);
            }
        }
        Ok(queue)
    }
}

/// Encode a queue record with bincode
pub fn to_bincode<T: Serialize>(queue: &BlockingQueue<T>) -> SyncResult<Vec<u8>> {
    bincode::to_vec(queue).map_err(|e| SyncError::Format(e.to_string()))
}

/// Restore a queue from a bincode record
pub fn from_bincode<T: DeserializeOwned>(bytes: &[u8]) -> SyncResult<BlockingQueue<T>> {
    bincode::from_slice(bytes).map_err(|e| SyncError::Format(e.to_string()))
}

/// Encode a queue record as a JSON array
pub fn to_json<T: Serialize>(queue: &BlockingQueue<T>) -> SyncResult<String> {
    serde_json::to_string(queue).map_err(|e| SyncError::Format(e.to_string()))
}

/// Restore a queue from a JSON array
pub fn from_json<T: DeserializeOwned>(json: &str) -> SyncResult<BlockingQueue<T>> {
    serde_json::from_str(json).map_err(|e| SyncError::Format(e.to_string()))
}
