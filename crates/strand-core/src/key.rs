//! Partition-scoped entity keys.
//!
//! Every persisted entity (deployment, form, process, job, process instance)
//! is assigned a `Key` by the partition's [`KeyGenerator`]. Keys are:
//!
//! - **Partition-unique**: the partition id is encoded in the high bits, so
//!   keys from different partitions never collide
//! - **Monotonic per partition**: later entities always get larger keys
//! - **Assigned once**: keys are generated while processing a command and
//!   recorded in the resulting event, so replay never re-generates them

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of bits reserved for the key counter; the remaining high bits
/// carry the partition id.
const KEY_BITS: u32 = 51;
const COUNTER_MASK: u64 = (1 << KEY_BITS) - 1;

/// A partition-unique, monotonic entity key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(u64);

impl Key {
    /// Creates a key from its raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw key value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns the partition id encoded in the key.
    #[must_use]
    pub const fn partition_id(self) -> u16 {
        (self.0 >> KEY_BITS) as u16
    }

    /// Returns the per-partition counter component of the key.
    #[must_use]
    pub const fn counter(self) -> u64 {
        self.0 & COUNTER_MASK
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic key generator for one partition.
///
/// Owned by the single-threaded processing loop; keys are handed out while
/// transforming commands into events and never re-generated during replay.
/// After a replay, [`KeyGenerator::observe`] advances the counter past every
/// key seen in the log so newly generated keys stay strictly increasing.
#[derive(Debug)]
pub struct KeyGenerator {
    partition_id: u16,
    next_counter: u64,
}

impl KeyGenerator {
    /// Creates a generator for the given partition. The first generated key
    /// has counter value 1.
    #[must_use]
    pub const fn new(partition_id: u16) -> Self {
        Self {
            partition_id,
            next_counter: 1,
        }
    }

    /// Returns the partition this generator belongs to.
    #[must_use]
    pub const fn partition_id(&self) -> u16 {
        self.partition_id
    }

    /// Generates the next key.
    pub fn next_key(&mut self) -> Key {
        let key = Key((u64::from(self.partition_id) << KEY_BITS) | self.next_counter);
        self.next_counter += 1;
        key
    }

    /// Advances the counter past an already-assigned key.
    ///
    /// Keys belonging to other partitions are ignored.
    pub fn observe(&mut self, key: Key) {
        if key.partition_id() == self.partition_id {
            self.next_counter = self.next_counter.max(key.counter() + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_encode_partition_and_counter() {
        let mut keys = KeyGenerator::new(3);
        let key = keys.next_key();
        assert_eq!(key.partition_id(), 3);
        assert_eq!(key.counter(), 1);
        assert_eq!(keys.next_key().counter(), 2);
    }

    #[test]
    fn keys_are_monotonic_per_partition() {
        let mut keys = KeyGenerator::new(1);
        let a = keys.next_key();
        let b = keys.next_key();
        assert!(b > a);
    }

    #[test]
    fn different_partitions_never_collide() {
        let mut p1 = KeyGenerator::new(1);
        let mut p2 = KeyGenerator::new(2);
        assert_ne!(p1.next_key(), p2.next_key());
    }

    #[test]
    fn observe_advances_past_replayed_keys() {
        let mut keys = KeyGenerator::new(1);
        let mut original = KeyGenerator::new(1);
        let k1 = original.next_key();
        let k2 = original.next_key();

        keys.observe(k1);
        keys.observe(k2);
        assert!(keys.next_key() > k2);
    }

    #[test]
    fn observe_ignores_foreign_partitions() {
        let mut keys = KeyGenerator::new(1);
        let mut other = KeyGenerator::new(2);
        for _ in 0..10 {
            keys.observe(other.next_key());
        }
        assert_eq!(keys.next_key().counter(), 1);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn generated_keys_never_collide_with_observed(
                counters in prop::collection::vec(1u64..1_000_000, 1..64)
            ) {
                let mut keys = KeyGenerator::new(1);
                let observed: Vec<Key> = counters
                    .iter()
                    .map(|c| Key::new((1u64 << KEY_BITS) | c))
                    .collect();
                for key in &observed {
                    keys.observe(*key);
                }

                let fresh = keys.next_key();
                prop_assert!(observed.iter().all(|key| *key != fresh));
                prop_assert!(fresh.counter() > counters.iter().copied().max().unwrap_or(0));
            }
        }
    }
}
