//! Identifier generation
//!
//! The process bootstrap builds one generator and hands it to each DAO.
//! Nothing here is global.

use rand::Rng;
use uuid::Uuid;

/// Source of fresh entity identifiers
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> Uuid;
}

/// Time-based (version 1) identifiers, ordered by creation time per node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeUuidGenerator {
    node_id: [u8; 6],
}

impl TimeUuidGenerator {
    pub fn new(node_id: [u8; 6]) -> Self {
        Self { node_id }
    }

    /// Random node id with the multicast bit set, so it cannot collide with
    /// a hardware address
    pub fn seeded() -> Self {
        let mut node_id: [u8; 6] = rand::thread_rng().gen();
        node_id[0] |= 0x01;
        Self::new(node_id)
    }

    pub fn node_id(&self) -> [u8; 6] {
        self.node_id
    }
}

impl IdGenerator for TimeUuidGenerator {
    fn next_id(&self) -> Uuid {
        Uuid::now_v1(&self.node_id)
    }
}

/// Random (version 4) identifiers
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomUuidGenerator;

impl IdGenerator for RandomUuidGenerator {
    fn next_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_time_uuids_are_v1_and_distinct() {
        let ids = TimeUuidGenerator::new([1, 2, 3, 4, 5, 6]);
        let seen: HashSet<Uuid> = (0..1000).map(|_| ids.next_id()).collect();
        assert_eq!(seen.len(), 1000);
        assert!(seen.iter().all(|id| id.get_version_num() == 1));
    }

    #[test]
    fn test_seeded_sets_multicast_bit() {
        assert_eq!(TimeUuidGenerator::seeded().node_id()[0] & 0x01, 0x01);
    }

    #[test]
    fn test_random_uuids_are_v4() {
        assert_eq!(RandomUuidGenerator.next_id().get_version_num(), 4);
    }
}
