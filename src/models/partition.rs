use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::Vocabulary;

/// The four quadrants of a Johari Window, each in vocabulary order.
///
/// - `arena`: descriptors both the subject and at least one peer chose
/// - `blind_spot`: descriptors only peers chose
/// - `facade`: descriptors only the subject chose
/// - `unknown`: descriptors nobody chose
///
/// For any pair of inputs the quadrants are pairwise disjoint and together
/// cover the whole vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub arena: Vec<String>,
    pub blind_spot: Vec<String>,
    pub facade: Vec<String>,
    pub unknown: Vec<String>,
}

impl Vocabulary {
    /// Partition the vocabulary by self- and peer-selections.
    ///
    /// Pure and total: any string slice is accepted, tokens outside the
    /// vocabulary are silently ignored (every quadrant is a filter over the
    /// vocabulary), and the output order is the vocabulary's own order no
    /// matter how the inputs are ordered. Duplicate input tokens are
    /// harmless since only membership is tested.
    pub fn partition(&self, self_selections: &[String], peer_selections: &[String]) -> Partition {
        let chosen_by_self: HashSet<&str> = self_selections.iter().map(String::as_str).collect();
        let chosen_by_peers: HashSet<&str> = peer_selections.iter().map(String::as_str).collect();

        let mut partition = Partition {
            arena: Vec::new(),
            blind_spot: Vec::new(),
            facade: Vec::new(),
            unknown: Vec::new(),
        };

        // One pass over the vocabulary; the (self, peer) membership pair
        // names exactly one quadrant, which gives disjointness and full
        // cover by construction.
        for term in self.terms() {
            let quadrant = match (
                chosen_by_self.contains(term.as_str()),
                chosen_by_peers.contains(term.as_str()),
            ) {
                (true, true) => &mut partition.arena,
                (false, true) => &mut partition.blind_spot,
                (true, false) => &mut partition.facade,
                (false, false) => &mut partition.unknown,
            };
            quadrant.push(term.clone());
        }

        partition
    }
}

impl Partition {
    /// Total number of descriptors across the four quadrants. Always equals
    /// the vocabulary size the partition was computed from.
    pub fn len(&self) -> usize {
        self.arena.len() + self.blind_spot.len() + self.facade.len() + self.unknown.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
