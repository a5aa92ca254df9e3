use rand::RngCore;

use crate::{DedupSet, Error};

/// Table regenerations tried before giving up. A random multigraph with
/// `n` edges on `3n` vertices is acyclic with probability around 0.57, so
/// the expected number of attempts is below two and the cap is unreachable
/// under a working RNG.
const MAX_LABEL_ATTEMPTS: u32 = 1024;

/// Vertex label meaning "not assigned yet".
const UNSET: u32 = u32::MAX;

/// Order-preserving minimal perfect hash over byte-string keys.
///
/// Maps key `i` of the build sequence back to index `i`, and every other
/// key to `None`, in O(key length) per query. Each key becomes an edge
/// between two of `3n` vertices, chosen by two independent weighted
/// byte-position hashes; a per-component BFS assigns vertex labels so the
/// endpoint labels of key `i` sum to `i` modulo `3n`. Any contradiction
/// during the BFS restarts the attempt with fresh random tables.
///
/// Key bytes are copied into owned storage at build time. Immutable once
/// built.
#[derive(Debug, Clone)]
pub struct OrderedFixedSet {
    keys: Vec<Vec<u8>>,
    vertices_count: usize,
    slot_tables: [[u32; 256]; 2],
    position_weight: Vec<u32>,
    label: Vec<u32>,
}

impl OrderedFixedSet {
    /// Builds the index over `keys`, copying each key's bytes. Keys must be
    /// distinct; duplicates are rejected up front rather than left to spin
    /// the retry loop.
    pub fn build<I, K, R>(keys: I, rng: &mut R) -> Result<Self, Error>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
        R: RngCore,
    {
        let mut owned = Vec::new();
        let mut seen: DedupSet<Vec<u8>> = DedupSet::default();
        for key in keys {
            let bytes = key.as_ref().to_vec();
            if !seen.insert(bytes.clone()) {
                return Err(Error::DuplicateKey);
            }
            owned.push(bytes);
        }

        let n = owned.len();
        let max_key_length = owned.iter().map(Vec::len).max().unwrap_or(0);
        let mut set = Self {
            keys: owned,
            vertices_count: 3 * n,
            slot_tables: [[0; 256]; 2],
            position_weight: vec![0; max_key_length],
            label: Vec::new(),
        };
        if n == 0 {
            return Ok(set);
        }

        for _ in 0..MAX_LABEL_ATTEMPTS {
            set.generate_random_tables(rng);
            let graph = KeyGraph::build(&set.edge_endpoints(), set.vertices_count);
            if set.assign_labels(&graph) {
                return Ok(set);
            }
        }
        Err(Error::RetriesExhausted {
            attempts: MAX_LABEL_ATTEMPTS,
        })
    }

    /// Position of `key` in the build sequence, or `None` if it was never
    /// part of it.
    pub fn get_index(&self, key: &[u8]) -> Option<usize> {
        // Keys longer than the longest build key have no weight entries and
        // cannot be members.
        if self.keys.is_empty() || key.len() > self.position_weight.len() {
            return None;
        }
        let tail = self.vertex(key, 0);
        let head = self.vertex(key, 1);
        if self.label[tail] == UNSET || self.label[head] == UNSET {
            return None;
        }
        let index = (self.label[tail] as usize + self.label[head] as usize) % self.vertices_count;
        // The label arithmetic is only a perfect hash for the build keys;
        // anything else must fail the exact byte comparison.
        if index >= self.keys.len() || self.keys[index] != key {
            return None;
        }
        Some(index)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Fresh per-slot byte tables and per-offset weights, all uniform in
    /// `[0, vertices_count)`.
    fn generate_random_tables<R: RngCore>(&mut self, rng: &mut R) {
        let modulus = self.vertices_count as u64;
        for table in self.slot_tables.iter_mut() {
            for entry in table.iter_mut() {
                *entry = (rng.next_u64() % modulus) as u32;
            }
        }
        for weight in self.position_weight.iter_mut() {
            *weight = (rng.next_u64() % modulus) as u32;
        }
    }

    /// Weighted byte-position hash of `key` under slot table `slot`:
    /// `Σ position_weight[offset] · slot_table[byte]  (mod vertices_count)`.
    fn vertex(&self, key: &[u8], slot: usize) -> usize {
        let modulus = self.vertices_count as u64;
        let mut hash = 0u64;
        for (offset, &byte) in key.iter().enumerate() {
            let weight = self.position_weight[offset] as u64;
            let value = self.slot_tables[slot][byte as usize] as u64;
            hash = (hash + weight * value) % modulus;
        }
        hash as usize
    }

    /// Both edge endpoints for every key under the current tables.
    fn edge_endpoints(&self) -> Vec<(usize, usize)> {
        self.keys
            .iter()
            .map(|key| (self.vertex(key, 0), self.vertex(key, 1)))
            .collect()
    }

    /// Labels every connected component; false on the first contradiction,
    /// which sends the caller back for fresh tables.
    fn assign_labels(&mut self, graph: &KeyGraph) -> bool {
        self.label.clear();
        self.label.resize(self.vertices_count, UNSET);
        for vertex in 0..self.vertices_count {
            if self.label[vertex] == UNSET && !graph.is_isolated(vertex) && !self.bfs(graph, vertex)
            {
                return false;
            }
        }
        true
    }

    /// Propagates labels across one component starting at `start` (label 0).
    /// The arc of key `i` from `tail` to `head` requires
    /// `label[head] = (i − label[tail]) mod vertices_count`; an already
    /// labeled head that disagrees is a contradiction.
    fn bfs(&mut self, graph: &KeyGraph, start: usize) -> bool {
        self.label[start] = 0;
        let mut queue = vec![start];
        let mut next = 0;
        while next < queue.len() {
            let tail = queue[next];
            next += 1;
            let tail_label = self.label[tail] as usize;
            for (head, key_index) in graph.arcs(tail) {
                let needed = ((key_index + self.vertices_count - tail_label)
                    % self.vertices_count) as u32;
                if self.label[head] == UNSET {
                    self.label[head] = needed;
                    queue.push(head);
                } else if self.label[head] != needed {
                    return false;
                }
            }
        }
        true
    }
}

/// Undirected multigraph over the label vertices in CSR form: offsets into
/// flat arc arrays, one arc per (endpoint, key) incidence, so every edge
/// appears once per endpoint.
struct KeyGraph {
    offsets: Vec<usize>,
    arc_head: Vec<u32>,
    arc_key: Vec<u32>,
}

impl KeyGraph {
    fn build(endpoints: &[(usize, usize)], vertices_count: usize) -> Self {
        let mut degree = vec![0u32; vertices_count];
        for &(tail, head) in endpoints {
            degree[tail] += 1;
            degree[head] += 1;
        }

        let mut offsets = vec![0usize; vertices_count + 1];
        for vertex in 0..vertices_count {
            offsets[vertex + 1] = offsets[vertex] + degree[vertex] as usize;
        }

        let mut cursor = offsets.clone();
        let mut arc_head = vec![0u32; offsets[vertices_count]];
        let mut arc_key = vec![0u32; offsets[vertices_count]];
        for (key_index, &(tail, head)) in endpoints.iter().enumerate() {
            for (from, to) in [(tail, head), (head, tail)] {
                arc_head[cursor[from]] = to as u32;
                arc_key[cursor[from]] = key_index as u32;
                cursor[from] += 1;
            }
        }

        Self {
            offsets,
            arc_head,
            arc_key,
        }
    }

    fn arcs(&self, vertex: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.offsets[vertex]..self.offsets[vertex + 1])
            .map(|arc| (self.arc_head[arc] as usize, self.arc_key[arc] as usize))
    }

    fn is_isolated(&self, vertex: usize) -> bool {
        self.offsets[vertex] == self.offsets[vertex + 1]
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn int_key(value: u32) -> Vec<u8> {
        value.to_le_bytes().to_vec()
    }

    #[test]
    fn increasing_integers_map_to_their_positions() {
        let mut rng = StdRng::seed_from_u64(20);
        let keys: Vec<Vec<u8>> = (0..1000).map(int_key).collect();
        let set = OrderedFixedSet::build(&keys, &mut rng).unwrap();

        assert_eq!(set.len(), 1000);
        for (index, key) in keys.iter().enumerate() {
            assert_eq!(set.get_index(key), Some(index));
        }
        assert_eq!(set.get_index(&int_key(1000)), None);
    }

    #[test]
    fn decreasing_integers_map_to_their_new_positions() {
        let mut rng = StdRng::seed_from_u64(21);
        let keys: Vec<Vec<u8>> = (0..1000).rev().map(int_key).collect();
        let set = OrderedFixedSet::build(&keys, &mut rng).unwrap();

        for position in 0..1000usize {
            let value = 999 - position as u32;
            assert_eq!(set.get_index(&int_key(value)), Some(position));
        }
    }

    #[test]
    fn indices_form_a_bijection_onto_the_range() {
        let mut rng = StdRng::seed_from_u64(22);
        let keys: Vec<String> = (0..500).map(|i| format!("key-{i:03}-{}", i * 7)).collect();
        let set = OrderedFixedSet::build(&keys, &mut rng).unwrap();

        let indices: HashSet<usize> = keys
            .iter()
            .map(|key| set.get_index(key.as_bytes()).unwrap())
            .collect();
        assert_eq!(indices.len(), keys.len());
        assert!(indices.iter().all(|&index| index < keys.len()));
    }

    #[test]
    fn absent_keys_are_rejected() {
        let mut rng = StdRng::seed_from_u64(23);
        let keys = ["tail", "head", "label", "arc"];
        let set = OrderedFixedSet::build(keys, &mut rng).unwrap();

        assert_eq!(set.get_index(b"vertex"), None);
        assert_eq!(set.get_index(b""), None);
        assert_eq!(set.get_index(b"tai"), None);
        // longer than every build key: no weights exist for its offsets
        assert_eq!(set.get_index(b"a key far longer than any build key"), None);
    }

    #[test]
    fn order_of_the_build_sequence_is_what_queries_recover() {
        let keys = ["alpha", "beta", "gamma", "delta"];
        let mut reversed = keys;
        reversed.reverse();

        let forward =
            OrderedFixedSet::build(keys, &mut StdRng::seed_from_u64(24)).unwrap();
        let backward =
            OrderedFixedSet::build(reversed, &mut StdRng::seed_from_u64(24)).unwrap();

        for (position, key) in keys.iter().enumerate() {
            assert_eq!(forward.get_index(key.as_bytes()), Some(position));
            assert_eq!(
                backward.get_index(key.as_bytes()),
                Some(keys.len() - 1 - position)
            );
        }
    }

    #[test]
    fn empty_set_rejects_everything() {
        let mut rng = StdRng::seed_from_u64(25);
        let set = OrderedFixedSet::build(Vec::<Vec<u8>>::new(), &mut rng).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.get_index(b""), None);
        assert_eq!(set.get_index(b"anything"), None);
    }

    #[test]
    fn single_key_set() {
        let mut rng = StdRng::seed_from_u64(26);
        let set = OrderedFixedSet::build(["only"], &mut rng).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get_index(b"only"), Some(0));
        assert_eq!(set.get_index(b"other"), None);
    }

    #[test]
    fn variable_length_keys() {
        let mut rng = StdRng::seed_from_u64(27);
        let keys = ["", "a", "ab", "abc", "abcd", "abcde"];
        let set = OrderedFixedSet::build(keys, &mut rng).unwrap();
        for (position, key) in keys.iter().enumerate() {
            assert_eq!(set.get_index(key.as_bytes()), Some(position));
        }
        assert_eq!(set.get_index(b"abcdef"), None);
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let mut rng = StdRng::seed_from_u64(28);
        let result = OrderedFixedSet::build(["x", "y", "x"], &mut rng);
        assert!(matches!(result, Err(Error::DuplicateKey)));
    }

    #[test]
    fn same_seed_builds_the_same_labeling() {
        let keys: Vec<Vec<u8>> = (0..100).map(int_key).collect();
        let first = OrderedFixedSet::build(&keys, &mut StdRng::seed_from_u64(29)).unwrap();
        let second = OrderedFixedSet::build(&keys, &mut StdRng::seed_from_u64(29)).unwrap();
        assert_eq!(first.label, second.label);

        // queries are pure: repeating one changes nothing
        assert_eq!(first.get_index(&int_key(42)), Some(42));
        assert_eq!(first.get_index(&int_key(42)), Some(42));
    }

    #[test]
    fn endpoint_labels_sum_to_the_key_index() {
        let mut rng = StdRng::seed_from_u64(30);
        let keys: Vec<Vec<u8>> = (0..64).map(int_key).collect();
        let set = OrderedFixedSet::build(&keys, &mut rng).unwrap();

        for (index, key) in set.keys.iter().enumerate() {
            let tail = set.vertex(key, 0);
            let head = set.vertex(key, 1);
            let sum = (set.label[tail] as usize + set.label[head] as usize) % set.vertices_count;
            assert_eq!(sum, index);
        }
    }
}
