use super::config::{DEFAULT_LINKER_LABELS, DEFAULT_NODE_LABELS};
use std::collections::{BTreeMap, VecDeque};
use tracing::debug;

/// Label used when a pool is constructed without any elements.
pub const OVERFLOW_LABEL: u8 = 118;

/// Ordered supply of synthetic species labels.
///
/// Labels are handed out front to back. The last label is never removed, so
/// once the pool is down to one element that label is reused indefinitely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelPool {
    labels: VecDeque<u8>,
}

impl LabelPool {
    pub fn new(labels: impl IntoIterator<Item = u8>) -> Self {
        let mut labels: VecDeque<u8> = labels.into_iter().collect();
        if labels.is_empty() {
            labels.push_back(OVERFLOW_LABEL);
        }
        Self { labels }
    }

    /// Zr, Zn, Ga, Og, Ts.
    pub fn nodes() -> Self {
        Self::new(DEFAULT_NODE_LABELS)
    }

    /// O, N, C, B.
    pub fn linkers() -> Self {
        Self::new(DEFAULT_LINKER_LABELS)
    }

    pub fn next_label(&mut self) -> u8 {
        if self.labels.len() > 1 {
            if let Some(label) = self.labels.pop_front() {
                return label;
            }
        }
        self.labels.front().copied().unwrap_or(OVERFLOW_LABEL)
    }

    pub fn is_exhausted(&self) -> bool {
        self.labels.len() <= 1
    }
}

/// Assigns a stable synthetic label to each distinct building-unit signature.
///
/// A registry is scoped to one classification pass; node and linker passes
/// each own their own instance.
#[derive(Debug, Clone)]
pub struct KeyRegistry {
    pool: LabelPool,
    mapping: BTreeMap<String, u8>,
}

impl KeyRegistry {
    pub fn new(pool: LabelPool) -> Self {
        Self {
            pool,
            mapping: BTreeMap::new(),
        }
    }

    /// Returns the label for `signature`, drawing a new one from the pool on
    /// first use.
    pub fn key(&mut self, signature: &str) -> u8 {
        if let Some(&label) = self.mapping.get(signature) {
            return label;
        }
        let label = self.pool.next_label();
        debug!(signature, label, "Assigned building-unit label");
        self.mapping.insert(signature.to_string(), label);
        label
    }

    pub fn mapping(&self) -> &BTreeMap<String, u8> {
        &self.mapping
    }

    pub fn into_mapping(self) -> BTreeMap<String, u8> {
        self.mapping
    }

    /// Labels handed out so far, in signature order. A reused overflow label
    /// appears once per signature.
    pub fn used_labels(&self) -> Vec<u8> {
        self.mapping.values().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}
