// src/pipeline/gate.rs

//! Dedup/upsert gate between harvesting and the sink.
//!
//! Stages, in order:
//! 1. intra-batch dedup by full-field equality (first copy wins)
//! 2. drop records whose natural key is already persisted
//! 3. collapse records that still share a natural key (last one wins)

use std::collections::{HashMap, HashSet};

use crate::models::{NaturalKey, ProductRecord};

/// Which candidates passed and why the others did not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Admission {
    /// Positions of accepted candidates, ascending
    pub indices: Vec<usize>,
    /// Exact copies of an earlier candidate
    pub duplicates: usize,
    /// Already persisted (or admitted earlier in a streaming run)
    pub known: usize,
    /// Same natural key as a later candidate
    pub collisions: usize,
}

/// Admits only records that are genuinely new to the sink.
#[derive(Debug, Default)]
pub struct DedupGate {
    known: HashSet<NaturalKey>,
    admitted: HashSet<NaturalKey>,
}

impl DedupGate {
    /// `known` is loaded once per run and never updated by `screen`.
    pub fn new(known: HashSet<NaturalKey>) -> Self {
        Self {
            known,
            admitted: HashSet::new(),
        }
    }

    pub fn known_len(&self) -> usize {
        self.known.len()
    }

    fn is_known(&self, key: &NaturalKey) -> bool {
        self.known.contains(key) || self.admitted.contains(key)
    }

    /// Decide which candidates pass, without consuming them.
    pub fn screen(&self, candidates: &[ProductRecord]) -> Admission {
        let mut admission = Admission::default();

        let mut distinct: HashSet<&ProductRecord> = HashSet::with_capacity(candidates.len());
        let mut survivors: Vec<(usize, NaturalKey)> = Vec::with_capacity(candidates.len());
        for (index, record) in candidates.iter().enumerate() {
            if !distinct.insert(record) {
                admission.duplicates += 1;
                continue;
            }
            let key = record.natural_key();
            if self.is_known(&key) {
                admission.known += 1;
                continue;
            }
            survivors.push((index, key));
        }

        let mut last: HashMap<&NaturalKey, usize> = HashMap::with_capacity(survivors.len());
        for (index, key) in &survivors {
            last.insert(key, *index);
        }
        for (index, key) in &survivors {
            if last.get(key) == Some(index) {
                admission.indices.push(*index);
            } else {
                admission.collisions += 1;
            }
        }

        admission
    }

    /// Filter a batch down to its new records.
    pub fn admit(&self, candidates: Vec<ProductRecord>) -> Vec<ProductRecord> {
        let admission = self.screen(&candidates);
        take_indices(candidates, &admission.indices)
    }

    /// Admit one batch of a streaming run and remember its keys, so a later
    /// batch cannot admit the same key again.
    pub fn admit_incremental(
        &mut self,
        candidates: Vec<ProductRecord>,
    ) -> (Vec<ProductRecord>, Admission) {
        let admission = self.screen(&candidates);
        let accepted = take_indices(candidates, &admission.indices);
        self.admitted
            .extend(accepted.iter().map(ProductRecord::natural_key));
        (accepted, admission)
    }
}

/// Move the records at `indices` (ascending) out of `records`.
pub(crate) fn take_indices(records: Vec<ProductRecord>, indices: &[usize]) -> Vec<ProductRecord> {
    let mut wanted = indices.iter().copied().peekable();
    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| {
            if wanted.peek() == Some(&index) {
                wanted.next();
                Some(record)
            } else {
                None
            }
        })
        .collect()
}
