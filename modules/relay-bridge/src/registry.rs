//! Ordered bridge records.

use std::slice;

use crate::record::BridgeRecord;

/// Insertion order is evaluation order. Duplicates are kept and both fire.
pub struct BridgeRegistry<In, Out, S> {
    records: Vec<BridgeRecord<In, Out, S>>,
}

impl<In, Out, S> BridgeRegistry<In, Out, S> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn add(&mut self, record: BridgeRecord<In, Out, S>) -> &mut Self {
        self.records.push(record);
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, BridgeRecord<In, Out, S>> {
        self.records.iter()
    }

    /// Value copy of every record as it stands now.
    pub fn snapshot(&self) -> Self {
        Self {
            records: self.records.clone(),
        }
    }
}

impl<In, Out, S> Default for BridgeRegistry<In, Out, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<In, Out, S> Extend<BridgeRecord<In, Out, S>> for BridgeRegistry<In, Out, S> {
    fn extend<T: IntoIterator<Item = BridgeRecord<In, Out, S>>>(&mut self, iter: T) {
        self.records.extend(iter);
    }
}

impl<In, Out, S> FromIterator<BridgeRecord<In, Out, S>> for BridgeRegistry<In, Out, S> {
    fn from_iter<T: IntoIterator<Item = BridgeRecord<In, Out, S>>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a, In, Out, S> IntoIterator for &'a BridgeRegistry<In, Out, S> {
    type Item = &'a BridgeRecord<In, Out, S>;
    type IntoIter = slice::Iter<'a, BridgeRecord<In, Out, S>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
