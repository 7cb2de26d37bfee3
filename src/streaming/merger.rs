// Dataset example assembly from the two characteristic streams
//
// The readings and debug characteristics notify independently. The merger
// keeps only the most recent normalized record and appends every raw record
// to it; it never queues, so a dropped or late notification costs at most
// one example and the next normalized record realigns the streams.

use super::record::{MergedRecord, NormalizedRecord, RawRecord, Value, MERGED_LEN};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("raw record arrived before any normalized record")]
    NoPendingNormalized,
}

/// Pairs the latest normalized record with each incoming raw record
#[derive(Debug, Default)]
pub struct RecordMerger {
    pending: Option<NormalizedRecord>,
}

impl RecordMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the buffered normalized record
    pub fn on_normalized(&mut self, record: NormalizedRecord) {
        self.pending = Some(record);
    }

    /// Append a raw record to the buffered normalized record.
    ///
    /// The buffer is left untouched, so one normalized record pairs with
    /// every raw record that arrives before the next normalized record.
    pub fn on_raw(&self, record: &RawRecord) -> Result<MergedRecord, SyncError> {
        let normalized = self.pending.as_ref().ok_or(SyncError::NoPendingNormalized)?;
        Ok(MergedRecord::new(normalized, record))
    }
}

/// True when `values` has exactly the length of a dataset example
pub fn is_complete(values: &[Value]) -> bool {
    values.len() == MERGED_LEN
}
