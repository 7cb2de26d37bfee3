// Decoded sensor records
//
// Records are immutable once decoded. Their values are published as OSC
// arguments, so every record converts into a list of `Value`s.

use serde::{Deserialize, Serialize};

/// Number of distance channels in a normalized record
pub const NORMALIZED_LEN: usize = 4;

/// Number of readings in a raw/debug record
pub const RAW_LEN: usize = 32;

/// Number of values in a complete dataset example
pub const MERGED_LEN: usize = NORMALIZED_LEN + RAW_LEN;

/// A single numeric value as published downstream
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Float(f32),
    Int(i32),
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value)
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Value::Int(i32::from(value))
    }
}

/// Four normalized distances, one per sensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedRecord([f32; NORMALIZED_LEN]);

impl NormalizedRecord {
    pub fn new(values: [f32; NORMALIZED_LEN]) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f32; NORMALIZED_LEN] {
        &self.0
    }

    pub fn to_values(&self) -> Vec<Value> {
        self.0.iter().copied().map(Value::from).collect()
    }
}

/// Thirty-two raw sensor readings from the debug characteristic
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawRecord([u16; RAW_LEN]);

impl RawRecord {
    pub fn new(values: [u16; RAW_LEN]) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[u16; RAW_LEN] {
        &self.0
    }

    pub fn to_values(&self) -> Vec<Value> {
        self.0.iter().copied().map(Value::from).collect()
    }
}

/// A normalized record followed by a raw record, used as a training example
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord(Vec<Value>);

impl MergedRecord {
    pub fn new(normalized: &NormalizedRecord, raw: &RawRecord) -> Self {
        let mut values = Vec::with_capacity(MERGED_LEN);
        values.extend(normalized.to_values());
        values.extend(raw.to_values());
        Self(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }
}
