use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::KeyValue;

/// Ordered tuple of the primary key column values of a record.
#[derive(Serialize, Deserialize, Eq, PartialEq, PartialOrd, Ord, Debug, Clone, Hash)]
pub struct PrimaryKey(Vec<KeyValue>);

impl PrimaryKey {
    pub fn new(values: Vec<KeyValue>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[KeyValue] {
        &self.0
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vals = self
            .0
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "[{vals}]")
    }
}

/// What the ingestion-side dedup manager needs to know about a record: its primary key and the
/// time used to decide which of two records with the same key wins.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct DedupRecordInfo {
    primary_key: PrimaryKey,
    dedup_time: f64,
}

impl DedupRecordInfo {
    pub fn new(primary_key: PrimaryKey, dedup_time: f64) -> Self {
        Self {
            primary_key,
            dedup_time,
        }
    }

    /// Record without a dedup time. It sorts before every record that has one.
    pub fn from_primary_key(primary_key: PrimaryKey) -> Self {
        Self::new(primary_key, f64::MIN)
    }

    pub fn primary_key(&self) -> &PrimaryKey {
        &self.primary_key
    }

    pub fn dedup_time(&self) -> f64 {
        self.dedup_time
    }
}

impl From<PrimaryKey> for DedupRecordInfo {
    fn from(primary_key: PrimaryKey) -> Self {
        Self::from_primary_key(primary_key)
    }
}
