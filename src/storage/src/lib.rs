pub mod dedup;
pub mod error;
pub mod segment;
pub mod star_tree;
pub mod test_util;

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

pub use crate::dedup::DedupRecordInfo;
pub use crate::dedup::PrimaryKey;
pub use crate::segment::Segment;
pub use crate::star_tree::StarTree;

#[derive(Serialize, Deserialize, Eq, PartialEq, PartialOrd, Ord, Debug, Clone, Hash)]
pub enum KeyValue {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    String(String),
    Timestamp(i64),
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Int8(v) => write!(f, "{v}"),
            KeyValue::Int16(v) => write!(f, "{v}"),
            KeyValue::Int32(v) => write!(f, "{v}"),
            KeyValue::Int64(v) => write!(f, "{v}"),
            KeyValue::String(v) => write!(f, "{v}"),
            KeyValue::Timestamp(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for KeyValue {
    fn from(v: i64) -> Self {
        KeyValue::Int64(v)
    }
}

impl From<&str> for KeyValue {
    fn from(v: &str) -> Self {
        KeyValue::String(v.to_owned())
    }
}
