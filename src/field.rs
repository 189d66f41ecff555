//! The heterogeneous field value type and the decoded-message record shape
//! (spec §3, §9 "Heterogeneous field value").

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// A decoded scalar, matching spec §9's tagged variant.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
    Enum { raw: i64, name: String },
    /// Days since 1970-01-01.
    Date(i64),
    /// Seconds since midnight.
    Time(f64),
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null => serializer.serialize_none(),
            FieldValue::Int(v) => serializer.serialize_i64(*v),
            FieldValue::Float(v) => serializer.serialize_f64(*v),
            FieldValue::Bytes(v) => v.serialize(serializer),
            FieldValue::Enum { raw, name } => {
                use serde::ser::SerializeMap;
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("raw", raw)?;
                map.serialize_entry("name", name)?;
                map.end()
            }
            FieldValue::Date(days) => serializer.serialize_i64(*days),
            FieldValue::Time(secs) => serializer.serialize_f64(*secs),
        }
    }
}

/// The raw (pre-scaling) bits extracted for a field, or `None` for the
/// DLC-too-short / all-1s-sentinel edge cases.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawValue {
    None,
    Int(i64),
    Bytes(Vec<u8>),
}

/// One decoded field within a [`DecodedMessage`].
#[derive(Debug, Clone, Serialize)]
pub struct FieldRecord {
    pub id: String,
    pub raw_value: RawValue,
    pub value: FieldValue,
    pub unit_of_measurement: String,
}

impl FieldRecord {
    /// The `-`-joined field-id title used by the original Python
    /// implementation's `_generate_field_title`.
    pub fn title(fields: &[FieldRecord]) -> String {
        fields
            .iter()
            .map(|f| f.id.as_str())
            .collect::<Vec<_>>()
            .join("-")
    }
}

/// A fully decoded NMEA2000 message produced by the PGN Payload Decoder.
#[derive(Debug, Clone, Serialize)]
pub struct DecodedMessage {
    pub pgn: u32,
    pub source: u8,
    pub destination: u8,
    pub priority: u8,
    pub fields: Vec<FieldRecord>,
    pub timestamp: DateTime<Utc>,
}

impl DecodedMessage {
    pub fn title(&self) -> String {
        FieldRecord::title(&self.fields)
    }
}
