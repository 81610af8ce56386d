//! Property columns as the feature table consumes them.
//!
//! Property stream decoding belongs to the column decoders outside this
//! crate; here a column is already-typed value storage plus an optional
//! present bit vector. Nullable columns store values densely, so a feature
//! index maps into the value buffer through the rank of its present bit.

use std::borrow::Cow;

use crate::decoder::BitVector;

/// Typed value storage of one property column.
#[derive(Debug, Clone)]
pub enum PropertyValues {
    Bool(BitVector),
    Int(Vec<i32>),
    Long(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    String(Vec<String>),
    /// Dictionary-encoded strings: dense indices into a shared dictionary.
    StringDictionary {
        indices: Vec<u32>,
        dictionary: Vec<String>,
    },
}

/// One materialized property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue<'a> {
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(Cow<'a, str>),
}

impl PropertyValue<'_> {
    /// JSON representation used by the feature facade. Non-finite floats
    /// have no JSON number form and map to null.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(value) => serde_json::Value::Bool(*value),
            Self::Int(value) => serde_json::Value::from(*value),
            Self::Long(value) => serde_json::Value::from(*value),
            Self::Float(value) => serde_json::Number::from_f64(f64::from(*value))
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::Double(value) => serde_json::Number::from_f64(*value)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::String(value) => serde_json::Value::String(value.clone().into_owned()),
        }
    }
}

/// A named, optionally nullable property column.
#[derive(Debug, Clone)]
pub struct PropertyColumn {
    name: String,
    present: Option<BitVector>,
    values: PropertyValues,
}

impl PropertyColumn {
    #[must_use]
    pub fn new(name: impl Into<String>, present: Option<BitVector>, values: PropertyValues) -> Self {
        Self {
            name: name.into(),
            present,
            values,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of feature `index`, or `None` when the column is null there.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<PropertyValue<'_>> {
        let dense = match &self.present {
            Some(present) => {
                if index >= present.len() || !present.get(index) {
                    return None;
                }
                present.rank(index)
            }
            None => index,
        };
        match &self.values {
            PropertyValues::Bool(values) => {
                (dense < values.len()).then(|| PropertyValue::Bool(values.get(dense)))
            }
            PropertyValues::Int(values) => values.get(dense).map(|&v| PropertyValue::Int(v)),
            PropertyValues::Long(values) => values.get(dense).map(|&v| PropertyValue::Long(v)),
            PropertyValues::Float(values) => values.get(dense).map(|&v| PropertyValue::Float(v)),
            PropertyValues::Double(values) => values.get(dense).map(|&v| PropertyValue::Double(v)),
            PropertyValues::String(values) => values
                .get(dense)
                .map(|v| PropertyValue::String(Cow::Borrowed(v.as_str()))),
            PropertyValues::StringDictionary {
                indices,
                dictionary,
            } => indices
                .get(dense)
                .and_then(|&slot| dictionary.get(slot as usize))
                .map(|v| PropertyValue::String(Cow::Borrowed(v.as_str()))),
        }
    }
}
