//! Best-effort inference of transform output types.
//!
//! A transform is run on a sample of its declared input type. Primitive results pick the
//! depicted output type; anything else degrades to an unconstrained type at the call site.

use crate::schema::{value_type_name, SchemaNode};
use chrono::{DateTime, Utc};
use log::debug;
use serde_json::{json, Map, Value};
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

/// Primitive type a probed transform produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Number,
    String,
    Boolean,
}

impl PrimitiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::Number => "number",
            PrimitiveKind::String => "string",
            PrimitiveKind::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("transform rejected the sample: {0}")]
    Rejected(String),
    #[error("transform produced {0}, not a primitive")]
    NotPrimitive(&'static str),
    #[error("transform panicked")]
    Panicked,
}

/// Declared input types that have a sample value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    Integer,
    Number,
    BigInt,
    String,
    Boolean,
    Object,
    Array,
    Null,
    Date,
}

impl SampleType {
    /// Sample type for a depicted JSON schema type and format
    pub fn from_depicted(type_name: &str, format: Option<&str>) -> Option<Self> {
        if format == Some("date-time") {
            return Some(SampleType::Date);
        }
        match type_name {
            "integer" => Some(SampleType::Integer),
            "number" => Some(SampleType::Number),
            "string" => Some(SampleType::String),
            "boolean" => Some(SampleType::Boolean),
            "object" => Some(SampleType::Object),
            "array" => Some(SampleType::Array),
            "null" => Some(SampleType::Null),
            _ => None,
        }
    }

    pub fn sample(&self) -> Value {
        match self {
            SampleType::Integer | SampleType::Number | SampleType::BigInt => json!(0),
            SampleType::String => json!(""),
            SampleType::Boolean => json!(false),
            SampleType::Object => Value::Object(Map::new()),
            SampleType::Array => json!([]),
            SampleType::Null => Value::Null,
            SampleType::Date => Value::String(
                DateTime::<Utc>::from_timestamp(0, 0)
                    .map(|d| d.to_rfc3339())
                    .unwrap_or_default(),
            ),
        }
    }
}

/// Runs `node` on `sample` and classifies the output
pub fn probe_transform(node: &SchemaNode, sample: &Value) -> Result<PrimitiveKind, ProbeError> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| node.parse(Some(sample))))
        .map_err(|_| ProbeError::Panicked)?;
    let output = outcome.map_err(|issue| ProbeError::Rejected(issue.message))?;

    let kind = match &output {
        Some(Value::Number(_)) => PrimitiveKind::Number,
        Some(Value::String(_)) => PrimitiveKind::String,
        Some(Value::Bool(_)) => PrimitiveKind::Boolean,
        other => return Err(ProbeError::NotPrimitive(value_type_name(other.as_ref()))),
    };
    debug!("Probed {} transform: {}", node.kind_name(), kind.as_str());
    Ok(kind)
}
