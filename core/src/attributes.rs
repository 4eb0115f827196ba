//! Entity codec contract: decoding from JSON and encoding attributes.
//!
//! # Design
//! Decoding is plain serde: any `DeserializeOwned` type is `FromJson`, and a
//! shape mismatch surfaces as a `serde_json::Error` that the client turns
//! into a decode `ApiError`.
//!
//! Encoding goes through `Attributes`, a map of tri-state values. `Absent`
//! fields never reach the wire. `Null` fields are dropped from the valued
//! projection (partial update) and sent as JSON `null` in the nullified
//! projection (clear the field). Nested objects get the same treatment: a
//! JSON `null` inside a nested value is dropped by the valued projection and
//! kept by the nullified one.
//!
//! Building an attribute from a `Serialize` value can fail (maps with
//! non-string keys, for instance), so the constructors and `ToAttributes`
//! return `serde_json::Error` rather than dropping the field.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::http::Params;

/// Build an entity from a parsed JSON value.
pub trait FromJson: Sized {
    fn from_json(value: Value) -> Result<Self, serde_json::Error>;
}

impl<T: DeserializeOwned> FromJson for T {
    fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Attribute {
    /// Not part of the payload at all.
    #[default]
    Absent,
    /// Explicitly cleared.
    Null,
    Value(Value),
}

impl Attribute {
    /// Wrap anything serializable. Values that serialize to `null` become
    /// `Attribute::Null`.
    pub fn value<T: Serialize>(value: T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Attribute::from)
    }

    /// `Some` becomes a value and `None` an explicit null.
    pub fn nullable<T: Serialize>(value: Option<T>) -> Result<Self, serde_json::Error> {
        value.map_or(Ok(Attribute::Null), Attribute::value)
    }

    /// `Some` becomes a value and `None` is left out.
    pub fn optional<T: Serialize>(value: Option<T>) -> Result<Self, serde_json::Error> {
        value.map_or(Ok(Attribute::Absent), Attribute::value)
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Attribute::Absent)
    }
}

impl From<Value> for Attribute {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Attribute::Null,
            value => Attribute::Value(value),
        }
    }
}

pub type Attributes = BTreeMap<String, Attribute>;

/// An entity that can describe its own attributes for create and update.
pub trait ToAttributes {
    fn attributes(&self) -> Result<Attributes, serde_json::Error>;

    /// Only keys that carry a value.
    fn valued_attributes(&self) -> Result<Params, serde_json::Error> {
        Ok(valued(&self.attributes()?))
    }

    /// Every non-absent key, with explicit nulls kept.
    fn nullified_attributes(&self) -> Result<Params, serde_json::Error> {
        Ok(nullified(&self.attributes()?))
    }
}

pub fn valued(attributes: &Attributes) -> Params {
    attributes
        .iter()
        .filter_map(|(key, attribute)| match attribute {
            Attribute::Value(value) => Some((key.clone(), strip_nulls(value))),
            Attribute::Absent | Attribute::Null => None,
        })
        .collect()
}

pub fn nullified(attributes: &Attributes) -> Params {
    attributes
        .iter()
        .filter_map(|(key, attribute)| match attribute {
            Attribute::Value(value) => Some((key.clone(), value.clone())),
            Attribute::Null => Some((key.clone(), Value::Null)),
            Attribute::Absent => None,
        })
        .collect()
}

fn strip_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, nested)| !nested.is_null())
                .map(|(key, nested)| (key.clone(), strip_nulls(nested)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(strip_nulls).collect()),
        other => other.clone(),
    }
}
