//! Attribute model shared by all authentication sources.
//!
//! The legacy CMS hands us a raw user record (scalar fields plus structured
//! "field module" containers); the identity-provider runtime expects a flat,
//! multi-valued attribute set. The types here model both sides of that
//! translation; the translation itself lives in [`mapper`].

mod hooks;
mod mapper;

pub use hooks::{AttributeAlterHook, HookRegistry};
pub use mapper::{AttributeMapper, default_forbidden_fields};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Columns that hold a structured field's default value. A `field:value` or
/// `field:safe_value` qualifier selects the same slot as plain `field`.
pub const DEFAULT_VALUE_COLUMNS: &[&str] = &["value", "safe_value"];

/// One variant of a structured field: a column → value sub-record.
pub type FieldVariant = BTreeMap<String, String>;

/// A single field value on the legacy user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Boolean scalar.
    Bool(bool),
    /// Numeric scalar (the legacy store keeps ids and counters as integers).
    Int(i64),
    /// String scalar.
    Text(String),
    /// Structured field container: an ordered sequence of variants, each a
    /// column → value sub-record. The first variant is the default one.
    Structured(Vec<FieldVariant>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Build a single-variant structured container from column/value pairs.
    pub fn structured<I, K, V>(columns: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let variant = columns
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::Structured(vec![variant])
    }

    /// Stringify a scalar value. Returns `None` for structured containers.
    pub fn as_scalar_string(&self) -> Option<String> {
        match self {
            Self::Bool(b) => Some(b.to_string()),
            Self::Int(n) => Some(n.to_string()),
            Self::Text(s) => Some(s.clone()),
            Self::Structured(_) => None,
        }
    }
}

/// A raw user record fetched from the legacy user store.
///
/// Field enumeration is an explicit capability here (`field_names`), used by
/// the mapper when no attribute spec is configured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawUserRecord(BTreeMap<String, FieldValue>);

impl RawUserRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: impl Into<String>, value: FieldValue) {
        self.0.insert(field.into(), value);
    }

    /// Builder-style variant of [`set`](Self::set).
    pub fn with(mut self, field: impl Into<String>, value: FieldValue) -> Self {
        self.set(field, value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The identity-provider-facing attribute set: output name → one or more
/// string values. Even single values are wrapped in a one-element sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeSet(BTreeMap<String, Vec<String>>);

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an attribute, replacing any previous values for the same name.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.0.insert(name.into(), values);
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One entry of the configured attribute spec.
///
/// `field` names a field on the legacy user record and may carry a
/// `field:column` qualifier to select a sub-column of a structured field.
/// `name` is the attribute name emitted to the identity-provider runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeRule {
    pub field: String,
    pub name: String,
}

impl AttributeRule {
    pub fn new(field: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            name: name.into(),
        }
    }

    /// Split the qualified field reference into `(field, sub-column)`.
    ///
    /// A qualifier naming a default value column (`value`, `safe_value`) is
    /// equivalent to no qualifier at all, matching the legacy configuration
    /// syntax.
    pub fn source(&self) -> (&str, Option<&str>) {
        match self.field.split_once(':') {
            Some((field, column)) if !column.is_empty() => {
                if DEFAULT_VALUE_COLUMNS.contains(&column) {
                    (field, None)
                } else {
                    (field, Some(column))
                }
            }
            Some((field, _)) => (field, None),
            None => (self.field.as_str(), None),
        }
    }
}

/// Ordered attribute spec; `None` at the call sites means "emit every field".
pub type AttributeSpec = Vec<AttributeRule>;
