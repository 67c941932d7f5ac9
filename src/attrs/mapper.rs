//! Spec-driven attribute extraction.
//!
//! Translates a raw legacy user record into the identity-provider attribute
//! vocabulary. Extraction never fails the request: a field that cannot be
//! read degrades to a single empty-string placeholder so the output shape
//! stays consistent with the configured spec.

use std::collections::BTreeSet;

use super::{
    AttributeSet, AttributeSpec, FieldValue, HookRegistry, RawUserRecord,
    hooks::AttributeAlterHook,
};

/// Field names that must never leak into an attribute set, whatever the
/// configured spec says.
const FORBIDDEN_FIELDS: &[&str] = &["pass"];

/// The default forbidden set: the credential-hash field.
pub fn default_forbidden_fields() -> BTreeSet<String> {
    FORBIDDEN_FIELDS.iter().map(|f| (*f).to_string()).collect()
}

/// Why a single field's extraction fell back to the empty placeholder.
#[derive(Debug, PartialEq, Eq)]
enum ExtractFailure {
    /// The record has no field under this name.
    MissingField,
    /// The structured container has no variants.
    EmptyContainer,
    /// No variant carries a non-empty default value.
    EmptyValue,
    /// The default variant has no such column.
    MissingColumn,
    /// A sub-column was requested on a scalar field.
    ColumnOnScalar,
}

/// Maps raw user records to attribute sets.
///
/// Owns the attribute spec, the forbidden-field set, and the post-mapping
/// hook registry for one authentication-source instance.
#[derive(Debug, Clone)]
pub struct AttributeMapper {
    spec: Option<AttributeSpec>,
    forbidden: BTreeSet<String>,
    hooks: HookRegistry,
}

impl AttributeMapper {
    /// Create a mapper for the given spec. `None` means "emit every field".
    pub fn new(spec: Option<AttributeSpec>) -> Self {
        Self {
            spec,
            forbidden: default_forbidden_fields(),
            hooks: HookRegistry::new(),
        }
    }

    /// Extend the forbidden-field set beyond the built-in credential fields.
    pub fn with_forbidden<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.forbidden.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Register a post-mapping alteration hook.
    pub fn register_hook(&mut self, hook: std::sync::Arc<dyn AttributeAlterHook>) {
        self.hooks.register(hook);
    }

    /// Map a record to an attribute set.
    ///
    /// Output has exactly one entry per spec rule (later rules for the same
    /// output name win) or, without a spec, one entry per record field.
    pub fn map(&self, record: &RawUserRecord) -> AttributeSet {
        let mut attributes = AttributeSet::new();

        match &self.spec {
            None => {
                for field in record.field_names() {
                    let values = self.extract_with_fallback(record, field, None);
                    attributes.insert(field, values);
                }
            }
            Some(rules) => {
                for rule in rules {
                    let (field, column) = rule.source();
                    let values = self.extract_with_fallback(record, field, column);
                    attributes.insert(rule.name.clone(), values);
                }
            }
        }

        self.hooks.run(&mut attributes, record);
        attributes
    }

    /// Extract one field, containing any failure as an empty placeholder.
    fn extract_with_fallback(
        &self,
        record: &RawUserRecord,
        field: &str,
        column: Option<&str>,
    ) -> Vec<String> {
        if self.forbidden.contains(field) {
            return vec![String::new()];
        }

        match extract(record, field, column) {
            Ok(values) => values,
            Err(ExtractFailure::MissingField) => {
                tracing::debug!(field, "record has no such field, emitting placeholder");
                vec![String::new()]
            }
            Err(failure) => {
                tracing::warn!(
                    field,
                    column = column.unwrap_or_default(),
                    ?failure,
                    "structured field extraction failed, emitting placeholder"
                );
                vec![String::new()]
            }
        }
    }
}

/// Fallible extraction of one (field, column) reference from a record.
fn extract(
    record: &RawUserRecord,
    field: &str,
    column: Option<&str>,
) -> Result<Vec<String>, ExtractFailure> {
    let value = record.get(field).ok_or(ExtractFailure::MissingField)?;

    match (value, column) {
        (FieldValue::Structured(variants), None) => {
            if variants.is_empty() {
                return Err(ExtractFailure::EmptyContainer);
            }
            // All variants contribute their default value, in order.
            let values: Vec<String> = variants
                .iter()
                .filter_map(|variant| {
                    super::DEFAULT_VALUE_COLUMNS
                        .iter()
                        .find_map(|col| variant.get(*col))
                })
                .filter(|v| !v.is_empty())
                .cloned()
                .collect();
            if values.is_empty() {
                Err(ExtractFailure::EmptyValue)
            } else {
                Ok(values)
            }
        }
        (FieldValue::Structured(variants), Some(column)) => {
            let default_variant = variants.first().ok_or(ExtractFailure::EmptyContainer)?;
            default_variant
                .get(column)
                .map(|v| vec![v.clone()])
                .ok_or(ExtractFailure::MissingColumn)
        }
        (scalar, None) => match scalar.as_scalar_string() {
            Some(value) => Ok(vec![value]),
            // Unreachable: structured values are matched above.
            None => Err(ExtractFailure::EmptyValue),
        },
        (_, Some(_)) => Err(ExtractFailure::ColumnOnScalar),
    }
}
