//! Document validation against resource schemas.
//!
//! Validation never fails the request: problems are reported as a list of
//! [`ValidationIssue`]s which the write handlers render under the document key
//! with the configured error status.

use chrono::NaiveDateTime;
use serde::ser::{Serialize, SerializeTuple, Serializer};
use serde_json::{Map, Value};
use tracing::trace;
use vesper_persistence::core::DataLayer;
use vesper_persistence::types::{Condition, DocumentField, Filter, Operator, Query};
use vesper_persistence::StorageResult;

use crate::settings::{FieldSchema, FieldType, Resource, Schema};

/// Whether a document is being created or changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// A new document; required fields are enforced.
    Insert,
    /// Changes to an existing document; only the given fields are checked.
    Update,
}

/// One validation problem.
///
/// Serializes as `[message, field]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Human readable message.
    pub message: String,
    /// The offending field, empty when the issue spans several fields.
    pub field: String,
}

impl ValidationIssue {
    fn new(message: String, field: impl Into<String>) -> Self {
        Self {
            message,
            field: field.into(),
        }
    }
}

impl Serialize for ValidationIssue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.message)?;
        tuple.serialize_element(&self.field)?;
        tuple.end()
    }
}

/// Validates documents against one schema.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    schema: &'a Schema,
    date_format: &'a str,
}

impl<'a> Validator<'a> {
    /// Creates a validator; `date_format` is used for `datetime` fields.
    pub fn new(schema: &'a Schema, date_format: &'a str) -> Self {
        Self {
            schema,
            date_format,
        }
    }

    /// Returns every issue found in `document`, in reporting order.
    ///
    /// An empty schema accepts any document.
    pub fn validate(
        &self,
        document: &Map<String, Value>,
        mode: ValidationMode,
    ) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if self.schema.is_empty() {
            return issues;
        }

        for field in document.keys() {
            if !self.schema.contains_key(field) {
                issues.push(ValidationIssue::new(
                    format!("unknown field '{}'", field),
                    field.as_str(),
                ));
            }
        }

        if mode == ValidationMode::Insert {
            let missing: Vec<String> = self
                .schema
                .iter()
                .filter(|(name, rules)| rules.required && !document.contains_key(*name))
                .map(|(name, _)| format!("'{}'", name))
                .collect();
            if !missing.is_empty() {
                issues.push(ValidationIssue::new(
                    format!("required field(s) are missing: {}", missing.join(", ")),
                    "",
                ));
            }
        }

        for (field, value) in document {
            if let Some(rules) = self.schema.get(field) {
                self.check_field(field, value, rules, &mut issues);
            }
        }

        issues
    }

    fn check_field(
        &self,
        field: &str,
        value: &Value,
        rules: &FieldSchema,
        issues: &mut Vec<ValidationIssue>,
    ) {
        if let Some(field_type) = rules.field_type
            && !self.has_type(value, field_type)
        {
            issues.push(ValidationIssue::new(
                format!("value of field '{}' must be of {} type", field, field_type),
                field,
            ));
            return;
        }

        let length = match value {
            Value::String(s) => Some(s.chars().count()),
            Value::Array(items) => Some(items.len()),
            _ => None,
        };
        if let Some(length) = length {
            if let Some(min) = rules.minlength
                && length < min
            {
                issues.push(ValidationIssue::new(
                    format!("min length for field '{}' is {}", field, min),
                    field,
                ));
            }
            if let Some(max) = rules.maxlength
                && length > max
            {
                issues.push(ValidationIssue::new(
                    format!("max length for field '{}' is {}", field, max),
                    field,
                ));
            }
        }

        if let Some(number) = value.as_f64() {
            if let Some(min) = rules.min
                && number < min
            {
                issues.push(ValidationIssue::new(
                    format!("min value for field '{}' is {}", field, min),
                    field,
                ));
            }
            if let Some(max) = rules.max
                && number > max
            {
                issues.push(ValidationIssue::new(
                    format!("max value for field '{}' is {}", field, max),
                    field,
                ));
            }
        }

        if let Some(allowed) = &rules.allowed {
            match value {
                Value::Array(items) => {
                    let unallowed: Vec<Value> = items
                        .iter()
                        .filter(|item| !allowed.contains(item))
                        .cloned()
                        .collect();
                    if !unallowed.is_empty() {
                        issues.push(ValidationIssue::new(
                            format!(
                                "unallowed values {} for field '{}'",
                                Value::Array(unallowed),
                                field
                            ),
                            field,
                        ));
                    }
                }
                other if !allowed.contains(other) => {
                    issues.push(ValidationIssue::new(
                        format!("unallowed value {} for field '{}'", display_value(other), field),
                        field,
                    ));
                }
                _ => {}
            }
        }
    }

    fn has_type(&self, value: &Value, field_type: FieldType) -> bool {
        match field_type {
            FieldType::String => value.is_string(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Float => value.is_f64(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Dict => value.is_object(),
            FieldType::List => value.is_array(),
            FieldType::Datetime => value
                .as_str()
                .is_some_and(|s| NaiveDateTime::parse_from_str(s, self.date_format).is_ok()),
            FieldType::Objectid => value.as_str().is_some_and(|s| {
                s.len() == 24 && s.bytes().all(|b| b.is_ascii_hexdigit())
            }),
        }
    }
}

/// Strings display unquoted, everything else as JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Checks the resource's unique fields against stored documents.
///
/// `exclude_id` names the document being updated, which may keep its own
/// values.
pub async fn unique_issues<S: DataLayer + ?Sized>(
    storage: &S,
    resource: &Resource,
    document: &Map<String, Value>,
    exclude_id: Option<&str>,
) -> StorageResult<Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    for field in resource.unique_fields() {
        let Some(value) = document.get(field) else {
            continue;
        };

        let mut filter = Filter::new().and(Condition::eq(
            DocumentField::Content(field.to_string()),
            value.clone(),
        ));
        if let Some(id) = exclude_id {
            filter = filter.and(Condition {
                field: DocumentField::Id,
                operator: Operator::Ne,
                value: Value::String(id.to_string()),
            });
        }

        let existing = storage
            .find(&resource.name, &Query::all().with_filter(filter).with_page(1, 1))
            .await?;
        if existing.total > 0 {
            trace!(resource = %resource.name, field, "Unique constraint violated");
            issues.push(ValidationIssue::new(
                format!("value '{}' for field '{}' is not unique", display_value(value), field),
                field,
            ));
        }
    }
    Ok(issues)
}
