//! Field schemas for resource documents.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;

/// Value type a schema field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// A JSON string.
    String,
    /// An integral JSON number.
    Integer,
    /// A JSON number with a fractional representation.
    Float,
    /// Any JSON number.
    Number,
    /// A JSON boolean.
    Boolean,
    /// A string in the configured date format.
    Datetime,
    /// A JSON object.
    Dict,
    /// A JSON array.
    List,
    /// A 24 character hex string.
    Objectid,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Datetime => "datetime",
            FieldType::Dict => "dict",
            FieldType::List => "list",
            FieldType::Objectid => "objectid",
        };
        f.write_str(name)
    }
}

/// Rules for one document field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldSchema {
    /// Accepted value type.
    #[serde(rename = "type")]
    pub field_type: Option<FieldType>,
    /// The field must be present on insert.
    pub required: bool,
    /// No two documents of the resource may share the value.
    pub unique: bool,
    /// Minimum length of strings and lists.
    pub minlength: Option<usize>,
    /// Maximum length of strings and lists.
    pub maxlength: Option<usize>,
    /// Minimum numeric value.
    pub min: Option<f64>,
    /// Maximum numeric value.
    pub max: Option<f64>,
    /// Accepted values (for lists, accepted elements).
    pub allowed: Option<Vec<Value>>,
}

/// Field name to field rules, iterated in name order.
pub type Schema = BTreeMap<String, FieldSchema>;
