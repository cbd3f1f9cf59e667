//! Query model for document lookups.
//!
//! A [`Query`] combines a [`Filter`] (a conjunction of [`Condition`]s), sort
//! keys, paging, and an optional modified-since bound. Filters are parsed from
//! Mongo-style JSON documents:
//!
//! ```
//! use vesper_persistence::types::{ContentFields, Filter};
//! use serde_json::json;
//!
//! let filter = Filter::from_json(
//!     &json!({"prog": {"$gte": 5}, "role": "agent"}),
//!     &ContentFields,
//! ).unwrap();
//! assert_eq!(filter.conditions().len(), 2);
//! ```

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::QueryError;
use crate::types::StoredDocument;

/// A field a condition or sort key can address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentField {
    /// The document identifier.
    Id,
    /// The creation timestamp.
    Created,
    /// The last-updated timestamp.
    Updated,
    /// A dotted path into the document content.
    Content(String),
}

impl DocumentField {
    /// Returns the comparable value of this field for a document.
    ///
    /// Timestamps are exposed as Unix seconds.
    pub fn value_of(&self, doc: &StoredDocument) -> Option<Value> {
        match self {
            DocumentField::Id => Some(Value::String(doc.id().to_string())),
            DocumentField::Created => Some(Value::from(doc.created().timestamp())),
            DocumentField::Updated => Some(Value::from(doc.updated().timestamp())),
            DocumentField::Content(path) => doc.get_path(path).cloned(),
        }
    }

    fn is_timestamp(&self) -> bool {
        matches!(self, DocumentField::Created | DocumentField::Updated)
    }
}

/// Maps client-facing field names onto [`DocumentField`]s.
///
/// The REST layer decides which names address metadata (the identifier and
/// timestamps) and how date strings in filters are parsed.
pub trait FieldMapping {
    /// Resolves a field name.
    fn field(&self, name: &str) -> DocumentField;

    /// Parses a date string used against a timestamp field.
    fn parse_date(&self, value: &str) -> Option<DateTime<Utc>>;
}

/// A mapping where every name addresses content and dates are RFC 3339.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentFields;

impl FieldMapping for ContentFields {
    fn field(&self, name: &str) -> DocumentField {
        DocumentField::Content(name.to_string())
    }

    fn parse_date(&self, value: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Equality (the implicit operator).
    Eq,
    /// `$ne`
    Ne,
    /// `$gt`
    Gt,
    /// `$gte`
    Gte,
    /// `$lt`
    Lt,
    /// `$lte`
    Lte,
    /// `$in`
    In,
    /// `$nin`
    Nin,
}

impl Operator {
    /// Parses a `$`-prefixed operator name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "$eq" => Some(Operator::Eq),
            "$ne" => Some(Operator::Ne),
            "$gt" => Some(Operator::Gt),
            "$gte" => Some(Operator::Gte),
            "$lt" => Some(Operator::Lt),
            "$lte" => Some(Operator::Lte),
            "$in" => Some(Operator::In),
            "$nin" => Some(Operator::Nin),
            _ => None,
        }
    }
}

/// A single field condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// The addressed field.
    pub field: DocumentField,
    /// The comparison.
    pub operator: Operator,
    /// The operand.
    pub value: Value,
}

impl Condition {
    /// Creates an equality condition.
    pub fn eq(field: DocumentField, value: impl Into<Value>) -> Self {
        Self {
            field,
            operator: Operator::Eq,
            value: value.into(),
        }
    }

    /// Evaluates the condition against a document.
    pub fn matches(&self, doc: &StoredDocument) -> bool {
        let actual = self.field.value_of(doc);
        match self.operator {
            Operator::Eq => actual.is_some_and(|v| contains_equal(&v, &self.value)),
            Operator::Ne => !actual.is_some_and(|v| contains_equal(&v, &self.value)),
            Operator::Gt => ordering_is(actual, &self.value, |o| o == Ordering::Greater),
            Operator::Gte => ordering_is(actual, &self.value, |o| o != Ordering::Less),
            Operator::Lt => ordering_is(actual, &self.value, |o| o == Ordering::Less),
            Operator::Lte => ordering_is(actual, &self.value, |o| o != Ordering::Greater),
            Operator::In => actual.is_some_and(|v| in_list(&v, &self.value)),
            Operator::Nin => !actual.is_some_and(|v| in_list(&v, &self.value)),
        }
    }
}

/// A conjunction of conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// Creates an empty filter that matches every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a condition.
    pub fn and(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Returns the conditions.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Returns `true` when the filter has no conditions.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Evaluates the filter against a document.
    pub fn matches(&self, doc: &StoredDocument) -> bool {
        self.conditions.iter().all(|c| c.matches(doc))
    }

    /// Parses a Mongo-style filter document.
    ///
    /// Each key is a field name; its value is either a literal (equality) or
    /// an object of `$`-operators.
    pub fn from_json(value: &Value, mapping: &dyn FieldMapping) -> Result<Self, QueryError> {
        let object = value.as_object().ok_or_else(|| QueryError::InvalidFilter {
            message: "filter must be a JSON object".to_string(),
        })?;

        let mut filter = Filter::new();
        for (name, spec) in object {
            let field = mapping.field(name);
            match spec {
                Value::Object(ops) if is_operator_object(ops) => {
                    for (op_name, operand) in ops {
                        let operator = Operator::parse(op_name).ok_or_else(|| {
                            QueryError::UnsupportedOperator {
                                field: name.clone(),
                                operator: op_name.clone(),
                            }
                        })?;
                        if matches!(operator, Operator::In | Operator::Nin) && !operand.is_array() {
                            return Err(QueryError::InvalidFilter {
                                message: format!(
                                    "operand of {} on '{}' must be a list",
                                    op_name, name
                                ),
                            });
                        }
                        filter = filter.and(Condition {
                            value: normalize_operand(&field, operand, mapping)?,
                            field: field.clone(),
                            operator,
                        });
                    }
                }
                literal => {
                    filter = filter.and(Condition {
                        value: normalize_operand(&field, literal, mapping)?,
                        field: field.clone(),
                        operator: Operator::Eq,
                    });
                }
            }
        }
        Ok(filter)
    }
}

fn is_operator_object(ops: &Map<String, Value>) -> bool {
    !ops.is_empty() && ops.keys().all(|k| k.starts_with('$'))
}

/// Timestamp fields compare as Unix seconds, so date strings are converted.
fn normalize_operand(
    field: &DocumentField,
    operand: &Value,
    mapping: &dyn FieldMapping,
) -> Result<Value, QueryError> {
    if !field.is_timestamp() {
        return Ok(operand.clone());
    }
    match operand {
        Value::String(s) => mapping
            .parse_date(s)
            .map(|dt| Value::from(dt.timestamp()))
            .ok_or_else(|| QueryError::InvalidFilter {
                message: format!("cannot parse date '{}'", s),
            }),
        Value::Array(items) => items
            .iter()
            .map(|item| normalize_operand(field, item, mapping))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}

/// Array fields match when any element matches.
fn contains_equal(actual: &Value, expected: &Value) -> bool {
    if values_equal(actual, expected) {
        return true;
    }
    match actual {
        Value::Array(items) if !expected.is_array() => {
            items.iter().any(|item| values_equal(item, expected))
        }
        _ => false,
    }
}

fn in_list(actual: &Value, list: &Value) -> bool {
    list.as_array()
        .is_some_and(|items| items.iter().any(|item| contains_equal(actual, item)))
}

fn ordering_is(actual: Option<Value>, operand: &Value, pred: impl Fn(Ordering) -> bool) -> bool {
    actual
        .and_then(|v| compare_scalars(&v, operand))
        .is_some_and(pred)
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Compares two values of the same scalar kind.
pub fn compare_scalars(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Total order used for sorting: missing < null < bool < number < string < other.
fn sort_order(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None => 0,
            Some(Value::Null) => 1,
            Some(Value::Bool(_)) => 2,
            Some(Value::Number(_)) => 3,
            Some(Value::String(_)) => 4,
            Some(_) => 5,
        }
    }
    match (a, b) {
        (Some(x), Some(y)) => compare_scalars(x, y).unwrap_or_else(|| rank(a).cmp(&rank(b))),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

/// One sort key.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    /// The addressed field.
    pub field: DocumentField,
    /// The direction.
    pub direction: SortDirection,
}

impl SortKey {
    /// Parses a sort specification.
    ///
    /// Accepts a comma separated list with `-` marking descending keys
    /// (`-prog,ref`), or a JSON list of `[field, direction]` pairs where
    /// direction is `1` or `-1` (`[["prog", -1]]`).
    pub fn parse_list(spec: &str, mapping: &dyn FieldMapping) -> Result<Vec<SortKey>, QueryError> {
        let spec = spec.trim();
        if spec.starts_with('[') {
            return Self::parse_json_list(spec, mapping);
        }

        spec.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                let (name, direction) = match part.strip_prefix('-') {
                    Some(name) => (name, SortDirection::Descending),
                    None => (part, SortDirection::Ascending),
                };
                if name.is_empty() {
                    return Err(QueryError::InvalidSort {
                        message: format!("empty field name in '{}'", spec),
                    });
                }
                Ok(SortKey {
                    field: mapping.field(name),
                    direction,
                })
            })
            .collect()
    }

    fn parse_json_list(spec: &str, mapping: &dyn FieldMapping) -> Result<Vec<SortKey>, QueryError> {
        let invalid = |message: String| QueryError::InvalidSort { message };
        let parsed: Value = serde_json::from_str(spec).map_err(|e| invalid(e.to_string()))?;
        let items = parsed
            .as_array()
            .ok_or_else(|| invalid("sort must be a list".to_string()))?;

        items
            .iter()
            .map(|item| {
                let pair = item
                    .as_array()
                    .filter(|pair| pair.len() == 2)
                    .ok_or_else(|| invalid(format!("expected [field, direction], got {}", item)))?;
                let name = pair[0].as_str().ok_or_else(|| {
                    invalid(format!("field name must be a string, got {}", pair[0]))
                })?;
                let direction = match pair[1].as_i64() {
                    Some(1) => SortDirection::Ascending,
                    Some(-1) => SortDirection::Descending,
                    _ => return Err(invalid(format!("direction must be 1 or -1, got {}", pair[1]))),
                };
                Ok(SortKey {
                    field: mapping.field(name),
                    direction,
                })
            })
            .collect()
    }

    /// Compares two documents by this key.
    pub fn compare(&self, a: &StoredDocument, b: &StoredDocument) -> Ordering {
        let left = self.field.value_of(a);
        let right = self.field.value_of(b);
        let ordering = sort_order(left.as_ref(), right.as_ref());
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// A complete lookup request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Conditions every returned document satisfies.
    pub filter: Filter,
    /// Sort keys, most significant first. Empty keeps insertion order.
    pub sort: Vec<SortKey>,
    /// Number of matching documents to skip.
    pub skip: usize,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
    /// Only documents updated strictly after this instant match.
    pub modified_since: Option<DateTime<Utc>>,
}

impl Query {
    /// Creates a query matching every document.
    pub fn all() -> Self {
        Self::default()
    }

    /// Sets the filter.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Sets the sort keys.
    pub fn with_sort(mut self, sort: Vec<SortKey>) -> Self {
        self.sort = sort;
        self
    }

    /// Sets skip and limit from a 1-based page number and page size.
    pub fn with_page(mut self, page: usize, page_size: usize) -> Self {
        self.skip = page.saturating_sub(1).saturating_mul(page_size);
        self.limit = Some(page_size);
        self
    }

    /// Sets the modified-since bound.
    pub fn modified_since(mut self, since: Option<DateTime<Utc>>) -> Self {
        self.modified_since = since;
        self
    }

    /// Returns `true` when the document satisfies filter and modified-since.
    pub fn matches(&self, doc: &StoredDocument) -> bool {
        let fresh = self.modified_since.is_none_or(|since| doc.updated() > since);
        fresh && self.filter.matches(doc)
    }
}

/// The result of a [`Query`].
#[derive(Debug, Clone, Default)]
pub struct FindResult {
    /// The requested page of documents.
    pub documents: Vec<StoredDocument>,
    /// Number of documents matching the query before paging.
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> StoredDocument {
        StoredDocument::new(value.as_object().cloned().unwrap_or_default())
    }

    #[test]
    fn test_equality_filter() {
        let filter = Filter::from_json(&json!({"role": "agent"}), &ContentFields).unwrap();
        assert!(filter.matches(&doc(json!({"role": "agent"}))));
        assert!(filter.matches(&doc(json!({"role": ["client", "agent"]}))));
        assert!(!filter.matches(&doc(json!({"role": "vendor"}))));
        assert!(!filter.matches(&doc(json!({}))));
    }

    #[test]
    fn test_range_operators() {
        let filter =
            Filter::from_json(&json!({"prog": {"$gte": 2, "$lt": 4}}), &ContentFields).unwrap();
        assert!(!filter.matches(&doc(json!({"prog": 1}))));
        assert!(filter.matches(&doc(json!({"prog": 2}))));
        assert!(filter.matches(&doc(json!({"prog": 3.5}))));
        assert!(!filter.matches(&doc(json!({"prog": 4}))));
        assert!(!filter.matches(&doc(json!({"prog": "3"}))));
    }

    #[test]
    fn test_in_and_nin() {
        let filter = Filter::from_json(&json!({"prog": {"$in": [1, 3]}}), &ContentFields).unwrap();
        assert!(filter.matches(&doc(json!({"prog": 3}))));
        assert!(!filter.matches(&doc(json!({"prog": 2}))));

        let filter = Filter::from_json(&json!({"prog": {"$nin": [1, 3]}}), &ContentFields).unwrap();
        assert!(filter.matches(&doc(json!({"prog": 2}))));
        assert!(filter.matches(&doc(json!({}))));
    }

    #[test]
    fn test_nested_object_literal_is_equality() {
        let filter =
            Filter::from_json(&json!({"location": {"city": "Ravenna"}}), &ContentFields).unwrap();
        assert_eq!(filter.conditions()[0].operator, Operator::Eq);
        assert!(filter.matches(&doc(json!({"location": {"city": "Ravenna"}}))));
    }

    #[test]
    fn test_invalid_filters() {
        assert!(Filter::from_json(&json!([1, 2]), &ContentFields).is_err());
        assert!(matches!(
            Filter::from_json(&json!({"a": {"$regex": "x"}}), &ContentFields),
            Err(QueryError::UnsupportedOperator { .. })
        ));
        assert!(Filter::from_json(&json!({"a": {"$in": 3}}), &ContentFields).is_err());
    }

    #[test]
    fn test_parse_sort_list() {
        let keys = SortKey::parse_list("-prog, ref", &ContentFields).unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].field, DocumentField::Content("prog".to_string()));
        assert_eq!(keys[0].direction, SortDirection::Descending);
        assert_eq!(keys[1].direction, SortDirection::Ascending);
    }

    #[test]
    fn test_parse_sort_json() {
        let keys = SortKey::parse_list(r#"[["prog", -1], ["ref", 1]]"#, &ContentFields).unwrap();
        assert_eq!(keys[0].direction, SortDirection::Descending);
        assert_eq!(keys[1].field, DocumentField::Content("ref".to_string()));

        assert!(SortKey::parse_list(r#"[["prog", 2]]"#, &ContentFields).is_err());
        assert!(SortKey::parse_list("[[", &ContentFields).is_err());
        assert!(SortKey::parse_list("-", &ContentFields).is_err());
    }

    #[test]
    fn test_sort_compare_missing_first() {
        let key = SortKey {
            field: DocumentField::Content("prog".to_string()),
            direction: SortDirection::Ascending,
        };
        let a = doc(json!({}));
        let b = doc(json!({"prog": 1}));
        assert_eq!(key.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_with_page() {
        let query = Query::all().with_page(3, 25);
        assert_eq!(query.skip, 50);
        assert_eq!(query.limit, Some(25));

        let query = Query::all().with_page(usize::MAX, 25);
        assert_eq!(query.skip, usize::MAX);
    }
}
