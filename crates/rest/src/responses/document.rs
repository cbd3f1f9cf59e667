//! Response payloads.
//!
//! Successful reads are wrapped in the `{"response": ..}` envelope. Items are
//! rendered as their content plus the metadata fields named in the settings
//! and a `link` to themselves. Write results are keyed by the client's
//! document key and carry a status.

use serde_json::{Map, Value, json};
use vesper_persistence::types::StoredDocument;

use crate::links::Link;
use crate::settings::{Resource, Settings};
use crate::validation::ValidationIssue;

/// Wraps a payload in the response envelope.
pub fn envelope(payload: Value) -> Value {
    json!({ "response": payload })
}

/// Renders a stored document as an item.
pub fn render_document(
    settings: &Settings,
    resource: &Resource,
    document: &StoredDocument,
) -> Value {
    let mut item = document.content().clone();
    item.insert(settings.id_field.clone(), Value::String(document.id().to_string()));
    item.insert(
        settings.last_updated.clone(),
        Value::String(settings.format_date(document.updated())),
    );
    item.insert(
        settings.date_created.clone(),
        Value::String(settings.format_date(document.created())),
    );
    item.insert(settings.etag_field.clone(), Value::String(document.etag().to_string()));
    item.insert("link".to_string(), link_value(settings, resource, document.id()));
    Value::Object(item)
}

/// The result of a successful write.
pub fn write_ok(settings: &Settings, resource: &Resource, document: &StoredDocument) -> Value {
    let mut result = Map::new();
    result.insert("status".to_string(), Value::String(settings.status_ok.clone()));
    result.insert(settings.id_field.clone(), Value::String(document.id().to_string()));
    result.insert(
        settings.last_updated.clone(),
        Value::String(settings.format_date(document.updated())),
    );
    result.insert(settings.etag_field.clone(), Value::String(document.etag().to_string()));
    result.insert("link".to_string(), link_value(settings, resource, document.id()));
    Value::Object(result)
}

/// The result of a rejected write.
pub fn write_err(settings: &Settings, issues: &[ValidationIssue]) -> Value {
    json!({
        "status": settings.status_err,
        "issues": issues,
    })
}

fn link_value(settings: &Settings, resource: &Resource, id: &str) -> Value {
    serde_json::to_value(Link::item(settings, resource, id)).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings::from_toml_str("[domain.contacts]").unwrap()
    }

    #[test]
    fn test_render_document() {
        let settings = settings();
        let resource = settings.resource("contacts").unwrap();
        let content = json!({"ref": "x"}).as_object().cloned().unwrap();
        let document = StoredDocument::new(content);

        let item = render_document(&settings, resource, &document);
        assert_eq!(item["ref"], "x");
        assert_eq!(item["_id"], document.id());
        assert_eq!(item["etag"], document.etag());
        assert!(settings.parse_date(item["updated"].as_str().unwrap()).is_some());
        assert_eq!(item["link"]["rel"], "self");
        assert_eq!(
            item["link"]["href"],
            format!("http://localhost:5000/contacts/{}/", document.id())
        );
    }

    #[test]
    fn test_write_results() {
        let settings = settings();
        let resource = settings.resource("contacts").unwrap();
        let document = StoredDocument::new(Map::new());

        let ok = write_ok(&settings, resource, &document);
        assert_eq!(ok["status"], "OK");
        assert_eq!(ok["_id"], document.id());

        let issues = vec![ValidationIssue {
            message: "unknown field 'x'".to_string(),
            field: "x".to_string(),
        }];
        let err = write_err(&settings, &issues);
        assert_eq!(err, json!({"status": "ERR", "issues": [["unknown field 'x'", "x"]]}));
    }

    #[test]
    fn test_envelope() {
        assert_eq!(envelope(json!({"a": 1})), json!({"response": {"a": 1}}));
    }
}
