//! Response contract checks.
//!
//! Every check is a pure function over an already received response part
//! (payload, headers, links) and returns a [`ContractViolation`] describing
//! what was expected and what was found. The panicking wrappers live in
//! [`assertions`](crate::assertions).

use http::{HeaderMap, StatusCode, header};
use serde_json::Value;
use thiserror::Error;
use url::Url;
use vesper_rest::Link;
use vesper_rest::settings::{Resource, Settings};

/// A response that does not honour a contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    /// Wrong status code.
    #[error("expected status {expected}, got {actual}")]
    Status {
        /// Expected status.
        expected: u16,
        /// Received status.
        actual: u16,
    },

    /// A required header is absent.
    #[error("missing {0} header")]
    MissingHeader(&'static str),

    /// A header has the wrong value.
    #[error("expected {header} {expected:?}, got {actual:?}")]
    HeaderMismatch {
        /// Header name.
        header: &'static str,
        /// Expected value.
        expected: String,
        /// Received value.
        actual: String,
    },

    /// A body was sent where none is allowed.
    #[error("expected an empty body, got {0} bytes")]
    NonEmptyBody(usize),

    /// A payload key is absent.
    #[error("'{0}' missing from response")]
    MissingKey(String),

    /// The write status of a key is not the error status.
    #[error("status of '{key}' is {actual:?}, expected it to contain {expected:?}")]
    NotAnError {
        /// Payload key.
        key: String,
        /// Expected error status.
        expected: String,
        /// Received status.
        actual: String,
    },

    /// A rejected document carries no issues.
    #[error("no issues reported for '{0}'")]
    NoIssues(String),

    /// The first issue does not mention an expected text.
    #[error("first issue {issue:?} does not contain {expected:?}")]
    IssueMismatch {
        /// The first issue message.
        issue: String,
        /// The missing text.
        expected: String,
    },

    /// An item is not a JSON object.
    #[error("item is not an object: {0}")]
    NotAnObject(String),

    /// An item field is absent.
    #[error("item field '{0}' is missing")]
    MissingField(String),

    /// An identifier does not fully match the item URL pattern.
    #[error("identifier {id:?} does not fully match {pattern:?}")]
    IdentifierMismatch {
        /// The identifier.
        id: String,
        /// The item URL pattern.
        pattern: String,
    },

    /// A date does not parse under the date format.
    #[error("field '{field}' value {value:?} does not parse as {format:?}")]
    DateFormat {
        /// Field name.
        field: String,
        /// Field value.
        value: String,
        /// Configured date format.
        format: String,
    },

    /// Links could not be read as `{rel, title, href}` objects.
    #[error("malformed links: {0}")]
    MalformedLinks(String),

    /// No link satisfies the contract.
    #[error("no {0} link found")]
    LinkNotFound(String),
}

/// Checks a status code.
pub fn check_status(actual: StatusCode, expected: u16) -> Result<(), ContractViolation> {
    if actual.as_u16() == expected {
        Ok(())
    } else {
        Err(ContractViolation::Status {
            expected,
            actual: actual.as_u16(),
        })
    }
}

/// Checks that `response[key]` is a rejected write whose first issue contains
/// every text of `matches`.
pub fn check_validation_error(
    response: &Value,
    key: &str,
    matches: &[&str],
    status_err: &str,
) -> Result<(), ContractViolation> {
    let entry = response
        .get(key)
        .ok_or_else(|| ContractViolation::MissingKey(key.to_string()))?;

    let status = entry
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| ContractViolation::MissingKey(format!("{key}.status")))?;
    if !status.contains(status_err) {
        return Err(ContractViolation::NotAnError {
            key: key.to_string(),
            expected: status_err.to_string(),
            actual: status.to_string(),
        });
    }

    let issues = entry
        .get("issues")
        .and_then(Value::as_array)
        .ok_or_else(|| ContractViolation::MissingKey(format!("{key}.issues")))?;
    let first = issues
        .first()
        .ok_or_else(|| ContractViolation::NoIssues(key.to_string()))?;
    let message = first
        .get(0)
        .and_then(Value::as_str)
        .unwrap_or_default();

    match matches.iter().find(|expected| !message.contains(**expected)) {
        Some(expected) => Err(ContractViolation::IssueMismatch {
            issue: message.to_string(),
            expected: expected.to_string(),
        }),
        None => Ok(()),
    }
}

/// Checks that an `Expires` header is present.
pub fn check_expires(headers: &HeaderMap) -> Result<(), ContractViolation> {
    header_str(headers, header::EXPIRES, "Expires").map(|_| ())
}

/// Checks that `Cache-Control` equals `expected` byte for byte.
pub fn check_cache_control(headers: &HeaderMap, expected: &str) -> Result<(), ContractViolation> {
    let actual = header_str(headers, header::CACHE_CONTROL, "Cache-Control")?;
    if actual == expected {
        Ok(())
    } else {
        Err(ContractViolation::HeaderMismatch {
            header: "Cache-Control",
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

/// Returns the `Last-Modified` header, which must be present.
pub fn check_last_modified(headers: &HeaderMap) -> Result<String, ContractViolation> {
    header_str(headers, header::LAST_MODIFIED, "Last-Modified").map(str::to_string)
}

/// Checks that a conditional GET was answered with an empty 304.
pub fn check_not_modified(status: StatusCode, body: &[u8]) -> Result<(), ContractViolation> {
    check_status(status, 304)?;
    if body.is_empty() {
        Ok(())
    } else {
        Err(ContractViolation::NonEmptyBody(body.len()))
    }
}

/// Checks the shape of a rendered item: identifier, last update and self link.
pub fn check_item(item: &Value, settings: &Settings) -> Result<(), ContractViolation> {
    let object = item
        .as_object()
        .ok_or_else(|| ContractViolation::NotAnObject(item.to_string()))?;

    let id = object
        .get(&settings.id_field)
        .and_then(Value::as_str)
        .ok_or_else(|| ContractViolation::MissingField(settings.id_field.clone()))?;
    if !settings.item_url.is_match(id) {
        return Err(ContractViolation::IdentifierMismatch {
            id: id.to_string(),
            pattern: settings.item_url_pattern.clone(),
        });
    }

    let updated = object
        .get(&settings.last_updated)
        .and_then(Value::as_str)
        .ok_or_else(|| ContractViolation::MissingField(settings.last_updated.clone()))?;
    if settings.parse_date(updated).is_none() {
        return Err(ContractViolation::DateFormat {
            field: settings.last_updated.clone(),
            value: updated.to_string(),
            format: settings.date_format.clone(),
        });
    }

    let link = object
        .get("link")
        .ok_or_else(|| ContractViolation::MissingField("link".to_string()))?;
    check_item_link(link, id)
}

/// Checks that `link` is a self link whose href contains `/{item_id}/`.
pub fn check_item_link(link: &Value, item_id: &str) -> Result<(), ContractViolation> {
    let link: Link = serde_json::from_value(link.clone())
        .map_err(|e| ContractViolation::MalformedLinks(e.to_string()))?;
    let segment = format!("/{item_id}/");
    if link.rel == "self" && link.href.contains(&segment) {
        Ok(())
    } else {
        Err(ContractViolation::LinkNotFound(format!("self ({segment})")))
    }
}

/// Reads a JSON array of links.
pub fn parse_links(links: &Value) -> Result<Vec<Link>, ContractViolation> {
    serde_json::from_value(links.clone())
        .map_err(|e| ContractViolation::MalformedLinks(e.to_string()))
}

/// Checks for a link to the API root.
pub fn check_home_link(links: &[Link], settings: &Settings) -> Result<(), ContractViolation> {
    let home_uri = settings.home_uri();
    find_link(links, "home", |link| link.title == "home" && link.href == home_uri)
}

/// Checks for a link to the collection of `resource`.
pub fn check_resource_link(
    links: &[Link],
    settings: &Settings,
    resource: &Resource,
) -> Result<(), ContractViolation> {
    let href = settings.resource_uri(resource);
    find_link(links, &resource.url, |link| {
        link.title == resource.url && link.href.starts_with(&href)
    })
}

/// Checks for a link to page `page` of a listing.
pub fn check_next_link(links: &[Link], page: usize) -> Result<(), ContractViolation> {
    find_link(links, "next", |link| {
        link.rel == "next" && link.title == "next page" && page_of(&link.href) == Some(page)
    })
}

/// Checks for a link to the previous page `page` of a listing.
///
/// The first page carries no `page` parameter, so for `page <= 1` any
/// previous page link qualifies.
pub fn check_prev_link(links: &[Link], page: usize) -> Result<(), ContractViolation> {
    find_link(links, "prev", |link| {
        link.rel == "prev"
            && link.title == "previous page"
            && (page <= 1 || page_of(&link.href) == Some(page))
    })
}

fn find_link(
    links: &[Link],
    what: &str,
    predicate: impl Fn(&Link) -> bool,
) -> Result<(), ContractViolation> {
    if links.iter().any(predicate) {
        Ok(())
    } else {
        Err(ContractViolation::LinkNotFound(what.to_string()))
    }
}

fn page_of(href: &str) -> Option<usize> {
    let url = Url::parse(href).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
}

fn header_str<'a>(
    headers: &'a HeaderMap,
    name: header::HeaderName,
    label: &'static str,
) -> Result<&'a str, ContractViolation> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or(ContractViolation::MissingHeader(label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use serde_json::json;

    fn settings() -> Settings {
        Settings::from_toml_str(
            r#"
server_name = "api.test"

[domain.contacts]
url = "arbitraryurl"
"#,
        )
        .unwrap()
    }

    fn links(value: Value) -> Vec<Link> {
        parse_links(&value).unwrap()
    }

    #[test]
    fn test_validation_error() {
        let response = json!({
            "item1": {"status": "ERR", "issues": [["value of field 'ref' is too short", "ref"]]}
        });
        assert!(check_validation_error(&response, "item1", &["ref", "short"], "ERR").is_ok());
        assert_eq!(
            check_validation_error(&response, "item1", &["long"], "ERR"),
            Err(ContractViolation::IssueMismatch {
                issue: "value of field 'ref' is too short".to_string(),
                expected: "long".to_string(),
            })
        );
        assert_eq!(
            check_validation_error(&response, "item2", &[], "ERR"),
            Err(ContractViolation::MissingKey("item2".to_string()))
        );
    }

    #[test]
    fn test_validation_error_needs_error_status_and_issues() {
        let ok = json!({"item1": {"status": "OK", "issues": []}});
        assert!(matches!(
            check_validation_error(&ok, "item1", &[], "ERR"),
            Err(ContractViolation::NotAnError { .. })
        ));

        let empty = json!({"item1": {"status": "ERR", "issues": []}});
        assert_eq!(
            check_validation_error(&empty, "item1", &[], "ERR"),
            Err(ContractViolation::NoIssues("item1".to_string()))
        );
    }

    #[test]
    fn test_cache_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(
            check_expires(&headers),
            Err(ContractViolation::MissingHeader("Expires"))
        );

        headers.insert(header::EXPIRES, HeaderValue::from_static("Thu, 01 Jan 2026 00:00:00 GMT"));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=20"));
        assert!(check_expires(&headers).is_ok());
        assert!(check_cache_control(&headers, "max-age=20").is_ok());
        assert!(matches!(
            check_cache_control(&headers, "max-age=20,must-revalidate"),
            Err(ContractViolation::HeaderMismatch { .. })
        ));
    }

    #[test]
    fn test_not_modified() {
        assert!(check_not_modified(StatusCode::NOT_MODIFIED, b"").is_ok());
        assert_eq!(
            check_not_modified(StatusCode::NOT_MODIFIED, b"{}"),
            Err(ContractViolation::NonEmptyBody(2))
        );
        assert!(matches!(
            check_not_modified(StatusCode::OK, b""),
            Err(ContractViolation::Status { expected: 304, actual: 200 })
        ));
    }

    #[test]
    fn test_item_shape() {
        let settings = settings();
        let id = "4f46445fc88e201858000000";
        let href = format!("http://api.test/arbitraryurl/{id}/");
        let item = json!({
            "_id": id,
            "updated": "Tue, 02 Apr 2013 10:00:00 UTC",
            "link": {"rel": "self", "title": "contact", "href": href}
        });
        assert!(check_item(&item, &settings).is_ok());

        let mut long_id = item.clone();
        long_id["_id"] = json!("4f46445fc88e201858000000aa");
        assert!(matches!(
            check_item(&long_id, &settings),
            Err(ContractViolation::IdentifierMismatch { .. })
        ));

        let mut bad_date = item.clone();
        bad_date["updated"] = json!("2013-04-02");
        assert!(matches!(
            check_item(&bad_date, &settings),
            Err(ContractViolation::DateFormat { .. })
        ));
    }

    #[test]
    fn test_home_and_resource_links() {
        let settings = settings();
        let resource = settings.resource("contacts").unwrap();
        let links = links(json!([
            {"rel": "parent", "title": "home", "href": "http://api.test/"},
            {"rel": "collection", "title": "arbitraryurl", "href": "http://api.test/arbitraryurl/"}
        ]));
        assert!(check_home_link(&links, &settings).is_ok());
        assert!(check_resource_link(&links, &settings, resource).is_ok());
        assert!(check_home_link(&links[1..], &settings).is_err());

        let without_slash = parse_links(&json!([
            {"rel": "parent", "title": "home", "href": "http://api.test"}
        ]))
        .unwrap();
        assert!(check_home_link(&without_slash, &settings).is_err());
    }

    #[test]
    fn test_pagination_links() {
        let links = links(json!([
            {
                "rel": "next",
                "title": "next page",
                "href": "http://api.test/arbitraryurl/?max_results=10&page=3"
            },
            {
                "rel": "prev",
                "title": "previous page",
                "href": "http://api.test/arbitraryurl/?max_results=10"
            }
        ]));
        assert!(check_next_link(&links, 3).is_ok());
        assert!(check_next_link(&links, 2).is_err());
        assert!(check_prev_link(&links, 1).is_ok());
        assert_eq!(
            check_prev_link(&links, 2),
            Err(ContractViolation::LinkNotFound("prev".to_string()))
        );
    }

    #[test]
    fn test_page_query_is_parsed_not_matched() {
        let links = links(json!([
            {"rel": "next", "title": "next page", "href": "http://api.test/x/?page=12"}
        ]));
        assert!(check_next_link(&links, 1).is_err());
        assert!(check_next_link(&links, 12).is_ok());
    }

    #[test]
    fn test_malformed_links() {
        assert!(matches!(
            parse_links(&json!(["<link rel='self' />"])),
            Err(ContractViolation::MalformedLinks(_))
        ));
    }
}
