//! REST API conformance tests.
//!
//! Tests the HTTP behaviour of the framework:
//! - HTTP status codes (200, 301, 304, 400, 403, 404, 405, 412)
//! - Response headers (Cache-Control, Expires, Last-Modified, ETag)
//! - Conditional requests (If-Match, If-None-Match, If-Modified-Since)
//! - Envelope, links and paging

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{Map, Value, json};
use vesper_persistence::backends::memory::MemoryBackend;
use vesper_persistence::core::DataLayer;
use vesper_rest::settings::Settings;
use vesper_rest::{AppState, ServerConfig, create_app_with_state};

const IF_MATCH: HeaderName = HeaderName::from_static("if-match");
const IF_NONE_MATCH: HeaderName = HeaderName::from_static("if-none-match");
const IF_MODIFIED_SINCE: HeaderName = HeaderName::from_static("if-modified-since");
const CACHE_CONTROL: HeaderName = HeaderName::from_static("cache-control");
const EXPIRES: HeaderName = HeaderName::from_static("expires");
const LAST_MODIFIED: HeaderName = HeaderName::from_static("last-modified");
const ETAG: HeaderName = HeaderName::from_static("etag");
const LOCATION: HeaderName = HeaderName::from_static("location");
const ALLOW: HeaderName = HeaderName::from_static("allow");

const SETTINGS: &str = r#"
server_name = "api.test"

[domain.contacts]
url = "people"
cache_control = "max-age=20,must-revalidate"
cache_expires = 20
resource_methods = ["GET", "POST", "DELETE"]
item_methods = ["GET", "PATCH", "DELETE"]
additional_lookup = { url = '[\w]+', field = "ref" }

[domain.contacts.schema.ref]
type = "string"
minlength = 5
required = true
unique = true

[domain.contacts.schema.prog]
type = "integer"

[domain.payments]
"#;

/// Creates a test server with `count` seeded contacts.
async fn create_test_server(count: usize) -> (TestServer, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    let contacts = (0..count)
        .map(|i| {
            let mut doc = Map::new();
            doc.insert("ref".to_string(), json!(format!("ref{:05}", i)));
            doc.insert("prog".to_string(), json!(i));
            doc
        })
        .collect();
    backend
        .insert_many("contacts", contacts)
        .await
        .expect("Failed to seed contacts");

    let settings = Settings::from_toml_str(SETTINGS).expect("Failed to load settings");
    let state = AppState::new(Arc::clone(&backend), settings, ServerConfig::for_testing());
    let server =
        TestServer::new(create_app_with_state(state)).expect("Failed to create test server");

    (server, backend)
}

async fn first_contact(server: &TestServer) -> Value {
    let response = server.get("/people/").await;
    response.json::<Value>()["response"]["contacts"][0].clone()
}

// =============================================================================
// Home and listing
// =============================================================================

mod listing {
    use super::*;

    #[tokio::test]
    async fn test_home_lists_resources() {
        let (server, _backend) = create_test_server(0).await;

        let body = server.get("/").await.json::<Value>();
        let links = body["response"]["links"].as_array().unwrap();
        assert_eq!(links.len(), 2);
        assert!(links.contains(&json!({
            "rel": "child",
            "title": "people",
            "href": "http://api.test/people/"
        })));
    }

    #[tokio::test]
    async fn test_home_link_under_prefix() {
        let text = format!("url_prefix = \"api\"\napi_version = \"v1\"\n{}", SETTINGS);
        let settings = Settings::from_toml_str(&text).expect("Failed to load settings");
        let state = AppState::new(
            Arc::new(MemoryBackend::new()),
            settings,
            ServerConfig::for_testing(),
        );
        let server = TestServer::new(create_app_with_state(state)).unwrap();

        let body = server.get("/api/v1/people/").await.json::<Value>();
        let home = &body["response"]["links"][0];
        assert_eq!(home["title"], "home");
        assert_eq!(home["href"], "http://api.test/api/v1/");

        server.get("/api/v1/").await.assert_status_ok();

        let response = server.get("/api/v1").await;
        response.assert_status(StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[LOCATION], "/api/v1/");
    }

    #[tokio::test]
    async fn test_list_envelope_and_links() {
        let (server, _backend) = create_test_server(30).await;

        let response = server.get("/people/").await;
        response.assert_status_ok();

        let body = response.json::<Value>();
        let page = &body["response"];
        assert_eq!(page["contacts"].as_array().unwrap().len(), 25);
        assert_eq!(page["links"][0]["title"], "home");
        assert_eq!(page["links"][1]["rel"], "collection");
        assert_eq!(page["links"][2]["rel"], "next");
        assert_eq!(page["links"][2]["href"], "http://api.test/people/?page=2");
    }

    #[tokio::test]
    async fn test_second_page_prev_link() {
        let (server, _backend) = create_test_server(30).await;

        let body = server
            .get("/people/")
            .add_query_param("page", 2)
            .await
            .json::<Value>();
        let page = &body["response"];
        assert_eq!(page["contacts"].as_array().unwrap().len(), 5);
        let links = page["links"].as_array().unwrap();
        assert_eq!(links.len(), 3);
        assert_eq!(links[2]["rel"], "prev");
        assert_eq!(links[2]["href"], "http://api.test/people/");
    }

    #[tokio::test]
    async fn test_where_and_sort() {
        let (server, _backend) = create_test_server(10).await;

        let body = server
            .get("/people/")
            .add_query_param("where", r#"{"prog": {"$gte": 7}}"#)
            .add_query_param("sort", "-prog")
            .await
            .json::<Value>();
        let progs: Vec<i64> = body["response"]["contacts"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["prog"].as_i64().unwrap())
            .collect();
        assert_eq!(progs, vec![9, 8, 7]);
    }

    #[tokio::test]
    async fn test_bad_query_parameters() {
        let (server, _backend) = create_test_server(1).await;

        for (name, value) in [("where", "{bad"), ("max_results", "0"), ("page", "x")] {
            let response = server.get("/people/").add_query_param(name, value).await;
            response.assert_status(StatusCode::BAD_REQUEST);
            assert_eq!(response.json::<Value>()["error"]["code"], 400);
        }
    }

    #[tokio::test]
    async fn test_unknown_resource() {
        let (server, _backend) = create_test_server(0).await;
        server.get("/unknown/").await.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let (server, _backend) = create_test_server(0).await;

        let response = server.post("/payments/").json(&json!({})).await;
        response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "GET");

        server
            .put("/people/")
            .json(&json!({}))
            .await
            .assert_status(StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_trailing_slash_redirect() {
        let (server, _backend) = create_test_server(0).await;

        let response = server.get("/people").add_query_param("page", 2).await;
        response.assert_status(StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[LOCATION], "/people/?page=2");

        server.get("/unknown").await.assert_status(StatusCode::NOT_FOUND);
    }
}

// =============================================================================
// Caching and conditional GET
// =============================================================================

mod caching {
    use super::*;

    #[tokio::test]
    async fn test_cache_headers() {
        let (server, _backend) = create_test_server(3).await;

        let response = server.get("/people/").await;
        let headers = response.headers();
        assert_eq!(headers[CACHE_CONTROL], "max-age=20,must-revalidate");
        assert!(headers.contains_key(EXPIRES));
        assert!(headers.contains_key(LAST_MODIFIED));
    }

    #[tokio::test]
    async fn test_resource_without_policy_has_no_cache_control() {
        let (server, _backend) = create_test_server(0).await;

        let response = server.get("/payments/").await;
        assert!(!response.headers().contains_key(CACHE_CONTROL));
        assert!(!response.headers().contains_key(LAST_MODIFIED));
    }

    #[tokio::test]
    async fn test_list_if_modified_since() {
        let (server, _backend) = create_test_server(3).await;

        let first = server.get("/people/").await;
        let last_modified = first.headers()[LAST_MODIFIED].clone();

        let second = server
            .get("/people/")
            .add_header(IF_MODIFIED_SINCE, last_modified)
            .await;
        second.assert_status(StatusCode::NOT_MODIFIED);
        assert!(second.text().is_empty());
    }

    #[tokio::test]
    async fn test_item_conditional_get() {
        let (server, _backend) = create_test_server(1).await;
        let contact = first_contact(&server).await;
        let url = format!("/people/{}/", contact["_id"].as_str().unwrap());

        let response = server.get(&url).await;
        response.assert_status_ok();
        let etag = response.headers()[ETAG].clone();
        let last_modified = response.headers()[LAST_MODIFIED].clone();

        server
            .get(&url)
            .add_header(IF_NONE_MATCH, etag)
            .await
            .assert_status(StatusCode::NOT_MODIFIED);
        server
            .get(&url)
            .add_header(IF_MODIFIED_SINCE, last_modified)
            .await
            .assert_status(StatusCode::NOT_MODIFIED);
    }
}

// =============================================================================
// Items
// =============================================================================

mod items {
    use super::*;

    #[tokio::test]
    async fn test_get_by_id_and_additional_lookup() {
        let (server, _backend) = create_test_server(2).await;
        let contact = first_contact(&server).await;
        let id = contact["_id"].as_str().unwrap();

        let body = server.get(&format!("/people/{}/", id)).await.json::<Value>();
        let item = &body["response"]["contact"];
        assert_eq!(item["_id"], id);
        assert_eq!(item["link"]["rel"], "self");
        assert_eq!(item["link"]["href"], format!("http://api.test/people/{}/", id));

        let body = server.get("/people/ref00001/").await.json::<Value>();
        assert_eq!(body["response"]["contact"]["prog"], 1);
    }

    #[tokio::test]
    async fn test_unknown_items() {
        let (server, _backend) = create_test_server(1).await;

        server
            .get("/people/4f46445fc88e201858000000/")
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .get("/people/unknown/")
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .get("/people/not-a-lookup/")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_patch_requires_if_match() {
        let (server, _backend) = create_test_server(1).await;

        server
            .patch("/people/ref00000/")
            .json(&json!({"key1": {"prog": 5}}))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        server
            .patch("/people/ref00000/")
            .add_header(IF_MATCH, HeaderValue::from_static("not-the-etag"))
            .json(&json!({"key1": {"prog": 5}}))
            .await
            .assert_status(StatusCode::PRECONDITION_FAILED);
    }

    #[tokio::test]
    async fn test_patch_updates_item() {
        let (server, backend) = create_test_server(1).await;
        let contact = first_contact(&server).await;
        let etag = contact["etag"].as_str().unwrap();

        let response = server
            .patch("/people/ref00000/")
            .add_header(IF_MATCH, HeaderValue::from_str(etag).unwrap())
            .json(&json!({"key1": {"prog": 42}}))
            .await;
        response.assert_status_ok();

        let result = &response.json::<Value>()["response"]["key1"];
        assert_eq!(result["status"], "OK");
        assert_ne!(result["etag"], contact["etag"]);

        let stored = backend
            .find_by_id("contacts", contact["_id"].as_str().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.content()["prog"], 42);
    }

    #[tokio::test]
    async fn test_patch_validation_errors() {
        let (server, _backend) = create_test_server(2).await;
        let contact = first_contact(&server).await;
        let etag = contact["etag"].as_str().unwrap();

        let response = server
            .patch("/people/ref00000/")
            .add_header(IF_MATCH, HeaderValue::from_str(etag).unwrap())
            .json(&json!({"key1": {"ref": "ref00001"}}))
            .await;
        response.assert_status_ok();

        let result = &response.json::<Value>()["response"]["key1"];
        assert_eq!(result["status"], "ERR");
        assert_eq!(
            result["issues"][0],
            json!(["value 'ref00001' for field 'ref' is not unique", "ref"])
        );
    }

    #[tokio::test]
    async fn test_patch_bad_body() {
        let (server, _backend) = create_test_server(1).await;
        let contact = first_contact(&server).await;
        let etag = contact["etag"].as_str().unwrap();

        server
            .patch("/people/ref00000/")
            .add_header(IF_MATCH, HeaderValue::from_str(etag).unwrap())
            .json(&json!({"key1": "not a document"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_item() {
        let (server, backend) = create_test_server(2).await;
        let contact = first_contact(&server).await;
        let url = format!("/people/{}/", contact["_id"].as_str().unwrap());

        server.delete(&url).await.assert_status(StatusCode::FORBIDDEN);
        server
            .delete(&url)
            .add_header(IF_MATCH, HeaderValue::from_str(contact["etag"].as_str().unwrap()).unwrap())
            .await
            .assert_status_ok();

        assert_eq!(backend.count("contacts").await.unwrap(), 1);
        server.get(&url).await.assert_status(StatusCode::NOT_FOUND);
    }
}

// =============================================================================
// Inserts
// =============================================================================

mod inserts {
    use super::*;

    #[tokio::test]
    async fn test_post_reports_each_key() {
        let (server, backend) = create_test_server(0).await;

        let response = server
            .post("/people/")
            .json(&json!({
                "good": {"ref": "abcdef", "prog": 1},
                "bad": {"ref": "abc", "nope": true}
            }))
            .await;
        response.assert_status_ok();

        let body = response.json::<Value>();
        let good = &body["response"]["good"];
        assert_eq!(good["status"], "OK");
        assert!(good["_id"].as_str().is_some());

        let bad = &body["response"]["bad"];
        assert_eq!(bad["status"], "ERR");
        assert_eq!(bad["issues"][0][0], "unknown field 'nope'");
        assert_eq!(bad["issues"][1][0], "min length for field 'ref' is 5");

        assert_eq!(backend.count("contacts").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_post_missing_required() {
        let (server, _backend) = create_test_server(0).await;

        let body = server
            .post("/people/")
            .json(&json!({"key1": {"prog": 1}}))
            .await
            .json::<Value>();
        assert_eq!(
            body["response"]["key1"]["issues"][0][0],
            "required field(s) are missing: 'ref'"
        );
    }

    #[tokio::test]
    async fn test_delete_collection() {
        let (server, backend) = create_test_server(5).await;

        server.delete("/people/").await.assert_status_ok();
        assert_eq!(backend.count("contacts").await.unwrap(), 0);
    }
}
