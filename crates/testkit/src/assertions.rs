//! Panicking assertions.
//!
//! Each `assert_*` method runs the matching [`contracts`](crate::contracts)
//! check and panics with the violation, which ends the current test.

use http::StatusCode;
use serde_json::Value;

use crate::contracts::{self, ContractViolation};
use crate::harness::TestHarness;

fn enforce(result: Result<(), ContractViolation>) {
    if let Err(violation) = result {
        panic!("{violation}");
    }
}

fn links_of(links: &Value) -> Vec<vesper_rest::Link> {
    match contracts::parse_links(links) {
        Ok(links) => links,
        Err(violation) => panic!("{violation}"),
    }
}

impl TestHarness {
    /// Asserts a 200 OK.
    pub fn assert_200(&self, status: StatusCode) {
        enforce(contracts::check_status(status, 200));
    }

    /// Asserts a 301 Moved Permanently.
    pub fn assert_301(&self, status: StatusCode) {
        enforce(contracts::check_status(status, 301));
    }

    /// Asserts a 304 Not Modified.
    pub fn assert_304(&self, status: StatusCode) {
        enforce(contracts::check_status(status, 304));
    }

    /// Asserts a 400 Bad Request.
    pub fn assert_400(&self, status: StatusCode) {
        enforce(contracts::check_status(status, 400));
    }

    /// Asserts a 403 Forbidden.
    pub fn assert_403(&self, status: StatusCode) {
        enforce(contracts::check_status(status, 403));
    }

    /// Asserts a 404 Not Found.
    pub fn assert_404(&self, status: StatusCode) {
        enforce(contracts::check_status(status, 404));
    }

    /// Asserts a 405 Method Not Allowed.
    pub fn assert_405(&self, status: StatusCode) {
        enforce(contracts::check_status(status, 405));
    }

    /// Asserts a 412 Precondition Failed.
    pub fn assert_412(&self, status: StatusCode) {
        enforce(contracts::check_status(status, 412));
    }

    /// Asserts that `response[key]` was rejected and that its first issue
    /// mentions every text of `matches`.
    pub fn assert_validation_error(&self, response: &Value, key: &str, matches: &[&str]) {
        enforce(contracts::check_validation_error(
            response,
            key,
            matches,
            &self.settings.status_err,
        ));
    }

    /// GETs `path` and asserts an `Expires` header.
    pub async fn assert_expires(&self, path: &str) {
        let response = self.get_raw(path, &[]).await;
        enforce(contracts::check_expires(response.headers()));
    }

    /// GETs `path` and asserts the known resource's `Cache-Control` policy.
    pub async fn assert_cache_control(&self, path: &str) {
        let response = self.get_raw(path, &[]).await;
        enforce(contracts::check_cache_control(
            response.headers(),
            &self.known().cache_control,
        ));
    }

    /// GETs `path`, replays its `Last-Modified` as `If-Modified-Since` and
    /// asserts an empty 304.
    pub async fn assert_if_modified_since(&self, path: &str) {
        let response = self.get_raw(path, &[]).await;
        let last_modified = match contracts::check_last_modified(response.headers()) {
            Ok(value) => value,
            Err(violation) => panic!("{violation}"),
        };

        let response = self
            .get_raw(path, &[("If-Modified-Since", last_modified.as_str())])
            .await;
        enforce(contracts::check_not_modified(
            response.status_code(),
            response.as_bytes(),
        ));
    }

    /// Asserts the shape of a rendered item.
    pub fn assert_item(&self, item: &Value) {
        enforce(contracts::check_item(item, &self.settings));
    }

    /// Asserts that `link` is the self link of `item_id`.
    pub fn assert_item_link(&self, link: &Value, item_id: &str) {
        enforce(contracts::check_item_link(link, item_id));
    }

    /// Asserts a link to the API root.
    pub fn assert_home_link(&self, links: &Value) {
        enforce(contracts::check_home_link(&links_of(links), &self.settings));
    }

    /// Asserts a link to the collection of `resource`.
    pub fn assert_resource_link(&self, links: &Value, resource: &str) {
        let Some(resource) = self.settings.resource(resource) else {
            panic!("'{resource}' is not in the domain");
        };
        enforce(contracts::check_resource_link(
            &links_of(links),
            &self.settings,
            resource,
        ));
    }

    /// Asserts a next page link to `page`.
    pub fn assert_next_link(&self, links: &Value, page: usize) {
        enforce(contracts::check_next_link(&links_of(links), page));
    }

    /// Asserts a previous page link to `page`.
    pub fn assert_prev_link(&self, links: &Value, page: usize) {
        enforce(contracts::check_prev_link(&links_of(links), page));
    }
}
