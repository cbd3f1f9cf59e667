//! # vesper-testkit - in-process test harness for Vesper APIs
//!
//! Spins up a Vesper application from a settings file, issues requests through
//! an in-process [`axum_test::TestServer`] and checks the response contracts:
//! the `{"response": ..}` envelope, validation error payloads, caching headers,
//! conditional GETs and hypermedia links.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vesper_testkit::TestHarness;
//!
//! #[tokio::test]
//! async fn test_contacts_are_cached() {
//!     let harness = TestHarness::setup().await;
//!
//!     let url = harness.known_resource_url.clone();
//!     harness.assert_cache_control(&url).await;
//!     harness.assert_if_modified_since(&url).await;
//! }
//! ```
//!
//! ## Layout
//!
//! - [`harness`] - [`TestHarness`], request helpers and response parsing
//! - [`methods`] - [`MethodsHarness`], a harness that also knows a stored item
//! - [`contracts`] - Pure contract checks returning [`ContractViolation`]
//! - [`assertions`] - Panicking `assert_*` wrappers around the checks
//! - [`fixtures`] - Deterministic seed documents

#![warn(missing_docs)]

pub mod assertions;
pub mod contracts;
pub mod fixtures;
pub mod harness;
pub mod methods;

pub use contracts::ContractViolation;
pub use harness::{HarnessError, HarnessOptions, ParsedResponse, TestHarness};
pub use methods::MethodsHarness;
