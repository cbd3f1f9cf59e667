//! Harness for tests that work on a stored item.

use std::ops::Deref;

use serde_json::Value;

use crate::harness::{HarnessError, HarnessOptions, TestHarness};

/// A [`TestHarness`] that also knows the first two stored documents of the
/// known resource.
///
/// Dereferences to the underlying harness, so every request helper and
/// assertion is available directly.
pub struct MethodsHarness {
    harness: TestHarness,
    /// Identifier of the first document.
    pub item_id: String,
    /// `ref` of the first document.
    pub item_name: String,
    /// Etag of the first document.
    pub item_etag: String,
    /// Item path of the first document by identifier.
    pub item_id_url: String,
    /// Item path of the first document by `ref`.
    pub item_name_url: String,
    /// `ref` of the second document.
    pub alt_ref: String,
}

impl MethodsHarness {
    /// Builds a harness from the bundled settings.
    ///
    /// # Panics
    ///
    /// Panics if the harness cannot be built.
    pub async fn setup() -> Self {
        Self::with_options(HarnessOptions::default()).await
    }

    /// Builds a harness with custom options.
    ///
    /// # Panics
    ///
    /// Panics if the harness cannot be built.
    pub async fn with_options(options: HarnessOptions) -> Self {
        match Self::try_with_options(options).await {
            Ok(harness) => harness,
            Err(e) => panic!("Failed to set up methods harness: {e}"),
        }
    }

    /// Builds a harness, reporting failures instead of panicking.
    pub async fn try_with_options(options: HarnessOptions) -> Result<Self, HarnessError> {
        let harness = TestHarness::try_with_options(options).await?;

        let response = harness.get(&harness.known_resource, "?max_results=2", None).await;
        let items = response
            .body
            .as_ref()
            .and_then(|body| body.get(&harness.known_resource))
            .and_then(Value::as_array)
            .filter(|items| items.len() >= 2)
            .ok_or_else(|| {
                HarnessError::Fixture(format!(
                    "listing '{}' returned {} without two items",
                    harness.known_resource, response.status
                ))
            })?;

        let settings = &harness.settings;
        let field = |item: &Value, name: &str| {
            item.get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| HarnessError::Fixture(format!("item has no '{name}' string")))
        };

        let item_id = field(&items[0], &settings.id_field)?;
        let item_name = field(&items[0], "ref")?;
        let item_etag = field(&items[0], &settings.etag_field)?;
        let alt_ref = field(&items[1], "ref")?;

        let known = harness.known_resource.clone();
        Ok(Self {
            item_id_url: harness.item_path(&known, &item_id),
            item_name_url: harness.item_path(&known, &item_name),
            harness,
            item_id,
            item_name,
            item_etag,
            alt_ref,
        })
    }
}

impl Deref for MethodsHarness {
    type Target = TestHarness;

    fn deref(&self) -> &TestHarness {
        &self.harness
    }
}
