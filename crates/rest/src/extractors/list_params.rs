//! Listing parameter extractor.
//!
//! Extracts `where`, `sort`, `max_results` and `page` from collection GET
//! requests and turns them into a data layer [`Query`].

use axum::{
    extract::{FromRequestParts, Query as QueryString},
    http::request::Parts,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use vesper_persistence::types::{DocumentField, FieldMapping, Filter, Query, SortKey};

use crate::error::{RestError, RestResult};
use crate::links::PageRequest;
use crate::settings::Settings;

/// Raw listing parameters as sent by the client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    /// JSON filter document.
    #[serde(rename = "where")]
    pub where_clause: Option<String>,
    /// Sort specification.
    pub sort: Option<String>,
    /// Requested page size.
    pub max_results: Option<String>,
    /// Requested page number.
    pub page: Option<String>,
}

impl<S> FromRequestParts<S> for ListQuery
where
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let QueryString(query) = QueryString::<ListQuery>::from_request_parts(parts, state)
            .await
            .map_err(|e| RestError::BadRequest {
                message: format!("Invalid query string: {}", e),
            })?;
        Ok(query)
    }
}

/// Validated listing parameters.
#[derive(Debug, Clone)]
pub struct ListParams {
    /// Raw `where` parameter, kept for pagination links.
    pub where_clause: Option<String>,
    /// Raw `sort` parameter, kept for pagination links.
    pub sort: Option<String>,
    /// Effective page size.
    pub max_results: usize,
    /// 1-based page number.
    pub page: usize,
    filter: Filter,
    sort_keys: Vec<SortKey>,
}

impl ListParams {
    /// Validates raw parameters against the settings.
    ///
    /// `max_results` above `paging_limit` is capped; zero, negative or
    /// non-numeric values are rejected, as are malformed `where` and `sort`.
    pub fn parse(query: ListQuery, settings: &Settings) -> RestResult<Self> {
        let max_results = match query.max_results.as_deref() {
            Some(value) => positive("max_results", value)?.min(settings.paging_limit),
            None => settings.paging_default,
        };
        let page = match query.page.as_deref() {
            Some(value) => positive("page", value)?,
            None => 1,
        };

        let mapping = ResourceFields::new(settings);
        let filter = match query.where_clause.as_deref() {
            Some(clause) => {
                let value: serde_json::Value = serde_json::from_str(clause)?;
                Filter::from_json(&value, &mapping)?
            }
            None => Filter::new(),
        };
        let sort_keys = match query.sort.as_deref() {
            Some(spec) => SortKey::parse_list(spec, &mapping)?,
            None => Vec::new(),
        };

        Ok(Self {
            where_clause: query.where_clause,
            sort: query.sort,
            max_results,
            page,
            filter,
            sort_keys,
        })
    }

    /// Builds the data layer query of this page.
    pub fn to_query(&self, modified_since: Option<DateTime<Utc>>) -> Query {
        Query::all()
            .with_filter(self.filter.clone())
            .with_sort(self.sort_keys.clone())
            .with_page(self.page, self.max_results)
            .modified_since(modified_since)
    }

    /// Returns the parameters that shape pagination links.
    pub fn page_request(&self) -> PageRequest<'_> {
        PageRequest {
            where_clause: self.where_clause.as_deref(),
            sort: self.sort.as_deref(),
            max_results: self.max_results,
            page: self.page,
        }
    }
}

fn positive(name: &str, value: &str) -> RestResult<usize> {
    value
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| RestError::BadRequest {
            message: format!("{} must be a positive integer, got '{}'", name, value),
        })
}

/// Maps client field names onto document metadata and content.
///
/// The configured identifier, last-updated and creation field names address
/// document metadata; date strings use the configured date format.
#[derive(Debug, Clone, Copy)]
pub struct ResourceFields<'a> {
    settings: &'a Settings,
}

impl<'a> ResourceFields<'a> {
    /// Creates a mapping for the given settings.
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }
}

impl FieldMapping for ResourceFields<'_> {
    fn field(&self, name: &str) -> DocumentField {
        if name == self.settings.id_field {
            DocumentField::Id
        } else if name == self.settings.last_updated {
            DocumentField::Updated
        } else if name == self.settings.date_created {
            DocumentField::Created
        } else {
            DocumentField::Content(name.to_string())
        }
    }

    fn parse_date(&self, value: &str) -> Option<DateTime<Utc>> {
        self.settings.parse_date(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> ListQuery {
        let mut query = ListQuery::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match *key {
                "where" => query.where_clause = value,
                "sort" => query.sort = value,
                "max_results" => query.max_results = value,
                "page" => query.page = value,
                _ => unreachable!(),
            }
        }
        query
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        let params = ListParams::parse(ListQuery::default(), &settings).unwrap();
        assert_eq!(params.max_results, 25);
        assert_eq!(params.page, 1);

        let query = params.to_query(None);
        assert_eq!(query.skip, 0);
        assert_eq!(query.limit, Some(25));
    }

    #[test]
    fn test_max_results_is_capped() {
        let settings = Settings::default();
        let params = ListParams::parse(raw(&[("max_results", "500")]), &settings).unwrap();
        assert_eq!(params.max_results, 50);
    }

    #[test]
    fn test_page_offset() {
        let settings = Settings::default();
        let params =
            ListParams::parse(raw(&[("max_results", "10"), ("page", "3")]), &settings).unwrap();
        assert_eq!(params.to_query(None).skip, 20);
    }

    #[test]
    fn test_rejects_bad_values() {
        let settings = Settings::default();
        for pair in [
            ("max_results", "0"),
            ("max_results", "-1"),
            ("page", "first"),
            ("where", "{not json"),
            ("where", r#"{"prog": {"$regex": "x"}}"#),
            ("sort", r#"[["prog", 2]]"#),
        ] {
            let result = ListParams::parse(raw(&[pair]), &settings);
            assert!(
                matches!(result, Err(RestError::BadRequest { .. })),
                "{:?} should be rejected",
                pair
            );
        }
    }

    #[test]
    fn test_metadata_fields() {
        let settings = Settings::default();
        let mapping = ResourceFields::new(&settings);
        assert_eq!(mapping.field("_id"), DocumentField::Id);
        assert_eq!(mapping.field("updated"), DocumentField::Updated);
        assert_eq!(mapping.field("created"), DocumentField::Created);
        assert_eq!(mapping.field("ref"), DocumentField::Content("ref".to_string()));

        let params = ListParams::parse(
            raw(&[("where", r#"{"updated": {"$gt": "Tue, 06 Nov 2012 10:33:31 UTC"}}"#)]),
            &settings,
        )
        .unwrap();
        assert_eq!(params.to_query(None).filter.conditions().len(), 1);
    }
}
