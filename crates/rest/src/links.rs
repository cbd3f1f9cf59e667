//! Hypermedia links embedded in responses.
//!
//! Every link is a JSON object `{"rel": .., "title": .., "href": ..}`. List
//! responses carry `home`, `collection` and the pagination links, items carry
//! a `self` link pointing at their canonical URL.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::settings::{Resource, Settings};

/// A hypermedia link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Relation of the target to the current document.
    pub rel: String,
    /// Human readable title.
    pub title: String,
    /// Absolute target URI.
    pub href: String,
}

impl Link {
    /// Creates a link.
    pub fn new(rel: impl Into<String>, title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            title: title.into(),
            href: href.into(),
        }
    }

    /// Link to the API root.
    pub fn home(settings: &Settings) -> Self {
        Self::new("parent", "home", settings.home_uri())
    }

    /// Link from the API root to a resource.
    pub fn child(settings: &Settings, resource: &Resource) -> Self {
        Self::new("child", &resource.url, settings.resource_uri(resource))
    }

    /// Link to a resource collection.
    pub fn collection(settings: &Settings, resource: &Resource) -> Self {
        Self::new("collection", &resource.url, settings.resource_uri(resource))
    }

    /// Canonical link of an item.
    pub fn item(settings: &Settings, resource: &Resource, id: &str) -> Self {
        Self::new(
            "self",
            &resource.item_title,
            format!("{}{}/", settings.resource_uri(resource), id),
        )
    }

    /// Link to the next page of a listing.
    pub fn next(href: impl Into<String>) -> Self {
        Self::new("next", "next page", href)
    }

    /// Link to the previous page of a listing.
    pub fn prev(href: impl Into<String>) -> Self {
        Self::new("prev", "previous page", href)
    }
}

/// The listing parameters that shape pagination hrefs.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    /// Raw `where` parameter, if any.
    pub where_clause: Option<&'a str>,
    /// Raw `sort` parameter, if any.
    pub sort: Option<&'a str>,
    /// Effective page size.
    pub max_results: usize,
    /// 1-based page number.
    pub page: usize,
}

impl PageRequest<'_> {
    /// Builds the query string of a page, without the leading `?`.
    ///
    /// Parameters at their default are left out, so page 1 carries no `page`
    /// parameter and the default page size no `max_results`.
    pub fn query_string(&self, settings: &Settings, page: usize) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        if self.max_results != settings.paging_default {
            serializer.append_pair("max_results", &self.max_results.to_string());
        }
        if let Some(where_clause) = self.where_clause {
            serializer.append_pair("where", where_clause);
        }
        if let Some(sort) = self.sort {
            serializer.append_pair("sort", sort);
        }
        if page > 1 {
            serializer.append_pair("page", &page.to_string());
        }
        serializer.finish()
    }

    fn href(&self, settings: &Settings, resource: &Resource, page: usize) -> String {
        let base = settings.resource_uri(resource);
        let query = self.query_string(settings, page);
        if query.is_empty() {
            base
        } else {
            format!("{}?{}", base, query)
        }
    }
}

/// Returns the `next` and `prev` links of a listing page.
pub fn pagination_links(
    settings: &Settings,
    resource: &Resource,
    request: &PageRequest<'_>,
    total: usize,
) -> Vec<Link> {
    let mut links = Vec::new();
    if request.page.saturating_mul(request.max_results) < total {
        links.push(Link::next(request.href(settings, resource, request.page + 1)));
    }
    if request.page > 1 {
        links.push(Link::prev(request.href(settings, resource, request.page - 1)));
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings::from_toml_str(
            r#"
            server_name = "api.test"
            [domain.contacts]
            url = "people"
            "#,
        )
        .unwrap()
    }

    fn request(page: usize) -> PageRequest<'static> {
        PageRequest {
            where_clause: None,
            sort: None,
            max_results: 25,
            page,
        }
    }

    #[test]
    fn test_basic_links() {
        let settings = settings();
        let contacts = settings.resource("contacts").unwrap();

        assert_eq!(Link::home(&settings).href, "http://api.test/");
        assert_eq!(Link::collection(&settings, contacts).title, "people");
        let item = Link::item(&settings, contacts, "abc");
        assert_eq!(item.rel, "self");
        assert_eq!(item.title, "contact");
        assert_eq!(item.href, "http://api.test/people/abc/");
    }

    #[test]
    fn test_first_page_has_only_next() {
        let settings = settings();
        let contacts = settings.resource("contacts").unwrap();
        let links = pagination_links(&settings, contacts, &request(1), 60);

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].rel, "next");
        assert_eq!(links[0].href, "http://api.test/people/?page=2");
    }

    #[test]
    fn test_second_page_prev_has_no_page_parameter() {
        let settings = settings();
        let contacts = settings.resource("contacts").unwrap();
        let links = pagination_links(&settings, contacts, &request(2), 60);

        assert_eq!(links[0].href, "http://api.test/people/?page=3");
        assert_eq!(links[1].rel, "prev");
        assert_eq!(links[1].href, "http://api.test/people/");
    }

    #[test]
    fn test_last_page_has_only_prev() {
        let settings = settings();
        let contacts = settings.resource("contacts").unwrap();
        let links = pagination_links(&settings, contacts, &request(3), 60);

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].href, "http://api.test/people/?page=2");
    }

    #[test]
    fn test_query_parameters_are_carried() {
        let settings = settings();
        let request = PageRequest {
            where_clause: Some(r#"{"prog": 1}"#),
            sort: Some("-prog"),
            max_results: 10,
            page: 1,
        };
        assert_eq!(
            request.query_string(&settings, 2),
            "max_results=10&where=%7B%22prog%22%3A+1%7D&sort=-prog&page=2"
        );
    }
}
