//! Seed documents for the known resource.
//!
//! Contacts are deterministic: contact `n` has the reference
//! `ref` followed by `n` padded to 25 characters, so tests can address any of
//! them through the `ref` lookup.

use chrono::{TimeZone, Utc};
use serde_json::{Map, Value, json};
use vesper_rest::Settings;

/// Number of contacts seeded by default.
pub const CONTACT_COUNT: usize = 101;

const ROLES: [&str; 3] = ["agent", "client", "vendor"];

/// Returns the 25 character reference of contact `n`.
pub fn contact_ref(n: usize) -> String {
    format!("ref{:022}", n)
}

/// Builds contact `n`.
pub fn contact(n: usize, settings: &Settings) -> Map<String, Value> {
    let born = Utc
        .with_ymd_and_hms(1970 + (n % 50) as i32, 1 + (n % 12) as u32, 1, 12, 0, 0)
        .single()
        .map(|date| settings.format_date(date));

    let mut doc = Map::new();
    doc.insert("ref".to_string(), json!(contact_ref(n)));
    doc.insert("prog".to_string(), json!(n));
    doc.insert("role".to_string(), json!([ROLES[n % ROLES.len()]]));
    doc.insert("rows".to_string(), json!([{"sku": format!("sku{n}"), "price": n * 10}]));
    doc.insert(
        "location".to_string(),
        json!({"address": format!("{n} Main Street"), "city": "Springfield"}),
    );
    if let Some(born) = born {
        doc.insert("born".to_string(), json!(born));
    }
    doc
}

/// Builds the first `count` contacts.
pub fn contacts(count: usize, settings: &Settings) -> Vec<Map<String, Value>> {
    (0..count).map(|n| contact(n, settings)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_ref_length() {
        assert_eq!(contact_ref(0).len(), 25);
        assert_eq!(contact_ref(100), "ref0000000000000000000100");
    }

    #[test]
    fn test_contacts_are_distinct() {
        let settings = Settings::default();
        let docs = contacts(5, &settings);
        assert_eq!(docs.len(), 5);
        assert_eq!(docs[3]["prog"], 3);
        assert_eq!(docs[3]["role"], json!(["agent"]));
        assert_eq!(docs[4]["born"], "Wed, 01 May 1974 12:00:00 UTC");
    }
}
