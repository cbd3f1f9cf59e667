//! HTTP request handlers.
//!
//! - [`home`] - The API root
//! - [`collection`] - List, insert and empty a collection
//! - [`item`] - Read, change and remove an item
//! - [`redirect`] - Trailing slash redirects

pub mod collection;
pub mod home;
pub mod item;
pub mod redirect;

// Re-export handlers for convenience
pub use collection::{
    collection_fallback_handler, delete_all_handler, insert_handler, list_handler,
};
pub use home::{home_handler, not_found_handler};
pub use item::{
    delete_item_handler, find_item, get_item_handler, item_fallback_handler, patch_item_handler,
};
pub use redirect::{collection_redirect_handler, home_redirect_handler, item_redirect_handler};
