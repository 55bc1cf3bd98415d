//! Display helpers shared by the front ends.

pub mod format;
pub mod pagination;

pub use format::{format_date, resolve_asset_url, truncate_string, unread_badge};
pub use pagination::{page_window, PageItem};
