pub mod currency;
pub mod text;
pub mod time;

pub use currency::Currency;
pub use text::{format_percent, sanitize_file_stem};
pub use time::{export_date_slug, format_local};
