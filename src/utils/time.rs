use chrono::{DateTime, Local, Utc};

pub fn format_local(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// `YYYYMMDD` stamp used in export file names.
pub fn export_date_slug(now: DateTime<Utc>) -> String {
    now.with_timezone(&Local).format("%Y%m%d").to_string()
}
