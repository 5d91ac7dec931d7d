// src/utils.rs
use chrono::{DateTime, Local, Utc};
use uuid::Uuid;

pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Local wall-clock rendering used in text transcripts, e.g.
/// `10/19/2026, 3:04:05 PM`.
pub fn format_local_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%-m/%-d/%Y, %-I:%M:%S %p")
        .to_string()
}

/// UTC calendar date used in export file names.
pub fn export_date(now: &DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}
