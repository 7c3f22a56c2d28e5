//! Bounded customer activity log stored in a structured field.
//!
//! The external record keeps a JSON-encoded array of events that feeds a
//! customer-visible timeline. The log is capped at the 50 most recent
//! entries; the oldest entries are evicted first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of retained entries.
pub const EVENT_LOG_LIMIT: usize = 50;

/// Structured-field key holding the encoded log.
pub const EVENT_LOG_FIELD: &str = "activation_events";

/// One timeline entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Append an entry to the encoded log and re-encode it, evicting the oldest
/// entries beyond [`EVENT_LOG_LIMIT`].
///
/// A missing or unreadable existing value starts a fresh log rather than
/// failing the sync.
pub fn append_entry(raw: Option<&str>, entry: EventLogEntry) -> Result<String, serde_json::Error> {
    let mut entries: Vec<EventLogEntry> = raw
        .and_then(|value| serde_json::from_str(value).ok())
        .unwrap_or_default();
    entries.push(entry);
    if entries.len() > EVENT_LOG_LIMIT {
        let overflow = entries.len() - EVENT_LOG_LIMIT;
        entries.drain(..overflow);
    }
    serde_json::to_string(&entries)
}
