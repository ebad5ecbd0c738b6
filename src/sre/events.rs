//! Event and log signals
//!
//! Events are decoded from `kubectl get events -o json` and ordered newest
//! first. Logs are only pulled for crash-class issues and classified line by
//! line.

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Event;

use super::status::{decode_many, Extracted};
use super::types::{EventRecord, LogLevel, LogLine};
use crate::error::Result;

fn event_record(event: &Event) -> EventRecord {
    let involved = &event.involved_object;
    let last_seen: Option<DateTime<Utc>> = event
        .last_timestamp
        .as_ref()
        .map(|t| t.0)
        .or_else(|| event.event_time.as_ref().map(|t| t.0))
        .or_else(|| event.first_timestamp.as_ref().map(|t| t.0))
        .or_else(|| event.metadata.creation_timestamp.as_ref().map(|t| t.0));

    EventRecord {
        event_type: event.type_.clone().unwrap_or_else(|| "Normal".to_string()),
        reason: event.reason.clone().unwrap_or_default(),
        message: event
            .message
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_string(),
        involved_kind: involved.kind.clone().unwrap_or_default(),
        involved_name: involved.name.clone().unwrap_or_default(),
        namespace: involved
            .namespace
            .clone()
            .or_else(|| event.metadata.namespace.clone())
            .filter(|ns| !ns.is_empty()),
        count: event.count.unwrap_or(1),
        last_seen,
    }
}

/// Decode an event list, newest first, keeping at most `limit` records
pub fn extract_events(json: &[u8], limit: usize) -> Result<Extracted<EventRecord>> {
    let mut extracted = decode_many::<Event>(json)?.map(|e| event_record(&e));
    sort_newest_first(&mut extracted.items);
    extracted.items.truncate(limit);
    Ok(extracted)
}

/// Undated events sort last
pub fn sort_newest_first(events: &mut [EventRecord]) {
    events.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
}

/// Keep only events about one object
pub fn events_for<'a>(
    events: &'a [EventRecord],
    kind: &'a str,
    name: &'a str,
) -> impl Iterator<Item = &'a EventRecord> + 'a {
    events
        .iter()
        .filter(move |e| e.involved_kind.eq_ignore_ascii_case(kind) && e.involved_name == name)
}

const ERROR_MARKERS: &[&str] = &["error", "fatal", "panic", "exception"];

/// Classify one log line by keyword
pub fn classify_log_line(line: &str) -> LogLevel {
    let lower = line.to_lowercase();
    if ERROR_MARKERS.iter().any(|m| lower.contains(m)) {
        LogLevel::Error
    } else if lower.contains("warn") {
        LogLevel::Warning
    } else {
        LogLevel::Info
    }
}

/// Classify every non-blank line of a log dump
pub fn analyze_logs(logs: &str) -> Vec<LogLine> {
    logs.lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .map(|line| LogLine {
            level: classify_log_line(line),
            line: line.to_string(),
        })
        .collect()
}
