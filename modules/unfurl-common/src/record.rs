//! Canonical post record plus normalization from the two ingest schemas.
//!
//! Source records arrive either in the Twitter Streaming-API "native" shape
//! (`text` / `created_at` / `entities`) or in the Gnip Activity Streams
//! shape (`body` / `postedTime` / `twitter_entities`). Both normalize into
//! a single `PostRecord`; anything else is rejected as malformed.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::error::UnfurlError;

/// Trailing numeric ID in an Activity Streams tag URI,
/// e.g. `tag:search.twitter.com,2005:250075927172759552`.
static TAG_URI_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r":([0-9]+)$").unwrap());

/// Native timestamps look like `Wed May 23 06:01:13 +0000 2007`.
const NATIVE_TIME_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// One normalized social-media post.
#[derive(Debug, Clone, Serialize)]
pub struct PostRecord {
    pub id: String,
    pub author: Option<String>,
    pub body: String,
    pub posted_at: Option<DateTime<Utc>>,
    /// Short-URL candidates embedded in the post, in entity order.
    pub urls: Vec<String>,
}

impl PostRecord {
    /// Normalize a parsed JSON record from either schema.
    pub fn from_json(value: &Value) -> Result<Self, UnfurlError> {
        if value.get("text").is_some() {
            Self::from_native(value)
        } else if value.get("body").is_some() {
            Self::from_activity_streams(value)
        } else {
            Err(UnfurlError::Input(
                "record matches neither native nor activity-streams schema".to_string(),
            ))
        }
    }

    fn from_native(value: &Value) -> Result<Self, UnfurlError> {
        let id = value
            .get("id_str")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| value.get("id").and_then(Value::as_u64).map(|n| n.to_string()))
            .ok_or_else(|| UnfurlError::Input("native record has no id".to_string()))?;

        let posted_at = value
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_str(raw, NATIVE_TIME_FORMAT).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Ok(Self {
            id,
            author: value
                .pointer("/user/screen_name")
                .and_then(Value::as_str)
                .map(str::to_string),
            body: value
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            posted_at,
            urls: extract_entity_urls(value.pointer("/entities/urls")),
        })
    }

    fn from_activity_streams(value: &Value) -> Result<Self, UnfurlError> {
        // Gnip tag URIs embed the numeric tweet ID; some dumps carry a bare
        // `_id` or `id_str` instead.
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .and_then(|tag| TAG_URI_ID_RE.captures(tag))
            .map(|c| c[1].to_string())
            .or_else(|| {
                value
                    .get("id_str")
                    .or_else(|| value.get("_id"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .ok_or_else(|| UnfurlError::Input("activity-streams record has no id".to_string()))?;

        let posted_at = value
            .get("postedTime")
            .and_then(Value::as_str)
            .and_then(parse_posted_time);

        Ok(Self {
            id,
            author: value
                .pointer("/actor/preferredUsername")
                .and_then(Value::as_str)
                .map(str::to_string),
            body: value
                .get("body")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            posted_at,
            urls: extract_entity_urls(value.pointer("/twitter_entities/urls")),
        })
    }
}

/// Pull URL candidates out of an `entities.urls`-shaped array, preferring
/// `expanded_url` over the t.co wrapper when present.
fn extract_entity_urls(urls: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(entries)) = urls else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            entry
                .get("expanded_url")
                .and_then(Value::as_str)
                .filter(|u| !u.is_empty())
                .or_else(|| {
                    entry
                        .get("url")
                        .and_then(Value::as_str)
                        .filter(|u| !u.is_empty())
                })
                .map(str::to_string)
        })
        .collect()
}

fn parse_posted_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // Some exports drop the zone suffix entirely; treat those as UTC.
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
