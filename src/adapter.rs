//! Shared plumbing for the provider adapters.

use chrono::{NaiveDate, NaiveTime};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::error::{FetchError, NormalizeError};
use crate::model::{CanonicalMatch, CanonicalPlayer, CanonicalTeam, Provider};

/// One upstream provider, seen through the canonical record shapes.
///
/// Adapters never read persisted state. Per-item normalization failures are
/// logged and the item dropped; only fetch failures reach the caller.
pub trait SourceAdapter {
    fn provider(&self) -> Provider;

    /// The provider's identifier for the tracked club, when it has one.
    fn tracked_team_id(&self) -> Option<&str> {
        None
    }

    fn fetch_recent_matches(&mut self, limit: usize) -> Result<Vec<CanonicalMatch>, FetchError>;

    fn fetch_upcoming_matches(&mut self, limit: usize) -> Result<Vec<CanonicalMatch>, FetchError>;

    fn fetch_squad(&mut self) -> Result<Vec<CanonicalPlayer>, FetchError>;

    fn fetch_team_info(&mut self) -> Result<Option<CanonicalTeam>, FetchError>;
}

impl<A: SourceAdapter + ?Sized> SourceAdapter for Box<A> {
    fn provider(&self) -> Provider {
        (**self).provider()
    }

    fn tracked_team_id(&self) -> Option<&str> {
        (**self).tracked_team_id()
    }

    fn fetch_recent_matches(&mut self, limit: usize) -> Result<Vec<CanonicalMatch>, FetchError> {
        (**self).fetch_recent_matches(limit)
    }

    fn fetch_upcoming_matches(&mut self, limit: usize) -> Result<Vec<CanonicalMatch>, FetchError> {
        (**self).fetch_upcoming_matches(limit)
    }

    fn fetch_squad(&mut self) -> Result<Vec<CanonicalPlayer>, FetchError> {
        (**self).fetch_squad()
    }

    fn fetch_team_info(&mut self) -> Result<Option<CanonicalTeam>, FetchError> {
        (**self).fetch_team_info()
    }
}

/// Decodes every element of `items` into the provider's raw schema `R` and
/// maps it through `normalize`. Failures are logged with the item's
/// identifier and skipped.
pub fn normalize_batch<R, T, F>(
    provider: Provider,
    entity: &'static str,
    items: &[Value],
    mut normalize: F,
) -> Vec<T>
where
    R: DeserializeOwned,
    F: FnMut(&R) -> Result<T, NormalizeError>,
{
    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let result = serde_json::from_value::<R>(item.clone())
            .map_err(|err| NormalizeError::Malformed(err.to_string()))
            .and_then(|raw| normalize(&raw));
        match result {
            Ok(record) => out.push(record),
            Err(err) => {
                warn!(
                    provider = %provider,
                    entity,
                    index,
                    key = %item_key(item),
                    error = %err,
                    "dropping record that failed normalization"
                );
            }
        }
    }
    out
}

/// Array under `key`, or nothing. Providers send `null` for empty lists.
pub fn array_at<'a>(root: &'a Value, key: &str) -> &'a [Value] {
    root.get(key)
        .and_then(|v| v.as_array())
        .map(|v| v.as_slice())
        .unwrap_or_default()
}

fn item_key(item: &Value) -> String {
    for key in ["id", "idEvent", "idPlayer", "idTeam"] {
        match item.get(key) {
            Some(Value::String(s)) => return s.clone(),
            Some(Value::Number(n)) => return n.to_string(),
            _ => {}
        }
    }
    "?".to_string()
}

pub(crate) fn required<'a>(
    field: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str, NormalizeError> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(NormalizeError::MissingField(field))
}

/// Accepts `YYYY-MM-DD` and anything that starts with it (ISO timestamps).
pub(crate) fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, NormalizeError> {
    let trimmed = raw.trim();
    let head = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").map_err(|_| NormalizeError::InvalidValue {
        field,
        value: trimmed.to_string(),
    })
}

pub(crate) fn parse_date_opt(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(|s| parse_date("date", s).ok())
}

/// `14:00:00`, `14:00`, optionally followed by `Z` or a UTC offset.
pub(crate) fn parse_time(raw: &str) -> Option<NaiveTime> {
    let trimmed = raw.trim().trim_end_matches('Z');
    let clock = trimmed
        .split(['+', ' '])
        .next()
        .unwrap_or_default()
        .trim();
    NaiveTime::parse_from_str(clock, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(clock, "%H:%M"))
        .ok()
}

pub(crate) fn parse_u32(raw: Option<&str>) -> Option<u32> {
    raw?.trim().parse::<u32>().ok()
}

pub(crate) fn parse_f64(raw: Option<&str>) -> Option<f64> {
    raw?.trim().trim_end_matches('%').parse::<f64>().ok()
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Serde helpers for providers that mix strings, numbers and nulls.
pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Any scalar as trimmed text; `null`, `""` and containers become `None`.
    pub fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        })
    }
}
