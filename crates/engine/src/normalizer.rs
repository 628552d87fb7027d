//! Subscription normalizer — reconciles drifted storage shapes.
//!
//! Subscription rows have been written by several generations of the
//! subscribe endpoint: a structured sub-object under various column names,
//! or flat columns under two naming conventions. Normalization is an ordered
//! list of pure mapping functions tried in sequence; each either produces
//! the canonical endpoint+keys form or declines.

use serde_json::Value;

use barbe_common::types::{PushKeys, PushSubscription};

/// Legacy column names that may hold a structured subscription object
/// (or a JSON-encoded string of one), tried in order.
const NESTED_FIELDS: &[&str] = &["subscription", "subscription_json", "sub", "data"];

/// Result of normalizing one stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// Canonical endpoint + key pair; ready for delivery.
    Usable(PushSubscription),
    /// An endpoint resolved but no key pair did. Not sendable.
    EndpointOnly(String),
    /// Nothing resolvable.
    Unusable,
}

impl Normalized {
    pub fn is_usable(&self) -> bool {
        matches!(self, Normalized::Usable(_))
    }
}

/// Reconstruct a canonical subscription from an arbitrary stored record.
pub fn normalize(record: &Value) -> Normalized {
    let mappers: &[fn(&Value) -> Option<PushSubscription>] = &[from_nested, from_flat];
    for mapper in mappers {
        if let Some(subscription) = mapper(record) {
            return Normalized::Usable(subscription);
        }
    }
    match resolve_endpoint(record) {
        Some(endpoint) => Normalized::EndpointOnly(endpoint),
        None => Normalized::Unusable,
    }
}

/// Mapper 1: structured sub-object under a legacy field name.
fn from_nested(record: &Value) -> Option<PushSubscription> {
    for field in NESTED_FIELDS {
        let Some(raw) = record.get(*field) else {
            continue;
        };
        // Some generations stored the object JSON-encoded in a text column.
        let parsed;
        let nested = match raw {
            Value::String(s) => {
                parsed = serde_json::from_str::<Value>(s).ok()?;
                &parsed
            }
            other => other,
        };
        if let Some(subscription) = canonical_from(nested) {
            return Some(subscription);
        }
    }
    None
}

/// Mapper 2: flat columns on the record itself.
fn from_flat(record: &Value) -> Option<PushSubscription> {
    canonical_from(record)
}

/// Build the canonical form from one object: endpoint plus keys found
/// either under `keys.{p256dh,auth}`, flat `{p256dh,auth}`, or the
/// column convention `{keys_p256dh,keys_auth}`.
fn canonical_from(obj: &Value) -> Option<PushSubscription> {
    let endpoint = str_field(obj, "endpoint")?;
    let keys = obj.get("keys");
    let p256dh = keys
        .and_then(|k| str_field(k, "p256dh"))
        .or_else(|| str_field(obj, "p256dh"))
        .or_else(|| str_field(obj, "keys_p256dh"))?;
    let auth = keys
        .and_then(|k| str_field(k, "auth"))
        .or_else(|| str_field(obj, "auth"))
        .or_else(|| str_field(obj, "keys_auth"))?;
    Some(PushSubscription {
        endpoint,
        keys: PushKeys { p256dh, auth },
    })
}

fn resolve_endpoint(record: &Value) -> Option<String> {
    if let Some(endpoint) = str_field(record, "endpoint") {
        return Some(endpoint);
    }
    for field in NESTED_FIELDS {
        if let Some(endpoint) = record.get(*field).and_then(|n| str_field(n, "endpoint")) {
            return Some(endpoint);
        }
    }
    None
}

fn str_field(obj: &Value, field: &str) -> Option<String> {
    obj.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
