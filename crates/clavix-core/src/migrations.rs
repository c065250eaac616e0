//! Schema upgraders for the implementation ledger.
//!
//! Ledgers are migrated as raw JSON before typed deserialization. Each
//! upgrader lifts a document from exactly one version to the next; they run
//! in order until [`LEDGER_VERSION`] is reached. New schema changes append an
//! upgrader here and bump the constant.

use serde_json::{Map, Value};

pub const LEDGER_VERSION: u32 = 2;

/// Ledgers written before completion tracking carry no version field.
const UNVERSIONED: u32 = 1;

pub struct Upgrader {
    pub from: u32,
    pub description: &'static str,
    pub apply: fn(&mut Map<String, Value>),
}

pub fn ledger_upgraders() -> &'static [Upgrader] {
    &[Upgrader {
        from: 1,
        description: "add completion tracking containers",
        apply: add_tracking_containers,
    }]
}

/// v1 -> v2: default the tracking containers, leaving every other field alone.
fn add_tracking_containers(obj: &mut Map<String, Value>) {
    obj.entry("completedTaskIds")
        .or_insert_with(|| Value::Array(Vec::new()));
    obj.entry("completionTimestamps")
        .or_insert_with(|| Value::Object(Map::new()));
    obj.entry("blockedTasks")
        .or_insert_with(|| Value::Array(Vec::new()));
}

pub fn ledger_version(doc: &Value) -> u32 {
    doc.get("version")
        .and_then(Value::as_u64)
        .map(|v| v as u32)
        .unwrap_or(UNVERSIONED)
}

/// Upgrade `doc` in place to [`LEDGER_VERSION`]. Returns the version it was
/// found at. Documents that are not JSON objects are left untouched.
pub fn migrate_ledger(doc: &mut Value) -> u32 {
    let found = ledger_version(doc);
    let Some(obj) = doc.as_object_mut() else {
        return found;
    };

    let mut version = found;
    for upgrader in ledger_upgraders() {
        if upgrader.from != version {
            continue;
        }
        tracing::debug!(
            from = upgrader.from,
            to = upgrader.from + 1,
            "migrating ledger: {}",
            upgrader.description
        );
        (upgrader.apply)(obj);
        version = upgrader.from + 1;
    }
    if version != found {
        obj.insert("version".to_string(), Value::from(version));
    }
    found
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
