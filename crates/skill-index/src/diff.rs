//! `ToolRecord` diffing and MVCC snapshot publication.
//!
//! Grounded on the teacher's `IndexManager::plan_sync`: both compare a
//! previously known set against a freshly discovered one by content hash
//! in a single `HashMap` pass, producing added/updated/removed/skipped
//! buckets in O(N+M).

use serde::{Deserialize, Serialize};
use skill_types::ToolRecord;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// The outcome of diffing a desired `ToolRecord` set against the
/// currently known one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncPlan {
    /// Tools present in `desired` but not `current`.
    pub added: Vec<ToolRecord>,
    /// Tools present in both, but with a changed `content_hash`.
    pub updated: Vec<ToolRecord>,
    /// Tools present in `current` but not `desired`.
    pub removed: Vec<String>,
    /// Tools present in both with an unchanged `content_hash` — not
    /// touched by `apply_diff`.
    pub skipped: Vec<String>,
}

/// Diffs `current` against `desired`, keyed by `fq_name`, in O(N+M).
pub fn diff(current: &[ToolRecord], desired: &[ToolRecord]) -> SyncPlan {
    let current_by_name: HashMap<&str, &ToolRecord> =
        current.iter().map(|t| (t.fq_name.as_str(), t)).collect();
    let desired_by_name: HashMap<&str, &ToolRecord> =
        desired.iter().map(|t| (t.fq_name.as_str(), t)).collect();

    let mut plan = SyncPlan::default();

    for record in desired {
        match current_by_name.get(record.fq_name.as_str()) {
            None => plan.added.push(record.clone()),
            Some(existing) if existing.content_hash != record.content_hash => {
                plan.updated.push(record.clone())
            }
            Some(_) => plan.skipped.push(record.fq_name.clone()),
        }
    }

    for record in current {
        if !desired_by_name.contains_key(record.fq_name.as_str()) {
            plan.removed.push(record.fq_name.clone());
        }
    }

    plan
}

/// Tool-level summary of one reindex operation, published alongside
/// `Topic::IndexUpdated`. Mirrors the shape of the teacher's
/// `IndexManager::plan_sync` result (added/updated/removed/skipped plus a
/// full-reindex flag), reduced from skill names to tool counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    /// Tools newly present.
    pub added: u64,
    /// Tools whose `content_hash` changed.
    pub updated: u64,
    /// Tools no longer present.
    pub removed: u64,
    /// Set when this sync bypassed a per-skill delta diff: either the
    /// changed-path count crossed `reindex.full_rebuild_threshold`, or a
    /// delta scan failed and a full rescan ran in its place.
    pub fallback: bool,
}

impl SyncResult {
    /// Summarizes `plan`'s bucket sizes, tagging whether it came from a
    /// full-rebuild path rather than an ordinary delta diff.
    pub fn from_plan(plan: &SyncPlan, fallback: bool) -> Self {
        Self {
            added: plan.added.len() as u64,
            updated: plan.updated.len() as u64,
            removed: plan.removed.len() as u64,
            fallback,
        }
    }

    /// Whether this sync changed anything at all.
    pub fn has_changes(&self) -> bool {
        self.added != 0 || self.updated != 0 || self.removed != 0
    }
}

/// A point-in-time, immutable view of the full `ToolRecord` set.
/// `apply_diff` publishes a new snapshot by swapping the `Arc` pointer,
/// so readers holding an old `Arc<IndexSnapshot>` never observe a
/// partially-applied update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexSnapshot {
    records: HashMap<String, ToolRecord>,
}

impl IndexSnapshot {
    /// Looks up a tool by its fully-qualified name.
    pub fn get(&self, fq_name: &str) -> Option<&ToolRecord> {
        self.records.get(fq_name)
    }

    /// All tool records currently in the snapshot.
    pub fn all(&self) -> impl Iterator<Item = &ToolRecord> {
        self.records.values()
    }

    fn apply(&mut self, plan: &SyncPlan) {
        for record in plan.added.iter().chain(plan.updated.iter()) {
            self.records.insert(record.fq_name.clone(), record.clone());
        }
        for name in &plan.removed {
            self.records.remove(name);
        }
    }
}

/// Applies `plan` to the snapshot behind `current`, publishing the
/// result atomically.
pub fn apply_diff(current: &RwLock<Arc<IndexSnapshot>>, plan: &SyncPlan) {
    let mut next = (**current.read().unwrap()).clone();
    next.apply(plan);
    *current.write().unwrap() = Arc::new(next);
}

/// Persists a snapshot to `path` as JSON.
pub fn persist(snapshot: &IndexSnapshot, path: &Path) -> std::io::Result<()> {
    let json = serde_json::to_vec_pretty(snapshot)?;
    std::fs::write(path, json)
}

/// Loads a snapshot previously written by [`persist`]. Returns an empty
/// snapshot if the file does not exist yet (first boot).
pub fn load(path: &Path) -> std::io::Result<IndexSnapshot> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(IndexSnapshot::default()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fq_name: &str, hash: &str) -> ToolRecord {
        ToolRecord {
            fq_name: fq_name.to_string(),
            skill_name: fq_name.split('.').next().unwrap().to_string(),
            name: fq_name.split('.').nth(1).unwrap().to_string(),
            description: String::new(),
            parameters: vec![],
            keywords: vec![],
            category: None,
            aliases: vec![],
            entry_point: "tools.py".into(),
            content_hash: hash.to_string(),
            variants: vec![],
        }
    }

    #[test]
    fn diff_classifies_added_updated_removed_skipped() {
        let current = vec![record("a.x", "h1"), record("a.y", "h1"), record("a.z", "h1")];
        let desired = vec![
            record("a.x", "h1"),      // skipped
            record("a.y", "h2"),      // updated
            record("a.w", "h1"),      // added
        ];
        let plan = diff(&current, &desired);
        assert_eq!(plan.skipped, vec!["a.x".to_string()]);
        assert_eq!(plan.updated.len(), 1);
        assert_eq!(plan.updated[0].fq_name, "a.y");
        assert_eq!(plan.added.len(), 1);
        assert_eq!(plan.removed, vec!["a.z".to_string()]);
    }

    #[test]
    fn apply_diff_is_atomic_swap() {
        let snapshot = Arc::new(IndexSnapshot::default());
        let lock = RwLock::new(snapshot);
        let plan = SyncPlan {
            added: vec![record("a.x", "h1")],
            ..Default::default()
        };
        apply_diff(&lock, &plan);
        let snap = lock.read().unwrap().clone();
        assert!(snap.get("a.x").is_some());
    }

    #[test]
    fn persist_and_load_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("index.json");
        let mut snapshot = IndexSnapshot::default();
        snapshot.apply(&SyncPlan {
            added: vec![record("a.x", "h1")],
            ..Default::default()
        });
        persist(&snapshot, &path).unwrap();
        let loaded = load(&path).unwrap();
        assert!(loaded.get("a.x").is_some());
    }

    #[test]
    fn load_missing_file_returns_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let loaded = load(&tmp.path().join("missing.json")).unwrap();
        assert_eq!(loaded.all().count(), 0);
    }
}
