//! `SkillContext`: the authoritative map of which skills are resident,
//! which tools they dispatch to, and when each should be evicted.
//!
//! This is the component the specification calls "the heart" of the
//! kernel — every `execute_tool` call passes through `get_command`, and
//! every load goes through `ensure_loaded`. Reads never block behind a
//! write lock held across I/O: `get_command`/`touch` are synchronous
//! `DashMap` operations, while `ensure_loaded`'s actual load work happens
//! outside any lock and is deduplicated per-skill so concurrent callers
//! share one in-flight load.

use dashmap::DashMap;
use skill_reactor::{Reactor, Topic};
use skill_types::{LoadState, SecurityDecision, ToolRecord};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

/// A skill currently resident in the context.
#[derive(Debug, Clone)]
pub struct LoadedSkill {
    /// Skill name.
    pub name: String,
    /// Root directory on disk.
    pub root: PathBuf,
    /// Current lifecycle state (always `Loaded` or `Unloaded` here).
    pub state: LoadState,
    /// Whether a `file.changed` event has invalidated this entry since
    /// it was loaded; the next `get_command` call triggers a reload.
    pub stale: bool,
    /// Monotonic sequence number assigned when this skill last
    /// transitioned into `Loaded`, used to reconstruct load order for an
    /// orderly shutdown.
    pub load_seq: u64,
}

/// Tunables for `SkillContext`.
#[derive(Debug, Clone)]
pub struct SkillContextConfig {
    /// Maximum number of skills resident at once before LRU eviction
    /// kicks in.
    pub max_loaded: usize,
    /// A loaded-but-untouched skill older than this is evicted by the
    /// TTL sweep.
    pub ttl: Duration,
    /// How often the TTL sweep runs.
    pub ttl_check_interval: Duration,
}

impl Default for SkillContextConfig {
    fn default() -> Self {
        Self {
            max_loaded: 64,
            ttl: Duration::from_secs(30 * 60),
            ttl_check_interval: Duration::from_secs(30),
        }
    }
}

/// A loader callback: given a skill name and root, scans it and returns
/// its `ToolRecord`s plus a security decision. Kept generic over the
/// caller's actual scan/gate wiring so this crate doesn't have to depend
/// on `skill-scanner`'s concrete scan entry point.
pub type LoaderFn = Arc<
    dyn Fn(&str, &std::path::Path) -> Result<(Vec<ToolRecord>, SecurityDecision), String>
        + Send
        + Sync,
>;

/// The loaded-skill map and dispatch table.
pub struct SkillContext {
    loaded: DashMap<String, LoadedSkill>,
    dispatch: DashMap<String, ToolRecord>,
    lru_timestamps: DashMap<String, Instant>,
    pinned: Mutex<HashSet<String>>,
    blocked: DashMap<String, String>,
    in_flight: DashMap<String, Arc<AsyncMutex<()>>>,
    roots: DashMap<String, PathBuf>,
    config: SkillContextConfig,
    reactor: Reactor,
    loader: LoaderFn,
    next_load_seq: AtomicU64,
}

/// Error returned when a skill cannot be made resident.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadedSkillError {
    /// The Security Gate blocked this skill; sticky, so this message is
    /// replayed without re-scanning.
    #[error("skill '{0}' is blocked by the security gate: {1}")]
    Blocked(String, String),
    /// Scanning or loading the skill itself failed.
    #[error("failed to load skill '{0}': {1}")]
    LoadFailed(String, String),
    /// The caller tried to unload a pinned skill.
    #[error("skill '{0}' is pinned and cannot be unloaded")]
    Pinned(String),
    /// No such tool is registered.
    #[error("no tool named '{0}'")]
    NotFound(String),
}

impl SkillContext {
    /// Creates a new, empty context. `loader` is responsible for both
    /// scanning the skill and running it through the Security Gate,
    /// returning the gate's decision alongside the discovered tools.
    pub fn new(config: SkillContextConfig, reactor: Reactor, loader: LoaderFn) -> Self {
        Self {
            loaded: DashMap::new(),
            dispatch: DashMap::new(),
            lru_timestamps: DashMap::new(),
            pinned: Mutex::new(HashSet::new()),
            blocked: DashMap::new(),
            in_flight: DashMap::new(),
            roots: DashMap::new(),
            config,
            reactor,
            loader,
            next_load_seq: AtomicU64::new(0),
        }
    }

    /// Marks `skill_name` as pinned: never evicted by LRU or TTL, and
    /// `unload` refuses it until unpinned.
    pub fn pin(&self, skill_name: &str) {
        self.pinned.lock().unwrap().insert(skill_name.to_string());
    }

    /// Removes the pin on `skill_name`.
    pub fn unpin(&self, skill_name: &str) {
        self.pinned.lock().unwrap().remove(skill_name);
    }

    fn is_pinned(&self, skill_name: &str) -> bool {
        self.pinned.lock().unwrap().contains(skill_name)
    }

    /// Seeds the sticky blocked cache for `skill_name` without going
    /// through `ensure_loaded`. Used by the Kernel's boot scan so a skill
    /// the Security Gate blocks never appears in a catalog snapshot, even
    /// before anything has tried to load it.
    pub fn mark_blocked(&self, skill_name: &str, reason: String) {
        self.blocked.insert(skill_name.to_string(), reason);
    }

    /// Whether the Security Gate has stuck a `Block` decision on
    /// `skill_name`. The Transport Adapter consults this to keep a
    /// blocked skill's tools out of `tools/list` even if the Indexer
    /// still carries stale records for it.
    pub fn is_blocked(&self, skill_name: &str) -> bool {
        self.blocked.contains_key(skill_name)
    }

    /// Synchronous, lock-free lookup of a tool's dispatch record. Also
    /// touches the LRU clock for the owning skill. Never suspends.
    pub fn get_command(&self, fq_name: &str) -> Option<ToolRecord> {
        let record = self.dispatch.get(fq_name).map(|r| r.clone());
        if record.is_some() {
            self.touch(fq_name.split('.').next().unwrap_or(fq_name));
        }
        record
    }

    /// Refreshes the LRU clock for `skill_name` without otherwise
    /// touching the loaded-skill map.
    pub fn touch(&self, skill_name: &str) {
        self.lru_timestamps.insert(skill_name.to_string(), Instant::now());
    }

    /// Ensures `skill_name` is resident, loading it (and running it
    /// through the Security Gate) on first use. Concurrent calls for the
    /// same skill serialize on a per-skill load lock rather than racing
    /// the loader; the one that wins does the work, the rest block on
    /// the same `Mutex` and then re-check the cache once it's their
    /// turn. A prior `Block` decision is sticky and short-circuits
    /// without rescanning.
    pub async fn ensure_loaded(&self, skill_name: &str, root: &std::path::Path) -> Result<(), LoadedSkillError> {
        if let Some(cached) = self.cached_result(skill_name) {
            return cached;
        }

        let lock = self
            .in_flight
            .entry(skill_name.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Another caller may have completed the load (or hit the block
        // decision) while we were waiting on the lock.
        if let Some(cached) = self.cached_result(skill_name) {
            return cached;
        }

        let result = (self.loader)(skill_name, root);
        self.roots.insert(skill_name.to_string(), root.to_path_buf());

        match result {
            Ok((records, SecurityDecision::Block)) => {
                let reason = format!("{} tool(s) found, security gate returned Block", records.len());
                self.blocked.insert(skill_name.to_string(), reason.clone());
                Err(LoadedSkillError::Blocked(skill_name.to_string(), reason))
            }
            Ok((records, decision)) => {
                for record in &records {
                    self.dispatch.insert(record.fq_name.clone(), record.clone());
                }
                self.loaded.insert(
                    skill_name.to_string(),
                    LoadedSkill {
                        name: skill_name.to_string(),
                        root: root.to_path_buf(),
                        state: LoadState::Loaded,
                        stale: false,
                        load_seq: self.next_load_seq.fetch_add(1, Ordering::SeqCst),
                    },
                );
                self.touch(skill_name);
                info!(skill = skill_name, decision = ?decision, tools = records.len(), "skill loaded");
                self.reactor
                    .publish(
                        Topic::SkillLoaded,
                        serde_json::json!({"skill": skill_name, "decision": format!("{decision:?}")}),
                        None,
                    )
                    .await;
                self.enforce_memory_limit().await;
                Ok(())
            }
            Err(e) => Err(LoadedSkillError::LoadFailed(skill_name.to_string(), e)),
        }
    }

    /// Returns `Some` if `skill_name`'s residency is already settled
    /// (blocked, or loaded and fresh), without touching the load lock.
    fn cached_result(&self, skill_name: &str) -> Option<Result<(), LoadedSkillError>> {
        if let Some(reason) = self.blocked.get(skill_name) {
            return Some(Err(LoadedSkillError::Blocked(skill_name.to_string(), reason.clone())));
        }
        match self.loaded.get(skill_name) {
            Some(entry) if !entry.stale => {
                drop(entry);
                self.touch(skill_name);
                Some(Ok(()))
            }
            _ => None,
        }
    }

    /// Evicts `skill_name`, refusing if it is pinned.
    pub async fn unload(&self, skill_name: &str) -> Result<(), LoadedSkillError> {
        if self.is_pinned(skill_name) {
            return Err(LoadedSkillError::Pinned(skill_name.to_string()));
        }
        if self.loaded.remove(skill_name).is_some() {
            self.dispatch.retain(|fq, _| !fq.starts_with(&format!("{skill_name}.")));
            self.lru_timestamps.remove(skill_name);
            self.reactor
                .publish(Topic::SkillUnloaded, serde_json::json!({"skill": skill_name}), None)
                .await;
        }
        Ok(())
    }

    /// Marks `skill_name` stale after a `file.changed` event; the next
    /// `ensure_loaded`/`get_command` for it triggers a reload rather than
    /// serving cached tool records.
    pub fn mark_stale(&self, skill_name: &str) {
        if let Some(mut entry) = self.loaded.get_mut(skill_name) {
            entry.stale = true;
        }
    }

    /// Evicts least-recently-touched, non-pinned skills until the
    /// non-pinned resident count is at or below `max_loaded`. Pinned
    /// skills count toward neither the trigger nor the eviction budget:
    /// the limit applies to `|loaded \ pinned|`, not `|loaded|`.
    pub async fn enforce_memory_limit(&self) {
        let pinned = self.pinned.lock().unwrap().clone();
        let mut by_age: Vec<(String, Instant)> = self
            .lru_timestamps
            .iter()
            .filter(|e| !pinned.contains(e.key()))
            .map(|e| (e.key().clone(), *e.value()))
            .collect();

        if by_age.len() <= self.config.max_loaded {
            return;
        }
        by_age.sort_by_key(|(_, t)| *t);

        let mut to_evict = by_age.len() - self.config.max_loaded;
        for (name, _) in by_age {
            if to_evict == 0 {
                break;
            }
            if self.unload(&name).await.is_ok() {
                to_evict -= 1;
            }
        }
    }

    /// Evicts skills whose last touch is older than `config.ttl`,
    /// skipping pinned skills. Intended to run on `config.ttl_check_interval`.
    pub async fn ttl_sweep(&self) {
        let now = Instant::now();
        let stale: Vec<String> = self
            .lru_timestamps
            .iter()
            .filter(|e| now.duration_since(*e.value()) >= self.config.ttl)
            .map(|e| e.key().clone())
            .collect();

        for name in stale {
            if self.is_pinned(&name) {
                continue;
            }
            if self.unload(&name).await.is_ok() {
                warn!(skill = %name, "evicted by ttl sweep");
            }
        }
    }

    /// Number of skills currently resident.
    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    /// Resident skill names paired with their load sequence number,
    /// sorted newest-first. Used by the Kernel to unload all skills in
    /// reverse load order on shutdown.
    pub fn resident_by_reverse_load_order(&self) -> Vec<String> {
        let mut entries: Vec<(String, u64)> = self
            .loaded
            .iter()
            .map(|e| (e.key().clone(), e.value().load_seq))
            .collect();
        entries.sort_by_key(|(_, seq)| std::cmp::Reverse(*seq));
        entries.into_iter().map(|(name, _)| name).collect()
    }
}
