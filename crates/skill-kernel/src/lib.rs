//! The Kernel: composition root wiring the Scanner, Security Gate,
//! SkillContext, Executor, Indexer, Watcher, Reactor, Sniffer and
//! Persistence Service into one running instance, and the single
//! `execute_tool(name, arguments)` entry point a Transport Adapter or CLI
//! command dispatches through.
//!
//! Boot sequence (`start`): scan each configured skill root, assess it
//! through the Security Gate, register core preload skills, build the
//! initial indexer snapshot, start the Watcher and Reactor-driven reindex
//! loop, open the Persistence Service, and register sniffer rules
//! discovered during the scan. Shutdown (`stop`): drain the Reactor, stop
//! the Persistence Service (flushing its queue), stop the Watcher, and
//! unload all resident skills in reverse load order.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod registry;

pub use config::KernelConfig;
pub use error::StartupError;
pub use registry::{RegisteredSkill, SkillRegistry};

use serde_json::Value;
use skill_context::{LoadedSkillError, LoaderFn, SkillContext, SkillContextConfig};
use skill_executor::{Executor, ExecutorConfig};
use skill_index::{apply_diff, diff, BM25Config, BM25Index, IndexSnapshot, RelationshipGraph};
use skill_mcp::{FilterLookupFn, McpServer, McpServerConfig, RootLookupFn};
use skill_persistence::{PersistenceConfig, PersistenceService, SqliteCheckpointStore};
use skill_reactor::{BackpressurePolicy, Reactor, Topic};
use skill_router::{rank, Candidate, RouterConfig};
use skill_security::SecurityGate;
use skill_sniffer::Sniffer;
use skill_types::{SecurityDecision, ToolRecord, ToolResponse};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

struct Tasks {
    watcher: Option<JoinHandle<()>>,
    reindex: Option<JoinHandle<()>>,
    persistence: Option<PersistenceService>,
}

struct Inner {
    config: KernelConfig,
    reactor: Reactor,
    context: Arc<SkillContext>,
    executor: Arc<Executor>,
    index: Arc<RwLock<Arc<IndexSnapshot>>>,
    registry: Arc<SkillRegistry>,
    security_gate: Arc<SecurityGate>,
    sniffer: std::sync::RwLock<Sniffer>,
    tasks: std::sync::Mutex<Tasks>,
}

/// The running kernel. Cheap to clone: every field behind `Inner` is an
/// `Arc`, a lock, or an otherwise-cloneable handle.
#[derive(Clone)]
pub struct Kernel(Arc<Inner>);

/// One skill's outcome from a root scan: how many tools it declared and
/// the Security Gate's verdict.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// The skill's name.
    pub skill_name: String,
    /// Number of tools discovered in the skill.
    pub tool_count: usize,
    /// The Security Gate's verdict.
    pub decision: SecurityDecision,
}

struct ScanOutcome {
    results: Vec<ScanResult>,
    desired_tools: Vec<ToolRecord>,
    sniffer_inputs: Vec<(String, Vec<skill_scanner::DeclaredSnifferRule>)>,
}

impl Kernel {
    /// Builds a kernel from a loaded configuration. Does not scan,
    /// preload, or start any background task — call [`Kernel::start`] for
    /// that.
    pub fn new(config: KernelConfig) -> Self {
        let reactor = Reactor::new(256, BackpressurePolicy::Block);
        let registry = Arc::new(SkillRegistry::new());
        let security_gate = Arc::new(SecurityGate::configured(
            config.security.block_threshold,
            config.security.warn_threshold,
            config.security.trusted_sources.clone(),
        ));

        let loader: LoaderFn = {
            let registry = registry.clone();
            let security_gate = security_gate.clone();
            let default_filter_commands = config.skills.filter_commands.clone();
            Arc::new(
                move |name: &str, root: &Path| -> Result<(Vec<ToolRecord>, SecurityDecision), String> {
                    let discovered = skill_scanner::scan_directory(root).map_err(|e| e.to_string())?;
                    let manifest = registry::load_manifest(&discovered, &default_filter_commands);
                    let manifest_json = serde_json::to_value(&manifest).map_err(|e| e.to_string())?;
                    let decision = security_gate.assess(root, &manifest_json, None);
                    registry.insert(name, root.to_path_buf(), manifest);
                    Ok((discovered.tools, decision))
                },
            )
        };

        let context = Arc::new(SkillContext::new(
            SkillContextConfig {
                max_loaded: config.skills.max_loaded,
                ttl: Duration::from_secs(config.skills.ttl_timeout_seconds),
                ttl_check_interval: Duration::from_secs(config.skills.ttl_check_interval_seconds),
            },
            reactor.clone(),
            loader,
        ));

        let aliases: HashMap<String, String> = config
            .skills
            .overrides
            .iter()
            .filter_map(|(fq_name, ov)| ov.alias.clone().map(|alias| (alias, fq_name.clone())))
            .collect();
        let executor = Arc::new(Executor::new(ExecutorConfig::default(), aliases));

        let index = Arc::new(RwLock::new(Arc::new(
            skill_index::diff::load(&config.index_path).unwrap_or_default(),
        )));

        Self(Arc::new(Inner {
            config,
            reactor,
            context,
            executor,
            index,
            registry,
            security_gate,
            sniffer: std::sync::RwLock::new(Sniffer::new()),
            tasks: std::sync::Mutex::new(Tasks {
                watcher: None,
                reindex: None,
                persistence: None,
            }),
        }))
    }

    /// Walks every configured skill root, assesses each through the
    /// Security Gate, and registers findings in the skill registry —
    /// without touching the index snapshot, the sniffer, or any
    /// background task. Shared by [`Kernel::start`] (which additionally
    /// builds the index and starts background tasks) and [`Kernel::scan`]
    /// (a one-shot report for `skill scan`).
    fn scan_roots(&self) -> Result<ScanOutcome, StartupError> {
        let inner = &self.0;
        let skills_dir = inner.config.skills_dir.clone();
        let roots = registry::skill_roots(&skills_dir)
            .map_err(|e| StartupError::Other(format!("failed to enumerate skills dir: {e}")))?;

        let mut results = Vec::new();
        let mut desired_tools = Vec::new();
        let mut sniffer_inputs: Vec<(String, Vec<skill_scanner::DeclaredSnifferRule>)> = Vec::new();

        for root in roots {
            let discovered = match skill_scanner::scan_directory(&root) {
                Ok(d) => d,
                Err(e) => {
                    warn!(root = %root.display(), error = %e, "skipping unscannable skill directory");
                    continue;
                }
            };
            let manifest = registry::load_manifest(&discovered, &inner.config.skills.filter_commands);
            let manifest_json = serde_json::to_value(&manifest)
                .map_err(|e| StartupError::Other(format!("failed to serialize manifest: {e}")))?;
            let decision = inner.security_gate.assess(&root, &manifest_json, None);

            inner.registry.insert(&discovered.name, root.clone(), manifest);

            if decision == SecurityDecision::Block {
                let reason = format!("{} tool(s) found, security gate returned Block", discovered.tools.len());
                warn!(skill = %discovered.name, "skill blocked at boot scan");
                inner.context.mark_blocked(&discovered.name, reason);
                results.push(ScanResult {
                    skill_name: discovered.name,
                    tool_count: discovered.tools.len(),
                    decision,
                });
                continue;
            }

            results.push(ScanResult {
                skill_name: discovered.name.clone(),
                tool_count: discovered.tools.len(),
                decision,
            });
            sniffer_inputs.push((discovered.name.clone(), discovered.sniffer_rules.clone()));
            desired_tools.extend(discovered.tools);
        }

        Ok(ScanOutcome { results, desired_tools, sniffer_inputs })
    }

    /// One-shot scan and security report for every configured skill root,
    /// without starting the kernel. Used by `skill scan` and `skill
    /// doctor`.
    pub fn scan(&self) -> anyhow::Result<Vec<ScanResult>> {
        Ok(self.scan_roots()?.results)
    }

    /// Runs the boot sequence: scan, assess, preload, index, persist,
    /// watch. Idempotent only in the sense that calling it twice starts a
    /// second set of background tasks — callers should call it once.
    pub async fn start(&self) -> Result<(), StartupError> {
        let inner = &self.0;
        let skills_dir = inner.config.skills_dir.clone();
        let ScanOutcome { desired_tools, sniffer_inputs, .. } = self.scan_roots()?;

        let current: Vec<ToolRecord> = inner.index.read().unwrap().all().cloned().collect();
        let plan = diff(&current, &desired_tools);
        apply_diff(&inner.index, &plan);
        if let Some(parent) = inner.config.index_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let snapshot = inner.index.read().unwrap().clone();
        if let Err(e) = skill_index::diff::persist(&snapshot, &inner.config.index_path) {
            warn!(error = %e, "failed to persist initial index snapshot");
        }

        {
            let mut sniffer = inner.sniffer.write().unwrap();
            let loaded = sniffer.load_from_index(&sniffer_inputs);
            info!(rules = loaded, "sniffer rules registered from boot scan");
        }

        let mut preload_names = inner.config.skills.preload.clone();
        preload_names.extend(inner.config.skills.cli_extend.iter().cloned());
        for name in preload_names {
            let root = inner
                .registry
                .root_of(&name)
                .ok_or_else(|| StartupError::Config(format!("preloaded skill '{name}' was not found under {}", skills_dir.display())))?;
            inner.context.pin(&name);
            if let Err(e) = inner.context.ensure_loaded(&name, &root).await {
                return match e {
                    LoadedSkillError::Blocked(skill, reason) => Err(StartupError::PinnedSkillBlocked(skill, reason)),
                    other => Err(StartupError::Other(other.to_string())),
                };
            }
        }

        let store = SqliteCheckpointStore::open(&inner.config.persistence_db_path)
            .await
            .map_err(|e| StartupError::Other(format!("failed to open persistence store: {e}")))?;
        store
            .setup()
            .await
            .map_err(|e| StartupError::Other(format!("failed to initialize persistence schema: {e}")))?;
        let persistence = PersistenceService::spawn(Arc::new(store), inner.reactor.clone(), PersistenceConfig::default());

        let watcher = tokio::spawn(skill_watcher::watch(
            skills_dir.clone(),
            inner.reactor.clone(),
            skill_watcher::WatcherConfig::default(),
        ));

        let reindex = tokio::spawn(reindex_loop(self.clone()));

        let mut tasks = inner.tasks.lock().unwrap();
        tasks.persistence = Some(persistence);
        tasks.watcher = Some(watcher);
        tasks.reindex = Some(reindex);

        info!(skills = inner.registry.names().len(), "kernel started");
        Ok(())
    }

    /// Runs the shutdown sequence: stop background tasks, then unload
    /// every resident skill in reverse load order.
    pub async fn stop(&self) {
        let inner = &self.0;
        let (persistence, watcher, reindex) = {
            let mut tasks = inner.tasks.lock().unwrap();
            (tasks.persistence.take(), tasks.watcher.take(), tasks.reindex.take())
        };

        if let Some(reindex) = reindex {
            reindex.abort();
        }
        if let Some(watcher) = watcher {
            watcher.abort();
        }
        // Dropping the service aborts its subscriber/worker tasks after
        // any write already in flight completes.
        drop(persistence);

        for name in inner.context.resident_by_reverse_load_order() {
            inner.context.unpin(&name);
            if let Err(e) = inner.context.unload(&name).await {
                warn!(skill = %name, error = %e, "failed to unload skill during shutdown");
            }
        }

        info!("kernel stopped");
    }

    /// The single dispatch chokepoint: resolves an alias, lazily loads
    /// the owning skill on a dispatch miss, enforces the filter-commands
    /// policy, and invokes the tool.
    pub async fn execute_tool(&self, fq_name: &str, arguments: Value) -> ToolResponse {
        let inner = &self.0;
        let resolved = inner.executor.resolve_alias(fq_name).to_string();

        let record = match inner.context.get_command(&resolved) {
            Some(record) => record,
            None => {
                let skill_name = resolved.split('.').next().unwrap_or(&resolved);
                let Some(root) = inner.registry.root_of(skill_name) else {
                    return ToolResponse::error("NOT_FOUND", format!("no tool named '{resolved}'"));
                };
                if let Err(e) = inner.context.ensure_loaded(skill_name, &root).await {
                    return match e {
                        LoadedSkillError::Blocked(_, reason) => ToolResponse::blocked(reason),
                        other => ToolResponse::error("NOT_FOUND", other.to_string()),
                    };
                }
                match inner.context.get_command(&resolved) {
                    Some(record) => record,
                    None => return ToolResponse::error("NOT_FOUND", format!("no tool named '{resolved}'")),
                }
            }
        };

        let filter_commands = inner.registry.filter_commands_of(&record.skill_name);
        inner.executor.execute(&record, arguments, &filter_commands).await
    }

    /// Builds a Transport Adapter (`McpServer`) sharing this kernel's
    /// context, executor, index and reactor, wired with lookup closures
    /// against the skill registry.
    pub fn mcp_server(&self) -> McpServer {
        let inner = &self.0;
        let registry_for_root = inner.registry.clone();
        let root_of: RootLookupFn = Arc::new(move |name: &str| registry_for_root.root_of(name));
        let registry_for_filter = inner.registry.clone();
        let filter_commands_of: FilterLookupFn = Arc::new(move |name: &str| registry_for_filter.filter_commands_of(name));

        let mut config = McpServerConfig::default();
        config.call_timeout = Duration::from_secs(inner.config.transport.timeout_seconds);

        McpServer::new(
            inner.context.clone(),
            inner.executor.clone(),
            inner.index.clone(),
            inner.reactor.clone(),
            root_of,
            filter_commands_of,
            config,
        )
    }

    /// Dumps the current dispatch snapshot: every indexed tool not
    /// belonging to a blocked skill. Used by `skill list`.
    pub fn list_tools(&self) -> Vec<ToolRecord> {
        let inner = &self.0;
        let snapshot = inner.index.read().unwrap().clone();
        snapshot
            .all()
            .filter(|r| !inner.context.is_blocked(&r.skill_name))
            .cloned()
            .collect()
    }

    /// Every skill with at least one sniffer rule matching `cwd`.
    pub fn sniff(&self, cwd: &Path) -> Vec<String> {
        self.0.sniffer.read().unwrap().sniff(cwd)
    }

    /// Number of skills currently registered from the last scan.
    pub fn registered_skill_count(&self) -> usize {
        self.0.registry.names().len()
    }

    /// Ranks the current tool catalog against a free-text task
    /// description, prepending `core_tools` and clipping to
    /// `skills.dynamic_tools`.
    ///
    /// Retrieval is a single BM25 pass over tool name/description/keywords,
    /// fed as both the semantic and keyword arm of the Router's fusion —
    /// true dense retrieval needs an embedding provider and vector store
    /// wired up as an external backend, which this kernel does not
    /// configure (see DESIGN.md).
    pub fn route(&self, query: &str, core_tools: &[String]) -> Vec<String> {
        let inner = &self.0;
        let router_config = RouterConfig {
            k: inner.config.skills.dynamic_tools,
            ..RouterConfig::default()
        };
        let top_k = router_config.k.max(router_config.retrieval_threshold);

        let mut bm25 = match BM25Index::new(BM25Config::in_memory()) {
            Ok(idx) => idx,
            Err(e) => {
                warn!(error = %e, "failed to build routing index");
                return core_tools.to_vec();
            }
        };

        let snapshot = inner.index.read().unwrap().clone();
        for record in snapshot.all() {
            let full_text = format!("{} {}", record.description, record.keywords.join(" "));
            if let Err(e) = bm25.add_document(&record.fq_name, &record.name, &record.skill_name, &record.description, &full_text) {
                warn!(tool = %record.fq_name, error = %e, "failed to index tool for routing");
            }
        }
        if let Err(e) = bm25.commit() {
            warn!(error = %e, "failed to commit routing index");
            return core_tools.to_vec();
        }

        let hits = match bm25.search(query, top_k) {
            Ok(hits) => hits,
            Err(e) => {
                warn!(query, error = %e, "routing query failed to parse");
                return core_tools.to_vec();
            }
        };

        let max_score = hits.iter().map(|h| h.score).fold(0.0_f32, f32::max).max(f32::EPSILON);
        let candidates: Vec<Candidate> = hits
            .into_iter()
            .map(|h| {
                let normalized = (h.score / max_score).clamp(0.0, 1.0);
                Candidate { fq_name: h.id, semantic_score: normalized, keyword_score: normalized }
            })
            .collect();

        rank(candidates, core_tools, &RelationshipGraph::new(), &router_config)
    }
}

/// Whether a `FileChanged` batch of `changed_paths` paths should be
/// handled by a full rebuild rather than one delta diff per touched
/// skill.
fn crosses_full_rebuild_threshold(changed_paths: usize, threshold: usize) -> bool {
    changed_paths >= threshold
}

/// Strips `skills_dir` off `path`, returning the name of its first
/// remaining path component — the skill that owns the changed file.
fn skill_name_from_path(path: &Path, skills_dir: &Path) -> Option<String> {
    path.strip_prefix(skills_dir)
        .ok()
        .and_then(|rel| rel.components().next())
        .map(|c| c.as_os_str().to_string_lossy().to_string())
}

/// Reacts to `Topic::FileChanged` by rescanning the touched skills,
/// diffing against the current index snapshot, and publishing
/// `Topic::IndexUpdated` when anything changed. Marks affected skills
/// stale in `SkillContext` so their next dispatch reloads rather than
/// serving cached records.
///
/// A batch touching at least `reindex.full_rebuild_threshold` paths is
/// handled by [`reindex_all`] (one full rescan) rather than one
/// [`reindex_skill`] call per touched skill — past that size a single
/// O(all tools) pass beats N small diffs.
async fn reindex_loop(kernel: Kernel) {
    let inner = kernel.0.clone();
    let mut changes = inner.reactor.subscribe(Topic::FileChanged, 5).await;

    while let Some(event) = changes.recv().await {
        let paths = match event.payload["paths"].as_array() {
            Some(paths) => paths,
            None => continue,
        };

        if crosses_full_rebuild_threshold(paths.len(), inner.config.reindex.full_rebuild_threshold) {
            info!(changed_paths = paths.len(), "reindex batch crossed full_rebuild_threshold");
            reindex_all(&kernel, Some(event.id)).await;
            continue;
        }

        let mut touched = std::collections::HashSet::new();
        for path in paths {
            if let Some(path_str) = path.as_str() {
                if let Some(name) = skill_name_from_path(Path::new(path_str), &inner.config.skills_dir) {
                    touched.insert(name);
                }
            }
        }

        for skill_name in touched {
            reindex_skill(&kernel, &skill_name, Some(event.id)).await;
        }
    }
}

async fn reindex_skill(kernel: &Kernel, skill_name: &str, origin_event_id: Option<u64>) {
    let inner = &kernel.0;
    let Some(root) = inner.registry.root_of(skill_name) else {
        return;
    };

    let discovered = match skill_scanner::scan_directory(&root) {
        Ok(d) => d,
        Err(e) => {
            warn!(skill = skill_name, error = %e, "delta reindex scan failed, falling back to full rebuild");
            reindex_all(kernel, origin_event_id).await;
            return;
        }
    };

    let manifest = registry::load_manifest(&discovered, &inner.config.skills.filter_commands);
    let manifest_json = match serde_json::to_value(&manifest) {
        Ok(v) => v,
        Err(_) => return,
    };
    let decision = inner.security_gate.assess(&root, &manifest_json, None);
    inner.registry.insert(skill_name, root.clone(), manifest);

    if decision == SecurityDecision::Block {
        let reason = format!("{} tool(s) found, security gate returned Block", discovered.tools.len());
        warn!(skill = skill_name, "skill blocked on reindex");
        inner.context.mark_blocked(skill_name, reason);
        return;
    }

    let current: Vec<ToolRecord> = inner
        .index
        .read()
        .unwrap()
        .all()
        .filter(|r| r.skill_name == skill_name)
        .cloned()
        .collect();
    let plan = diff(&current, &discovered.tools);
    let result = skill_index::diff::SyncResult::from_plan(&plan, false);
    if !result.has_changes() {
        return;
    }

    apply_diff(&inner.index, &plan);
    inner.context.mark_stale(skill_name);
    info!(
        skill = skill_name,
        added = result.added,
        updated = result.updated,
        removed = result.removed,
        "reindexed skill after file change"
    );

    inner
        .reactor
        .publish(
            Topic::IndexUpdated,
            serde_json::json!({
                "skill": skill_name,
                "added": result.added,
                "updated": result.updated,
                "removed": result.removed,
                "fallback": result.fallback,
            }),
            origin_event_id,
        )
        .await;
}

/// Rescans every configured skill root and republishes the full desired
/// tool set against the current snapshot in one diff, rather than one
/// per touched skill. Used when a change batch crosses
/// `reindex.full_rebuild_threshold`, and as the fallback when a
/// per-skill delta scan fails outright.
async fn reindex_all(kernel: &Kernel, origin_event_id: Option<u64>) {
    let inner = &kernel.0;

    let outcome = match kernel.scan_roots() {
        Ok(o) => o,
        Err(e) => {
            warn!(error = %e, "full reindex scan failed");
            return;
        }
    };

    let current: Vec<ToolRecord> = inner.index.read().unwrap().all().cloned().collect();
    let plan = diff(&current, &outcome.desired_tools);
    let result = skill_index::diff::SyncResult::from_plan(&plan, true);
    if !result.has_changes() {
        return;
    }

    apply_diff(&inner.index, &plan);

    let touched_skills: std::collections::HashSet<&str> = plan
        .added
        .iter()
        .chain(plan.updated.iter())
        .map(|r| r.skill_name.as_str())
        .collect();
    for skill_name in &touched_skills {
        inner.context.mark_stale(skill_name);
    }

    info!(
        added = result.added,
        updated = result.updated,
        removed = result.removed,
        "full index rebuild complete"
    );

    inner
        .reactor
        .publish(
            Topic::IndexUpdated,
            serde_json::json!({
                "added": result.added,
                "updated": result.updated,
                "removed": result.removed,
                "fallback": result.fallback,
            }),
            origin_event_id,
        )
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_skill(dir: &Path, name: &str, tool_fn: &str) {
        let skill_dir = dir.join(name);
        std::fs::create_dir_all(&skill_dir).unwrap();
        std::fs::write(
            skill_dir.join("skill.toml"),
            format!("name = \"{name}\"\nversion = \"1.0.0\"\n"),
        )
        .unwrap();
        std::fs::write(
            skill_dir.join("tools.py"),
            format!(
                "@tool(name=\"{tool_fn}\", description=\"does a thing\")\ndef {tool_fn}():\n    pass\n"
            ),
        )
        .unwrap();
    }

    fn test_config(dir: &Path) -> KernelConfig {
        KernelConfig {
            skills_dir: dir.join("skills"),
            index_path: dir.join("index.json"),
            persistence_db_path: PathBuf::from(":memory:"),
            ..KernelConfig::default()
        }
    }

    #[tokio::test]
    async fn boot_blocks_dangerous_skill_and_excludes_it_from_index() {
        let tmp = tempfile::tempdir().unwrap();
        let skills_dir = tmp.path().join("skills");
        write_skill(&skills_dir, "clean", "do_clean_thing");
        std::fs::create_dir_all(skills_dir.join("dangerous")).unwrap();
        std::fs::write(
            skills_dir.join("dangerous").join("tools.py"),
            "eval('x'); exec('y'); os.system('z')\n@tool(name=\"do_bad_thing\", description=\"d\")\ndef do_bad_thing():\n    pass\n",
        )
        .unwrap();

        let kernel = Kernel::new(test_config(tmp.path()));
        kernel.start().await.unwrap();

        assert!(kernel.0.context.is_blocked("dangerous"), "dangerous skill should be blocked");
        let snapshot = kernel.0.index.read().unwrap().clone();
        assert!(snapshot.get("dangerous.do_bad_thing").is_none());
        assert!(snapshot.all().any(|r| r.fq_name == "clean.do_clean_thing"));

        kernel.stop().await;
    }

    #[tokio::test]
    async fn preloading_a_blocked_skill_fails_with_pinned_skill_blocked() {
        let tmp = tempfile::tempdir().unwrap();
        let skills_dir = tmp.path().join("skills");
        std::fs::create_dir_all(skills_dir.join("dangerous")).unwrap();
        std::fs::write(
            skills_dir.join("dangerous").join("tools.py"),
            "eval('x'); exec('y'); os.system('z')\n@tool(name=\"do_bad_thing\", description=\"d\")\ndef do_bad_thing():\n    pass\n",
        )
        .unwrap();

        let mut config = test_config(tmp.path());
        config.skills.preload = vec!["dangerous".to_string()];
        let kernel = Kernel::new(config);

        let result = kernel.start().await;
        match result {
            Err(StartupError::PinnedSkillBlocked(name, _)) => assert_eq!(name, "dangerous"),
            other => panic!("expected PinnedSkillBlocked, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn execute_tool_lazily_loads_on_dispatch_miss() {
        let tmp = tempfile::tempdir().unwrap();
        let skills_dir = tmp.path().join("skills");
        write_skill(&skills_dir, "clean", "do_clean_thing");

        let kernel = Kernel::new(test_config(tmp.path()));
        kernel.start().await.unwrap();
        assert_eq!(kernel.0.context.loaded_count(), 0, "nothing preloaded yet");

        // The skill has no Python interpreter to actually run in this
        // environment, so the call fails at invocation — but that is only
        // reachable once the lazy load has already registered the tool
        // in the dispatch map, which is what this test is checking.
        let response = kernel.execute_tool("clean.do_clean_thing", serde_json::json!({})).await;
        assert_ne!(response.error_code.as_deref(), Some("NOT_FOUND"));
        assert_eq!(kernel.0.context.loaded_count(), 1);

        kernel.stop().await;
    }

    #[tokio::test]
    async fn route_prepends_core_tools_and_ranks_by_keyword_match() {
        let tmp = tempfile::tempdir().unwrap();
        let skills_dir = tmp.path().join("skills");
        write_skill(&skills_dir, "k8s", "list_pods");
        write_skill(&skills_dir, "memory", "save_note");

        let kernel = Kernel::new(test_config(tmp.path()));
        kernel.start().await.unwrap();

        let core = vec!["memory.save_note".to_string()];
        let ranked = kernel.route("does a thing", &core);

        assert_eq!(ranked[0], "memory.save_note", "core tool is always first");
        assert!(ranked.contains(&"k8s.list_pods".to_string()));

        kernel.stop().await;
    }

    #[tokio::test]
    async fn reindex_skill_picks_up_a_newly_added_tool() {
        let tmp = tempfile::tempdir().unwrap();
        let skills_dir = tmp.path().join("skills");
        write_skill(&skills_dir, "k8s", "list_pods");

        let kernel = Kernel::new(test_config(tmp.path()));
        kernel.start().await.unwrap();

        std::fs::write(
            skills_dir.join("k8s").join("tools.py"),
            "@tool(name=\"list_pods\", description=\"does a thing\")\ndef list_pods():\n    pass\n\n\
             @tool(name=\"get_logs\", description=\"does another thing\")\ndef get_logs():\n    pass\n",
        )
        .unwrap();

        reindex_skill(&kernel, "k8s", None).await;

        let snapshot = kernel.0.index.read().unwrap().clone();
        assert!(snapshot.get("k8s.get_logs").is_some());

        kernel.stop().await;
    }

    #[tokio::test]
    async fn reindex_all_rebuilds_the_whole_snapshot_with_fallback_flagged() {
        let tmp = tempfile::tempdir().unwrap();
        let skills_dir = tmp.path().join("skills");
        write_skill(&skills_dir, "k8s", "list_pods");

        let kernel = Kernel::new(test_config(tmp.path()));
        kernel.start().await.unwrap();

        write_skill(&skills_dir, "memory", "save_note");

        let mut events = kernel.0.reactor.subscribe(Topic::IndexUpdated, 5).await;
        reindex_all(&kernel, None).await;

        let snapshot = kernel.0.index.read().unwrap().clone();
        assert!(snapshot.get("memory.save_note").is_some(), "full rebuild should pick up the new skill");

        let event = events.recv().await.expect("expected an IndexUpdated event");
        assert_eq!(event.payload["fallback"], serde_json::json!(true));
        assert_eq!(event.payload["added"], serde_json::json!(1));

        kernel.stop().await;
    }

    #[test]
    fn crosses_full_rebuild_threshold_at_the_configured_count() {
        assert!(!crosses_full_rebuild_threshold(1, 20));
        assert!(!crosses_full_rebuild_threshold(19, 20));
        assert!(crosses_full_rebuild_threshold(20, 20));
        assert!(crosses_full_rebuild_threshold(21, 20));
    }

    #[test]
    fn skill_name_from_path_strips_prefix() {
        let skills_dir = Path::new("/srv/skills");
        let name = skill_name_from_path(Path::new("/srv/skills/k8s/tools.py"), skills_dir);
        assert_eq!(name, Some("k8s".to_string()));
    }

    #[test]
    fn skill_name_from_path_outside_dir_is_none() {
        let skills_dir = Path::new("/srv/skills");
        let name = skill_name_from_path(Path::new("/elsewhere/tools.py"), skills_dir);
        assert_eq!(name, None);
    }
}
