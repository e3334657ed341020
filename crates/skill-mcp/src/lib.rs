//! Transport Adapter: exposes the kernel's dispatch map over the Model
//! Context Protocol.
//!
//! `tools/list` reflects the Indexer's live snapshot (minus anything the
//! Security Gate has blocked); `tools/call` resolves aliases, lazily
//! loads the owning skill through `SkillContext`, and delegates to the
//! Executor. Stdio is the primary transport; streaming HTTP is available
//! for deployments that need it.

pub mod server;

pub use server::{FilterLookupFn, McpServer, McpServerConfig, RootLookupFn};
