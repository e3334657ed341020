//! The loaded-skill map: which skills are resident, which tools they
//! dispatch to, and when each should be evicted.
//!
//! `SkillContext` is the single type this crate exposes. It sits between
//! the Router (which resolves a tool name to a skill) and the Executor
//! (which spawns the skill's process): `ensure_loaded` makes a skill
//! resident, `get_command` resolves a dispatch entry without blocking,
//! and `enforce_memory_limit`/`ttl_sweep` keep the resident set bounded.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod loaded;

pub use loaded::{LoaderFn, LoadedSkill, LoadedSkillError, SkillContext, SkillContextConfig};
