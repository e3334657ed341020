//! Skill CLI library - command implementations driving `skill-kernel`.
//!
//! The binary (`skill`) is a thin wrapper around this library.

pub mod commands;
