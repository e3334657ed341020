//! Filter-commands policy: a skill manifest's `filter_commands` list is a
//! set of block-globs with `!`-prefixed exceptions carved back out.

use regex::Regex;

/// A command name matched a block pattern with no matching exception.
#[derive(Debug, Clone, thiserror::Error)]
#[error("command '{0}' is blocked by filter pattern '{1}'")]
pub struct FilterError(pub String, pub String);

/// Checks `fq_name` against `patterns`. A plain pattern blocks any command
/// matching its glob; a `!`-prefixed pattern is an allow-exception that
/// overrides a block from an earlier or later plain pattern. Exceptions
/// always win regardless of declaration order, since they name specific
/// carve-outs out of an otherwise-blanket deny.
pub fn is_command_filtered(fq_name: &str, patterns: &[String]) -> Result<(), FilterError> {
    let mut blocked_by: Option<String> = None;

    for pattern in patterns {
        if let Some(exception) = pattern.strip_prefix('!') {
            if glob_to_regex(exception).is_match(fq_name) {
                return Ok(());
            }
            continue;
        }
        if blocked_by.is_none() && glob_to_regex(pattern).is_match(fq_name) {
            blocked_by = Some(pattern.clone());
        }
    }

    match blocked_by {
        Some(pattern) => Err(FilterError(fq_name.to_string(), pattern)),
        None => Ok(()),
    }
}

fn glob_to_regex(glob: &str) -> Regex {
    let escaped = regex::escape(glob).replace(r"\*", ".*").replace(r"\?", ".");
    Regex::new(&format!("^{escaped}$")).unwrap_or_else(|_| Regex::new("$^").unwrap())
}
