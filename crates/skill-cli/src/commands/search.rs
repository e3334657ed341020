use anyhow::Result;
use colored::*;
use skill_kernel::{Kernel, KernelConfig};

/// Ranks the last persisted tool index against a free-text task
/// description via the Router.
pub fn execute(config: KernelConfig, query: &str, core: &[String]) -> Result<()> {
    let kernel = Kernel::new(config);
    let ranked = kernel.route(query, core);

    if ranked.is_empty() {
        println!("{} no matching tools — run `skill serve` or `skill scan` first", "!".yellow());
        return Ok(());
    }

    println!("{} top matches for \"{}\"", "→".cyan(), query);
    println!();
    for (rank, name) in ranked.iter().enumerate() {
        println!("  {:>2}. {}", rank + 1, name.cyan());
    }
    Ok(())
}
