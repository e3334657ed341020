use anyhow::{bail, Result};
use colored::*;
use skill_kernel::{Kernel, KernelConfig};
use skill_types::SecurityDecision;

/// Full security report for every discovered skill. Exits non-zero if any
/// skill is blocked.
pub fn execute(config: KernelConfig) -> Result<()> {
    let kernel = Kernel::new(config);
    let results = kernel.scan()?;

    let mut blocked = Vec::new();
    let mut warned = Vec::new();
    let mut allowed = 0;

    for result in &results {
        match result.decision {
            SecurityDecision::Allow => allowed += 1,
            SecurityDecision::Warn | SecurityDecision::Sandbox => warned.push(&result.skill_name),
            SecurityDecision::Block => blocked.push(&result.skill_name),
        }
    }

    println!("{} {} skill(s): {} allow, {} warn, {} block", "→".cyan(), results.len(), allowed, warned.len(), blocked.len());

    if !warned.is_empty() {
        println!();
        println!("  {}", "Warned".yellow().bold());
        for name in &warned {
            println!("    {} {}", "!".yellow(), name);
        }
    }

    if !blocked.is_empty() {
        println!();
        println!("  {}", "Blocked".red().bold());
        for name in &blocked {
            println!("    {} {}", "✗".red(), name);
        }
        println!();
        bail!("{} skill(s) blocked by the security gate", blocked.len());
    }

    Ok(())
}
