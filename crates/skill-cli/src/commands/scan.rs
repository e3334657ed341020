use anyhow::Result;
use colored::*;
use skill_kernel::{Kernel, KernelConfig};
use skill_types::SecurityDecision;

/// Scans every configured skill root once and reports what was found,
/// without starting the kernel or touching the persisted index.
pub fn execute(config: KernelConfig) -> Result<()> {
    let kernel = Kernel::new(config);
    let results = kernel.scan()?;

    if results.is_empty() {
        println!("{} no skills found", "!".yellow());
        return Ok(());
    }

    println!("{} {} skill(s) scanned", "→".cyan(), results.len());
    println!();
    for result in &results {
        let badge = match result.decision {
            SecurityDecision::Allow => "allow".green(),
            SecurityDecision::Warn => "warn".yellow(),
            SecurityDecision::Sandbox => "sandbox".yellow(),
            SecurityDecision::Block => "block".red().bold(),
        };
        println!(
            "  {:<24} {:<5} tool(s)  [{}]",
            result.skill_name.cyan(),
            result.tool_count,
            badge
        );
    }
    Ok(())
}
