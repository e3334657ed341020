use anyhow::Result;
use colored::*;
use skill_kernel::{Kernel, KernelConfig};

/// Dumps the current tool dispatch snapshot — the index as last persisted
/// by a `skill serve` run, not a fresh scan. Use `skill scan` to see what
/// is on disk right now.
pub fn execute(config: KernelConfig, format: &str) -> Result<()> {
    let kernel = Kernel::new(config);
    let tools = kernel.list_tools();

    match format {
        "json" => {
            let rows: Vec<_> = tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "fq_name": t.fq_name,
                        "skill": t.skill_name,
                        "description": t.description,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        _ => {
            if tools.is_empty() {
                println!("{} no tools indexed — run `skill serve` or `skill scan` first", "!".yellow());
                return Ok(());
            }
            println!("{} {} tool(s) in the dispatch snapshot", "→".cyan(), tools.len());
            println!();
            for tool in &tools {
                println!("  {:<36} {}", tool.fq_name.cyan(), tool.description.dimmed());
            }
        }
    }
    Ok(())
}
