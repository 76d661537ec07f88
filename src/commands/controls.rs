use anyhow::Result;
use colored::Colorize;

use super::OutputFormat;
use crate::controls;

pub fn run(format: OutputFormat) -> Result<()> {
    let infos = controls::registry().info();

    if format != OutputFormat::Table {
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(());
    }

    println!("{}", "═══ Controls ═══".cyan().bold());
    for info in &infos {
        let name = format!("{}/{}", info.product, info.name);
        match &info.min_version {
            Some(min) => println!("  {:<32} {} {}", name.bold(), info.description, format!("(>= {min})").dimmed()),
            None => println!("  {:<32} {}", name.bold(), info.description),
        }
    }
    println!();
    println!("  {} controls registered", infos.len());
    Ok(())
}
