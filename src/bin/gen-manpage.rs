//! Man page generator for fwflasher
//!
//! Writes `fwflasher.1` plus one `fwflasher-<command>.1` page per
//! subcommand (nested ones included, e.g. `fwflasher-config-init.1`).
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]

use clap::CommandFactory;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[path = "../cli.rs"]
#[allow(dead_code)]
mod cli;

fn main() -> io::Result<()> {
    // Default to ./man directory
    let output_dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));

    fs::create_dir_all(&output_dir)?;

    let mut cmd = cli::Cli::command();
    cmd.build();

    let mut pages = Vec::new();
    render(&cmd, "fwflasher", &output_dir, &mut pages)?;

    for page in &pages {
        println!("Generated {}", page.display());
    }
    println!("\nTo view the main page:");
    println!("  man -l {}", output_dir.join("fwflasher.1").display());

    Ok(())
}

/// Render `cmd` as `<name>.1`, then recurse into its subcommands
fn render(
    cmd: &clap::Command,
    name: &str,
    output_dir: &Path,
    pages: &mut Vec<PathBuf>,
) -> io::Result<()> {
    let mut buffer = Vec::new();
    clap_mangen::Man::new(cmd.clone())
        .title(name)
        .render(&mut buffer)?;

    let path = output_dir.join(format!("{}.1", name));
    fs::write(&path, buffer)?;
    pages.push(path);

    for sub in cmd.get_subcommands().filter(|sub| sub.get_name() != "help") {
        render(sub, &format!("{}-{}", name, sub.get_name()), output_dir, pages)?;
    }
    Ok(())
}
