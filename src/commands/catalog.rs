//! Image catalog listing

use fwflasher_core::{BinaryCatalog, Config, RoleSelection};

/// List images per role, marking the one `flash` would use by default
pub fn cmd_list(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut catalog = BinaryCatalog::from_settings(&config.catalog);
    let snapshot = catalog.scan()?;
    let selection = snapshot.reconcile(&RoleSelection::new());

    println!("Images in {}:", catalog.directory().display());
    if snapshot.is_empty() {
        println!("  (none)");
        return Ok(());
    }

    for (role, entries) in snapshot.iter() {
        println!();
        println!("{}:", role.label());
        if entries.is_empty() {
            println!("    (none)");
            continue;
        }
        for entry in entries {
            let marker = if selection.get(role) == Some(entry.path.as_path()) {
                '*'
            } else {
                ' '
            };
            println!("  {} {}", marker, entry.file_name());
        }
    }

    if !selection.is_complete() {
        println!();
        println!("Warning: not every role has an image; flash needs all four");
    }

    Ok(())
}
