//! Flash command implementation

use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use fwflasher_core::{Config, ImageRole, Port};
use fwflasher_flash::{JobEvent, Orchestrator};

/// Images given on the command line, overriding the directory defaults
#[derive(Debug, Default)]
pub struct BrowsedImages {
    pub bootloader: Option<PathBuf>,
    pub partitions: Option<PathBuf>,
    pub ota_data: Option<PathBuf>,
    pub app: Option<PathBuf>,
}

impl BrowsedImages {
    fn iter(&self) -> impl Iterator<Item = (ImageRole, &Path)> {
        [
            (ImageRole::Bootloader, &self.bootloader),
            (ImageRole::PartitionTable, &self.partitions),
            (ImageRole::OtaData, &self.ota_data),
            (ImageRole::Application, &self.app),
        ]
        .into_iter()
        .filter_map(|(role, path)| path.as_deref().map(|path| (role, path)))
    }
}

/// Flash all four images to a port and exit non-zero on failure
pub fn cmd_flash(
    config: Config,
    port: Option<&str>,
    browsed: &BrowsedImages,
) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = Orchestrator::new(config)?;

    for (role, path) in browsed.iter() {
        if !path.is_file() {
            return Err(format!("{} image not found: {}", role.label(), path.display()).into());
        }
        orchestrator.register_browsed(path, Some(role))?;
    }

    let ports = orchestrator.ports();
    let port = match port {
        // Unknown ids are kept so validation can report them
        Some(id) => Some(ports.get(id).cloned().unwrap_or_else(|| Port::new(id, ""))),
        None => ports.ports().first().cloned(),
    };

    let selection = orchestrator.build_selection(port);
    let target = &orchestrator.config().target;
    println!("Chip: {} at {} baud", target.chip, target.baud);
    if let Some(port) = &selection.port {
        println!("Port: {}", port);
    }
    for (role, entry) in &selection.images {
        println!("{:<12} {}", format!("{}:", role.label()), entry.path.display());
    }
    println!();

    let job = orchestrator.submit_flash(&selection)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Flashing...");

    let outcome = loop {
        let event = job.events().recv_timeout(Duration::from_millis(200));
        match event {
            Ok(JobEvent::Line(line)) => show_line(&pb, line),
            Ok(JobEvent::Finished(outcome)) => break outcome,
            Err(RecvTimeoutError::Timeout) if !job.is_finished() => {}
            // Job thread ended without a verdict event
            Err(_) => {
                for event in job.events().try_iter() {
                    if let JobEvent::Line(line) = event {
                        show_line(&pb, line);
                    }
                }
                break job.wait();
            }
        }
    };
    pb.finish_and_clear();

    if outcome.succeeded() {
        println!("Flashing succeeded");
        Ok(())
    } else {
        match outcome.exit_code {
            Some(code) => eprintln!("Flashing failed (exit code {})", code),
            None => eprintln!("Flashing failed (tool was terminated)"),
        }
        std::process::exit(1);
    }
}

fn show_line(pb: &ProgressBar, line: String) {
    pb.println(&line);
    if !line.trim().is_empty() {
        pb.set_message(line);
    }
}
