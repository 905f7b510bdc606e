//! Serial port commands

use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};

use fwflasher_core::{Config, DeviceRegistry, PortSet, SerialRegistry};
use fwflasher_flash::PortWatcher;

/// List attached serial ports
pub fn cmd_ports() -> Result<(), Box<dyn std::error::Error>> {
    let ports = PortSet::from_ports(SerialRegistry::new().enumerate()?);
    print_ports(&ports);
    Ok(())
}

/// Print port changes until `duration` seconds have passed (or forever)
pub fn cmd_watch(config: Config, duration: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let watcher = PortWatcher::new(SerialRegistry::new(), config.watcher.interval());
    let changes = watcher.subscribe();
    watcher.start()?;

    let deadline = duration.map(|secs| Instant::now() + Duration::from_secs(secs));
    println!("Watching serial ports (Ctrl-C to stop)...");

    let mut previous = PortSet::new();
    loop {
        let timeout = match deadline {
            Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                Some(left) => left,
                None => break,
            },
            None => Duration::from_secs(3600),
        };

        match changes.recv_timeout(timeout) {
            Ok(ports) => {
                print_changes(&previous, &ports);
                previous = ports;
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    watcher.stop();
    Ok(())
}

fn print_ports(ports: &PortSet) {
    if ports.is_empty() {
        println!("No serial ports found");
        return;
    }
    for port in ports {
        println!("{}", port);
    }
}

fn print_changes(previous: &PortSet, current: &PortSet) {
    for port in previous.iter().filter(|p| !current.contains(&p.id)) {
        println!("- {}", port);
    }
    for port in current.iter().filter(|p| !previous.contains(&p.id)) {
        println!("+ {}", port);
    }
}
