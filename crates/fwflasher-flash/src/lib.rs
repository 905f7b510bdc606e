//! Flash orchestration runtime
//!
//! This crate runs the parts of fwflasher that live on background threads
//! and hands their results to the front end over channels. The CLI should
//! only talk to the [`Orchestrator`] and the handles it returns.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       CLI (bin/fwflasher)                     │
//! │  - Renders ports, catalog, log lines, verdict                 │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 fwflasher-flash (this crate)                  │
//! │  - Orchestrator: one active job, refresh after each job       │
//! │  - PortWatcher: polling thread, publishes port changes        │
//! │  - FlashJob: runs esptool, streams merged output              │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!               ┌───────────────┴───────────────┐
//!               ▼                               ▼
//! ┌──────────────────────────┐   ┌──────────────────────────┐
//! │     fwflasher-core       │   │   External processes     │
//! │  - Port / catalog model  │   │  - esptool               │
//! │  - Argument building     │   │  - serialport (host API) │
//! │  - Config                │   │                          │
//! └──────────────────────────┘   └──────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use fwflasher_core::Config;
//! use fwflasher_flash::{JobEvent, Orchestrator};
//!
//! let orchestrator = Orchestrator::new(Config::default())?;
//! let port = orchestrator.ports().ports().first().cloned();
//! let job = orchestrator.submit_flash(&orchestrator.build_selection(port))?;
//! for event in job.events() {
//!     match event {
//!         JobEvent::Line(line) => println!("{}", line),
//!         JobEvent::Finished(outcome) => break,
//!     }
//! }
//! ```

mod error;
mod job;
mod lines;
mod orchestrator;
mod subscribers;
mod watcher;

pub use error::{Error, Result};
pub use job::{FlashJob, JobEvent, JobHandle, JobId, JobOutcome, JobState, LAUNCH_FAILURE_CODE};
pub use orchestrator::Orchestrator;
pub use subscribers::Subscribers;
pub use watcher::PortWatcher;

// Re-export core types the CLI needs
pub use fwflasher_core::{
    Catalog, Config, FlashSelection, ImageRole, Port, PortSet, RoleSelection, SelectionError,
};
