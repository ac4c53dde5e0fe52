pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use adapters::StdTerminal;
#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{DryRun, DryRunConnector, VsphereClient, VsphereConfig, VsphereConnector};
pub use config::{Overrides, Settings, TomlConfig};
pub use crate::core::workflow::{RunOutcome, RunSummary, Workflow, WorkflowOptions};
pub use utils::console::Console;
pub use utils::error::{MigrationError, Result};
pub use utils::style::Palette;
