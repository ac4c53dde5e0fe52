// Concrete implementations of the domain ports: vCenter, the operator terminal, dry-run wrapper.

pub mod dry_run;
#[cfg(feature = "cli")]
pub mod terminal;
pub mod vsphere;

pub use dry_run::{DryRun, DryRunConnector};
#[cfg(feature = "cli")]
pub use terminal::StdTerminal;
pub use vsphere::{VsphereClient, VsphereConfig, VsphereConnector};
