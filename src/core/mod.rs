pub mod inventory;
pub mod migration;
pub mod port_group;
pub mod pvlan;
pub mod retry;
pub mod workflow;

pub use crate::domain::model::{
    AdapterBacking, AdapterChange, DistributedSwitch, MigrationPhase, NetworkAdapter, PortGroup,
    PortGroupSpec, PvlanMapEntry, PvlanType, VirtualMachine, VlanSpec,
};
pub use crate::domain::ports::{Connector, ManagementPlane, Terminal};
pub use crate::utils::error::Result;
