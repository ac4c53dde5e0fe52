use crate::domain::model::{
    AdapterChange, ConnectionParams, DistributedSwitch, Network, PortGroup, PortGroupSpec,
    PvlanMapEntry, VirtualMachine,
};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 虛擬化管理平面。每個變更呼叫都會等待遠端任務完成後才返回
#[async_trait]
pub trait ManagementPlane: Send + Sync {
    async fn list_switches(&self) -> Result<Vec<DistributedSwitch>>;
    async fn port_groups(&self, switch: &DistributedSwitch) -> Result<Vec<PortGroup>>;
    async fn attached_vms(&self, port_group: &PortGroup) -> Result<Vec<VirtualMachine>>;
    /// Networks of every datacenter directly under the root folder.
    async fn datacenter_networks(&self) -> Result<Vec<Network>>;

    async fn reconfigure_vm(&self, vm: &VirtualMachine, changes: &[AdapterChange]) -> Result<()>;
    async fn add_pvlan_entry(&self, switch: &DistributedSwitch, entry: &PvlanMapEntry)
        -> Result<()>;
    async fn add_port_groups(&self, switch: &DistributedSwitch, specs: &[PortGroupSpec])
        -> Result<()>;
    async fn destroy_port_group(&self, port_group: &PortGroup) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;
}

#[async_trait]
pub trait Connector: Send + Sync {
    type Plane: ManagementPlane;

    async fn connect(&self, params: &ConnectionParams) -> Result<Self::Plane>;
}

/// 互動式終端
pub trait Terminal {
    fn write_line(&mut self, line: &str);
    fn read_line(&mut self, prompt: &str) -> Result<String>;
    /// Input must not be echoed.
    fn read_secret(&mut self, prompt: &str) -> Result<String>;
}
