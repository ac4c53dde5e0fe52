//! Read-only wrapper: inventory reads reach vCenter, changes are only journaled.

use crate::domain::model::{
    AdapterChange, ConnectionParams, DistributedSwitch, Network, PortGroup, PortGroupSpec,
    PvlanMapEntry, VirtualMachine,
};
use crate::domain::ports::{Connector, ManagementPlane};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Mutex;

pub struct DryRun<M> {
    inner: M,
    journal: Mutex<Vec<String>>,
}

impl<M: ManagementPlane> DryRun<M> {
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            journal: Mutex::new(Vec::new()),
        }
    }

    /// 被略過的變更，依呼叫順序
    pub fn planned(&self) -> Vec<String> {
        match self.journal.lock() {
            Ok(journal) => journal.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&self, action: String) {
        tracing::warn!("🧪 [dry-run] {}", action);
        match self.journal.lock() {
            Ok(mut journal) => journal.push(action),
            Err(poisoned) => poisoned.into_inner().push(action),
        }
    }
}

#[async_trait]
impl<M: ManagementPlane> ManagementPlane for DryRun<M> {
    async fn list_switches(&self) -> Result<Vec<DistributedSwitch>> {
        self.inner.list_switches().await
    }

    async fn port_groups(&self, switch: &DistributedSwitch) -> Result<Vec<PortGroup>> {
        self.inner.port_groups(switch).await
    }

    async fn attached_vms(&self, port_group: &PortGroup) -> Result<Vec<VirtualMachine>> {
        self.inner.attached_vms(port_group).await
    }

    async fn datacenter_networks(&self) -> Result<Vec<Network>> {
        self.inner.datacenter_networks().await
    }

    async fn reconfigure_vm(&self, vm: &VirtualMachine, changes: &[AdapterChange]) -> Result<()> {
        let adapters: Vec<String> = changes
            .iter()
            .map(|c| format!("{} -> {}", c.adapter.label, c.target.portgroup_key))
            .collect();
        self.record(format!("reconfigure VM {} ({})", vm.name, adapters.join(", ")));
        Ok(())
    }

    async fn add_pvlan_entry(
        &self,
        switch: &DistributedSwitch,
        entry: &PvlanMapEntry,
    ) -> Result<()> {
        self.record(format!(
            "add {} PVLAN entry {}/{} to {}",
            entry.pvlan_type, entry.primary_vlan_id, entry.secondary_vlan_id, switch.name
        ));
        Ok(())
    }

    async fn add_port_groups(
        &self,
        switch: &DistributedSwitch,
        specs: &[PortGroupSpec],
    ) -> Result<()> {
        for spec in specs {
            self.record(format!(
                "create port group {} ({}) on {}",
                spec.name, spec.vlan, switch.name
            ));
        }
        Ok(())
    }

    async fn destroy_port_group(&self, port_group: &PortGroup) -> Result<()> {
        self.record(format!("destroy port group {}", port_group.name));
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.inner.disconnect().await
    }
}

/// 以 [`DryRun`] 包裝連線結果
#[derive(Debug, Clone)]
pub struct DryRunConnector<C> {
    inner: C,
}

impl<C: Connector> DryRunConnector<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: Connector> Connector for DryRunConnector<C> {
    type Plane = DryRun<C::Plane>;

    async fn connect(&self, params: &ConnectionParams) -> Result<Self::Plane> {
        let plane = self.inner.connect(params).await?;
        tracing::warn!("🧪 Dry run: no changes will be applied to {}", params.host);
        Ok(DryRun::new(plane))
    }
}
