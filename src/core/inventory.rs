//! Read-only inventory queries against the management plane.
//!
//! Missing switches or port groups come back as `None` after a message to the
//! operator; only remote call failures surface as errors.

use crate::domain::model::{DistributedSwitch, Network, NetworkAdapter, PortGroup, VlanSpec};
use crate::domain::ports::{ManagementPlane, Terminal};
use crate::utils::console::Console;
use crate::utils::error::Result;

pub async fn list_switch_names<M: ManagementPlane + ?Sized>(plane: &M) -> Result<Vec<String>> {
    Ok(plane
        .list_switches()
        .await?
        .into_iter()
        .map(|s| s.name)
        .collect())
}

pub async fn find_switch<M: ManagementPlane + ?Sized>(
    plane: &M,
    name: &str,
) -> Result<Option<DistributedSwitch>> {
    Ok(plane
        .list_switches()
        .await?
        .into_iter()
        .find(|s| s.name == name))
}

pub async fn list_port_group_names<M: ManagementPlane + ?Sized>(
    plane: &M,
    switch: &DistributedSwitch,
) -> Result<Vec<String>> {
    Ok(plane
        .port_groups(switch)
        .await?
        .into_iter()
        .map(|pg| pg.name)
        .collect())
}

pub async fn find_port_group<M: ManagementPlane + ?Sized>(
    plane: &M,
    switch: &DistributedSwitch,
    name: &str,
) -> Result<Option<PortGroup>> {
    Ok(plane
        .port_groups(switch)
        .await?
        .into_iter()
        .find(|pg| pg.name == name))
}

pub async fn find_network_by_name<M: ManagementPlane + ?Sized>(
    plane: &M,
    name: &str,
) -> Result<Option<Network>> {
    Ok(plane
        .datacenter_networks()
        .await?
        .into_iter()
        .find(|n| n.name == name))
}

/// VLAN ID of a port group on a named switch. Reports and returns `None`
/// when the switch, the port group or a single VLAN ID is missing.
pub async fn resolve_vlan_id<M, T>(
    plane: &M,
    console: &mut Console<T>,
    switch_name: &str,
    port_group_name: &str,
) -> Result<Option<u16>>
where
    M: ManagementPlane + ?Sized,
    T: Terminal,
{
    let Some(switch) = find_switch(plane, switch_name).await? else {
        console.error(&format!("Distributed Virtual Switch {} not found.", switch_name));
        return Ok(None);
    };

    let Some(port_group) = find_port_group(plane, &switch, port_group_name).await? else {
        console.error(&format!(
            "Port group {} not found on VDS {}.",
            port_group_name, switch_name
        ));
        return Ok(None);
    };

    match port_group.vlan.vlan_id() {
        Some(id) => Ok(Some(id)),
        None => {
            console.error(&format!(
                "Port group {} has no single VLAN ID ({}).",
                port_group_name, port_group.vlan
            ));
            Ok(None)
        }
    }
}

/// 顯示用的網卡分類
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterView {
    StandardSwitch { label: String },
    OnPortGroup { label: String, mac_address: String },
}

pub fn classify_adapter(adapter: &NetworkAdapter, port_group_key: &str) -> Option<AdapterView> {
    if adapter.is_standard_switch() {
        return Some(AdapterView::StandardSwitch {
            label: adapter.label.clone(),
        });
    }
    if adapter.portgroup_key() == Some(port_group_key) {
        return Some(AdapterView::OnPortGroup {
            label: adapter.label.clone(),
            mac_address: adapter.mac_address.clone().unwrap_or_default(),
        });
    }
    None
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmAttachment {
    pub vm_name: String,
    pub adapters: Vec<AdapterView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentReport {
    pub port_group: String,
    pub vlan: VlanSpec,
    pub vms: Vec<VmAttachment>,
}

/// Finds the port group on any switch and prints its VLAN and attached VMs.
pub async fn show_attachments<M, T>(
    plane: &M,
    console: &mut Console<T>,
    port_group_name: &str,
) -> Result<Option<AttachmentReport>>
where
    M: ManagementPlane + ?Sized,
    T: Terminal,
{
    let palette = console.palette();
    console.blank();

    let mut found = None;
    for switch in plane.list_switches().await? {
        if let Some(pg) = find_port_group(plane, &switch, port_group_name).await? {
            found = Some(pg);
            break;
        }
    }

    let Some(port_group) = found else {
        console.line(&format!("Port group {} not found.", port_group_name));
        return Ok(None);
    };

    console.line(&format!(
        "{} --> {}",
        palette.info(&format!("VLAN ID for port group {}", port_group_name)),
        palette.emphasis(&port_group.vlan.to_string())
    ));

    let vms = plane.attached_vms(&port_group).await?;
    let mut report = AttachmentReport {
        port_group: port_group.name.clone(),
        vlan: port_group.vlan.clone(),
        vms: Vec::with_capacity(vms.len()),
    };

    if vms.is_empty() {
        console.line(&format!("No VMs found in port group {}.", port_group_name));
    } else {
        console.info(&format!("The following VM's are attached to {}", port_group_name));
        for vm in &vms {
            console.info(&format!("VM Name: {}", vm.name));
            let mut views = Vec::new();
            for adapter in &vm.adapters {
                match classify_adapter(adapter, &port_group.key) {
                    Some(AdapterView::StandardSwitch { label }) => {
                        console.line(&format!(
                            "{}{}",
                            palette.warn(&format!(
                                "VM {} has a network interface connected to a Standard Switch. This adapter will not be touched. Interface: ",
                                vm.name
                            )),
                            palette.error(&label)
                        ));
                        views.push(AdapterView::StandardSwitch { label });
                    }
                    Some(AdapterView::OnPortGroup { label, mac_address }) => {
                        console.info(&format!("  vNIC Device: {} (MAC: {})", label, mac_address));
                        views.push(AdapterView::OnPortGroup { label, mac_address });
                    }
                    None => {}
                }
            }
            report.vms.push(VmAttachment {
                vm_name: vm.name.clone(),
                adapters: views,
            });
        }
    }
    console.blank();

    Ok(Some(report))
}
