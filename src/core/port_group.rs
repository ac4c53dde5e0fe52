use crate::core::inventory::{find_port_group, find_switch, list_port_group_names};
use crate::core::pvlan::{parse_vlan_input, VlanInput};
use crate::core::retry::submit_once;
use crate::domain::model::{DistributedSwitch, PortGroupSpec};
use crate::domain::ports::{ManagementPlane, Terminal};
use crate::utils::console::{parse_selection, Console};
use crate::utils::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DummySelection {
    Existing(String),
    Created { name: String, vlan_id: u16 },
}

impl DummySelection {
    pub fn name(&self) -> &str {
        match self {
            DummySelection::Existing(name) => name,
            DummySelection::Created { name, .. } => name,
        }
    }
}

/// 選擇現有的 dummy port group，或輸入 'new' 建立新的 (early binding)
///
/// Invalid selections are reported and yield `None`.
pub async fn create_or_reuse_dummy<M, T>(
    plane: &M,
    console: &mut Console<T>,
    switch: &DistributedSwitch,
) -> Result<Option<DummySelection>>
where
    M: ManagementPlane + ?Sized,
    T: Terminal,
{
    let names = list_port_group_names(plane, switch).await?;

    console.blank();
    console.success("Please choose a dummy port group or type 'new' to create a new one:");
    console.numbered_list(&names);
    let choice = console.ask("\nSelect an entry or type 'new': ")?;

    if !choice.eq_ignore_ascii_case("new") {
        let Some(index) = parse_selection(&choice, names.len()) else {
            console.error(&format!(
                "Invalid selection '{}'. Expected 'new' or a number between 1 and {}.",
                choice,
                names.len()
            ));
            return Ok(None);
        };
        let name = names[index].clone();
        console.success(&format!("Using existing port group {}.", name));
        return Ok(Some(DummySelection::Existing(name)));
    }

    let name = console.ask("Please enter the name of the new port-group: ")?;
    if name.is_empty() {
        console.error("A port group name is required.");
        return Ok(None);
    }
    if names.iter().any(|existing| existing == &name) {
        console.warn(&format!(
            "Port group {} already exists on {}. Using it as the dummy port group.",
            name, switch.name
        ));
        return Ok(Some(DummySelection::Existing(name)));
    }

    let vlan_answer = console.ask("Please enter the VLAN ID for the new port-group: ")?;
    let vlan_id = match parse_vlan_input(&vlan_answer) {
        VlanInput::Entered(id) => id,
        VlanInput::Blank | VlanInput::Invalid(_) => {
            console.error(&format!("Invalid VLAN ID '{}'.", vlan_answer));
            return Ok(None);
        }
    };

    let spec = PortGroupSpec::with_vlan(name.clone(), vlan_id);
    tracing::info!("➕ Creating dummy port group {} (VLAN {}) on {}", name, vlan_id, switch.name);
    submit_once(|_| plane.add_port_groups(switch, std::slice::from_ref(&spec))).await?;
    console.success(&format!(
        "Port group {} with VLAN ID {} created.",
        name, vlan_id
    ));

    Ok(Some(DummySelection::Created { name, vlan_id }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyOutcome {
    Destroyed,
    /// Nothing to delete; treated as success.
    AlreadyAbsent,
    SwitchNotFound,
}

impl DestroyOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DestroyOutcome::Destroyed | DestroyOutcome::AlreadyAbsent)
    }
}

/// 刪除 port group，找不到時視為已刪除
pub async fn destroy_port_group<M, T>(
    plane: &M,
    console: &mut Console<T>,
    switch_name: &str,
    port_group_name: &str,
) -> Result<DestroyOutcome>
where
    M: ManagementPlane + ?Sized,
    T: Terminal,
{
    console.warn("\nDeleting original Port group from VDS ");

    let Some(switch) = find_switch(plane, switch_name).await? else {
        console.error(&format!("Distributed Virtual Switch {} not found.", switch_name));
        return Ok(DestroyOutcome::SwitchNotFound);
    };

    let Some(port_group) = find_port_group(plane, &switch, port_group_name).await? else {
        tracing::debug!("Port group {} already absent from {}", port_group_name, switch_name);
        console.success(&format!(
            "   Port group {} successfully removed from VDS {}",
            port_group_name, switch_name
        ));
        return Ok(DestroyOutcome::AlreadyAbsent);
    };

    tracing::info!("🗑️ Destroying port group {} ({})", port_group.name, port_group.moref);
    submit_once(|_| plane.destroy_port_group(&port_group)).await?;
    console.success(&format!(
        "   Port group {} deleted from VDS {}",
        port_group_name, switch_name
    ));

    Ok(DestroyOutcome::Destroyed)
}
