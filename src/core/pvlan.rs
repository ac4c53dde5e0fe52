use crate::core::inventory::find_switch;
use crate::core::retry::submit_once;
use crate::domain::model::{PortGroupSpec, PvlanMapEntry, PvlanType};
use crate::domain::ports::{ManagementPlane, Terminal};
use crate::utils::console::Console;
use crate::utils::error::{MigrationError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_vlan_id, MAX_VLAN_ID};

pub const PROMISCUOUS_SUFFIX: &str = "_promiscuous";
pub const ISOLATED_SUFFIX: &str = "_isolated";

/// PVLAN 建置計畫：兩個 map entry 與兩個新的 port group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PvlanPlan {
    pub base_name: String,
    pub promiscuous_vlan: u16,
    pub isolated_vlan: u16,
}

impl PvlanPlan {
    pub fn new(base_name: impl Into<String>, promiscuous_vlan: u16, isolated_vlan: u16) -> Result<Self> {
        let base_name = base_name.into();
        validate_non_empty_string("base_name", &base_name)
            .map_err(|_| MigrationError::invalid_input("base_name", "port group base name is empty"))?;
        validate_vlan_id("promiscuous_vlan", promiscuous_vlan)?;
        validate_vlan_id("isolated_vlan", isolated_vlan)?;
        if promiscuous_vlan == isolated_vlan {
            return Err(MigrationError::invalid_input(
                "isolated_vlan",
                format!(
                    "isolated VLAN must differ from the promiscuous VLAN ({})",
                    promiscuous_vlan
                ),
            ));
        }

        Ok(Self {
            base_name,
            promiscuous_vlan,
            isolated_vlan,
        })
    }

    pub fn promiscuous_port_group(&self) -> String {
        format!("{}{}", self.base_name, PROMISCUOUS_SUFFIX)
    }

    pub fn isolated_port_group(&self) -> String {
        format!("{}{}", self.base_name, ISOLATED_SUFFIX)
    }

    pub fn port_group_for(&self, pvlan_type: PvlanType) -> String {
        match pvlan_type {
            PvlanType::Promiscuous => self.promiscuous_port_group(),
            PvlanType::Isolated => self.isolated_port_group(),
        }
    }

    /// Promiscuous first: the isolated entry uses it as its primary VLAN.
    pub fn map_entries(&self) -> [PvlanMapEntry; 2] {
        [
            PvlanMapEntry::promiscuous(self.promiscuous_vlan),
            PvlanMapEntry::isolated(self.promiscuous_vlan, self.isolated_vlan),
        ]
    }

    pub fn port_group_specs(&self) -> Vec<PortGroupSpec> {
        vec![
            PortGroupSpec::with_pvlan(self.promiscuous_port_group(), self.promiscuous_vlan),
            PortGroupSpec::with_pvlan(self.isolated_port_group(), self.isolated_vlan),
        ]
    }
}

/// 提示輸入的 VLAN 預設值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VlanDefaults {
    pub promiscuous: Option<u16>,
    pub isolated: Option<u16>,
}

impl VlanDefaults {
    /// Promiscuous keeps the original VLAN, isolated takes the next one.
    pub fn from_original(original_vlan: Option<u16>) -> Self {
        Self {
            promiscuous: original_vlan,
            isolated: original_vlan.and_then(|id| id.checked_add(1)).filter(|id| *id <= MAX_VLAN_ID),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VlanInput {
    Entered(u16),
    Blank,
    Invalid(String),
}

pub fn parse_vlan_input(input: &str) -> VlanInput {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return VlanInput::Blank;
    }
    match trimmed.parse::<u16>() {
        Ok(id) if validate_vlan_id("vlan", id).is_ok() => VlanInput::Entered(id),
        _ => VlanInput::Invalid(trimmed.to_string()),
    }
}

/// Blank or invalid input falls back to `default`; `None` when there is none.
pub fn vlan_or_default(input: &VlanInput, default: Option<u16>) -> Option<u16> {
    match input {
        VlanInput::Entered(id) => Some(*id),
        VlanInput::Blank | VlanInput::Invalid(_) => default,
    }
}

/// 最終遷移目標
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalTarget(pub PvlanType);

impl FinalTarget {
    pub fn parse(answer: &str) -> Option<Self> {
        match answer.trim().to_lowercase().as_str() {
            "promiscuous" | "p" => Some(FinalTarget(PvlanType::Promiscuous)),
            "isolated" | "i" => Some(FinalTarget(PvlanType::Isolated)),
            _ => None,
        }
    }
}

/// Registers both PVLAN map entries and creates the two port groups.
///
/// Returns `false` when the switch cannot be found. Remote failures are not
/// retried and propagate to the caller.
pub async fn provision_pvlan<M, T>(
    plane: &M,
    console: &mut Console<T>,
    switch_name: &str,
    plan: &PvlanPlan,
) -> Result<bool>
where
    M: ManagementPlane + ?Sized,
    T: Terminal,
{
    if find_switch(plane, switch_name).await?.is_none() {
        console.error(&format!("Distributed Virtual Switch {} not found.", switch_name));
        return Ok(false);
    }

    for entry in plan.map_entries() {
        // 每次重新讀取交換器，取得最新的 config version
        let switch = find_switch(plane, switch_name)
            .await?
            .ok_or_else(|| MigrationError::not_found("Distributed switch", switch_name))?;

        tracing::info!(
            "🧩 Adding {} PVLAN entry {}/{} on {} (config version {})",
            entry.pvlan_type,
            entry.primary_vlan_id,
            entry.secondary_vlan_id,
            switch.name,
            switch.config_version
        );
        submit_once(|_| plane.add_pvlan_entry(&switch, &entry)).await?;
    }

    let switch = find_switch(plane, switch_name)
        .await?
        .ok_or_else(|| MigrationError::not_found("Distributed switch", switch_name))?;
    let specs = plan.port_group_specs();
    submit_once(|_| plane.add_port_groups(&switch, &specs)).await?;

    console.success(&format!(
        "Port groups with PVLAN configuration created on VDS {}.",
        switch_name
    ));
    console.success(&format!("   Created {}", plan.promiscuous_port_group()));
    console.success(&format!("   Created {}", plan.isolated_port_group()));
    console.blank();

    Ok(true)
}
