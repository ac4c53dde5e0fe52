use serde::{Deserialize, Serialize};
use std::fmt;

/// 管理平面上的物件參照 (type + id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoRef {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl MoRef {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for MoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributedSwitch {
    pub moref: MoRef,
    pub name: String,
    pub uuid: String,
    /// Every reconfiguration must echo the current value back.
    pub config_version: String,
}

/// Default VLAN setting of a port group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VlanSpec {
    Vlan(u16),
    /// PVLAN secondary VLAN ID
    Pvlan(u16),
    Trunk,
    Unknown(String),
}

impl VlanSpec {
    pub fn vlan_id(&self) -> Option<u16> {
        match self {
            VlanSpec::Vlan(id) | VlanSpec::Pvlan(id) => Some(*id),
            VlanSpec::Trunk | VlanSpec::Unknown(_) => None,
        }
    }
}

impl fmt::Display for VlanSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VlanSpec::Vlan(id) => write!(f, "{}", id),
            VlanSpec::Pvlan(id) => write!(f, "PVLAN {}", id),
            VlanSpec::Trunk => write!(f, "trunk"),
            VlanSpec::Unknown(kind) => write!(f, "unknown ({})", kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortGroup {
    pub moref: MoRef,
    pub key: String,
    pub name: String,
    pub vlan: VlanSpec,
    pub vms: Vec<MoRef>,
}

/// Datacenter level network entry, any kind of network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub moref: MoRef,
    pub name: String,
    pub vms: Vec<MoRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connectable {
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub start_connected: bool,
    #[serde(default)]
    pub allow_guest_control: bool,
}

/// 網卡後端類型，在讀取時決定一次
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterBacking {
    /// Standard vSwitch backing. Never modified.
    StandardSwitch { network_name: String },
    DistributedPort {
        switch_uuid: String,
        portgroup_key: String,
    },
    /// Opaque network, legacy or other backings.
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkAdapter {
    pub key: i32,
    pub label: String,
    pub mac_address: Option<String>,
    pub backing: AdapterBacking,
    pub connectable: Option<Connectable>,
    /// Device payload as returned by the management plane, sent back on edit.
    pub device: serde_json::Value,
}

impl NetworkAdapter {
    pub fn is_standard_switch(&self) -> bool {
        matches!(self.backing, AdapterBacking::StandardSwitch { .. })
    }

    pub fn portgroup_key(&self) -> Option<&str> {
        match &self.backing {
            AdapterBacking::DistributedPort { portgroup_key, .. } => Some(portgroup_key),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VirtualMachine {
    pub moref: MoRef,
    pub name: String,
    pub adapters: Vec<NetworkAdapter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConnection {
    pub switch_uuid: String,
    pub portgroup_key: String,
}

/// One adapter edit inside a VM reconfiguration request.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterChange {
    pub adapter: NetworkAdapter,
    pub target: PortConnection,
    pub connectable: Option<Connectable>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PvlanType {
    Promiscuous,
    Isolated,
}

impl PvlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PvlanType::Promiscuous => "promiscuous",
            PvlanType::Isolated => "isolated",
        }
    }
}

impl fmt::Display for PvlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PvlanMapEntry {
    pub primary_vlan_id: u16,
    pub secondary_vlan_id: u16,
    pub pvlan_type: PvlanType,
}

impl PvlanMapEntry {
    pub fn promiscuous(vlan_id: u16) -> Self {
        Self {
            primary_vlan_id: vlan_id,
            secondary_vlan_id: vlan_id,
            pvlan_type: PvlanType::Promiscuous,
        }
    }

    pub fn isolated(promiscuous_vlan_id: u16, isolated_vlan_id: u16) -> Self {
        Self {
            primary_vlan_id: promiscuous_vlan_id,
            secondary_vlan_id: isolated_vlan_id,
            pvlan_type: PvlanType::Isolated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortBinding {
    #[default]
    EarlyBinding,
}

impl PortBinding {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortBinding::EarlyBinding => "earlyBinding",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortGroupSpec {
    pub name: String,
    pub vlan: VlanSpec,
    pub binding: PortBinding,
}

impl PortGroupSpec {
    pub fn with_vlan(name: impl Into<String>, vlan_id: u16) -> Self {
        Self {
            name: name.into(),
            vlan: VlanSpec::Vlan(vlan_id),
            binding: PortBinding::EarlyBinding,
        }
    }

    pub fn with_pvlan(name: impl Into<String>, secondary_vlan_id: u16) -> Self {
        Self {
            name: name.into(),
            vlan: VlanSpec::Pvlan(secondary_vlan_id),
            binding: PortBinding::EarlyBinding,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationPhase {
    /// Source port group to the dummy.
    Initial,
    /// Dummy to the chosen PVLAN port group.
    Final,
}

/// 連線參數
#[derive(Clone)]
pub struct ConnectionParams {
    pub host: String,
    pub username: String,
    pub password: String,
    pub accept_invalid_certs: bool,
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"********")
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pvlan_entries_reference_promiscuous_primary() {
        let promiscuous = PvlanMapEntry::promiscuous(100);
        let isolated = PvlanMapEntry::isolated(100, 101);
        assert_eq!(promiscuous.primary_vlan_id, promiscuous.secondary_vlan_id);
        assert_eq!(isolated.primary_vlan_id, 100);
        assert_eq!(isolated.secondary_vlan_id, 101);
        assert_eq!(isolated.pvlan_type.as_str(), "isolated");
    }

    #[test]
    fn test_connection_params_debug_hides_password() {
        let params = ConnectionParams {
            host: "vcenter.lab.local".into(),
            username: "administrator@vsphere.local".into(),
            password: "hunter2".into(),
            accept_invalid_certs: true,
        };
        let rendered = format!("{:?}", params);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("vcenter.lab.local"));
    }

    #[test]
    fn test_vlan_spec_ids() {
        assert_eq!(VlanSpec::Vlan(20).vlan_id(), Some(20));
        assert_eq!(VlanSpec::Pvlan(21).vlan_id(), Some(21));
        assert_eq!(VlanSpec::Trunk.vlan_id(), None);
    }
}
