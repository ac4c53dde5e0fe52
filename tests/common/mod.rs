#![allow(dead_code)]

use async_trait::async_trait;
use pvlan_migrate::domain::model::{
    AdapterBacking, AdapterChange, Connectable, ConnectionParams, DistributedSwitch, MoRef,
    Network, NetworkAdapter, PortGroup, PortGroupSpec, PvlanMapEntry, VirtualMachine, VlanSpec,
};
use pvlan_migrate::domain::ports::{Connector, ManagementPlane, Terminal};
use pvlan_migrate::utils::error::{MigrationError, Result};
use pvlan_migrate::{Console, Palette};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Mutating calls seen by the fake, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Reconfigure { vm: String, targets: Vec<String> },
    AddPvlanEntry { switch: String, config_version: String, entry: PvlanMapEntry },
    AddPortGroups { switch: String, specs: Vec<PortGroupSpec> },
    Destroy { port_group: String },
    Disconnect,
}

/// How a fake VM adapter is wired.
pub enum Attach<'a> {
    PortGroup(&'a str),
    Standard(&'a str),
}

struct StoredPortGroup {
    switch_uuid: String,
    moref: MoRef,
    key: String,
    name: String,
    vlan: VlanSpec,
}

#[derive(Default)]
struct State {
    switches: Vec<DistributedSwitch>,
    port_groups: Vec<StoredPortGroup>,
    vms: Vec<VirtualMachine>,
    calls: Vec<Call>,
    reconfigure_attempts: HashMap<String, u32>,
    reconfigure_failures: HashMap<String, u32>,
    destroy_fault: Option<String>,
    pvlan_fault: Option<String>,
    next_id: u32,
}

impl State {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn members(&self, key: &str) -> Vec<MoRef> {
        self.vms
            .iter()
            .filter(|vm| vm.adapters.iter().any(|a| a.portgroup_key() == Some(key)))
            .map(|vm| vm.moref.clone())
            .collect()
    }

    fn port_group(&self, stored: &StoredPortGroup) -> PortGroup {
        PortGroup {
            moref: stored.moref.clone(),
            key: stored.key.clone(),
            name: stored.name.clone(),
            vlan: stored.vlan.clone(),
            vms: self.members(&stored.key),
        }
    }
}

/// In-memory management plane. Clones share state.
#[derive(Clone, Default)]
pub struct FakePlane {
    state: Arc<Mutex<State>>,
}

impl FakePlane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_switch(self, name: &str, uuid: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let id = state.next_id();
            state.switches.push(DistributedSwitch {
                moref: MoRef::new("VmwareDistributedVirtualSwitch", format!("dvs-{}", id)),
                name: name.to_string(),
                uuid: uuid.to_string(),
                config_version: "1".to_string(),
            });
        }
        self
    }

    pub fn with_port_group(self, switch: &str, name: &str, vlan: VlanSpec) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let uuid = state
                .switches
                .iter()
                .find(|s| s.name == switch)
                .map(|s| s.uuid.clone())
                .expect("switch must be added first");
            let id = state.next_id();
            state.port_groups.push(StoredPortGroup {
                switch_uuid: uuid,
                moref: MoRef::new("DistributedVirtualPortgroup", format!("dvportgroup-{}", id)),
                key: format!("dvportgroup-{}", id),
                name: name.to_string(),
                vlan,
            });
        }
        self
    }

    pub fn with_vm(self, name: &str, adapters: &[Attach<'_>]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let id = state.next_id();
            let mut nics = Vec::new();
            for (i, attach) in adapters.iter().enumerate() {
                let backing = match attach {
                    Attach::PortGroup(pg) => {
                        let stored = state
                            .port_groups
                            .iter()
                            .find(|p| p.name == *pg)
                            .expect("port group must be added first");
                        AdapterBacking::DistributedPort {
                            switch_uuid: stored.switch_uuid.clone(),
                            portgroup_key: stored.key.clone(),
                        }
                    }
                    Attach::Standard(network) => AdapterBacking::StandardSwitch {
                        network_name: network.to_string(),
                    },
                };
                nics.push(NetworkAdapter {
                    key: 4000 + i as i32,
                    label: format!("Network adapter {}", i + 1),
                    mac_address: Some(format!("00:50:56:00:{:02x}:{:02x}", id, i)),
                    backing,
                    connectable: Some(Connectable {
                        connected: true,
                        start_connected: true,
                        allow_guest_control: true,
                    }),
                    device: serde_json::json!({ "key": 4000 + i as i32 }),
                });
            }
            state.vms.push(VirtualMachine {
                moref: MoRef::new("VirtualMachine", format!("vm-{}", id)),
                name: name.to_string(),
                adapters: nics,
            });
        }
        self
    }

    /// The next `times` reconfigurations of `vm` fail with a task error.
    pub fn fail_reconfigure(self, vm: &str, times: u32) -> Self {
        self.state
            .lock()
            .unwrap()
            .reconfigure_failures
            .insert(vm.to_string(), times);
        self
    }

    /// Every port group destruction fails with `message` after being recorded.
    pub fn fail_destroy(self, message: &str) -> Self {
        self.state.lock().unwrap().destroy_fault = Some(message.to_string());
        self
    }

    /// Every PVLAN map entry fails with `message` after being recorded.
    pub fn fail_pvlan_entry(self, message: &str) -> Self {
        self.state.lock().unwrap().pvlan_fault = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| *c != Call::Disconnect)
            .collect()
    }

    pub fn reconfigure_attempts(&self, vm: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .reconfigure_attempts
            .get(vm)
            .copied()
            .unwrap_or(0)
    }

    pub fn port_group_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .port_groups
            .iter()
            .map(|p| p.name.clone())
            .collect()
    }

    pub fn port_group_vlan(&self, name: &str) -> Option<VlanSpec> {
        self.state
            .lock()
            .unwrap()
            .port_groups
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.vlan.clone())
    }

    /// Port group name (or standard network) per adapter of `vm`.
    pub fn vm_networks(&self, vm: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let vm = state.vms.iter().find(|v| v.name == vm).expect("unknown VM");
        vm.adapters
            .iter()
            .map(|a| match &a.backing {
                AdapterBacking::DistributedPort { portgroup_key, .. } => state
                    .port_groups
                    .iter()
                    .find(|p| &p.key == portgroup_key)
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| portgroup_key.clone()),
                AdapterBacking::StandardSwitch { network_name } => network_name.clone(),
                AdapterBacking::Other(kind) => kind.clone(),
            })
            .collect()
    }

    pub fn switch(&self, name: &str) -> DistributedSwitch {
        self.state
            .lock()
            .unwrap()
            .switches
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .expect("unknown switch")
    }
}

#[async_trait]
impl ManagementPlane for FakePlane {
    async fn list_switches(&self) -> Result<Vec<DistributedSwitch>> {
        Ok(self.state.lock().unwrap().switches.clone())
    }

    async fn port_groups(&self, switch: &DistributedSwitch) -> Result<Vec<PortGroup>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .port_groups
            .iter()
            .filter(|p| p.switch_uuid == switch.uuid)
            .map(|p| state.port_group(p))
            .collect())
    }

    async fn attached_vms(&self, port_group: &PortGroup) -> Result<Vec<VirtualMachine>> {
        let state = self.state.lock().unwrap();
        Ok(port_group
            .vms
            .iter()
            .filter_map(|mo| state.vms.iter().find(|vm| &vm.moref == mo).cloned())
            .collect())
    }

    async fn datacenter_networks(&self) -> Result<Vec<Network>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .port_groups
            .iter()
            .map(|p| Network {
                moref: p.moref.clone(),
                name: p.name.clone(),
                vms: state.members(&p.key),
            })
            .collect())
    }

    async fn reconfigure_vm(&self, vm: &VirtualMachine, changes: &[AdapterChange]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Reconfigure {
            vm: vm.name.clone(),
            targets: changes.iter().map(|c| c.target.portgroup_key.clone()).collect(),
        });
        *state.reconfigure_attempts.entry(vm.name.clone()).or_insert(0) += 1;

        if let Some(remaining) = state.reconfigure_failures.get_mut(&vm.name) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(MigrationError::TaskFailed {
                    task: "task-1".to_string(),
                    message: "Another task is already in progress.".to_string(),
                });
            }
        }

        let stored = state
            .vms
            .iter_mut()
            .find(|v| v.moref == vm.moref)
            .ok_or_else(|| MigrationError::not_found("Virtual machine", &vm.name))?;
        for change in changes {
            if let Some(adapter) = stored.adapters.iter_mut().find(|a| a.key == change.adapter.key) {
                adapter.backing = AdapterBacking::DistributedPort {
                    switch_uuid: change.target.switch_uuid.clone(),
                    portgroup_key: change.target.portgroup_key.clone(),
                };
            }
        }
        Ok(())
    }

    async fn add_pvlan_entry(
        &self,
        switch: &DistributedSwitch,
        entry: &PvlanMapEntry,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::AddPvlanEntry {
            switch: switch.name.clone(),
            config_version: switch.config_version.clone(),
            entry: *entry,
        });
        if let Some(message) = state.pvlan_fault.clone() {
            return Err(MigrationError::TaskFailed {
                task: "task-7".to_string(),
                message,
            });
        }
        if let Some(stored) = state.switches.iter_mut().find(|s| s.uuid == switch.uuid) {
            let version: u32 = stored.config_version.parse().unwrap_or(0);
            stored.config_version = (version + 1).to_string();
        }
        Ok(())
    }

    async fn add_port_groups(
        &self,
        switch: &DistributedSwitch,
        specs: &[PortGroupSpec],
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::AddPortGroups {
            switch: switch.name.clone(),
            specs: specs.to_vec(),
        });
        for spec in specs {
            let id = state.next_id();
            state.port_groups.push(StoredPortGroup {
                switch_uuid: switch.uuid.clone(),
                moref: MoRef::new("DistributedVirtualPortgroup", format!("dvportgroup-{}", id)),
                key: format!("dvportgroup-{}", id),
                name: spec.name.clone(),
                vlan: spec.vlan.clone(),
            });
        }
        Ok(())
    }

    async fn destroy_port_group(&self, port_group: &PortGroup) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Destroy {
            port_group: port_group.name.clone(),
        });
        if let Some(message) = state.destroy_fault.clone() {
            return Err(MigrationError::TaskFailed {
                task: "task-9".to_string(),
                message,
            });
        }
        state.port_groups.retain(|p| p.moref != port_group.moref);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.state.lock().unwrap().calls.push(Call::Disconnect);
        Ok(())
    }
}

/// Hands out clones of one [`FakePlane`] and remembers the login parameters.
#[derive(Clone, Default)]
pub struct FakeConnector {
    plane: FakePlane,
    reject_login: bool,
    logins: Arc<Mutex<Vec<ConnectionParams>>>,
}

impl FakeConnector {
    pub fn new(plane: FakePlane) -> Self {
        Self {
            plane,
            ..Default::default()
        }
    }

    pub fn rejecting(plane: FakePlane) -> Self {
        Self {
            plane,
            reject_login: true,
            ..Default::default()
        }
    }

    pub fn logins(&self) -> Vec<ConnectionParams> {
        self.logins.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    type Plane = FakePlane;

    async fn connect(&self, params: &ConnectionParams) -> Result<FakePlane> {
        self.logins.lock().unwrap().push(params.clone());
        if self.reject_login {
            return Err(MigrationError::AuthenticationError {
                message: "Cannot complete login due to an incorrect user name or password."
                    .to_string(),
            });
        }
        Ok(self.plane.clone())
    }
}

/// Replays canned answers and records everything shown to the operator.
#[derive(Default)]
pub struct ScriptedTerminal {
    answers: VecDeque<String>,
    pub output: Vec<String>,
    pub prompts: Vec<String>,
}

impl ScriptedTerminal {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    pub fn transcript(&self) -> String {
        self.output.join("\n")
    }

    fn next_answer(&mut self, prompt: &str) -> Result<String> {
        self.prompts.push(prompt.to_string());
        self.output.push(prompt.to_string());
        self.answers.pop_front().ok_or_else(|| {
            MigrationError::IoError(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("no scripted answer for prompt '{}'", prompt),
            ))
        })
    }
}

impl Terminal for ScriptedTerminal {
    fn write_line(&mut self, line: &str) {
        self.output.push(line.to_string());
    }

    fn read_line(&mut self, prompt: &str) -> Result<String> {
        self.next_answer(prompt)
    }

    fn read_secret(&mut self, prompt: &str) -> Result<String> {
        self.next_answer(prompt)
    }
}

pub fn console(answers: &[&str]) -> Console<ScriptedTerminal> {
    Console::new(ScriptedTerminal::new(answers), Palette::plain())
}

/// `dvs01` with `web` (VLAN 100) and `parking` (VLAN 999).
pub fn lab_plane() -> FakePlane {
    FakePlane::new()
        .with_switch("dvs01", "50 1f 2e 3d")
        .with_port_group("dvs01", "web", VlanSpec::Vlan(100))
        .with_port_group("dvs01", "parking", VlanSpec::Vlan(999))
}

pub fn key_of(plane: &FakePlane, name: &str) -> String {
    let switch = plane.switch("dvs01");
    let state = plane.state.lock().unwrap();
    state
        .port_groups
        .iter()
        .find(|p| p.name == name && p.switch_uuid == switch.uuid)
        .map(|p| p.key.clone())
        .expect("unknown port group")
}
