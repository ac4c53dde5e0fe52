//! vSphere VI/JSON client (`https://{host}/sdk/vim25/{release}/...`).
//!
//! Managed objects are addressed as `/{type}/{id}/{property}` for reads and
//! `/{type}/{id}/{method}` for invocations. Mutating methods return a task
//! reference which is polled until it reaches `success` or `error`.

use crate::domain::model::{
    AdapterBacking, AdapterChange, ConnectionParams, DistributedSwitch, MoRef, Network,
    NetworkAdapter, PortGroup, PortGroupSpec, PvlanMapEntry, VirtualMachine, VlanSpec,
};
use crate::domain::ports::{Connector, ManagementPlane};
use crate::utils::error::{MigrationError, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

pub const DEFAULT_API_RELEASE: &str = "8.0.1.0";
pub const SESSION_HEADER: &str = "vmware-api-session-id";

const DVS_BACKING_TYPE: &str = "VirtualEthernetCardDistributedVirtualPortBackingInfo";
const STANDARD_BACKING_TYPE: &str = "VirtualEthernetCardNetworkBackingInfo";

#[derive(Debug, Clone)]
pub struct VsphereConfig {
    pub api_release: String,
    pub request_timeout: Duration,
    pub task_poll_interval: Duration,
    pub task_timeout: Duration,
}

impl Default for VsphereConfig {
    fn default() -> Self {
        Self {
            api_release: DEFAULT_API_RELEASE.to_string(),
            request_timeout: Duration::from_secs(60),
            task_poll_interval: Duration::from_millis(500),
            task_timeout: Duration::from_secs(300),
        }
    }
}

/// `vcenter.lab` → `https://vcenter.lab`; explicit schemes are kept.
pub fn base_url_for(host: &str) -> String {
    let trimmed = host.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceContent {
    root_folder: MoRef,
    view_manager: MoRef,
    session_manager: MoRef,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DvsConfigWire {
    name: String,
    uuid: String,
    config_version: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PortgroupConfigWire {
    key: String,
    name: String,
    #[serde(default)]
    default_port_config: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct VmHardwareWire {
    #[serde(default)]
    device: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct VmConfigWire {
    hardware: VmHardwareWire,
}

#[derive(Debug, Deserialize)]
struct TaskInfoWire {
    state: String,
    #[serde(default)]
    error: Option<Value>,
}

/// 已登入的 VI/JSON 會話
pub struct VsphereClient {
    client: Client,
    sdk_url: String,
    session_id: String,
    content: ServiceContent,
    config: VsphereConfig,
}

impl VsphereClient {
    /// Fetches the service content and logs in.
    pub async fn connect(params: &ConnectionParams, config: &VsphereConfig) -> Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(params.accept_invalid_certs)
            .timeout(config.request_timeout)
            .build()?;

        let sdk_url = format!(
            "{}/sdk/vim25/{}",
            base_url_for(&params.host),
            config.api_release
        );

        tracing::debug!("Retrieving service content from {}", sdk_url);
        let resp = client
            .get(format!("{}/ServiceInstance/ServiceInstance/content", sdk_url))
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        let content: ServiceContent = Self::parse_response(resp).await?;

        let login_url = format!(
            "{}/SessionManager/{}/Login",
            sdk_url, content.session_manager.value
        );
        let resp = client
            .post(&login_url)
            .json(&json!({ "userName": params.username, "password": params.password }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MigrationError::AuthenticationError {
                message: format!("login returned {}: {}", status.as_u16(), truncate(&body)),
            });
        }

        let session_id = resp
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| MigrationError::AuthenticationError {
                message: format!("login response carried no {} header", SESSION_HEADER),
            })?;

        tracing::info!("🔑 Logged in to {} (API {})", params.host, config.api_release);

        Ok(Self {
            client,
            sdk_url,
            session_id,
            content,
            config: config.clone(),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn mo_url(&self, mo: &MoRef, tail: &str) -> String {
        format!("{}/{}/{}/{}", self.sdk_url, mo.kind, mo.value, tail)
    }

    async fn get_property<T: DeserializeOwned>(&self, mo: &MoRef, property: &str) -> Result<T> {
        let resp = self
            .client
            .get(self.mo_url(mo, property))
            .header(SESSION_HEADER, &self.session_id)
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        Self::parse_response(resp).await
    }

    async fn invoke<T: DeserializeOwned>(
        &self,
        mo: &MoRef,
        method: &str,
        body: Option<&Value>,
    ) -> Result<T> {
        tracing::debug!("Invoking {} on {}", method, mo);
        let mut request = self
            .client
            .post(self.mo_url(mo, method))
            .header(SESSION_HEADER, &self.session_id);
        if let Some(body) = body {
            request = request.json(body);
        }
        let resp = Self::check_status(request.send().await?).await?;
        Self::parse_response(resp).await
    }

    /// 呼叫回傳 Task 的方法並等待完成
    async fn invoke_task(&self, mo: &MoRef, method: &str, body: Option<&Value>) -> Result<()> {
        let task: MoRef = self.invoke(mo, method, body).await?;
        self.wait_for_task(&task).await
    }

    pub async fn wait_for_task(&self, task: &MoRef) -> Result<()> {
        let started = Instant::now();
        loop {
            let info: TaskInfoWire = self.get_property(task, "info").await?;
            match info.state.as_str() {
                "success" => {
                    tracing::debug!("Task {} completed in {:?}", task.value, started.elapsed());
                    return Ok(());
                }
                "error" => {
                    return Err(MigrationError::TaskFailed {
                        task: task.value.clone(),
                        message: task_error_message(info.error.as_ref()),
                    })
                }
                _ => {}
            }

            if started.elapsed() >= self.config.task_timeout {
                return Err(MigrationError::TaskTimeout {
                    task: task.value.clone(),
                    seconds: self.config.task_timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.config.task_poll_interval).await;
        }
    }

    async fn list_container(&self, type_name: &str) -> Result<Vec<MoRef>> {
        let body = json!({
            "container": moref_json(&self.content.root_folder),
            "type": [type_name],
            "recursive": true,
        });
        let view: MoRef = self
            .invoke(&self.content.view_manager, "CreateContainerView", Some(&body))
            .await?;
        let refs = self.get_property::<Vec<MoRef>>(&view, "view").await;

        if let Err(e) = self.invoke::<Value>(&view, "DestroyView", None).await {
            tracing::warn!("Failed to destroy container view {}: {}", view.value, e);
        }
        refs
    }

    async fn load_port_group(&self, mo: &MoRef) -> Result<PortGroup> {
        let config: PortgroupConfigWire = self.get_property(mo, "config").await?;
        let vms: Vec<MoRef> = self.get_property(mo, "vm").await?;
        Ok(PortGroup {
            moref: mo.clone(),
            key: config.key,
            name: config.name,
            vlan: vlan_from_port_setting(config.default_port_config.as_ref()),
            vms,
        })
    }

    async fn load_vm(&self, mo: &MoRef) -> Result<VirtualMachine> {
        let name: String = self.get_property(mo, "name").await?;
        // 無法存取的 VM 沒有 config
        let config: Option<VmConfigWire> = self.get_property(mo, "config").await?;
        let adapters = config
            .map(|c| {
                c.hardware
                    .device
                    .iter()
                    .filter_map(adapter_from_device)
                    .collect()
            })
            .unwrap_or_default();
        Ok(VirtualMachine {
            moref: mo.clone(),
            name,
            adapters,
        })
    }

    async fn check_status(resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let code = status.as_u16();
        let body = resp.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED => Err(MigrationError::AuthenticationError {
                message: format!("Session expired or invalid: {}", truncate(&body)),
            }),
            _ => Err(MigrationError::ApiError {
                status: code,
                message: fault_message(&body),
            }),
        }
    }

    async fn parse_response<T: DeserializeOwned>(resp: Response) -> Result<T> {
        let text = resp.text().await?;
        if text.trim().is_empty() {
            // void 方法回傳空內容
            return serde_json::from_str("null")
                .map_err(|e| MigrationError::parse(format!("Cannot deserialise empty response: {}", e)));
        }
        serde_json::from_str(&text).map_err(|e| {
            MigrationError::parse(format!("JSON parse error: {} (body: {})", e, truncate(&text)))
        })
    }
}

#[async_trait]
impl ManagementPlane for VsphereClient {
    async fn list_switches(&self) -> Result<Vec<DistributedSwitch>> {
        let refs = self.list_container("DistributedVirtualSwitch").await?;
        let mut switches = Vec::with_capacity(refs.len());
        for mo in refs {
            let config: DvsConfigWire = self.get_property(&mo, "config").await?;
            switches.push(DistributedSwitch {
                moref: mo,
                name: config.name,
                uuid: config.uuid,
                config_version: config.config_version,
            });
        }
        Ok(switches)
    }

    async fn port_groups(&self, switch: &DistributedSwitch) -> Result<Vec<PortGroup>> {
        let refs: Vec<MoRef> = self.get_property(&switch.moref, "portgroup").await?;
        let mut groups = Vec::with_capacity(refs.len());
        for mo in &refs {
            groups.push(self.load_port_group(mo).await?);
        }
        Ok(groups)
    }

    async fn attached_vms(&self, port_group: &PortGroup) -> Result<Vec<VirtualMachine>> {
        let mut vms = Vec::with_capacity(port_group.vms.len());
        for mo in &port_group.vms {
            vms.push(self.load_vm(mo).await?);
        }
        Ok(vms)
    }

    async fn datacenter_networks(&self) -> Result<Vec<Network>> {
        let children: Vec<MoRef> = self
            .get_property(&self.content.root_folder, "childEntity")
            .await?;

        let mut networks = Vec::new();
        for datacenter in children.iter().filter(|c| c.kind == "Datacenter") {
            let refs: Vec<MoRef> = self.get_property(datacenter, "network").await?;
            for mo in refs {
                let name: String = self.get_property(&mo, "name").await?;
                let vms: Vec<MoRef> = self.get_property(&mo, "vm").await?;
                networks.push(Network {
                    moref: mo,
                    name,
                    vms,
                });
            }
        }
        Ok(networks)
    }

    async fn reconfigure_vm(&self, vm: &VirtualMachine, changes: &[AdapterChange]) -> Result<()> {
        let device_changes = changes
            .iter()
            .map(device_change_json)
            .collect::<Result<Vec<_>>>()?;
        let body = json!({
            "spec": {
                "_typeName": "VirtualMachineConfigSpec",
                "deviceChange": device_changes,
            }
        });
        self.invoke_task(&vm.moref, "ReconfigVM_Task", Some(&body))
            .await
    }

    async fn add_pvlan_entry(
        &self,
        switch: &DistributedSwitch,
        entry: &PvlanMapEntry,
    ) -> Result<()> {
        let body = json!({ "spec": pvlan_config_spec_json(&switch.config_version, entry) });
        self.invoke_task(&switch.moref, "ReconfigureDvs_Task", Some(&body))
            .await
    }

    async fn add_port_groups(
        &self,
        switch: &DistributedSwitch,
        specs: &[PortGroupSpec],
    ) -> Result<()> {
        let specs = specs
            .iter()
            .map(portgroup_spec_json)
            .collect::<Result<Vec<_>>>()?;
        let body = json!({ "spec": specs });
        self.invoke_task(&switch.moref, "AddDVPortgroup_Task", Some(&body))
            .await
    }

    async fn destroy_port_group(&self, port_group: &PortGroup) -> Result<()> {
        self.invoke_task(&port_group.moref, "Destroy_Task", None).await
    }

    async fn disconnect(&self) -> Result<()> {
        self.invoke::<Value>(&self.content.session_manager, "Logout", None)
            .await
            .map(|_| ())
    }
}

/// 建立 VsphereClient 的 Connector
#[derive(Debug, Clone, Default)]
pub struct VsphereConnector {
    config: VsphereConfig,
}

impl VsphereConnector {
    pub fn new(config: VsphereConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for VsphereConnector {
    type Plane = VsphereClient;

    async fn connect(&self, params: &ConnectionParams) -> Result<VsphereClient> {
        VsphereClient::connect(params, &self.config).await
    }
}

// Wire mapping

fn moref_json(mo: &MoRef) -> Value {
    json!({ "_typeName": "ManagedObjectReference", "type": mo.kind, "value": mo.value })
}

fn truncate(text: &str) -> String {
    text.chars().take(500).collect()
}

/// VI/JSON faults carry `faultMessage`/`localizedMessage`; fall back to the raw body.
fn fault_message(body: &str) -> String {
    let Ok(fault) = serde_json::from_str::<Value>(body) else {
        return truncate(body);
    };
    let kind = fault
        .get("_typeName")
        .and_then(Value::as_str)
        .unwrap_or("Fault");
    let detail = fault
        .pointer("/faultMessage/0/message")
        .or_else(|| fault.get("localizedMessage"))
        .or_else(|| fault.get("message"))
        .and_then(Value::as_str);
    match detail {
        Some(detail) => format!("{}: {}", kind, detail),
        None => kind.to_string(),
    }
}

fn task_error_message(error: Option<&Value>) -> String {
    let Some(error) = error else {
        return "unknown error".to_string();
    };
    error
        .get("localizedMessage")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| {
            error
                .pointer("/fault/_typeName")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| "unknown error".to_string())
}

pub(crate) fn vlan_from_port_setting(setting: Option<&Value>) -> VlanSpec {
    let Some(vlan) = setting.and_then(|s| s.get("vlan")) else {
        return VlanSpec::Unknown("none".to_string());
    };
    let type_name = vlan
        .get("_typeName")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let id = |field: &str| {
        vlan.get(field)
            .and_then(Value::as_u64)
            .and_then(|v| u16::try_from(v).ok())
    };

    match type_name {
        "VmwareDistributedVirtualSwitchVlanIdSpec" => id("vlanId")
            .map(VlanSpec::Vlan)
            .unwrap_or_else(|| VlanSpec::Unknown(type_name.to_string())),
        "VmwareDistributedVirtualSwitchPvlanSpec" => id("pvlanId")
            .map(VlanSpec::Pvlan)
            .unwrap_or_else(|| VlanSpec::Unknown(type_name.to_string())),
        "VmwareDistributedVirtualSwitchTrunkVlanSpec" => VlanSpec::Trunk,
        other => VlanSpec::Unknown(other.to_string()),
    }
}

/// Virtual device → network adapter. Non-ethernet devices yield `None`.
pub(crate) fn adapter_from_device(device: &Value) -> Option<NetworkAdapter> {
    let backing = device.get("backing")?;
    let backing_type = backing.get("_typeName")?.as_str()?;
    if !backing_type.starts_with("VirtualEthernetCard") {
        return None;
    }

    let key = i32::try_from(device.get("key")?.as_i64()?).ok()?;
    let label = device
        .pointer("/deviceInfo/label")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("device {}", key));
    let mac_address = device
        .get("macAddress")
        .and_then(Value::as_str)
        .map(str::to_string);
    let connectable = device
        .get("connectable")
        .and_then(|c| serde_json::from_value(c.clone()).ok());

    let backing = match backing_type {
        STANDARD_BACKING_TYPE => AdapterBacking::StandardSwitch {
            network_name: backing
                .get("deviceName")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        },
        DVS_BACKING_TYPE => {
            let switch_uuid = backing.pointer("/port/switchUuid").and_then(Value::as_str);
            let portgroup_key = backing.pointer("/port/portgroupKey").and_then(Value::as_str);
            match (switch_uuid, portgroup_key) {
                (Some(uuid), Some(key)) => AdapterBacking::DistributedPort {
                    switch_uuid: uuid.to_string(),
                    portgroup_key: key.to_string(),
                },
                _ => AdapterBacking::Other(backing_type.to_string()),
            }
        }
        other => AdapterBacking::Other(other.to_string()),
    };

    Some(NetworkAdapter {
        key,
        label,
        mac_address,
        backing,
        connectable,
        device: device.clone(),
    })
}

pub(crate) fn device_change_json(change: &AdapterChange) -> Result<Value> {
    let mut device = change.adapter.device.clone();
    let Some(fields) = device.as_object_mut() else {
        return Err(MigrationError::parse(format!(
            "device payload of {} is not an object",
            change.adapter.label
        )));
    };

    fields.insert(
        "backing".to_string(),
        json!({
            "_typeName": DVS_BACKING_TYPE,
            "port": {
                "_typeName": "DistributedVirtualSwitchPortConnection",
                "switchUuid": change.target.switch_uuid,
                "portgroupKey": change.target.portgroup_key,
            }
        }),
    );

    if let Some(connectable) = change.connectable {
        let entry = fields
            .entry("connectable")
            .or_insert_with(|| json!({ "_typeName": "VirtualDeviceConnectInfo" }));
        if let Some(info) = entry.as_object_mut() {
            info.insert("connected".into(), json!(connectable.connected));
            info.insert("startConnected".into(), json!(connectable.start_connected));
            info.insert(
                "allowGuestControl".into(),
                json!(connectable.allow_guest_control),
            );
        }
    }

    Ok(json!({
        "_typeName": "VirtualDeviceConfigSpec",
        "operation": "edit",
        "device": device,
    }))
}

pub(crate) fn pvlan_config_spec_json(config_version: &str, entry: &PvlanMapEntry) -> Value {
    json!({
        "_typeName": "VMwareDVSConfigSpec",
        "configVersion": config_version,
        "pvlanConfigSpec": [{
            "_typeName": "VMwareDVSPvlanConfigSpec",
            "operation": "add",
            "pvlanEntry": {
                "_typeName": "VMwareDVSPvlanMapEntry",
                "primaryVlanId": entry.primary_vlan_id,
                "secondaryVlanId": entry.secondary_vlan_id,
                "pvlanType": entry.pvlan_type.as_str(),
            }
        }]
    })
}

fn vlan_spec_json(vlan: &VlanSpec) -> Result<Value> {
    match vlan {
        VlanSpec::Vlan(id) => Ok(json!({
            "_typeName": "VmwareDistributedVirtualSwitchVlanIdSpec",
            "inherited": false,
            "vlanId": id,
        })),
        VlanSpec::Pvlan(id) => Ok(json!({
            "_typeName": "VmwareDistributedVirtualSwitchPvlanSpec",
            "inherited": false,
            "pvlanId": id,
        })),
        other => Err(MigrationError::invalid_input(
            "vlan",
            format!("cannot create a port group with VLAN setting {}", other),
        )),
    }
}

pub(crate) fn portgroup_spec_json(spec: &PortGroupSpec) -> Result<Value> {
    Ok(json!({
        "_typeName": "DVPortgroupConfigSpec",
        "name": spec.name,
        "type": spec.binding.as_str(),
        "defaultPortConfig": {
            "_typeName": "VMwareDVSPortSetting",
            "vlan": vlan_spec_json(&spec.vlan)?,
        }
    }))
}
