use crate::core::inventory::{
    find_network_by_name, find_switch, list_port_group_names, list_switch_names, resolve_vlan_id,
    show_attachments,
};
use crate::core::migration::{migrate_vms, MigrationReport, MigrationRequest, MigrationStatus};
use crate::core::port_group::{
    create_or_reuse_dummy, destroy_port_group, DestroyOutcome, DummySelection,
};
use crate::core::pvlan::{
    parse_vlan_input, provision_pvlan, vlan_or_default, FinalTarget, PvlanPlan, VlanDefaults,
    VlanInput,
};
use crate::core::retry::RetryPolicy;
use crate::domain::model::{ConnectionParams, DistributedSwitch, MigrationPhase};
use crate::domain::ports::{Connector, ManagementPlane, Terminal};
use crate::utils::console::Console;
use crate::utils::error::Result;
use std::time::Duration;

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(5);

const INTRODUCTION: &[&str] = &[
    "Any selected VM will be parked in a Dummy VLAN, until the PVLAN construct is in place",
    "The VM(s) will then be moved either to the promiscuous or isolated VLAN (user decision)",
    "Ports connected to Standard Switches will be ignored",
    "There is a network outage of any selected VM",
    "There is no automated recovery process, once the script made any changes",
];

const DISCLAIMER: &[&str] = &[
    "###################################",
    "This tool is provided 'as is' without any guarantees or warranty.",
    "The use of this tool is at your own risk and you are fully responsible for any consequences resulting from its use.",
    "This tool may affect the networking configuration of your VMs and cause downtime or loss of connectivity.",
    "Before running this tool, please ensure you have a full understanding of its function.",
    "By proceeding, you are acknowledging that you have read and understood this disclaimer.",
    "###################################",
];

/// 由 CLI 或配置檔預先提供的答案，提供時不再詢問
#[derive(Debug, Clone, Default)]
pub struct Preset {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub trusted_certificate: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    pub retry: RetryPolicy,
    /// Pause between the parking migration and the emptiness check.
    pub settle_delay: Duration,
    pub preset: Preset,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            preset: Preset::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub switch_name: String,
    pub source_port_group: String,
    pub dummy: DummySelection,
    pub plan: PvlanPlan,
    pub initial_migration: MigrationReport,
    pub source_removal: DestroyOutcome,
    pub final_port_group: Option<String>,
    pub final_migration: Option<MigrationReport>,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    DisclaimerDeclined,
    Aborted { reason: String },
    Completed(Box<RunSummary>),
}

impl RunOutcome {
    fn aborted(reason: impl Into<String>) -> Self {
        RunOutcome::Aborted {
            reason: reason.into(),
        }
    }
}

/// 互動流程：免責聲明 → 連線 → 選擇 → 暫存遷移 → 刪除 → PVLAN → 最終遷移 → 斷線
pub struct Workflow<C: Connector, T: Terminal> {
    connector: C,
    console: Console<T>,
    options: WorkflowOptions,
}

impl<C: Connector, T: Terminal> Workflow<C, T> {
    pub fn new(connector: C, console: Console<T>, options: WorkflowOptions) -> Self {
        Self {
            connector,
            console,
            options,
        }
    }

    pub fn console(&self) -> &Console<T> {
        &self.console
    }

    pub fn into_console(self) -> Console<T> {
        self.console
    }

    pub async fn run(&mut self) -> Result<RunOutcome> {
        self.print_introduction();

        if !self
            .console
            .confirm("\nDo you accept the disclaimer and acknowledge the risks? (yes/no): ")?
        {
            self.console
                .error("You did not accept the disclaimer. Exiting.");
            return Ok(RunOutcome::DisclaimerDeclined);
        }

        let Some(params) = self.collect_connection_params()? else {
            return Ok(RunOutcome::aborted("no vCenter host or user name given"));
        };

        tracing::info!("🔌 Connecting to {} as {}", params.host, params.username);
        let plane = self.connector.connect(&params).await?;

        let result = self.run_session(&plane).await;

        // 會話只在結束時關閉一次，錯誤路徑也一樣
        if let Err(e) = plane.disconnect().await {
            tracing::warn!("Failed to close the management session: {}", e);
        } else {
            tracing::info!("👋 Disconnected from {}", params.host);
        }

        result
    }

    fn print_introduction(&mut self) {
        self.console.warn(
            "\n\nThis tool automates the migration of VMs to Private VLAN on the same VDS:",
        );
        for line in INTRODUCTION {
            self.console.info(line);
        }
        self.console
            .warn("\nMake sure you understand the risks before proceeding");

        self.console.warn("\n\nDISCLAIMER:");
        for line in DISCLAIMER {
            self.console.warn(line);
        }
    }

    fn collect_connection_params(&mut self) -> Result<Option<ConnectionParams>> {
        let preset = self.options.preset.clone();

        let host = match preset.host {
            Some(host) => host,
            None => self.console.ask("Enter vCenter host: ")?,
        };
        let username = match preset.username {
            Some(user) => user,
            None => self.console.ask("Enter user name: ")?,
        };
        if host.is_empty() || username.is_empty() {
            self.console
                .error("A vCenter host and a user name are required.");
            return Ok(None);
        }
        let password = match preset.password {
            Some(password) => password,
            None => self.console.ask_secret("Password: ")?,
        };

        let trusted = match preset.trusted_certificate {
            Some(trusted) => trusted,
            None => self
                .console
                .confirm("\nIs a trusted certificate used on the vCenter? (yes/no): ")?,
        };
        if trusted {
            self.console.success("   Continuing in verified TLS context");
        } else {
            self.console.error("   Continuing in unverified TLS context");
        }

        Ok(Some(ConnectionParams {
            host,
            username,
            password,
            accept_invalid_certs: !trusted,
        }))
    }

    async fn select_switch(&mut self, plane: &C::Plane) -> Result<Option<DistributedSwitch>> {
        let names = list_switch_names(plane).await?;
        if names.is_empty() {
            self.console.error("No distributed switches found.");
            return Ok(None);
        }

        self.console.blank();
        self.console.line("Please choose a VDS:");
        self.console.numbered_list(&names);
        let Some(index) = self.console.choose_index("\nSelect an entry: ", names.len())? else {
            return Ok(None);
        };

        let switch = find_switch(plane, &names[index]).await?;
        if switch.is_none() {
            self.console.error(&format!(
                "Distributed Virtual Switch {} not found.",
                names[index]
            ));
        }
        Ok(switch)
    }

    async fn select_source(
        &mut self,
        plane: &C::Plane,
        switch: &DistributedSwitch,
    ) -> Result<Option<String>> {
        let names = list_port_group_names(plane, switch).await?;
        if names.is_empty() {
            self.console
                .error(&format!("No port groups found on {}.", switch.name));
            return Ok(None);
        }

        self.console.blank();
        self.console.success("\nPlease choose the source port group:");
        self.console.numbered_list(&names);
        let index = self.console.choose_index("\nSelect an entry: ", names.len())?;

        Ok(index.map(|i| names[i].clone()))
    }

    /// Prompts for a VLAN with a default. Blank or invalid input takes the
    /// default; `None` when no default exists.
    fn ask_vlan(&mut self, label: &str, default: Option<u16>) -> Result<Option<u16>> {
        let palette = self.console.palette();
        let shown = default
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string());
        let answer = self.console.ask(&format!(
            "Please enter the {} VLAN number ({}): ",
            label,
            palette.success(&shown)
        ))?;

        let input = parse_vlan_input(&answer);
        if let VlanInput::Invalid(raw) = &input {
            tracing::warn!("Invalid {} VLAN input '{}'", label, raw);
            self.console
                .line("Invalid VLAN number entered. Using the default VLAN ID.");
        }
        Ok(vlan_or_default(&input, default))
    }

    async fn run_session(&mut self, plane: &C::Plane) -> Result<RunOutcome> {
        let palette = self.console.palette();
        let options = self.options.clone();

        let Some(switch) = self.select_switch(plane).await? else {
            return Ok(RunOutcome::aborted("no distributed switch selected"));
        };
        let Some(source) = self.select_source(plane, &switch).await? else {
            return Ok(RunOutcome::aborted("no source port group selected"));
        };

        let Some(dummy) = create_or_reuse_dummy(plane, &mut self.console, &switch).await? else {
            return Ok(RunOutcome::aborted("no dummy port group selected"));
        };
        if dummy.name() == source {
            self.console.error(
                "The dummy port group must differ from the source port group.",
            );
            return Ok(RunOutcome::aborted("dummy port group equals source port group"));
        }

        show_attachments(plane, &mut self.console, &source).await?;

        // 新 port group 的基本名稱，預設沿用來源名稱
        let base_answer = self.console.ask(&format!(
            "Please enter the new base name for the port group ({}): ",
            palette.success(&source)
        ))?;
        let base_name = if base_answer.is_empty() {
            source.clone()
        } else {
            base_answer
        };
        self.console.info(&format!(
            "  Promiscuous Port Group name: {}_promiscuous",
            base_name
        ));
        self.console.info(&format!(
            "  Isolated Port Group name:    {}_isolated",
            base_name
        ));
        self.console.blank();

        let original_vlan = resolve_vlan_id(plane, &mut self.console, &switch.name, &source).await?;
        match original_vlan {
            Some(id) => self.console.line(&format!(
                "The existing base VLAN ID for port group {} is {}",
                source,
                palette.success(&id.to_string())
            )),
            None => self.console.line(&format!(
                "Failed to retrieve the VLAN ID for port group {}.",
                source
            )),
        }

        let defaults = VlanDefaults::from_original(original_vlan);
        let Some(promiscuous_vlan) = self.ask_vlan("promiscuous", defaults.promiscuous)? else {
            self.console.error("No promiscuous VLAN ID available.");
            return Ok(RunOutcome::aborted("no promiscuous VLAN ID"));
        };
        self.console.info(&format!(
            "   Using Promiscuous VLAN ID: {}",
            promiscuous_vlan
        ));
        self.console.blank();

        let Some(isolated_vlan) = self.ask_vlan("Isolated", defaults.isolated)? else {
            self.console.error("No isolated VLAN ID available.");
            return Ok(RunOutcome::aborted("no isolated VLAN ID"));
        };
        self.console
            .info(&format!("   Using Isolated VLAN ID: {}", isolated_vlan));

        let plan = match PvlanPlan::new(base_name, promiscuous_vlan, isolated_vlan) {
            Ok(plan) => plan,
            Err(e) => {
                self.console.error(&e.to_string());
                return Ok(RunOutcome::aborted(e.to_string()));
            }
        };
        tracing::debug!("PVLAN plan: {:?}", plan);

        // 第一階段：來源 → dummy
        self.console.warn(&format!(
            "\nMigrating VM NIC's from original Port-Group to {}\n",
            dummy.name()
        ));
        let initial_migration = migrate_vms(
            plane,
            &mut self.console,
            &options.retry,
            &MigrationRequest {
                switch_name: switch.name.clone(),
                source_port_group: source.clone(),
                target_port_group: dummy.name().to_string(),
                phase: MigrationPhase::Initial,
            },
        )
        .await?;

        if !options.settle_delay.is_zero() {
            tokio::time::sleep(options.settle_delay).await;
        }

        match find_network_by_name(plane, &source).await? {
            Some(network) if network.vms.is_empty() => {
                self.console
                    .info(&format!("Port group {} has no VMs attached.", source));
            }
            Some(network) => {
                self.console.error(&format!(
                    "Failed to migrate all VMs from port group {} ({} still attached).",
                    source,
                    network.vms.len()
                ));
            }
            None => {
                self.console.error(&format!(
                    "Port group {} not found in the datacenter networks.",
                    source
                ));
            }
        }
        let source_removal =
            destroy_port_group(plane, &mut self.console, &switch.name, &source).await?;

        if !provision_pvlan(plane, &mut self.console, &switch.name, &plan).await? {
            return Ok(RunOutcome::aborted(format!(
                "switch {} disappeared before PVLAN provisioning",
                switch.name
            )));
        }

        // 第二階段：dummy → 最終 port group
        let choice = self.console.ask(
            "Do you want to migrate all VMs to the 'promiscuous' or 'isolated' port group? Enter 'promiscuous' or 'p', 'isolated' or 'i': ",
        )?;
        let (final_port_group, final_migration) = match FinalTarget::parse(&choice) {
            None => {
                self.console.line(
                    "Invalid choice. Please enter 'promiscuous' or 'p', 'isolated' or 'i'.",
                );
                (None, None)
            }
            Some(FinalTarget(pvlan_type)) => {
                let target = plan.port_group_for(pvlan_type);
                self.console.success(&format!(
                    "Migrating VM NIC's from {} to {}",
                    dummy.name(),
                    target
                ));
                let report = migrate_vms(
                    plane,
                    &mut self.console,
                    &options.retry,
                    &MigrationRequest {
                        switch_name: switch.name.clone(),
                        source_port_group: dummy.name().to_string(),
                        target_port_group: target.clone(),
                        phase: MigrationPhase::Final,
                    },
                )
                .await?;

                if report.status == MigrationStatus::Completed && report.failed() == 0 {
                    self.console
                        .success(&format!("\nVMs successfully migrated to {}", target));
                } else {
                    self.console.warn(&format!(
                        "\nMigration to {} finished with {} failed VM(s).",
                        target,
                        report.failed()
                    ));
                }
                (Some(target), Some(report))
            }
        };

        Ok(RunOutcome::Completed(Box::new(RunSummary {
            switch_name: switch.name,
            source_port_group: source,
            dummy,
            plan,
            initial_migration,
            source_removal,
            final_port_group,
            final_migration,
        })))
    }
}
