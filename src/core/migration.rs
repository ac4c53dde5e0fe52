use crate::core::retry::{submit_with_retry, RetryOutcome, RetryPolicy};
use crate::domain::model::{AdapterChange, MigrationPhase, PortConnection, VirtualMachine};
use crate::domain::ports::{ManagementPlane, Terminal};
use crate::utils::console::Console;
use crate::utils::error::Result;

/// 一次遷移的輸入
#[derive(Debug, Clone)]
pub struct MigrationRequest {
    pub switch_name: String,
    pub source_port_group: String,
    pub target_port_group: String,
    pub phase: MigrationPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmMode {
    OneByOne,
    AllAtOnce,
}

impl ConfirmMode {
    pub fn from_answer(answer: &str) -> Self {
        if answer.trim().eq_ignore_ascii_case("all") {
            ConfirmMode::AllAtOnce
        } else {
            ConfirmMode::OneByOne
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmOutcome {
    Migrated { attempts: u32 },
    Failed { attempts: u32, error: String },
    Declined,
    NoChanges,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmResult {
    pub vm_name: String,
    pub adapter_changes: usize,
    pub outcome: VmOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStatus {
    Completed,
    SwitchNotFound,
    PortGroupNotFound,
    /// Operator declined the "all at once" batch.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub status: MigrationStatus,
    pub mode: Option<ConfirmMode>,
    pub vms: Vec<VmResult>,
}

impl MigrationReport {
    fn aborted(status: MigrationStatus) -> Self {
        Self {
            status,
            mode: None,
            vms: Vec::new(),
        }
    }

    pub fn migrated(&self) -> usize {
        self.vms
            .iter()
            .filter(|r| matches!(r.outcome, VmOutcome::Migrated { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.vms
            .iter()
            .filter(|r| matches!(r.outcome, VmOutcome::Failed { .. }))
            .count()
    }
}

/// Adapter edits needed to move one VM onto `target`.
///
/// Only adapters backed by the distributed port group `source_key` are
/// included, in both phases. NICs on other port groups, standard-switch
/// networks or opaque backings stay where they are.
pub fn plan_adapter_changes(
    vm: &VirtualMachine,
    source_key: &str,
    target: &PortConnection,
) -> Vec<AdapterChange> {
    vm.adapters
        .iter()
        .filter(|adapter| adapter.portgroup_key() == Some(source_key))
        .map(|adapter| AdapterChange {
            adapter: adapter.clone(),
            target: target.clone(),
            connectable: adapter.connectable,
        })
        .collect()
}

/// 將來源 port group 上的 VM 網卡改接到目標 port group
pub async fn migrate_vms<M, T>(
    plane: &M,
    console: &mut Console<T>,
    policy: &RetryPolicy,
    request: &MigrationRequest,
) -> Result<MigrationReport>
where
    M: ManagementPlane + ?Sized,
    T: Terminal,
{
    let palette = console.palette();

    let Some(switch) = plane
        .list_switches()
        .await?
        .into_iter()
        .find(|s| s.name == request.switch_name)
    else {
        console.line(&format!(
            "Distributed Virtual Switch {} not found.",
            request.switch_name
        ));
        return Ok(MigrationReport::aborted(MigrationStatus::SwitchNotFound));
    };

    let port_groups = plane.port_groups(&switch).await?;
    let source = port_groups
        .iter()
        .find(|pg| pg.name == request.source_port_group);
    let target = port_groups
        .iter()
        .find(|pg| pg.name == request.target_port_group);
    let (Some(source), Some(target)) = (source, target) else {
        console.line("Original or target port group not found.");
        return Ok(MigrationReport::aborted(MigrationStatus::PortGroupNotFound));
    };

    tracing::info!(
        "🔀 Migrating adapters from {} to {} on {} ({:?})",
        source.name,
        target.name,
        switch.name,
        request.phase
    );

    let vms = plane.attached_vms(source).await?;

    let mode = ConfirmMode::from_answer(&console.ask(
        "Do you want to migrate VMs one by one or all at once? (single/all): ",
    )?);

    if mode == ConfirmMode::AllAtOnce {
        console.info("\nThe following VMs will be migrated:\n");
        for vm in &vms {
            console.success(&vm.name);
        }
        if !console.confirm("Do you want to proceed? (yes/no): ")? {
            tracing::info!("Batch migration declined by operator");
            return Ok(MigrationReport {
                status: MigrationStatus::Cancelled,
                mode: Some(mode),
                vms: Vec::new(),
            });
        }
    }

    let connection = PortConnection {
        switch_uuid: switch.uuid.clone(),
        portgroup_key: target.key.clone(),
    };

    let mut results = Vec::with_capacity(vms.len());
    for vm in &vms {
        let changes = plan_adapter_changes(vm, &source.key, &connection);
        if changes.is_empty() {
            tracing::debug!("No eligible adapters on VM {}", vm.name);
            results.push(VmResult {
                vm_name: vm.name.clone(),
                adapter_changes: 0,
                outcome: VmOutcome::NoChanges,
            });
            continue;
        }

        let approved = mode == ConfirmMode::AllAtOnce
            || console.confirm_default_yes(&format!(
                "Confirm reconfiguration of VM {}? ([yes]/no): ",
                vm.name
            ))?;

        if !approved {
            console.line(&format!(
                "   {}",
                palette.error(&format!("Skipped reconfiguration of VM {}", vm.name))
            ));
            results.push(VmResult {
                vm_name: vm.name.clone(),
                adapter_changes: changes.len(),
                outcome: VmOutcome::Declined,
            });
            continue;
        }

        let changes_ref = changes.as_slice();
        let outcome = submit_with_retry(
            policy,
            move |attempt| {
                tracing::debug!("Reconfiguring VM {} (attempt {})", vm.name, attempt);
                plane.reconfigure_vm(vm, changes_ref)
            },
            |_, error, will_retry| {
                tracing::warn!("Reconfiguration of VM {} failed: {}", vm.name, error);
                if will_retry {
                    console.line(&format!(
                        "   {}",
                        palette.error(&format!(
                            "Failed to reconfigure VM {}. Retrying...",
                            vm.name
                        ))
                    ));
                }
            },
        )
        .await;
        tracing::debug!("VM {} done after {} attempt(s)", vm.name, outcome.attempts());

        let outcome = match outcome {
            RetryOutcome::Succeeded { attempts, .. } => {
                console.line(&format!(
                    "   {}",
                    palette.success(&format!("Reconfigured VM {}", vm.name))
                ));
                VmOutcome::Migrated { attempts }
            }
            RetryOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                console.line(&format!(
                    "   {}",
                    palette.error(&format!(
                        "Failed to reconfigure VM {} after {} attempts.",
                        vm.name, attempts
                    ))
                ));
                VmOutcome::Failed {
                    attempts,
                    error: last_error.to_string(),
                }
            }
        };

        results.push(VmResult {
            vm_name: vm.name.clone(),
            adapter_changes: changes.len(),
            outcome,
        });
    }

    let report = MigrationReport {
        status: MigrationStatus::Completed,
        mode: Some(mode),
        vms: results,
    };
    tracing::info!(
        "✅ Migration to {} finished: {} migrated, {} failed",
        target.name,
        report.migrated(),
        report.failed()
    );
    Ok(report)
}
