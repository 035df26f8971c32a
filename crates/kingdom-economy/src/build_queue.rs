//! Build queue: queueing, partial payment, completion, and cancellation.
//!
//! Projects are paid in queue order from one shared pool. Each project
//! takes, resource by resource, as much of its outstanding cost as the pool
//! still holds, so later projects see what earlier ones left. A project
//! never receives more than `cost - invested` of any resource. Completed
//! projects leave the queue and grant their structure to the target
//! settlement (repairing it if a damaged copy stands there).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use kingdom_ledger::{LedgerEntry, LedgerEntryType, LedgerError, ResourcePool};
use kingdom_types::{
    BuildProject, BuiltStructure, Kingdom, ProjectId, Resource, SettlementId, StructureKey,
};
use kingdom_world::Catalog;

use crate::error::EconomyError;
use crate::pass::close_pool;

/// What one project received in a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPayment {
    /// The project paid.
    pub project_id: ProjectId,
    /// Amount paid per resource (only non-zero entries).
    pub paid: BTreeMap<Resource, u32>,
}

/// A project that finished in a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedProject {
    /// The finished project.
    pub project_id: ProjectId,
    /// Structure granted.
    pub structure: StructureKey,
    /// Settlement that received it.
    pub settlement_id: SettlementId,
}

/// Result of a build queue pass.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BuildReport {
    /// Payments made, in queue order.
    pub payments: Vec<ProjectPayment>,
    /// Projects completed and removed.
    pub completed: Vec<CompletedProject>,
    /// Projects dropped because their settlement no longer exists.
    pub dropped: Vec<ProjectId>,
    /// Material movements.
    pub ledger: Vec<LedgerEntry>,
}

/// Pay `queue` in order from `pool`. Returns one payment per project that
/// received anything.
///
/// # Errors
///
/// Returns [`LedgerError`] if a payment cannot be recorded.
pub fn pay_projects(queue: &mut [BuildProject], pool: &mut ResourcePool) -> Result<Vec<ProjectPayment>, LedgerError> {
    let mut payments = Vec::new();

    for project in queue.iter_mut() {
        let mut paid = BTreeMap::new();
        let resources: Vec<Resource> = project.cost.keys().copied().collect();
        for resource in resources {
            let outstanding = project.outstanding(resource);
            if outstanding == 0 {
                continue;
            }
            let amount = pool.withdraw_up_to(
                resource,
                outstanding,
                LedgerEntryType::BuildInvestment,
                project.structure.as_str(),
            )?;
            if amount > 0 {
                let invested = project.invested.entry(resource).or_insert(0);
                *invested = invested.saturating_add(amount);
                paid.insert(resource, amount);
            }
        }
        if !paid.is_empty() {
            payments.push(ProjectPayment {
                project_id: project.id,
                paid,
            });
        }
    }

    Ok(payments)
}

/// Grant `structure` to `settlement_id`, repairing a damaged copy if one
/// exists. Returns `false` if the settlement is gone.
pub fn grant_structure(kingdom: &mut Kingdom, settlement_id: SettlementId, structure: &StructureKey) -> bool {
    let Some(settlement) = kingdom.settlement_mut(settlement_id) else {
        return false;
    };
    match settlement.structures.iter_mut().find(|s| &s.key == structure) {
        Some(existing) => existing.damaged = false,
        None => settlement.structures.push(BuiltStructure {
            key: structure.clone(),
            damaged: false,
        }),
    }
    true
}

/// Run the build queue pass against the kingdom.
///
/// # Errors
///
/// Returns [`EconomyError::ConservationViolated`] if the pass's ledger
/// does not balance, or [`EconomyError::Ledger`] if a debit cannot be
/// recorded.
pub fn process_build_queue(kingdom: &mut Kingdom) -> Result<BuildReport, EconomyError> {
    let mut report = BuildReport::default();
    let mut pool = ResourcePool::from_kingdom(kingdom);

    let settlements: Vec<SettlementId> = kingdom.settlements.iter().map(|s| s.id).collect();
    let mut queue = std::mem::take(&mut kingdom.build_queue);
    queue.retain(|project| {
        let keep = settlements.contains(&project.settlement_id);
        if !keep {
            warn!(project = %project.id, structure = %project.structure, "dropping project for missing settlement");
            report.dropped.push(project.id);
        }
        keep
    });

    report.payments = pay_projects(&mut queue, &mut pool)?;

    let (done, pending): (Vec<BuildProject>, Vec<BuildProject>) =
        queue.into_iter().partition(BuildProject::is_complete);
    kingdom.build_queue = pending;

    report.ledger = close_pool(pool, kingdom)?;

    for project in done {
        grant_structure(kingdom, project.settlement_id, &project.structure);
        debug!(structure = %project.structure, settlement = %project.settlement_id, "project completed");
        report.completed.push(CompletedProject {
            project_id: project.id,
            structure: project.structure,
            settlement_id: project.settlement_id,
        });
    }

    info!(
        turn = kingdom.turn,
        paid = report.payments.len(),
        completed = report.completed.len(),
        remaining = kingdom.build_queue.len(),
        "build queue processed"
    );
    Ok(report)
}

/// Append a project for `structure` in `settlement_id` to the queue.
///
/// # Errors
///
/// Returns [`EconomyError`] if the structure is unknown, the settlement is
/// missing, an undamaged copy already stands there, or the same structure
/// is already queued for that settlement.
pub fn queue_project(
    kingdom: &mut Kingdom,
    catalog: &Catalog,
    structure: &StructureKey,
    settlement_id: SettlementId,
) -> Result<ProjectId, EconomyError> {
    let blueprint = catalog.structure(structure)?;
    let settlement = kingdom
        .settlement(settlement_id)
        .ok_or(EconomyError::SettlementNotFound(settlement_id))?;

    if settlement
        .structures
        .iter()
        .any(|s| &s.key == structure && !s.damaged)
    {
        return Err(EconomyError::StructureAlreadyBuilt {
            structure: structure.clone(),
            settlement: settlement_id,
        });
    }
    if kingdom
        .build_queue
        .iter()
        .any(|p| &p.structure == structure && p.settlement_id == settlement_id)
    {
        return Err(EconomyError::AlreadyQueued {
            structure: structure.clone(),
            settlement: settlement_id,
        });
    }

    let project = BuildProject::new(structure.clone(), settlement_id, blueprint.cost.clone());
    let id = project.id;
    info!(project = %id, structure = %structure, settlement = %settlement.name, "project queued");
    kingdom.build_queue.push(project);
    Ok(id)
}

/// Remove a project and refund exactly what it had received.
///
/// # Errors
///
/// Returns [`EconomyError::ProjectNotFound`] if the project is not queued.
pub fn cancel_project(
    kingdom: &mut Kingdom,
    project_id: ProjectId,
) -> Result<BTreeMap<Resource, u32>, EconomyError> {
    let position = kingdom
        .build_queue
        .iter()
        .position(|p| p.id == project_id)
        .ok_or(EconomyError::ProjectNotFound(project_id))?;
    let project = kingdom.build_queue.remove(position);

    let mut pool = ResourcePool::from_kingdom(kingdom);
    for (resource, amount) in &project.invested {
        pool.deposit(*resource, *amount, LedgerEntryType::BuildRefund, project.structure.as_str())?;
    }
    close_pool(pool, kingdom)?;

    info!(project = %project_id, structure = %project.structure, "project cancelled");
    Ok(project.invested)
}
