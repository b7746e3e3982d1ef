//! Two-phase migration: compute a plan, confirm it, stamp it, apply it.

use crate::decision::{Approval, DecisionProvider};
use crate::error::{SyncError, SyncResult};
use crate::render::render_migration;
use crate::transport::RemoteService;
use chrono::{DateTime, Utc};
use schemasync_protocol::{BranchRef, Migration, MigrationPlan};
use schemasync_schema::Schema;
use std::io::Write;
use tracing::{debug, info};

/// Prompt used to confirm a migration.
pub const CONFIRM_PROMPT: &str = "Apply the above migration?";

/// The state of a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    /// Nothing requested yet.
    Idle,
    /// Waiting for the service to compute the plan.
    PlanRequested,
    /// The plan was received.
    PlanReceived,
    /// The plan was empty; nothing to do.
    NoOpDone,
    /// Waiting for the user to approve the plan.
    AwaitingConfirmation,
    /// The user declined the plan.
    Aborted,
    /// The plan carries the apply timestamp and git provenance.
    Stamped,
    /// The plan was executed.
    Applied,
}

impl MigrationState {
    fn can_transition_to(self, next: MigrationState) -> bool {
        use MigrationState::*;
        matches!(
            (self, next),
            (Idle, PlanRequested)
                | (PlanRequested, PlanReceived)
                | (PlanReceived, NoOpDone)
                | (PlanReceived, AwaitingConfirmation)
                | (AwaitingConfirmation, Aborted)
                | (AwaitingConfirmation, Stamped)
                | (Stamped, Applied)
        )
    }

    /// Returns true once the run has finished.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MigrationState::NoOpDone | MigrationState::Aborted | MigrationState::Applied
        )
    }
}

/// Git provenance of the local schema file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Provenance {
    /// Last commit of the working tree.
    pub git_revision: Option<String>,
    /// Whether the schema file has uncommitted changes.
    pub local_changes: bool,
}

/// How a migration run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum MigrationOutcome {
    /// The branch already matched the schema.
    UpToDate,
    /// The user declined the plan.
    Declined,
    /// The plan was applied.
    Applied(MigrationPlan),
}

/// Drives one migration of a branch towards a local schema.
pub struct Migrator<'a, R: ?Sized, D: ?Sized> {
    remote: &'a R,
    decisions: &'a D,
    state: MigrationState,
}

impl<'a, R, D> Migrator<'a, R, D>
where
    R: RemoteService + ?Sized,
    D: DecisionProvider + ?Sized,
{
    /// Creates a migrator in the `Idle` state.
    pub fn new(remote: &'a R, decisions: &'a D) -> Self {
        Self {
            remote,
            decisions,
            state: MigrationState::Idle,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> MigrationState {
        self.state
    }

    fn transition(&mut self, next: MigrationState) -> SyncResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(SyncError::conflict(format!(
                "invalid migration state transition from {:?} to {:?}",
                self.state, next
            )));
        }
        debug!(from = ?self.state, to = ?next, "migration state");
        self.state = next;
        Ok(())
    }

    /// Asks the service for the plan that moves `branch` to `schema`.
    ///
    /// Leaves the migrator in `NoOpDone` for an empty plan and in
    /// `AwaitingConfirmation` otherwise.
    pub fn compute_plan(&mut self, branch: &BranchRef, schema: &Schema) -> SyncResult<MigrationPlan> {
        self.transition(MigrationState::PlanRequested)?;
        let plan = self.remote.migration_plan(branch, schema)?;
        self.transition(MigrationState::PlanReceived)?;

        if plan.is_empty() {
            info!(branch = %branch, "schema is up to date");
            self.transition(MigrationState::NoOpDone)?;
        } else {
            info!(branch = %branch, "migration plan received");
            self.transition(MigrationState::AwaitingConfirmation)?;
        }
        Ok(plan)
    }

    /// Decides whether the pending plan may be applied.
    ///
    /// Declining moves the migrator to `Aborted` and is not an error. Asking
    /// for a prompt in a non-interactive session is a validation error.
    pub fn confirm(&mut self, approval: Approval) -> SyncResult<bool> {
        if self.state != MigrationState::AwaitingConfirmation {
            return Err(SyncError::conflict(format!(
                "no migration awaiting confirmation (state {:?})",
                self.state
            )));
        }
        let approved = match approval {
            Approval::AutoApprove => true,
            Approval::Prompt => {
                if !self.decisions.is_interactive() {
                    return Err(SyncError::validation(
                        "a migration must be confirmed, but the session is not interactive",
                    ));
                }
                self.decisions.confirm(CONFIRM_PROMPT, true)?
            }
        };
        if !approved {
            self.transition(MigrationState::Aborted)?;
        }
        Ok(approved)
    }

    /// Stamps the approved plan with the apply time and git provenance.
    pub fn stamp_plan(
        &mut self,
        plan: &mut MigrationPlan,
        provenance: Option<&Provenance>,
        at: DateTime<Utc>,
    ) -> SyncResult<()> {
        self.transition(MigrationState::Stamped)?;
        stamp(&mut plan.migration, provenance, at);
        Ok(())
    }

    /// Executes the stamped plan.
    pub fn apply(&mut self, branch: &BranchRef, plan: &MigrationPlan) -> SyncResult<()> {
        if self.state != MigrationState::Stamped {
            return Err(SyncError::conflict(format!(
                "migration applied before it was stamped (state {:?})",
                self.state
            )));
        }
        self.remote.execute_migration_plan(branch, plan)?;
        self.transition(MigrationState::Applied)?;
        info!(branch = %branch, "migration applied");
        Ok(())
    }

    /// Runs the whole protocol, writing the preview and progress to `out`.
    pub fn run<W: Write + ?Sized>(
        &mut self,
        branch: &BranchRef,
        schema: &Schema,
        approval: Approval,
        provenance: Option<&Provenance>,
        out: &mut W,
    ) -> SyncResult<MigrationOutcome> {
        let mut plan = self.compute_plan(branch, schema)?;
        if self.state == MigrationState::NoOpDone {
            writeln!(out, "Your schema is up to date.")?;
            return Ok(MigrationOutcome::UpToDate);
        }

        writeln!(out, "Migration plan preview:\n")?;
        write!(out, "{}", render_migration(&plan.migration))?;
        writeln!(out)?;

        if !self.confirm(approval)? {
            return Ok(MigrationOutcome::Declined);
        }

        self.stamp_plan(&mut plan, provenance, Utc::now())?;
        self.apply(branch, &plan)?;
        writeln!(out, "Done.")?;
        Ok(MigrationOutcome::Applied(plan))
    }
}

/// Records the apply time and, when a git revision is known, the provenance.
pub fn stamp(migration: &mut Migration, provenance: Option<&Provenance>, at: DateTime<Utc>) {
    if let Some(Provenance {
        git_revision: Some(sha),
        local_changes,
    }) = provenance
    {
        if !sha.is_empty() {
            migration.last_git_revision = Some(sha.clone());
            migration.local_changes = *local_changes;
        }
    }
    migration.created_at = Some(at);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{Answer, NonInteractive, ScriptedDecisions};
    use crate::transport::{MockRemote, RemoteCall};
    use chrono::TimeZone;

    fn branch() -> BranchRef {
        BranchRef::new("blog", "main").unwrap()
    }

    fn non_empty_plan() -> MigrationPlan {
        MigrationPlan::new(Migration {
            removed_tables: Some(vec!["drafts".into()]),
            ..Default::default()
        })
    }

    #[test]
    fn empty_plan_never_applies() {
        let remote = MockRemote::new();
        remote.push_plan(Ok(MigrationPlan::default()));
        let decisions = NonInteractive;
        let mut migrator = Migrator::new(&remote, &decisions);
        let mut out = Vec::new();

        let outcome = migrator
            .run(&branch(), &Schema::default(), Approval::Prompt, None, &mut out)
            .unwrap();

        assert_eq!(outcome, MigrationOutcome::UpToDate);
        assert_eq!(migrator.state(), MigrationState::NoOpDone);
        assert_eq!(remote.calls(), vec![RemoteCall::MigrationPlan("blog:main".into())]);
        assert_eq!(String::from_utf8(out).unwrap(), "Your schema is up to date.\n");
    }

    #[test]
    fn approved_plan_is_stamped_and_applied() {
        let remote = MockRemote::new();
        remote.push_plan(Ok(non_empty_plan()));
        let decisions = ScriptedDecisions::new([Answer::Confirm(true)]);
        let mut migrator = Migrator::new(&remote, &decisions);
        let provenance = Provenance {
            git_revision: Some("abc123".into()),
            local_changes: true,
        };
        let mut out = Vec::new();

        let outcome = migrator
            .run(
                &branch(),
                &Schema::default(),
                Approval::Prompt,
                Some(&provenance),
                &mut out,
            )
            .unwrap();

        assert!(matches!(outcome, MigrationOutcome::Applied(_)));
        assert_eq!(migrator.state(), MigrationState::Applied);
        assert_eq!(decisions.prompts(), [CONFIRM_PROMPT]);
        let executed = remote.executed_plans();
        assert_eq!(executed.len(), 1);
        let applied = &executed[0].migration;
        assert_eq!(applied.last_git_revision.as_deref(), Some("abc123"));
        assert!(applied.local_changes);
        assert!(applied.created_at.is_some());

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Migration plan preview:\n\nDELETE table drafts\n"));
        assert!(text.ends_with("Done.\n"));
    }

    #[test]
    fn declined_plan_is_not_applied() {
        let remote = MockRemote::new();
        remote.push_plan(Ok(non_empty_plan()));
        let decisions = ScriptedDecisions::new([Answer::Confirm(false)]);
        let mut migrator = Migrator::new(&remote, &decisions);

        let outcome = migrator
            .run(&branch(), &Schema::default(), Approval::Prompt, None, &mut std::io::sink())
            .unwrap();

        assert_eq!(outcome, MigrationOutcome::Declined);
        assert_eq!(migrator.state(), MigrationState::Aborted);
        assert!(remote.executed_plans().is_empty());
    }

    #[test]
    fn prompt_without_user_is_rejected() {
        let remote = MockRemote::new();
        remote.push_plan(Ok(non_empty_plan()));
        let mut migrator = Migrator::new(&remote, &NonInteractive);

        let err = migrator
            .run(&branch(), &Schema::default(), Approval::Prompt, None, &mut std::io::sink())
            .unwrap_err();

        assert!(matches!(err, SyncError::Validation(_)));
        assert!(remote.executed_plans().is_empty());
    }

    #[test]
    fn auto_approve_skips_the_prompt() {
        let remote = MockRemote::new();
        remote.push_plan(Ok(non_empty_plan()));
        let mut migrator = Migrator::new(&remote, &NonInteractive);

        let outcome = migrator
            .run(&branch(), &Schema::default(), Approval::AutoApprove, None, &mut std::io::sink())
            .unwrap();

        assert!(matches!(outcome, MigrationOutcome::Applied(_)));
        let applied = &remote.executed_plans()[0].migration;
        assert!(applied.last_git_revision.is_none());
    }

    #[test]
    fn plan_failure_is_fatal() {
        let remote = MockRemote::new();
        remote.push_plan(Err(SyncError::Unauthorized("bad key".into())));
        let mut migrator = Migrator::new(&remote, &NonInteractive);

        let err = migrator
            .run(&branch(), &Schema::default(), Approval::AutoApprove, None, &mut std::io::sink())
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(migrator.state(), MigrationState::PlanRequested);
    }

    #[test]
    fn apply_failure_propagates() {
        let remote = MockRemote::new();
        remote.push_plan(Ok(non_empty_plan()));
        remote.push_write_result(Err(SyncError::network(500, "boom")));
        let mut migrator = Migrator::new(&remote, &NonInteractive);

        let err = migrator
            .run(&branch(), &Schema::default(), Approval::AutoApprove, None, &mut std::io::sink())
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(migrator.state(), MigrationState::Stamped);
    }

    #[test]
    fn out_of_order_calls_are_rejected() {
        let remote = MockRemote::new();
        let mut migrator = Migrator::new(&remote, &NonInteractive);
        assert!(migrator.confirm(Approval::AutoApprove).is_err());
        assert!(migrator.apply(&branch(), &MigrationPlan::default()).is_err());
        assert!(remote.calls().is_empty());
    }

    #[test]
    fn stamp_skips_empty_revision() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let mut migration = Migration::default();
        let provenance = Provenance {
            git_revision: Some(String::new()),
            local_changes: true,
        };
        stamp(&mut migration, Some(&provenance), at);
        assert_eq!(migration.created_at, Some(at));
        assert!(migration.last_git_revision.is_none());
        assert!(!migration.local_changes);
    }

    #[test]
    fn terminal_states() {
        assert!(MigrationState::Applied.is_terminal());
        assert!(MigrationState::NoOpDone.is_terminal());
        assert!(!MigrationState::Stamped.is_terminal());
    }
}
