//! Backward traversal of applied migrations across fork boundaries.

use crate::cancel::CancelToken;
use crate::config::EngineConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::RemoteService;
use schemasync_protocol::{BranchRef, HistoryRequest, Migration, StartedFrom};
use std::collections::HashSet;
use tracing::debug;

/// One entry of a lineage walk.
#[derive(Debug, Clone, PartialEq)]
pub enum LineageEntry {
    /// An applied migration of `branch`.
    Migration {
        /// Branch the migration was applied to.
        branch: String,
        /// The migration.
        migration: Migration,
    },
    /// `branch` was created by forking another branch.
    Origin {
        /// The forked branch.
        branch: String,
        /// Where it was forked from.
        origin: StartedFrom,
    },
}

/// Walks migration history, newest first.
pub struct LineageWalker<'a, R: ?Sized> {
    remote: &'a R,
    config: &'a EngineConfig,
    cancel: CancelToken,
}

impl<'a, R: RemoteService + ?Sized> LineageWalker<'a, R> {
    /// Creates a walker.
    pub fn new(remote: &'a R, config: &'a EngineConfig) -> Self {
        Self {
            remote,
            config,
            cancel: CancelToken::new(),
        }
    }

    /// Uses `cancel` to stop the walk between requests.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Collects the migrations of `branch`, newest first.
    ///
    /// Each branch's migrations are followed by an origin entry if the branch
    /// was forked. With `follow`, the walk continues in the origin branch from
    /// the migration the fork was taken at.
    pub fn walk(&self, branch: &BranchRef, follow: bool) -> SyncResult<Vec<LineageEntry>> {
        let mut entries = Vec::new();
        let mut visited_branches = HashSet::new();
        let mut seen_migrations = HashSet::new();
        let mut work = vec![(branch.clone(), None::<String>)];

        while let Some((current, start_from)) = work.pop() {
            if !visited_branches.insert(current.branch().to_string()) {
                return Err(SyncError::conflict(format!(
                    "branch lineage loops back to [{}]",
                    current.branch()
                )));
            }
            if visited_branches.len() > self.config.max_lineage_hops {
                return Err(SyncError::conflict(format!(
                    "branch lineage exceeds {} branches",
                    self.config.max_lineage_hops
                )));
            }

            let origin = self.walk_branch(&current, start_from, &mut seen_migrations, &mut entries)?;

            if let Some(origin) = origin {
                entries.push(LineageEntry::Origin {
                    branch: current.branch().to_string(),
                    origin: origin.clone(),
                });
                if follow {
                    let next = current.with_branch(origin.branch_name)?;
                    work.push((next, Some(origin.migration_id)));
                }
            }
        }

        Ok(entries)
    }

    fn walk_branch(
        &self,
        branch: &BranchRef,
        start_from: Option<String>,
        seen_migrations: &mut HashSet<String>,
        entries: &mut Vec<LineageEntry>,
    ) -> SyncResult<Option<StartedFrom>> {
        let mut cursor = start_from;
        let mut origin = None;

        loop {
            self.cancel.check()?;
            let request = HistoryRequest {
                start_from: cursor.clone(),
                limit: self.config.history_page_size,
            };
            let page = self.remote.migration_history(branch, &request)?;
            debug!(branch = %branch, count = page.migrations.len(), "history page");

            if page.started_from.is_some() {
                origin = page.started_from;
            }
            let next = match page.migrations.last() {
                Some(last) => last.parent_id.clone(),
                None => break,
            };

            for migration in page.migrations {
                if let Some(id) = &migration.id {
                    if !seen_migrations.insert(id.clone()) {
                        return Err(SyncError::conflict(format!(
                            "migration [{}] appears twice in the history of [{}]",
                            id, branch
                        )));
                    }
                }
                entries.push(LineageEntry::Migration {
                    branch: branch.branch().to_string(),
                    migration,
                });
            }

            match next {
                Some(parent) => cursor = Some(parent),
                None => break,
            }
        }

        Ok(origin)
    }
}
