//! CLI command implementations.

pub mod deploy;
pub mod dump;
pub mod load;
pub mod log;
pub mod pull;
pub mod random_data;
pub mod status;

use crate::git;
use crate::http_client::{connect_workspace, HttpConfig, ReqwestClient};
use crate::settings::Settings;
use schemasync_engine::{Approval, EngineConfig, HttpRemote};
use schemasync_protocol::BranchRef;
use std::error::Error;
use std::path::PathBuf;

/// Options shared by every command.
pub struct Context {
    /// Project directory holding `config.json` and the schema file.
    pub dir: PathBuf,
    /// Apply migrations without asking.
    pub yes: bool,
    /// Connection settings.
    pub http: HttpConfig,
    /// Engine tuning.
    pub engine: EngineConfig,
}

impl Context {
    /// Migration approval policy.
    pub fn approval(&self) -> Approval {
        if self.yes {
            Approval::AutoApprove
        } else {
            Approval::Prompt
        }
    }

    /// Reads the project settings.
    pub fn settings(&self) -> Result<Settings, Box<dyn Error>> {
        Ok(Settings::read(&self.dir)?)
    }

    /// The database branch matching the current git branch.
    pub fn project_branch(&self, settings: &Settings) -> Result<BranchRef, Box<dyn Error>> {
        let git_branch = git::repo_and_branch().map(|(_, branch)| branch);
        let branch = git::database_branch(git_branch.as_deref());
        Ok(BranchRef::new(settings.db_name.clone(), branch)?)
    }

    /// Remote service of the project's workspace.
    pub fn connect(&self, settings: &Settings) -> Result<HttpRemote<ReqwestClient>, Box<dyn Error>> {
        connect_workspace(&self.http, settings.workspace_id()?)
    }
}
