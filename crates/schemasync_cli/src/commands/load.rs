//! Load a dump directory into a branch given by URL.

use super::Context;
use crate::http_client::connect_url;
use crate::terminal::TerminalDecisions;
use schemasync_engine::Importer;
use schemasync_protocol::BranchUrl;
use std::io;
use std::path::Path;

/// Runs the load command.
pub fn run(ctx: &Context, branch_url: &str, input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let url = BranchUrl::parse(branch_url).map_err(|e| format!("Invalid branch URL: {}", e))?;
    let branch = url.branch_ref()?;
    let remote = connect_url(&ctx.http, &url.base_url)?;
    let decisions = TerminalDecisions::stdio();

    let summary =
        Importer::new(&remote, &decisions).load_branch(&branch, input, ctx.approval(), &mut io::stdout())?;
    let records: usize = summary.tables.iter().map(|t| t.records).sum();
    println!(
        "Loaded {} records into {} tables of [{}]",
        records,
        summary.tables.len(),
        branch
    );
    Ok(())
}
