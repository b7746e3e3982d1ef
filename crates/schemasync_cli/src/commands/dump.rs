//! Dump a branch, given by URL, into a new directory.

use super::Context;
use crate::http_client::connect_url;
use schemasync_engine::Exporter;
use schemasync_protocol::BranchUrl;
use std::io;
use std::path::Path;

/// Runs the dump command.
pub fn run(ctx: &Context, branch_url: &str, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let url = BranchUrl::parse(branch_url).map_err(|e| format!("Invalid branch URL: {}", e))?;
    let branch = url.branch_ref()?;
    let remote = connect_url(&ctx.http, &url.base_url)?;

    let summary = Exporter::new(&remote, &ctx.engine).dump_branch(&branch, output, &mut io::stdout())?;
    let records: usize = summary.tables.iter().map(|t| t.records).sum();
    println!(
        "Dumped {} records from {} tables of [{}]",
        records,
        summary.tables.len(),
        branch
    );
    Ok(())
}
