//! Seed the current branch with random records.

use super::Context;
use rand::rngs::StdRng;
use rand::SeedableRng;
use schemasync_engine::{seed_tables, CancelToken, RemoteService};
use std::io;

/// Runs the random-data command.
pub fn run(
    ctx: &Context,
    tables: &[String],
    records: usize,
    seed: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = ctx.settings()?;
    let branch = ctx.project_branch(&settings)?;
    let remote = ctx.connect(&settings)?;

    let details = remote
        .branch_details(&branch)?
        .ok_or_else(|| format!("branch [{}] does not exist", branch))?;

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    seed_tables(
        &remote,
        &branch,
        &details.schema,
        tables,
        records,
        &mut rng,
        &CancelToken::new(),
        &mut io::stdout(),
    )?;
    Ok(())
}
