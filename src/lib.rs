// src/lib.rs

pub mod cli;
pub mod command;
pub mod config;
pub mod errors;
pub mod logging;
pub mod poll;
pub mod remote;
pub mod runner;
pub mod sched;

use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::TaskList;
use crate::errors::Result;
use crate::runner::{Runner, RunnerOptions, Transport};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - task list loading + validation
/// - runner options from the CLI
/// - stage-by-stage execution
pub async fn run(args: CliArgs) -> Result<()> {
    let path = PathBuf::from(&args.tasklist);
    let tasklist = load_and_validate(&path)?;

    if args.dry_run {
        print_dry_run(&tasklist);
        return Ok(());
    }

    let options = RunnerOptions {
        transport: Transport::Ssh {
            default_user: args.remote_user.clone(),
        },
        tick: Duration::from_millis(args.tick_ms.max(1)),
    };

    let summary = Runner::new(tasklist, options).run().await?;

    if summary.total_jobs() == 0 {
        info!(tasklist = %summary.tasklist, "nothing to deploy");
    } else {
        info!(
            tasklist = %summary.tasklist,
            stages = summary.stages.len(),
            jobs = summary.total_jobs(),
            "deployment completed"
        );
    }
    Ok(())
}

/// Simple dry-run output: print stages, jobs, chains and hosts.
fn print_dry_run(tl: &TaskList) {
    println!("rollout dry-run: {}", tl.name);
    println!("stages ({}):", tl.stages.len());

    for stage in &tl.stages {
        println!("  - {}", stage.name);
        println!("      concurrency: {}", stage.concurrency);
        if let Some(cap) = stage.concurrency_per_host {
            println!("      concurrency_per_host: {cap}");
        }
        if stage.tasks.is_empty() {
            println!("      (no tasks)");
            continue;
        }
        for entry in &stage.tasks {
            let defs = entry.defs();
            if defs.len() > 1 {
                println!("      chain:");
            }
            for def in defs {
                let indent = if defs.len() > 1 { "        " } else { "      " };
                let host = def.remote_host.as_deref().unwrap_or("local");
                println!("{indent}{} on {host}", def.command);
            }
        }
    }
}
