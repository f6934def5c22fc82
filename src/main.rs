//! steamrail - command-line driver for the rules kernel
//!
//! Runs games against the stateless engine the same way an embedding UI
//! would: every step passes the previous snapshot back in and keeps only
//! the returned one.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use steamrail::core::PlayerId;
use steamrail::engine::EngineDelegator;

#[derive(Parser)]
#[command(name = "steamrail", about = "Rail delivery rules kernel", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play a game, from a script or by passing every turn
    Run {
        /// Variant to play
        #[arg(long, default_value = "heartland")]
        variant: String,

        /// Number of players
        #[arg(long, default_value_t = 3)]
        players: usize,

        /// Seed for the game's random stream
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// JSON-lines action script; without one, every turn passes
        #[arg(long)]
        script: Option<PathBuf>,

        /// Print the engine log as the game runs
        #[arg(long)]
        verbose: bool,
    },
    /// List registered variants
    Variants,
}

/// One scripted step: `{"action": "build", "data": {...}}` per line.
#[derive(Deserialize)]
struct ScriptStep {
    action: String,
    #[serde(default)]
    data: Value,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let delegator = EngineDelegator::with_standard_variants();

    match cli.command {
        Command::Run {
            variant,
            players,
            seed,
            script,
            verbose,
        } => run(&delegator, &variant, players, seed, script, verbose),
        Command::Variants => {
            for key in delegator.variant_keys() {
                println!("{key}");
            }
            Ok(())
        }
    }
}

fn run(
    delegator: &EngineDelegator,
    variant: &str,
    players: usize,
    seed: u64,
    script: Option<PathBuf>,
    verbose: bool,
) -> anyhow::Result<()> {
    let ids: Vec<PlayerId> = (0..players as u32).map(PlayerId::new).collect();
    let mut result = delegator
        .start(variant, &ids, seed)
        .context("starting the game")?;
    print_logs(&result.logs, verbose);

    match script {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading script {}", path.display()))?;
            for (lineno, line) in text.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                let step: ScriptStep = serde_json::from_str(line)
                    .with_context(|| format!("script line {}", lineno + 1))?;
                if result.has_ended {
                    bail!("script line {} comes after the game ended", lineno + 1);
                }
                result = delegator
                    .process_action(variant, &result.snapshot, &step.action, &step.data)
                    .with_context(|| format!("script line {}", lineno + 1))?;
                print_logs(&result.logs, verbose);
            }
        }
        None => {
            // Passing is always legal on your turn, so this terminates at
            // the round limit. The cap is a backstop against a variant
            // whose phase plan never ends.
            let mut steps = 0u32;
            while !result.has_ended {
                steps += 1;
                if steps > 100_000 {
                    bail!("game did not end after {steps} passes");
                }
                result = delegator
                    .process_action(variant, &result.snapshot, "pass", &Value::Null)
                    .context("passing")?;
                print_logs(&result.logs, verbose);
            }
        }
    }

    print_standings(&result.snapshot)?;
    Ok(())
}

fn print_logs(logs: &[String], verbose: bool) {
    if verbose {
        for line in logs {
            println!("{line}");
        }
    }
}

fn print_standings(snapshot: &str) -> anyhow::Result<()> {
    #[derive(Deserialize)]
    struct PlayerRow {
        id: PlayerId,
        money: i64,
        loco: u8,
    }

    let parsed: Value = serde_json::from_str(snapshot).context("parsing final snapshot")?;
    let players: Vec<PlayerRow> = serde_json::from_value(
        parsed
            .get("players")
            .cloned()
            .context("final snapshot has no players")?,
    )?;

    println!("Final standings:");
    for p in players {
        println!("  Player {}: {} money, locomotive level {}", p.id, p.money, p.loco);
    }
    Ok(())
}
