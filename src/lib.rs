pub mod battle;
pub mod error;
pub mod matrix;
pub mod model;
pub mod ranking;
pub mod stats;
pub mod types;

pub use crate::battle::{simulate_battle, BattleConfig, BattleResult};
pub use crate::error::PvpError;
pub use crate::ranking::{PvpIvResult, RankingCache};
pub use crate::stats::{Ivs, LeagueCap};
pub use crate::types::{defensive_matchups, Type};

use crate::matrix::RosterFile;
use crate::model::{BattleRequest, LevelChoice, SpeciesRecord};
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Simulate {
        input: PathBuf,
        max_turns: Option<i64>,
    },
    Rank {
        species: PathBuf,
        cap: LeagueCap,
        top: usize,
        ivs: Option<Ivs>,
    },
    Stats {
        species: PathBuf,
        ivs: Ivs,
        level: LevelChoice,
    },
    Matrix {
        roster: PathBuf,
        output: Option<PathBuf>,
    },
    Matchups {
        primary: String,
        secondary: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CliOptions {
    pub command: Command,
    pub verbose: bool,
}

fn load_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse JSON from {}", path.display()))
}

pub fn load_battle_request(path: &Path) -> anyhow::Result<BattleRequest> {
    load_json(path)
}

pub fn load_species(path: &Path) -> anyhow::Result<SpeciesRecord> {
    load_json(path)
}

pub fn load_roster(path: &Path) -> anyhow::Result<RosterFile> {
    load_json(path)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn run(opts: CliOptions) -> anyhow::Result<()> {
    match opts.command {
        Command::Simulate { input, max_turns } => {
            let request = load_battle_request(&input)?;
            let config = BattleConfig::clamped(max_turns.or(request.max_turns));
            let result = simulate_battle(&request.left, &request.right, &config);
            print_json(&result)
        }
        Command::Rank {
            species,
            cap,
            top,
            ivs,
        } => {
            let species = load_species(&species)?;
            let cache = RankingCache::new();
            match ivs {
                Some(ivs) => {
                    let lookup = cache.rank_of(&species, cap, ivs).with_context(|| {
                        format!(
                            "{}/{}/{} does not rank for {} under cap {}",
                            ivs.atk,
                            ivs.def,
                            ivs.hp,
                            species.name,
                            cap.label()
                        )
                    })?;
                    print_json(&lookup)
                }
                None => print_json(&cache.top_pvp_ivs(&species, cap, top)),
            }
        }
        Command::Stats {
            species,
            ivs,
            level,
        } => {
            let species = load_species(&species)?;
            let profile = species.stat_profile(ivs, level)?;
            print_json(&profile)
        }
        Command::Matrix { roster, output } => {
            let roster = load_roster(&roster)?;
            let matrix = matrix::compute_roster_matrix(&roster)?;
            match output {
                Some(path) => {
                    matrix::write_csv(&matrix, &path)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    log::info!(
                        "Wrote {}x{} matrix to {}",
                        matrix.len(),
                        matrix.first().map(|r| r.len()).unwrap_or(0),
                        path.display()
                    );
                    Ok(())
                }
                None => print_json(&matrix),
            }
        }
        Command::Matchups { primary, secondary } => {
            print_json(&defensive_matchups(&primary, secondary.as_deref()))
        }
    }
}
