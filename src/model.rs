//! Plain data records exchanged with the service layer, and their
//! normalization into the canonical forms the simulator runs on.

use crate::error::PvpError;
use crate::stats::{find_highest_level_under_cap, level_entry, BaseStats, Ivs, LeagueCap, StatProfile};
use crate::types::Type;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

pub const MAX_ENERGY: u32 = 100;
pub const DEFAULT_SHIELDS: u32 = 2;
pub const TURN_MS: f64 = 500.0;

const DEFAULT_FAST_POWER: f64 = 5.0;
const DEFAULT_FAST_ENERGY_GAIN: u32 = 8;
const DEFAULT_CHARGED_POWER: f64 = 70.0;
const DEFAULT_CHARGED_ENERGY_COST: u32 = 50;
const DEFAULT_STAT: f64 = 100.0;

/// Accepts a JSON number or a numeric string; anything else reads as absent.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }))
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveKind {
    Fast,
    Charged,
}

impl MoveKind {
    /// Charged moves resolve before fast moves within a turn.
    pub fn priority(self) -> u8 {
        match self {
            MoveKind::Charged => 2,
            MoveKind::Fast => 1,
        }
    }
}

/// A move as supplied by the move-pool source. Either `turns` or
/// `durationMs` may describe its length, and energy may come as explicit
/// gain/cost or as a signed delta.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMove {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub move_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub power: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub energy_gain: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub energy_cost: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub energy_delta: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub turns: Option<f64>,
    #[serde(default, alias = "duration", deserialize_with = "lenient_number")]
    pub duration_ms: Option<f64>,
    #[serde(flatten, default)]
    pub extras: HashMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub move_type: Option<Type>,
    pub kind: MoveKind,
    pub power: f64,
    pub energy_gain: u32,
    pub energy_cost: u32,
    pub turns: u32,
}

fn energy_amount(value: f64) -> u32 {
    value.abs().round().min(MAX_ENERGY as f64) as u32
}

fn turns_of(raw: &RawMove) -> u32 {
    if let Some(turns) = finite(raw.turns).filter(|t| *t >= 0.0) {
        return (turns.round() as u32).max(1);
    }
    if let Some(ms) = finite(raw.duration_ms).filter(|ms| *ms >= 0.0) {
        return ((ms / TURN_MS).round() as u32).max(1);
    }
    1
}

impl Move {
    pub fn normalize(raw: &RawMove, kind: MoveKind) -> Self {
        let fallback = match kind {
            MoveKind::Fast => "fast",
            MoveKind::Charged => "charged",
        };
        let id = raw
            .id
            .clone()
            .or_else(|| raw.name.as_ref().map(|n| n.trim().to_ascii_lowercase().replace(' ', "_")))
            .unwrap_or_else(|| fallback.to_string());
        let name = raw.name.clone().unwrap_or_else(|| id.clone());
        let move_type = raw.move_type.as_deref().and_then(Type::from_name);
        let delta = finite(raw.energy_delta);
        let (power, energy_gain, energy_cost) = match kind {
            MoveKind::Fast => (
                finite(raw.power).map_or(DEFAULT_FAST_POWER, |p| p.max(0.0)),
                finite(raw.energy_gain)
                    .or(delta)
                    .map_or(DEFAULT_FAST_ENERGY_GAIN, energy_amount),
                0,
            ),
            MoveKind::Charged => (
                finite(raw.power).map_or(DEFAULT_CHARGED_POWER, |p| p.max(0.0)),
                0,
                finite(raw.energy_cost)
                    .or(delta)
                    .map_or(DEFAULT_CHARGED_ENERGY_COST, energy_amount),
            ),
        };
        Self {
            id,
            name,
            move_type,
            kind,
            power,
            energy_gain,
            energy_cost,
            turns: turns_of(raw),
        }
    }
}

/// One side of a battle request: already level/IV-resolved stats plus a
/// move set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatantInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "type1")]
    pub primary_type: Option<String>,
    #[serde(default, alias = "type2")]
    pub secondary_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub atk: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub def: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub hp: Option<f64>,
    #[serde(default)]
    pub fast_move: RawMove,
    #[serde(default)]
    pub charged_moves: Vec<RawMove>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub start_energy: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub shields: Option<f64>,
}

/// Canonical combatant; every numeric field is defined.
#[derive(Debug, Clone, PartialEq)]
pub struct Combatant {
    pub name: String,
    pub primary_type: Option<Type>,
    pub secondary_type: Option<Type>,
    pub atk: f64,
    pub def: f64,
    pub max_hp: u32,
    pub fast_move: Move,
    pub charged_moves: Vec<Move>,
    pub start_energy: u32,
    pub shields: u32,
}

impl Combatant {
    pub fn from_input(input: &CombatantInput, fallback_name: &str) -> Self {
        let stat = |v: Option<f64>| finite(v).filter(|x| *x > 0.0).unwrap_or(DEFAULT_STAT);
        let mut primary_type = input.primary_type.as_deref().and_then(Type::from_name);
        let mut secondary_type = input.secondary_type.as_deref().and_then(Type::from_name);
        if primary_type.is_none() {
            primary_type = secondary_type.take();
        }
        if secondary_type == primary_type {
            secondary_type = None;
        }
        Self {
            name: input
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| fallback_name.to_string()),
            primary_type,
            secondary_type,
            atk: stat(input.atk),
            def: stat(input.def),
            max_hp: (stat(input.hp).floor() as u32).max(1),
            fast_move: Move::normalize(&input.fast_move, MoveKind::Fast),
            charged_moves: input
                .charged_moves
                .iter()
                .map(|raw| Move::normalize(raw, MoveKind::Charged))
                .collect(),
            start_energy: finite(input.start_energy)
                .map_or(0, |e| e.clamp(0.0, MAX_ENERGY as f64).round() as u32),
            shields: finite(input.shields).map_or(DEFAULT_SHIELDS, |s| s.max(0.0).round() as u32),
        }
    }

    pub fn has_type(&self, kind: Type) -> bool {
        self.primary_type == Some(kind) || self.secondary_type == Some(kind)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleRequest {
    pub left: CombatantInput,
    pub right: CombatantInput,
    #[serde(default)]
    pub max_turns: Option<i64>,
}

/// Species record from the Pokedex data source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesRecord {
    pub name: String,
    #[serde(default, alias = "type1")]
    pub primary_type: Option<String>,
    #[serde(default, alias = "type2")]
    pub secondary_type: Option<String>,
    #[serde(flatten)]
    pub base: BaseStats,
}

/// How to pick the level of a species-derived combatant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LevelChoice {
    Exact(f64),
    BestUnder(LeagueCap),
}

impl SpeciesRecord {
    pub fn new(name: impl Into<String>, atk: f64, def: f64, hp: f64) -> Self {
        Self {
            name: name.into(),
            primary_type: None,
            secondary_type: None,
            base: BaseStats::new(atk, def, hp),
        }
    }

    pub fn with_types(mut self, primary: &str, secondary: Option<&str>) -> Self {
        self.primary_type = Some(primary.to_string());
        self.secondary_type = secondary.map(str::to_string);
        self
    }

    pub fn stat_profile(&self, ivs: Ivs, level: LevelChoice) -> Result<StatProfile, PvpError> {
        let base = self
            .base
            .resolve()
            .ok_or_else(|| PvpError::MissingStats(self.name.clone()))?;
        let entry = match level {
            LevelChoice::Exact(level) => level_entry(level).ok_or(PvpError::InvalidLevel(level))?,
            LevelChoice::BestUnder(cap) => find_highest_level_under_cap(base, ivs, cap).ok_or_else(
                || PvpError::NoLevelUnderCap {
                    species: self.name.clone(),
                    cap: cap.label(),
                },
            )?,
        };
        Ok(StatProfile::at(base, ivs, entry))
    }

    /// Battle-ready descriptor at the given stat profile.
    pub fn combatant(
        &self,
        profile: &StatProfile,
        fast_move: RawMove,
        charged_moves: Vec<RawMove>,
    ) -> CombatantInput {
        CombatantInput {
            name: Some(self.name.clone()),
            primary_type: self.primary_type.clone(),
            secondary_type: self.secondary_type.clone(),
            atk: Some(profile.atk),
            def: Some(profile.def),
            hp: Some(profile.hp as f64),
            fast_move,
            charged_moves,
            start_energy: None,
            shields: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> RawMove {
        serde_json::from_str(json).expect("raw move json")
    }

    #[test]
    fn fast_move_defaults() {
        let mv = Move::normalize(&RawMove::default(), MoveKind::Fast);
        assert_eq!(mv.power, 5.0);
        assert_eq!(mv.energy_gain, 8);
        assert_eq!(mv.turns, 1);
        assert_eq!(mv.id, "fast");
    }

    #[test]
    fn charged_move_defaults() {
        let mv = Move::normalize(&RawMove::default(), MoveKind::Charged);
        assert_eq!(mv.power, 70.0);
        assert_eq!(mv.energy_cost, 50);
        assert_eq!(mv.turns, 1);
    }

    #[test]
    fn duration_converts_to_turns() {
        let mv = Move::normalize(&raw(r#"{"name":"Fire Spin","durationMs":1500}"#), MoveKind::Fast);
        assert_eq!(mv.turns, 3);
        assert_eq!(mv.id, "fire_spin");
        let short = Move::normalize(&raw(r#"{"duration":100}"#), MoveKind::Fast);
        assert_eq!(short.turns, 1);
        let explicit = Move::normalize(&raw(r#"{"turns":2,"durationMs":5000}"#), MoveKind::Fast);
        assert_eq!(explicit.turns, 2);
    }

    #[test]
    fn signed_energy_delta_is_accepted() {
        let fast = Move::normalize(&raw(r#"{"energyDelta":6}"#), MoveKind::Fast);
        assert_eq!(fast.energy_gain, 6);
        let charged = Move::normalize(&raw(r#"{"energyDelta":-45}"#), MoveKind::Charged);
        assert_eq!(charged.energy_cost, 45);
        let explicit = Move::normalize(&raw(r#"{"energyCost":35,"energyDelta":-45}"#), MoveKind::Charged);
        assert_eq!(explicit.energy_cost, 35);
    }

    #[test]
    fn malformed_numbers_fall_back() {
        let mv = Move::normalize(
            &raw(r#"{"power":"lots","energyCost":null,"turns":[1],"type":"Plasma"}"#),
            MoveKind::Charged,
        );
        assert_eq!(mv.power, 70.0);
        assert_eq!(mv.energy_cost, 50);
        assert_eq!(mv.turns, 1);
        assert_eq!(mv.move_type, None);
        let numeric_string = Move::normalize(&raw(r#"{"power":"90"}"#), MoveKind::Charged);
        assert_eq!(numeric_string.power, 90.0);
    }

    #[test]
    fn combatant_defaults_and_clamps() {
        let input: CombatantInput = serde_json::from_str(
            r#"{"type1":"Water","type2":"water","atk":-4,"hp":"88.9","startEnergy":250,"shields":-1}"#,
        )
        .expect("combatant json");
        let combatant = Combatant::from_input(&input, "left");
        assert_eq!(combatant.name, "left");
        assert_eq!(combatant.primary_type, Some(Type::Water));
        assert_eq!(combatant.secondary_type, None);
        assert_eq!(combatant.atk, 100.0);
        assert_eq!(combatant.def, 100.0);
        assert_eq!(combatant.max_hp, 88);
        assert_eq!(combatant.start_energy, 100);
        assert_eq!(combatant.shields, 0);
        assert_eq!(Combatant::from_input(&CombatantInput::default(), "x").shields, 2);
    }

    #[test]
    fn species_profile_errors_are_typed() {
        let missing = SpeciesRecord {
            name: "Missingno".into(),
            ..SpeciesRecord::default()
        };
        assert_eq!(
            missing.stat_profile(Ivs::PERFECT, LevelChoice::Exact(20.0)),
            Err(PvpError::MissingStats("Missingno".into()))
        );
        let charizard = SpeciesRecord::new("Charizard", 223.0, 173.0, 186.0);
        assert_eq!(
            charizard.stat_profile(Ivs::PERFECT, LevelChoice::Exact(20.25)),
            Err(PvpError::InvalidLevel(20.25))
        );
        assert!(matches!(
            charizard.stat_profile(Ivs::PERFECT, LevelChoice::BestUnder(LeagueCap::Capped(10))),
            Err(PvpError::NoLevelUnderCap { .. })
        ));
        let great = charizard
            .stat_profile(Ivs::PERFECT, LevelChoice::BestUnder(LeagueCap::GREAT))
            .expect("fits great league");
        assert!(great.cp <= 1500);
    }

    #[test]
    fn species_json_reads_nullable_stats() {
        let record: SpeciesRecord =
            serde_json::from_str(r#"{"name":"Bulbasaur","type1":"grass","atk":null,"def":111,"hp":128}"#)
                .expect("species json");
        assert_eq!(record.base.atk, None);
        assert_eq!(record.base.def, Some(111.0));
    }
}
