//! Pokemon GO type chart and dual-type composition.
//!
//! GO uses the main-series chart but with its own multipliers, and battle
//! immunities become a flat double resist instead of zero damage.

use phf::phf_map;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

pub const SUPER_EFFECTIVE: f64 = 1.6;
pub const NOT_VERY_EFFECTIVE: f64 = 0.625;
pub const IMMUNE: f64 = 0.390625;
pub const NEUTRAL: f64 = 1.0;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    Normal,
    Fire,
    Water,
    Electric,
    Grass,
    Ice,
    Fighting,
    Poison,
    Ground,
    Flying,
    Psychic,
    Bug,
    Rock,
    Ghost,
    Dragon,
    Dark,
    Steel,
    Fairy,
}

static TYPE_NAMES: phf::Map<&'static str, Type> = phf_map! {
    "normal" => Type::Normal,
    "fire" => Type::Fire,
    "water" => Type::Water,
    "electric" => Type::Electric,
    "grass" => Type::Grass,
    "ice" => Type::Ice,
    "fighting" => Type::Fighting,
    "poison" => Type::Poison,
    "ground" => Type::Ground,
    "flying" => Type::Flying,
    "psychic" => Type::Psychic,
    "bug" => Type::Bug,
    "rock" => Type::Rock,
    "ghost" => Type::Ghost,
    "dragon" => Type::Dragon,
    "dark" => Type::Dark,
    "steel" => Type::Steel,
    "fairy" => Type::Fairy,
};

impl Type {
    pub const ALL: [Type; 18] = [
        Type::Normal,
        Type::Fire,
        Type::Water,
        Type::Electric,
        Type::Grass,
        Type::Ice,
        Type::Fighting,
        Type::Poison,
        Type::Ground,
        Type::Flying,
        Type::Psychic,
        Type::Bug,
        Type::Rock,
        Type::Ghost,
        Type::Dragon,
        Type::Dark,
        Type::Steel,
        Type::Fairy,
    ];

    /// Case-insensitive lookup; anything unrecognized is `None`.
    pub fn from_name(name: &str) -> Option<Type> {
        let key = name.trim().to_ascii_lowercase();
        TYPE_NAMES.get(key.as_str()).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Type::Normal => "normal",
            Type::Fire => "fire",
            Type::Water => "water",
            Type::Electric => "electric",
            Type::Grass => "grass",
            Type::Ice => "ice",
            Type::Fighting => "fighting",
            Type::Poison => "poison",
            Type::Ground => "ground",
            Type::Flying => "flying",
            Type::Psychic => "psychic",
            Type::Bug => "bug",
            Type::Rock => "rock",
            Type::Ghost => "ghost",
            Type::Dragon => "dragon",
            Type::Dark => "dark",
            Type::Steel => "steel",
            Type::Fairy => "fairy",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How one attacking type classifies every defending type. Types missing
/// from all three lists are neutral.
#[derive(Clone, Copy, Debug)]
pub struct Matchup {
    pub super_effective: &'static [Type],
    pub not_very_effective: &'static [Type],
    pub immune: &'static [Type],
}

pub fn chart(attacking: Type) -> Matchup {
    use Type::*;
    let (super_effective, not_very_effective, immune): (&[Type], &[Type], &[Type]) =
        match attacking {
            Normal => (&[], &[Rock, Steel], &[Ghost]),
            Fire => (&[Grass, Ice, Bug, Steel], &[Fire, Water, Rock, Dragon], &[]),
            Water => (&[Fire, Ground, Rock], &[Water, Grass, Dragon], &[]),
            Electric => (&[Water, Flying], &[Electric, Grass, Dragon], &[Ground]),
            Grass => (
                &[Water, Ground, Rock],
                &[Fire, Grass, Poison, Flying, Bug, Dragon, Steel],
                &[],
            ),
            Ice => (&[Grass, Ground, Flying, Dragon], &[Fire, Water, Ice, Steel], &[]),
            Fighting => (
                &[Normal, Ice, Rock, Dark, Steel],
                &[Poison, Flying, Psychic, Bug, Fairy],
                &[Ghost],
            ),
            Poison => (&[Grass, Fairy], &[Poison, Ground, Rock, Ghost], &[Steel]),
            Ground => (
                &[Fire, Electric, Poison, Rock, Steel],
                &[Grass, Bug],
                &[Flying],
            ),
            Flying => (&[Grass, Fighting, Bug], &[Electric, Rock, Steel], &[]),
            Psychic => (&[Fighting, Poison], &[Psychic, Steel], &[Dark]),
            Bug => (
                &[Grass, Psychic, Dark],
                &[Fire, Fighting, Poison, Flying, Ghost, Steel, Fairy],
                &[],
            ),
            Rock => (&[Fire, Ice, Flying, Bug], &[Fighting, Ground, Steel], &[]),
            Ghost => (&[Ghost, Psychic], &[Dark], &[Normal]),
            Dragon => (&[Dragon], &[Steel], &[Fairy]),
            Dark => (&[Psychic, Ghost], &[Fighting, Dark, Fairy], &[]),
            Steel => (&[Rock, Ice, Fairy], &[Fire, Water, Electric, Steel], &[]),
            Fairy => (&[Fighting, Dragon, Dark], &[Fire, Poison, Steel], &[]),
        };
    Matchup {
        super_effective,
        not_very_effective,
        immune,
    }
}

pub fn single_type_multiplier(attacking: Type, defending: Type) -> f64 {
    let matchup = chart(attacking);
    if matchup.super_effective.contains(&defending) {
        SUPER_EFFECTIVE
    } else if matchup.not_very_effective.contains(&defending) {
        NOT_VERY_EFFECTIVE
    } else if matchup.immune.contains(&defending) {
        IMMUNE
    } else {
        NEUTRAL
    }
}

/// Rounds to 6 decimals so products like 1.6 * 1.6 compare equal to 2.56.
pub fn round_multiplier(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Multiplier of `attacking` against a (possibly dual-typed) defender.
/// A secondary type equal to the primary counts once.
pub fn effectiveness(attacking: Type, primary: Type, secondary: Option<Type>) -> f64 {
    let mut multiplier = single_type_multiplier(attacking, primary);
    if let Some(second) = secondary.filter(|t| *t != primary) {
        multiplier *= single_type_multiplier(attacking, second);
    }
    round_multiplier(multiplier)
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TypeMultiplier {
    #[serde(rename = "type")]
    pub kind: Type,
    pub multiplier: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DefensiveMatchups {
    pub weaknesses: Vec<TypeMultiplier>,
    pub resistances: Vec<TypeMultiplier>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OffensiveMatchups {
    pub super_effective: Vec<TypeMultiplier>,
    pub resisted: Vec<TypeMultiplier>,
}

fn by_multiplier_desc(lhs: &TypeMultiplier, rhs: &TypeMultiplier) -> Ordering {
    rhs.multiplier
        .total_cmp(&lhs.multiplier)
        .then_with(|| lhs.kind.name().cmp(rhs.kind.name()))
}

fn by_multiplier_asc(lhs: &TypeMultiplier, rhs: &TypeMultiplier) -> Ordering {
    lhs.multiplier
        .total_cmp(&rhs.multiplier)
        .then_with(|| lhs.kind.name().cmp(rhs.kind.name()))
}

pub fn defensive_profile(primary: Type, secondary: Option<Type>) -> DefensiveMatchups {
    let mut weaknesses = Vec::new();
    let mut resistances = Vec::new();
    for attacking in Type::ALL {
        let multiplier = effectiveness(attacking, primary, secondary);
        let entry = TypeMultiplier {
            kind: attacking,
            multiplier,
        };
        if multiplier > NEUTRAL {
            weaknesses.push(entry);
        } else if multiplier < NEUTRAL {
            resistances.push(entry);
        }
    }
    weaknesses.sort_by(by_multiplier_desc);
    resistances.sort_by(by_multiplier_asc);
    DefensiveMatchups {
        weaknesses,
        resistances,
    }
}

/// String-facing entry point. An unknown primary type yields empty lists; an
/// unknown secondary type is ignored.
pub fn defensive_matchups(type1: &str, type2: Option<&str>) -> DefensiveMatchups {
    let Some(primary) = Type::from_name(type1) else {
        return DefensiveMatchups::default();
    };
    let secondary = type2.and_then(Type::from_name);
    defensive_profile(primary, secondary)
}

pub fn offensive_matchups(attacking: &str) -> OffensiveMatchups {
    let Some(attacking) = Type::from_name(attacking) else {
        return OffensiveMatchups::default();
    };
    let mut super_effective = Vec::new();
    let mut resisted = Vec::new();
    for defending in Type::ALL {
        let multiplier = single_type_multiplier(attacking, defending);
        let entry = TypeMultiplier {
            kind: defending,
            multiplier,
        };
        if multiplier > NEUTRAL {
            super_effective.push(entry);
        } else if multiplier < NEUTRAL {
            resisted.push(entry);
        }
    }
    super_effective.sort_by(by_multiplier_desc);
    resisted.sort_by(by_multiplier_asc);
    OffensiveMatchups {
        super_effective,
        resisted,
    }
}
