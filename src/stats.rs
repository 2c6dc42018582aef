//! CP multiplier table and the GO stat/CP formulas.

use crate::error::PvpError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const MIN_LEVEL: f64 = 1.0;
pub const MAX_LEVEL: f64 = 50.0;
pub const MAX_IV: u8 = 15;

const LEVEL_TOLERANCE: f64 = 1e-6;

// Levels 1.0, 1.5, ..., 50.0.
const CP_MULTIPLIERS: [f64; 99] = [
    0.0939999967813492,
    0.135137430784308,
    0.166397869586944,
    0.192650914456886,
    0.215732470154762,
    0.236572655026622,
    0.255720049142837,
    0.273530381100769,
    0.290249884128570,
    0.306057381335773,
    0.321087598800659,
    0.335445032295077,
    0.349212676286697,
    0.362457748778790,
    0.375235587358474,
    0.387592411085168,
    0.399567276239395,
    0.411193549517250,
    0.422500014305114,
    0.432926413410414,
    0.443107545375824,
    0.453059953871985,
    0.462798386812210,
    0.472336077786704,
    0.481684952974319,
    0.490855810259008,
    0.499858438968658,
    0.508701756943992,
    0.517393946647644,
    0.525942508771329,
    0.534354329109191,
    0.542635762230353,
    0.550792694091796,
    0.558830599438087,
    0.566754519939422,
    0.574569148039264,
    0.582278907299041,
    0.589887911977272,
    0.597400009632110,
    0.604823657502073,
    0.612157285213470,
    0.619404110566050,
    0.626567125320434,
    0.633649181622743,
    0.640652954578399,
    0.647580963301656,
    0.654435634613037,
    0.661219263506722,
    0.667934000492096,
    0.674581899290818,
    0.681164920330047,
    0.687684905887771,
    0.694143652915954,
    0.700542893277978,
    0.706884205341339,
    0.713169102333341,
    0.719399094581604,
    0.725575616972598,
    0.731700003147125,
    0.734741011137376,
    0.737769484519958,
    0.740785574597326,
    0.743789434432983,
    0.746781208702482,
    0.749761044979095,
    0.752729105305821,
    0.755685508251190,
    0.758630366519684,
    0.761563837528228,
    0.764486065255226,
    0.767397165298461,
    0.770297273971590,
    0.773186504840850,
    0.776064945942412,
    0.778932750225067,
    0.781790064808426,
    0.784636974334716,
    0.787473583646825,
    0.790300011634826,
    0.792803950958807,
    0.795300006866455,
    0.797803921486970,
    0.800300002098083,
    0.802803892322847,
    0.805299997329711,
    0.807803863460723,
    0.810299992561340,
    0.812803834895026,
    0.815299987792968,
    0.817803806620319,
    0.820299983024597,
    0.822803778631297,
    0.825299978256225,
    0.827803750922782,
    0.830299973487854,
    0.832803753381377,
    0.835300028324127,
    0.837803755931569,
    0.840300023555755,
];

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelEntry {
    pub level: f64,
    pub cpm: f64,
    pub cpm_squared: f64,
}

static LEVEL_TABLE: Lazy<Vec<LevelEntry>> = Lazy::new(|| {
    CP_MULTIPLIERS
        .iter()
        .enumerate()
        .map(|(idx, &cpm)| LevelEntry {
            level: MIN_LEVEL + idx as f64 * 0.5,
            cpm,
            cpm_squared: cpm * cpm,
        })
        .collect()
});

/// All 99 levels, ascending.
pub fn level_table() -> &'static [LevelEntry] {
    &LEVEL_TABLE
}

/// Looks up a level after snapping it to the nearest half step. Values that
/// are not (within float noise) on a half step, or out of range, are `None`.
pub fn level_entry(level: f64) -> Option<&'static LevelEntry> {
    if !level.is_finite() {
        return None;
    }
    let doubled = (level * 2.0).round();
    if (doubled / 2.0 - level).abs() > LEVEL_TOLERANCE {
        return None;
    }
    let idx = doubled - MIN_LEVEL * 2.0;
    if idx < 0.0 {
        return None;
    }
    level_table().get(idx as usize)
}

/// GO-exact CP: a single floor over the whole product, using the squared
/// multiplier rather than two rounded multiplications.
pub fn calculate_cp(
    base_atk: f64,
    base_def: f64,
    base_hp: f64,
    atk_iv: u8,
    def_iv: u8,
    hp_iv: u8,
    cpm_squared: f64,
) -> u32 {
    let attack = base_atk + atk_iv as f64;
    let defense = (base_def + def_iv as f64).sqrt();
    let stamina = (base_hp + hp_iv as f64).sqrt();
    let cp = (attack * defense * stamina * cpm_squared / 10.0).floor();
    if cp.is_finite() && cp > 0.0 {
        cp as u32
    } else {
        0
    }
}

/// Maximum CP a combatant may have, or no ceiling at all.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum LeagueCap {
    Capped(u32),
    Unlimited,
}

impl LeagueCap {
    pub const LITTLE: LeagueCap = LeagueCap::Capped(500);
    pub const GREAT: LeagueCap = LeagueCap::Capped(1500);
    pub const ULTRA: LeagueCap = LeagueCap::Capped(2500);
    pub const MASTER: LeagueCap = LeagueCap::Unlimited;

    /// Non-finite and non-positive caps mean "no cap".
    pub fn from_cp(cap: f64) -> Self {
        if cap.is_finite() && cap > 0.0 {
            LeagueCap::Capped(cap.floor().min(u32::MAX as f64) as u32)
        } else {
            LeagueCap::Unlimited
        }
    }

    pub fn allows(self, cp: u32) -> bool {
        match self {
            LeagueCap::Capped(cap) => cp <= cap,
            LeagueCap::Unlimited => true,
        }
    }

    pub fn label(self) -> String {
        match self {
            LeagueCap::Capped(cap) => cap.to_string(),
            LeagueCap::Unlimited => "none".to_string(),
        }
    }
}

impl FromStr for LeagueCap {
    type Err = PvpError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let name = raw.trim().to_ascii_lowercase();
        match name.as_str() {
            "little" => Ok(LeagueCap::LITTLE),
            "great" => Ok(LeagueCap::GREAT),
            "ultra" => Ok(LeagueCap::ULTRA),
            "master" | "none" | "inf" | "infinity" => Ok(LeagueCap::MASTER),
            other => other
                .parse::<f64>()
                .map(LeagueCap::from_cp)
                .map_err(|_| PvpError::UnknownLeague(raw.to_string())),
        }
    }
}

/// Species base stats as they arrive from the data source; any of them may
/// be absent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseStats {
    #[serde(default)]
    pub atk: Option<f64>,
    #[serde(default)]
    pub def: Option<f64>,
    #[serde(default)]
    pub hp: Option<f64>,
}

/// Base stats that are known to be present and positive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BaseStatLine {
    pub atk: f64,
    pub def: f64,
    pub hp: f64,
}

impl BaseStats {
    pub fn new(atk: f64, def: f64, hp: f64) -> Self {
        Self {
            atk: Some(atk),
            def: Some(def),
            hp: Some(hp),
        }
    }

    pub fn resolve(&self) -> Option<BaseStatLine> {
        let positive = |v: Option<f64>| v.filter(|x| x.is_finite() && *x > 0.0);
        Some(BaseStatLine {
            atk: positive(self.atk)?,
            def: positive(self.def)?,
            hp: positive(self.hp)?,
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
pub struct Ivs {
    pub atk: u8,
    pub def: u8,
    pub hp: u8,
}

impl Ivs {
    pub const PERFECT: Ivs = Ivs {
        atk: MAX_IV,
        def: MAX_IV,
        hp: MAX_IV,
    };

    pub fn new(atk: u8, def: u8, hp: u8) -> Option<Self> {
        if atk > MAX_IV || def > MAX_IV || hp > MAX_IV {
            return None;
        }
        Some(Self { atk, def, hp })
    }

    /// Every spread from 0/0/0 to 15/15/15, attack-major.
    pub fn all() -> impl Iterator<Item = Ivs> {
        (0..=MAX_IV).flat_map(|atk| {
            (0..=MAX_IV).flat_map(move |def| (0..=MAX_IV).map(move |hp| Ivs { atk, def, hp }))
        })
    }
}

impl FromStr for Ivs {
    type Err = PvpError;

    /// Parses `A/D/H`, e.g. `0/15/14`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = raw.split('/').map(str::trim).collect();
        let [atk, def, hp] = parts.as_slice() else {
            return Err(PvpError::InvalidIvs(raw.to_string()));
        };
        let parse = |v: &str| {
            v.parse::<u8>()
                .map_err(|_| PvpError::InvalidIvs(raw.to_string()))
        };
        Ivs::new(parse(*atk)?, parse(*def)?, parse(*hp)?)
            .ok_or_else(|| PvpError::InvalidIvs(raw.to_string()))
    }
}

pub fn cp_at(base: BaseStatLine, ivs: Ivs, entry: &LevelEntry) -> u32 {
    calculate_cp(
        base.atk,
        base.def,
        base.hp,
        ivs.atk,
        ivs.def,
        ivs.hp,
        entry.cpm_squared,
    )
}

/// Highest level whose CP fits under `cap`, scanning down from 50.
pub fn find_highest_level_under_cap(
    base: BaseStatLine,
    ivs: Ivs,
    cap: LeagueCap,
) -> Option<&'static LevelEntry> {
    let table = level_table();
    if cap == LeagueCap::Unlimited {
        return table.last();
    }
    table
        .iter()
        .rev()
        .find(|entry| cap.allows(cp_at(base, ivs, entry)))
}

/// Final battle stats of one combatant at a given IV spread and level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatProfile {
    pub ivs: Ivs,
    pub level: f64,
    pub cp: u32,
    pub atk: f64,
    pub def: f64,
    pub hp: u32,
}

impl StatProfile {
    pub fn at(base: BaseStatLine, ivs: Ivs, entry: &LevelEntry) -> Self {
        Self {
            ivs,
            level: entry.level,
            cp: cp_at(base, ivs, entry),
            atk: (base.atk + ivs.atk as f64) * entry.cpm,
            def: (base.def + ivs.def as f64) * entry.cpm,
            hp: ((base.hp + ivs.hp as f64) * entry.cpm).floor() as u32,
        }
    }

    pub fn resolve(base: &BaseStats, ivs: Ivs, level: f64) -> Option<Self> {
        let base = base.resolve()?;
        let entry = level_entry(level)?;
        Some(Self::at(base, ivs, entry))
    }

    pub fn stat_product(&self) -> f64 {
        self.atk * self.def * self.hp as f64
    }
}
