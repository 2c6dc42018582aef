//! Brute-force PvP IV ranking.
//!
//! Every one of the 4096 IV spreads is levelled as high as the league cap
//! allows and ranked by stat product. The full ranking is memoized per
//! (species, cap) in a [`RankingCache`] owned by the caller.

use crate::model::SpeciesRecord;
use crate::stats::{find_highest_level_under_cap, BaseStatLine, Ivs, LeagueCap, StatProfile};
use log::debug;
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PvpIvResult {
    pub rank: u32,
    pub atk_iv: u8,
    pub def_iv: u8,
    pub hp_iv: u8,
    pub level: f64,
    pub cp: u32,
    pub stat_product: f64,
    pub final_atk: f64,
    pub final_def: f64,
    pub final_hp: u32,
}

impl PvpIvResult {
    fn unranked(profile: StatProfile) -> Self {
        Self {
            rank: 0,
            atk_iv: profile.ivs.atk,
            def_iv: profile.ivs.def,
            hp_iv: profile.ivs.hp,
            level: profile.level,
            cp: profile.cp,
            stat_product: profile.stat_product(),
            final_atk: profile.atk,
            final_def: profile.def,
            final_hp: profile.hp,
        }
    }

    pub fn ivs(&self) -> Ivs {
        Ivs {
            atk: self.atk_iv,
            def: self.def_iv,
            hp: self.hp_iv,
        }
    }
}

/// Stat product, CP and HP high first; then the lower attack IV, the higher
/// defense and HP IVs, and finally the higher level.
fn compare_results(lhs: &PvpIvResult, rhs: &PvpIvResult) -> Ordering {
    rhs.stat_product
        .total_cmp(&lhs.stat_product)
        .then_with(|| rhs.cp.cmp(&lhs.cp))
        .then_with(|| rhs.final_hp.cmp(&lhs.final_hp))
        .then_with(|| lhs.atk_iv.cmp(&rhs.atk_iv))
        .then_with(|| rhs.def_iv.cmp(&lhs.def_iv))
        .then_with(|| rhs.hp_iv.cmp(&lhs.hp_iv))
        .then_with(|| rhs.level.total_cmp(&lhs.level))
}

/// Ranks the whole IV space without caching. Spreads that cannot fit under
/// the cap at any level are left out.
pub fn rank_ivs(base: BaseStatLine, cap: LeagueCap) -> Vec<PvpIvResult> {
    let spreads: Vec<Ivs> = Ivs::all().collect();
    let mut results: Vec<PvpIvResult> = spreads
        .par_iter()
        .filter_map(|&ivs| {
            let entry = find_highest_level_under_cap(base, ivs, cap)?;
            Some(PvpIvResult::unranked(StatProfile::at(base, ivs, entry)))
        })
        .collect();
    results.sort_by(compare_results);
    for (idx, result) in results.iter_mut().enumerate() {
        result.rank = idx as u32 + 1;
    }
    results
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IvRankLookup {
    pub result: PvpIvResult,
    pub percent_of_best: f64,
    pub total_ranked: usize,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
struct CacheKey {
    species: String,
    base: [Option<u64>; 3],
    cap: LeagueCap,
}

impl CacheKey {
    fn new(species: &SpeciesRecord, cap: LeagueCap) -> Self {
        let bits = |v: Option<f64>| v.map(f64::to_bits);
        Self {
            species: species.name.clone(),
            base: [bits(species.base.atk), bits(species.base.def), bits(species.base.hp)],
            cap,
        }
    }
}

type Ranked = Arc<[PvpIvResult]>;

/// Read-through cache of full rankings. Safe to share between threads; a
/// key that is being computed is computed once, other callers wait for it.
#[derive(Default)]
pub struct RankingCache {
    entries: RwLock<HashMap<CacheKey, Arc<OnceCell<Ranked>>>>,
}

impl RankingCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: CacheKey) -> Arc<OnceCell<Ranked>> {
        if let Some(slot) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(slot);
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(key).or_default())
    }

    /// The complete ranking for `species` under `cap`. Repeated calls return
    /// the same allocation. Species with missing or non-positive base stats
    /// rank to an empty list.
    pub fn ranked(&self, species: &SpeciesRecord, cap: LeagueCap) -> Ranked {
        let slot = self.slot(CacheKey::new(species, cap));
        if let Some(ranked) = slot.get() {
            debug!("ranking cache hit for {} under cap {}", species.name, cap.label());
            return Arc::clone(ranked);
        }
        let ranked = slot.get_or_init(|| {
            let results = match species.base.resolve() {
                Some(base) => rank_ivs(base, cap),
                None => Vec::new(),
            };
            debug!(
                "ranked {} IV spreads for {} under cap {}",
                results.len(),
                species.name,
                cap.label()
            );
            Arc::from(results)
        });
        Arc::clone(ranked)
    }

    /// The best `top_n` spreads.
    pub fn top_pvp_ivs(&self, species: &SpeciesRecord, cap: LeagueCap, top_n: usize) -> Vec<PvpIvResult> {
        if top_n == 0 {
            return Vec::new();
        }
        let ranked = self.ranked(species, cap);
        ranked[..top_n.min(ranked.len())].to_vec()
    }

    /// Where one particular spread lands in the ranking.
    pub fn rank_of(&self, species: &SpeciesRecord, cap: LeagueCap, ivs: Ivs) -> Option<IvRankLookup> {
        let ranked = self.ranked(species, cap);
        let best = ranked.first()?;
        let result = *ranked.iter().find(|r| r.ivs() == ivs)?;
        Some(IvRankLookup {
            result,
            percent_of_best: result.stat_product / best.stat_product * 100.0,
            total_ranked: ranked.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(atk_iv: u8, def_iv: u8, hp_iv: u8, stat_product: f64) -> PvpIvResult {
        PvpIvResult {
            rank: 0,
            atk_iv,
            def_iv,
            hp_iv,
            level: 40.0,
            cp: 1500,
            stat_product,
            final_atk: 100.0,
            final_def: 100.0,
            final_hp: 100,
        }
    }

    #[test]
    fn ties_prefer_lower_attack_then_higher_bulk() {
        let mut results = vec![
            result(3, 10, 10, 1000.0),
            result(1, 10, 10, 1000.0),
            result(1, 12, 10, 1000.0),
            result(1, 12, 11, 1000.0),
            result(15, 15, 15, 2000.0),
        ];
        results.sort_by(compare_results);
        let order: Vec<(u8, u8, u8)> = results.iter().map(|r| (r.atk_iv, r.def_iv, r.hp_iv)).collect();
        assert_eq!(
            order,
            vec![(15, 15, 15), (1, 12, 11), (1, 12, 10), (1, 10, 10), (3, 10, 10)]
        );
    }

    #[test]
    fn cp_and_hp_break_stat_product_ties() {
        let mut low_cp = result(0, 0, 0, 1000.0);
        low_cp.cp = 1400;
        let mut low_hp = result(0, 0, 1, 1000.0);
        low_hp.final_hp = 90;
        let baseline = result(5, 0, 0, 1000.0);
        let mut results = vec![low_cp, low_hp, baseline];
        results.sort_by(compare_results);
        assert_eq!(results[0].atk_iv, 5);
        assert_eq!(results[1].hp_iv, 1);
        assert_eq!(results[2].cp, 1400);
    }

    #[test]
    fn cache_keys_include_the_cap() {
        let cache = RankingCache::new();
        let species = SpeciesRecord::new("Bulbasaur", 118.0, 111.0, 128.0);
        cache.ranked(&species, LeagueCap::GREAT);
        cache.ranked(&species, LeagueCap::Unlimited);
        cache.ranked(&species, LeagueCap::GREAT);
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }
}
