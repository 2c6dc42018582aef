use crate::model::{Combatant, CombatantInput, Move, MoveKind, MAX_ENERGY};
use crate::types::{effectiveness, NEUTRAL};
use log::{debug, trace, warn};
use serde::Serialize;
use std::cmp::Ordering;

pub const DEFAULT_MAX_TURNS: u32 = 300;
pub const MIN_REQUEST_TURNS: i64 = 20;
pub const MAX_REQUEST_TURNS: i64 = 1000;

const STAB_MULTIPLIER: f64 = 1.2;
const SHIELD_HIGH_DAMAGE_RATIO: f64 = 0.35;
const SHIELD_LOW_HP_RATIO: f64 = 0.45;
const SHIELDED_DAMAGE: u32 = 1;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BattleConfig {
    pub max_turns: u32,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
        }
    }
}

impl BattleConfig {
    /// Turn bound as the service layer accepts it: default 300, clamped to
    /// [20, 1000].
    pub fn clamped(requested: Option<i64>) -> Self {
        let Some(requested) = requested else {
            return Self::default();
        };
        let max_turns = requested.clamp(MIN_REQUEST_TURNS, MAX_REQUEST_TURNS);
        if max_turns != requested {
            warn!("maxTurns {requested} out of range, using {max_turns}");
        }
        Self {
            max_turns: max_turns as u32,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Left,
    Right,
    Draw,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Faint,
    TurnLimit,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShieldReason {
    Lethal,
    HighDamage,
    LowHp,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleEvent {
    pub turn: u32,
    pub actor: Side,
    pub target: Side,
    pub action: MoveKind,
    pub move_id: String,
    pub move_name: String,
    pub damage: u32,
    pub shielded: bool,
    pub shield_reason: Option<ShieldReason>,
    pub effectiveness: f64,
    pub stab: bool,
    pub actor_energy: u32,
    pub target_hp: u32,
    pub target_shields: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SideSummary {
    pub name: String,
    pub hp_remaining: u32,
    pub energy_remaining: u32,
    pub shields_remaining: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleResult {
    pub winner: Winner,
    pub reason: EndReason,
    pub turns_elapsed: u32,
    pub timeline: Vec<BattleEvent>,
    pub left: SideSummary,
    pub right: SideSummary,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Damage {
    pub amount: u32,
    pub effectiveness: f64,
    pub stab: bool,
}

/// `max(1, floor(0.5 * power * atk/def * effectiveness * stab) + 1)`.
pub fn compute_damage(attacker: &Combatant, defender: &Combatant, mv: &Move) -> Damage {
    let (effectiveness, stab) = match (mv.move_type, defender.primary_type) {
        (Some(kind), Some(primary)) => (
            effectiveness(kind, primary, defender.secondary_type),
            attacker.has_type(kind),
        ),
        (Some(kind), None) => (NEUTRAL, attacker.has_type(kind)),
        (None, _) => (NEUTRAL, false),
    };
    let stab_multiplier = if stab { STAB_MULTIPLIER } else { 1.0 };
    let raw = (0.5 * mv.power * (attacker.atk / defender.def) * effectiveness * stab_multiplier)
        .floor()
        + 1.0;
    let amount = if raw.is_finite() { raw.max(1.0) as u32 } else { 1 };
    Damage {
        amount,
        effectiveness,
        stab,
    }
}

/// Defender-side choice, judged against the unshielded damage.
pub fn shield_decision(hp: u32, max_hp: u32, shields: u32, incoming: u32) -> Option<ShieldReason> {
    if shields == 0 {
        return None;
    }
    if incoming >= hp {
        Some(ShieldReason::Lethal)
    } else if incoming as f64 >= SHIELD_HIGH_DAMAGE_RATIO * max_hp as f64 {
        Some(ShieldReason::HighDamage)
    } else if hp as f64 <= SHIELD_LOW_HP_RATIO * max_hp as f64 {
        Some(ShieldReason::LowHp)
    } else {
        None
    }
}

struct SideState<'a> {
    combatant: &'a Combatant,
    hp: u32,
    energy: u32,
    shields: u32,
    cooldown: u32,
}

impl<'a> SideState<'a> {
    fn new(combatant: &'a Combatant) -> Self {
        Self {
            combatant,
            hp: combatant.max_hp,
            energy: combatant.start_energy,
            shields: combatant.shields,
            cooldown: 0,
        }
    }

    fn is_fainted(&self) -> bool {
        self.hp == 0
    }

    fn summary(&self) -> SideSummary {
        SideSummary {
            name: self.combatant.name.clone(),
            hp_remaining: self.hp,
            energy_remaining: self.energy,
            shields_remaining: self.shields,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct PlannedAction {
    side: Side,
    kind: MoveKind,
    charged_index: usize,
    attack: f64,
}

impl PlannedAction {
    fn order(lhs: &PlannedAction, rhs: &PlannedAction) -> Ordering {
        rhs.kind
            .priority()
            .cmp(&lhs.kind.priority())
            .then_with(|| rhs.attack.total_cmp(&lhs.attack))
            .then_with(|| lhs.side.name().cmp(rhs.side.name()))
    }
}

/// Picks a charged move for `attacker`, or `None` if nothing is affordable.
/// Fires the hardest hitter when the target has no shields, when it would be
/// lethal, or when the cheapest move can still follow it; otherwise baits
/// with the cheapest move.
fn choose_charged_move(attacker: &SideState<'_>, defender: &SideState<'_>) -> Option<usize> {
    let mut cheapest: Option<(usize, &Move)> = None;
    let mut strongest: Option<(usize, &Move, u32)> = None;
    for (idx, mv) in attacker.combatant.charged_moves.iter().enumerate() {
        if attacker.energy < mv.energy_cost {
            continue;
        }
        if cheapest.map_or(true, |(_, best)| mv.energy_cost < best.energy_cost) {
            cheapest = Some((idx, mv));
        }
        let damage = compute_damage(attacker.combatant, defender.combatant, mv).amount;
        if strongest.map_or(true, |(_, _, best)| damage > best) {
            strongest = Some((idx, mv, damage));
        }
    }
    let (cheap_idx, cheap) = cheapest?;
    let (strong_idx, strong, strong_damage) = strongest?;
    if defender.shields == 0
        || strong_damage >= defender.hp
        || attacker.energy >= strong.energy_cost + cheap.energy_cost
    {
        Some(strong_idx)
    } else {
        Some(cheap_idx)
    }
}

fn decide_winner(left_hp: u32, right_hp: u32) -> Winner {
    match left_hp.cmp(&right_hp) {
        Ordering::Greater => Winner::Left,
        Ordering::Less => Winner::Right,
        Ordering::Equal => Winner::Draw,
    }
}

pub struct Battle<'a> {
    left: SideState<'a>,
    right: SideState<'a>,
    max_turns: u32,
    timeline: Vec<BattleEvent>,
}

impl<'a> Battle<'a> {
    pub fn new(left: &'a Combatant, right: &'a Combatant, config: &BattleConfig) -> Self {
        Battle {
            left: SideState::new(left),
            right: SideState::new(right),
            max_turns: config.max_turns.max(1),
            timeline: Vec::new(),
        }
    }

    fn side(&self, side: Side) -> &SideState<'a> {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// (actor, target) mutable pair.
    fn pair_mut(&mut self, actor: Side) -> (&mut SideState<'a>, &mut SideState<'a>) {
        match actor {
            Side::Left => (&mut self.left, &mut self.right),
            Side::Right => (&mut self.right, &mut self.left),
        }
    }

    fn plan(&self, side: Side) -> Option<PlannedAction> {
        let actor = self.side(side);
        if actor.cooldown > 0 || actor.is_fainted() {
            return None;
        }
        let opponent = self.side(side.opponent());
        let (kind, charged_index) = match choose_charged_move(actor, opponent) {
            Some(idx) => (MoveKind::Charged, idx),
            None => (MoveKind::Fast, 0),
        };
        Some(PlannedAction {
            side,
            kind,
            charged_index,
            attack: actor.combatant.atk,
        })
    }

    fn execute(&mut self, action: PlannedAction, turn: u32) -> BattleEvent {
        let (actor, target) = self.pair_mut(action.side);
        let (attacker, defender): (&'a Combatant, &'a Combatant) = (actor.combatant, target.combatant);
        let mv = match action.kind {
            MoveKind::Fast => &attacker.fast_move,
            MoveKind::Charged => &attacker.charged_moves[action.charged_index],
        };
        let mut shield_reason = None;
        let damage = match action.kind {
            MoveKind::Fast => {
                let damage = compute_damage(attacker, defender, mv);
                target.hp = target.hp.saturating_sub(damage.amount);
                actor.energy = (actor.energy + mv.energy_gain).min(MAX_ENERGY);
                damage
            }
            MoveKind::Charged => {
                actor.energy = actor.energy.saturating_sub(mv.energy_cost);
                let mut damage = compute_damage(attacker, defender, mv);
                shield_reason = shield_decision(
                    target.hp,
                    defender.max_hp,
                    target.shields,
                    damage.amount,
                );
                if shield_reason.is_some() {
                    damage.amount = SHIELDED_DAMAGE;
                    target.shields -= 1;
                }
                target.hp = target.hp.saturating_sub(damage.amount);
                damage
            }
        };
        actor.cooldown = mv.turns;
        BattleEvent {
            turn,
            actor: action.side,
            target: action.side.opponent(),
            action: action.kind,
            move_id: mv.id.clone(),
            move_name: mv.name.clone(),
            damage: damage.amount,
            shielded: shield_reason.is_some(),
            shield_reason,
            effectiveness: damage.effectiveness,
            stab: damage.stab,
            actor_energy: actor.energy,
            target_hp: target.hp,
            target_shields: target.shields,
        }
    }

    fn finish(self, reason: EndReason, turns_elapsed: u32) -> BattleResult {
        let winner = decide_winner(self.left.hp, self.right.hp);
        debug!(
            "battle {} vs {} ended on turn {turns_elapsed}: {winner:?} ({reason:?})",
            self.left.combatant.name, self.right.combatant.name
        );
        BattleResult {
            winner,
            reason,
            turns_elapsed,
            left: self.left.summary(),
            right: self.right.summary(),
            timeline: self.timeline,
        }
    }

    pub fn run(mut self) -> BattleResult {
        debug!(
            "battle {} vs {}: up to {} turns",
            self.left.combatant.name, self.right.combatant.name, self.max_turns
        );
        for turn in 1..=self.max_turns {
            self.left.cooldown = self.left.cooldown.saturating_sub(1);
            self.right.cooldown = self.right.cooldown.saturating_sub(1);

            let mut actions: Vec<PlannedAction> = [Side::Left, Side::Right]
                .into_iter()
                .filter_map(|side| self.plan(side))
                .collect();
            actions.sort_by(PlannedAction::order);

            for action in actions {
                let event = self.execute(action, turn);
                trace!(
                    "turn {turn}: {} {} -> {} dmg{}",
                    event.actor.name(),
                    event.move_name,
                    event.damage,
                    if event.shielded { " (shielded)" } else { "" }
                );
                self.timeline.push(event);
                if self.left.is_fainted() || self.right.is_fainted() {
                    return self.finish(EndReason::Faint, turn);
                }
            }
        }
        let turns = self.max_turns;
        self.finish(EndReason::TurnLimit, turns)
    }
}

/// Runs one battle on already-normalized combatants.
pub fn run_battle(left: &Combatant, right: &Combatant, config: &BattleConfig) -> BattleResult {
    Battle::new(left, right, config).run()
}

/// Normalizes both descriptors and runs the battle. Never fails: malformed
/// numbers fall back to defaults.
pub fn simulate_battle(
    left: &CombatantInput,
    right: &CombatantInput,
    config: &BattleConfig,
) -> BattleResult {
    let left = Combatant::from_input(left, Side::Left.name());
    let right = Combatant::from_input(right, Side::Right.name());
    run_battle(&left, &right, config)
}
