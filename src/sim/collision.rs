//! Merge resolution
//!
//! The heart of the game: given two pieces that just touched, decide whether
//! they merge and what comes out. `resolve` is the pure rule; `resolve_contact`
//! applies it to the live board (guards, removal, replacement, scoring,
//! level goal).

use glam::Vec2;

use super::factory::{self, Burst};
use super::level::LevelProgression;
use super::physics::{BodyHandle, BodyLabel, PhysicsWorld};
use super::piece::{OperatorKind, PieceKind, clamp_value, signed};
use super::state::{GameEvent, GameState};
use crate::consts::*;
use crate::settings::RuleVariant;

/// Outcome of the merge rule for a pair of pieces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Bodies just collide physically
    NoInteraction,
    /// Operator ball applied to a number ball
    Operator {
        op: OperatorKind,
        operand: i32,
        old_value: i32,
        /// Tier of the number ball (kept unchanged)
        tier: u32,
        new_value: i32,
    },
    /// Two equal-tier number balls combined
    Number {
        value_a: i32,
        value_b: i32,
        /// Pre-merge tier shared by both balls
        common_tier: u32,
        new_value: i32,
        /// `common_tier + 1`, uncapped
        raw_tier: u32,
        /// Tier stored on the product (capped under tiered rules)
        stored_tier: u32,
    },
}

impl Resolution {
    pub fn is_merge(&self) -> bool {
        !matches!(self, Resolution::NoInteraction)
    }

    /// Whether the pair vanishes without a replacement
    pub fn is_zero(&self) -> bool {
        match *self {
            Resolution::NoInteraction => false,
            Resolution::Operator { new_value, .. } | Resolution::Number { new_value, .. } => {
                new_value == 0
            }
        }
    }

    /// Points awarded for this resolution
    pub fn points(&self) -> u64 {
        match *self {
            Resolution::NoInteraction => 0,
            Resolution::Operator {
                old_value,
                tier,
                new_value,
                ..
            } => {
                if new_value == 0 {
                    old_value.unsigned_abs() as u64
                        * OPERATOR_ZERO_POINTS
                        * (tier as u64 + 1).max(1)
                } else {
                    OPERATOR_BONUS
                }
            }
            Resolution::Number {
                value_a,
                value_b,
                new_value,
                raw_tier,
                stored_tier,
                ..
            } => {
                if new_value == 0 {
                    (value_a.unsigned_abs() as u64 + value_b.unsigned_abs() as u64)
                        * ZERO_MERGE_POINTS
                        * (raw_tier as u64).max(1)
                } else {
                    MERGE_POINTS * (stored_tier as u64).max(1)
                }
            }
        }
    }

    /// Replacement piece (value, tier), if the result is not zero
    pub fn product(&self) -> Option<(i32, u32)> {
        match *self {
            Resolution::NoInteraction => None,
            Resolution::Operator { new_value, tier, .. } => (new_value != 0).then_some((new_value, tier)),
            Resolution::Number {
                new_value,
                stored_tier,
                ..
            } => (new_value != 0).then_some((new_value, stored_tier)),
        }
    }
}

/// Apply the merge rules to a pair of piece kinds
pub fn resolve(a: &PieceKind, b: &PieceKind, variant: RuleVariant, level: &LevelProgression) -> Resolution {
    match (*a, *b) {
        (PieceKind::Operator { .. }, PieceKind::Operator { .. }) => Resolution::NoInteraction,
        (PieceKind::Operator { op, operand }, PieceKind::Number { value, tier })
        | (PieceKind::Number { value, tier }, PieceKind::Operator { op, operand }) => {
            Resolution::Operator {
                op,
                operand,
                old_value: value,
                tier,
                new_value: op.apply(value, operand),
            }
        }
        (
            PieceKind::Number {
                value: value_a,
                tier: tier_a,
            },
            PieceKind::Number {
                value: value_b,
                tier: tier_b,
            },
        ) => {
            if tier_a != tier_b {
                return Resolution::NoInteraction;
            }
            let raw_tier = tier_a.max(tier_b) + 1;
            Resolution::Number {
                value_a,
                value_b,
                common_tier: tier_a,
                new_value: clamp_value(value_a + value_b),
                raw_tier,
                stored_tier: level.stored_tier(variant, raw_tier),
            }
        }
    }
}

/// A committed merge, reported to the HUD
#[derive(Debug, Clone, PartialEq)]
pub struct MergeEvent {
    pub resolution: Resolution,
    /// Midpoint of the two source bodies
    pub pos: Vec2,
    pub points: u64,
    /// Product body, if any
    pub product: Option<BodyHandle>,
    /// This zero-merge cleared the current level
    pub goal: bool,
}

impl MergeEvent {
    /// Banner text, e.g. `ZERO! ×3 = +600` or `-7 ÷ 2 = -3`
    pub fn combo_text(&self) -> String {
        match self.resolution {
            Resolution::NoInteraction => String::new(),
            Resolution::Operator {
                op,
                operand,
                old_value,
                new_value,
                ..
            } => {
                if new_value == 0 {
                    format!("{}{} = ZERO! +{}", op.symbol(), operand, self.points)
                } else {
                    format!("{} {} {} = {}", old_value, op.symbol(), operand, signed(new_value))
                }
            }
            Resolution::Number {
                new_value,
                raw_tier,
                stored_tier,
                ..
            } => {
                if new_value == 0 {
                    if raw_tier > 1 {
                        format!("ZERO! ×{} = +{}", raw_tier, self.points)
                    } else {
                        format!("ZERO! +{}", self.points)
                    }
                } else if stored_tier > 0 {
                    format!("= {} (tier {})", signed(new_value), stored_tier)
                } else {
                    format!("= {}", signed(new_value))
                }
            }
        }
    }

    /// Zero banners are drawn highlighted
    pub fn is_highlight(&self) -> bool {
        self.resolution.is_zero()
    }
}

/// Process one "began touching" pair against the live board
///
/// Returns the committed merge, or None when the pair is ignored: a finished
/// game, wall or particle contacts, bodies without game data, pieces already
/// claimed by another merge or still in their drop grace period, and pairs
/// the merge rules say do not interact.
pub fn resolve_contact<W: PhysicsWorld>(
    state: &mut GameState,
    world: &mut W,
    ha: BodyHandle,
    hb: BodyHandle,
) -> Option<MergeEvent> {
    if state.game_over {
        return None;
    }
    if world.label(ha) != Some(BodyLabel::Piece) || world.label(hb) != Some(BodyLabel::Piece) {
        return None;
    }
    let (a, b) = (state.pieces.get(&ha)?, state.pieces.get(&hb)?);
    if !a.can_merge() || !b.can_merge() {
        return None;
    }

    let resolution = resolve(&a.kind, &b.kind, state.settings.variant, &state.level);
    if !resolution.is_merge() {
        return None;
    }

    // Claim both before anything else so a second report in this pass skips them
    for h in [ha, hb] {
        if let Some(piece) = state.pieces.get_mut(&h) {
            piece.merging = true;
        }
    }

    let pos = match (world.position(ha), world.position(hb)) {
        (Some(pa), Some(pb)) => (pa + pb) * 0.5,
        (Some(p), None) | (None, Some(p)) => p,
        (None, None) => Vec2::ZERO,
    };

    let burst = match resolution {
        Resolution::Operator { .. } => Burst::Operator,
        _ => Burst::Merge,
    };
    factory::spawn_burst(state, world, pos, burst);

    state.remove_piece(world, ha);
    state.remove_piece(world, hb);

    let points = resolution.points();
    state.score += points;

    let mut goal = false;
    let product = match resolution.product() {
        Some((value, tier)) => Some(factory::build_merged(state, world, value, tier, pos)),
        None => {
            factory::spawn_burst(state, world, pos, Burst::Zero);
            if let Resolution::Number { common_tier, .. } = resolution {
                goal = state.level.is_goal(state.settings.variant, common_tier);
            }
            None
        }
    };

    let event = MergeEvent {
        resolution,
        pos,
        points,
        product,
        goal,
    };
    log::debug!("{} (score {})", event.combo_text(), state.score);
    state.show_combo(&event);
    state.events.push(GameEvent::Merge(event.clone()));

    if goal {
        state.begin_level_transition();
    }

    Some(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::sim::physics::{CircleDesc, RapierWorld};
    use crate::sim::piece::{Piece, PieceDescriptor};
    use proptest::prelude::*;

    fn num(value: i32, tier: u32) -> PieceKind {
        PieceKind::Number { value, tier }
    }

    fn op(op: OperatorKind) -> PieceKind {
        PieceKind::Operator {
            op,
            operand: OPERATOR_OPERAND,
        }
    }

    fn level_at(current_level: u32) -> LevelProgression {
        let mut level = LevelProgression::new(MAX_LEVEL);
        level.current_level = current_level;
        level
    }

    /// Place a non-fresh piece directly (bypasses dropping)
    fn place(state: &mut GameState, world: &mut RapierWorld, kind: PieceKind, pos: Vec2) -> BodyHandle {
        let desc = match kind {
            PieceKind::Number { value, tier } => PieceDescriptor::number(value, tier),
            PieceKind::Operator { op, .. } => PieceDescriptor::operator(op),
        };
        let h = world.add_circle(CircleDesc::piece(pos, desc.radius));
        state.pieces.insert(h, Piece::from_descriptor(&desc, false));
        h
    }

    #[test]
    fn test_two_operators_never_interact() {
        let r = resolve(&op(OperatorKind::Multiply), &op(OperatorKind::Divide), RuleVariant::Plain, &level_at(0));
        assert_eq!(r, Resolution::NoInteraction);
    }

    #[test]
    fn test_unequal_tiers_never_merge() {
        let r = resolve(&num(3, 0), &num(-3, 1), RuleVariant::Plain, &level_at(0));
        assert_eq!(r, Resolution::NoInteraction);
        assert_eq!(r.points(), 0);
    }

    #[test]
    fn test_number_merge_plain_uncapped() {
        let r = resolve(&num(3, 4), &num(2, 4), RuleVariant::Plain, &level_at(0));
        assert_eq!(r.product(), Some((5, 5)));
        assert_eq!(r.points(), 10 * 5);
    }

    #[test]
    fn test_number_merge_tiered_capped() {
        let r = resolve(&num(3, 0), &num(2, 0), RuleVariant::Tiered, &level_at(0));
        assert_eq!(r.product(), Some((5, 0)));
        // Stored tier 0 still scores the minimum multiplier
        assert_eq!(r.points(), 10);

        let r = resolve(&num(3, 1), &num(2, 1), RuleVariant::Tiered, &level_at(3));
        assert_eq!(r.product(), Some((5, 2)));
    }

    #[test]
    fn test_number_sum_clamped() {
        let r = resolve(&num(10, 0), &num(7, 0), RuleVariant::Plain, &level_at(0));
        assert_eq!(r.product(), Some((VALUE_CAP, 1)));
        let r = resolve(&num(-10, 0), &num(-7, 0), RuleVariant::Plain, &level_at(0));
        assert_eq!(r.product(), Some((-VALUE_CAP, 1)));
    }

    #[test]
    fn test_zero_merge_scoring() {
        let r = resolve(&num(4, 2), &num(-4, 2), RuleVariant::Plain, &level_at(0));
        assert!(r.is_zero());
        assert_eq!(r.product(), None);
        assert_eq!(r.points(), 8 * 50 * 3);

        // Tiered: multiplier uses the uncapped tier
        let r = resolve(&num(4, 0), &num(-4, 0), RuleVariant::Tiered, &level_at(0));
        assert_eq!(r.points(), 8 * 50);
    }

    #[test]
    fn test_operator_keeps_tier() {
        let r = resolve(&op(OperatorKind::Multiply), &num(3, 6), RuleVariant::Plain, &level_at(0));
        assert_eq!(r.product(), Some((6, 6)));
        assert_eq!(r.points(), OPERATOR_BONUS);

        let r = resolve(&num(-7, 2), &op(OperatorKind::Divide), RuleVariant::Tiered, &level_at(0));
        assert_eq!(r.product(), Some((-3, 2)));
    }

    #[test]
    fn test_operator_zero_scoring() {
        let r = resolve(&num(1, 2), &op(OperatorKind::Divide), RuleVariant::Plain, &level_at(0));
        assert!(r.is_zero());
        assert_eq!(r.points(), 100 * 3);
    }

    #[test]
    fn test_combo_texts() {
        let event = |resolution: Resolution| MergeEvent {
            resolution,
            pos: Vec2::ZERO,
            points: resolution.points(),
            product: None,
            goal: false,
        };
        let lvl = level_at(0);
        let e = event(resolve(&num(3, 2), &num(-3, 2), RuleVariant::Plain, &lvl));
        assert_eq!(e.combo_text(), "ZERO! ×3 = +900");
        assert!(e.is_highlight());
        let e = event(resolve(&num(3, 0), &num(-3, 0), RuleVariant::Plain, &lvl));
        assert_eq!(e.combo_text(), "ZERO! +300");
        let e = event(resolve(&num(3, 1), &num(1, 1), RuleVariant::Plain, &lvl));
        assert_eq!(e.combo_text(), "= +4 (tier 2)");
        let e = event(resolve(&num(-7, 0), &op(OperatorKind::Divide), RuleVariant::Plain, &lvl));
        assert_eq!(e.combo_text(), "-7 ÷ 2 = -3");
        let e = event(resolve(&num(1, 0), &op(OperatorKind::Divide), RuleVariant::Plain, &lvl));
        assert_eq!(e.combo_text(), "÷2 = ZERO! +100");
    }

    #[test]
    fn test_contact_merges_and_replaces() {
        let mut state = GameState::new(Settings::default(), 1);
        let mut world = RapierWorld::new(Vec2::ZERO);
        let a = place(&mut state, &mut world, num(2, 0), Vec2::new(100.0, 100.0));
        let b = place(&mut state, &mut world, num(3, 0), Vec2::new(140.0, 100.0));

        let event = resolve_contact(&mut state, &mut world, a, b).unwrap();
        assert_eq!(event.pos, Vec2::new(120.0, 100.0));
        assert_eq!(state.score, 10);
        assert!(!state.pieces.contains_key(&a));
        assert!(!state.pieces.contains_key(&b));
        assert!(world.position(a).is_none());

        let product = event.product.unwrap();
        assert_eq!(state.pieces[&product].kind, num(5, 1));
        assert!(!state.pieces[&product].fresh);
        assert_eq!(state.pieces.len(), 1);
    }

    #[test]
    fn test_contact_zero_leaves_nothing() {
        let mut state = GameState::new(Settings::default(), 1);
        let mut world = RapierWorld::new(Vec2::ZERO);
        let a = place(&mut state, &mut world, num(2, 0), Vec2::new(100.0, 100.0));
        let b = place(&mut state, &mut world, num(-2, 0), Vec2::new(140.0, 100.0));

        let event = resolve_contact(&mut state, &mut world, a, b).unwrap();
        assert!(event.product.is_none());
        assert!(state.pieces.is_empty());
        assert_eq!(state.score, 4 * 50);
        assert!(world.bodies_with_label(BodyLabel::Piece).is_empty());
    }

    #[test]
    fn test_claimed_piece_not_merged_twice_in_one_pass() {
        let mut state = GameState::new(Settings::default(), 1);
        let mut world = RapierWorld::new(Vec2::ZERO);
        let a = place(&mut state, &mut world, num(2, 0), Vec2::new(100.0, 100.0));
        let b = place(&mut state, &mut world, num(1, 0), Vec2::new(140.0, 100.0));
        let c = place(&mut state, &mut world, num(1, 0), Vec2::new(60.0, 100.0));

        // Same pair reported twice, then one of them again with a third piece
        assert!(resolve_contact(&mut state, &mut world, a, b).is_some());
        assert!(resolve_contact(&mut state, &mut world, a, b).is_none());
        assert!(resolve_contact(&mut state, &mut world, c, a).is_none());
        assert_eq!(state.score, 10);
        assert!(state.pieces.contains_key(&c));
    }

    #[test]
    fn test_merging_flag_guard() {
        let mut state = GameState::new(Settings::default(), 1);
        let mut world = RapierWorld::new(Vec2::ZERO);
        let a = place(&mut state, &mut world, num(2, 0), Vec2::new(100.0, 100.0));
        let b = place(&mut state, &mut world, num(1, 0), Vec2::new(140.0, 100.0));
        state.pieces.get_mut(&a).unwrap().merging = true;
        assert!(resolve_contact(&mut state, &mut world, a, b).is_none());
        assert!(state.pieces.contains_key(&b));
    }

    #[test]
    fn test_fresh_piece_does_not_merge() {
        let mut state = GameState::new(Settings::default(), 1);
        let mut world = RapierWorld::new(Vec2::ZERO);
        let a = place(&mut state, &mut world, num(2, 0), Vec2::new(100.0, 100.0));
        let b = place(&mut state, &mut world, num(-2, 0), Vec2::new(140.0, 100.0));
        state.pieces.get_mut(&b).unwrap().fresh = true;
        assert!(resolve_contact(&mut state, &mut world, a, b).is_none());
        assert_eq!(state.pieces.len(), 2);

        // Once the grace period is over the same pair merges
        state.pieces.get_mut(&b).unwrap().fresh = false;
        assert!(resolve_contact(&mut state, &mut world, a, b).is_some());
        assert!(state.pieces.is_empty());
    }

    #[test]
    fn test_no_merge_after_game_over() {
        let mut state = GameState::new(Settings::for_variant(RuleVariant::Tiered), 1);
        let mut world = RapierWorld::new(Vec2::ZERO);
        let a = place(&mut state, &mut world, num(1, 0), Vec2::new(100.0, 100.0));
        let b = place(&mut state, &mut world, num(-1, 0), Vec2::new(140.0, 100.0));
        state.end_game();

        assert!(resolve_contact(&mut state, &mut world, a, b).is_none());
        assert_eq!(state.pieces.len(), 2);
        assert_eq!(state.score, 0);
        assert!(!state.level.is_transitioning());
    }

    #[test]
    fn test_wall_and_untagged_contacts_ignored() {
        let mut state = GameState::new(Settings::default(), 1);
        let mut world = RapierWorld::with_field_walls();
        let wall = world.bodies_with_label(BodyLabel::Wall)[0];
        let a = place(&mut state, &mut world, num(2, 0), Vec2::new(100.0, 100.0));
        assert!(resolve_contact(&mut state, &mut world, wall, a).is_none());

        // Body exists but lost its game data
        let b = world.add_circle(CircleDesc::piece(Vec2::new(140.0, 100.0), 20.0));
        assert!(resolve_contact(&mut state, &mut world, a, b).is_none());
        assert!(state.pieces.contains_key(&a));
    }

    #[test]
    fn test_operator_with_any_tier() {
        let mut state = GameState::new(Settings::default(), 1);
        let mut world = RapierWorld::new(Vec2::ZERO);
        let o = place(&mut state, &mut world, op(OperatorKind::Multiply), Vec2::new(100.0, 100.0));
        let n = place(&mut state, &mut world, num(-3, 7), Vec2::new(140.0, 100.0));

        let event = resolve_contact(&mut state, &mut world, o, n).unwrap();
        let product = event.product.unwrap();
        assert_eq!(state.pieces[&product].kind, num(-6, 7));
        assert_eq!(state.score, OPERATOR_BONUS);
    }

    #[test]
    fn test_tiered_goal_starts_transition() {
        let mut state = GameState::new(Settings::for_variant(RuleVariant::Tiered), 1);
        let mut world = RapierWorld::new(Vec2::ZERO);
        let a = place(&mut state, &mut world, num(3, 0), Vec2::new(100.0, 100.0));
        let b = place(&mut state, &mut world, num(-3, 0), Vec2::new(140.0, 100.0));

        let event = resolve_contact(&mut state, &mut world, a, b).unwrap();
        assert!(event.goal);
        assert!(state.level.is_transitioning());
        assert!(!state.can_drop);
    }

    #[test]
    fn test_operator_zero_is_not_a_goal() {
        let mut state = GameState::new(Settings::for_variant(RuleVariant::Tiered), 1);
        let mut world = RapierWorld::new(Vec2::ZERO);
        let o = place(&mut state, &mut world, op(OperatorKind::Divide), Vec2::new(100.0, 100.0));
        let n = place(&mut state, &mut world, num(1, 0), Vec2::new(140.0, 100.0));

        let event = resolve_contact(&mut state, &mut world, o, n).unwrap();
        assert!(event.product.is_none());
        assert!(!event.goal);
        assert!(!state.level.is_transitioning());
        assert_eq!(state.score, 100);
    }

    #[test]
    fn test_second_goal_during_transition_ignored() {
        let mut state = GameState::new(Settings::for_variant(RuleVariant::Tiered), 1);
        let mut world = RapierWorld::new(Vec2::ZERO);
        let a = place(&mut state, &mut world, num(3, 0), Vec2::new(100.0, 100.0));
        let b = place(&mut state, &mut world, num(-3, 0), Vec2::new(140.0, 100.0));
        let c = place(&mut state, &mut world, num(1, 0), Vec2::new(300.0, 100.0));
        let d = place(&mut state, &mut world, num(-1, 0), Vec2::new(340.0, 100.0));

        assert!(resolve_contact(&mut state, &mut world, a, b).unwrap().goal);
        let second = resolve_contact(&mut state, &mut world, c, d).unwrap();
        assert!(!second.goal);
        assert_eq!(state.level.current_level, 0);
        assert!(state.level.is_transitioning());
    }

    proptest! {
        #[test]
        fn prop_equal_tier_merge_values(a in -10i32..=10, b in -10i32..=10, t in 0u32..20, lvl in 0u32..10) {
            prop_assume!(a != 0 && b != 0);
            let tiered = resolve(&num(a, t), &num(b, t), RuleVariant::Tiered, &level_at(lvl));
            let plain = resolve(&num(a, t), &num(b, t), RuleVariant::Plain, &level_at(lvl));
            if a + b == 0 {
                prop_assert_eq!(tiered.product(), None);
                prop_assert_eq!(plain.points(), (a.abs() + b.abs()) as u64 * 50 * (t as u64 + 1));
            } else {
                prop_assert_eq!(tiered.product(), Some((clamp_value(a + b), (t + 1).min(lvl))));
                prop_assert_eq!(plain.product(), Some((clamp_value(a + b), t + 1)));
            }
        }

        #[test]
        fn prop_unequal_tiers_no_interaction(a in -10i32..=10, b in -10i32..=10, ta in 0u32..20, tb in 0u32..20) {
            prop_assume!(ta != tb);
            prop_assert_eq!(resolve(&num(a, ta), &num(b, tb), RuleVariant::Plain, &level_at(0)), Resolution::NoInteraction);
        }
    }
}
