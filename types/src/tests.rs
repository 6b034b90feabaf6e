use super::*;
use uuid::Uuid;

fn action(
    number: u32,
    dice: &[u8],
    kept: &[u8],
    score: u32,
    outcome: Option<TurnOutcome>,
) -> TurnAction {
    let available = (dice.len() - kept.len()) as u8;
    TurnAction {
        id: Uuid::new_v4(),
        action_number: number,
        dice_values: dice.to_vec(),
        kept_dice: kept.to_vec(),
        score,
        available_dice: available,
        turn_action_outcome: outcome,
    }
}

#[test]
fn remaining_dice_respects_duplicate_counts() {
    let a = action(1, &[2, 2, 5], &[5], 50, None);
    assert_eq!(a.remaining_dice(), vec![2, 2]);

    let b = action(1, &[2, 2, 5], &[2], 50, None);
    assert_eq!(b.remaining_dice(), vec![2, 5]);

    let c = action(1, &[1, 1, 1, 2, 3, 4], &[1, 1, 1], 300, None);
    assert_eq!(c.remaining_dice(), vec![2, 3, 4]);
}

#[test]
fn remaining_dice_preserves_multiset_arithmetic() {
    let cases: &[(&[u8], &[u8])] = &[
        (&[1, 1, 1, 2, 3, 4], &[1, 1, 1]),
        (&[5, 5, 5, 5, 5, 5], &[5, 5, 5]),
        (&[2, 3, 4, 6], &[]),
        (&[1], &[1]),
        (&[6, 6, 6, 1, 5, 2], &[6, 6, 6, 1, 5]),
    ];
    for (dice, kept) in cases {
        let score = if kept.is_empty() { 0 } else { 100 };
        let a = action(1, dice, kept, score, None);
        let mut recombined = a.kept_dice.clone();
        recombined.extend(a.remaining_dice());
        recombined.sort_unstable();
        let mut original = dice.to_vec();
        original.sort_unstable();
        assert_eq!(recombined, original, "dice {dice:?} kept {kept:?}");
    }
}

#[test]
fn hot_dice_rolls_a_full_set() {
    let mut a = action(1, &[1, 1, 1, 5, 5, 5], &[1, 1, 1, 5, 5, 5], 1250, None);
    a.available_dice = 0;
    assert_eq!(a.next_roll_dice(), DICE_PER_TURN);

    let b = action(1, &[1, 2, 3, 4, 5, 6], &[1, 5], 150, None);
    assert_eq!(b.next_roll_dice(), 4);
}

#[test]
fn pending_non_farkle_offers_bank_and_continue() {
    // Scenario A.
    let actions = vec![action(1, &[1, 1, 1, 2, 3, 4], &[1, 1, 1], 300, None)];
    let snapshot = TurnSnapshot::try_new(&actions).unwrap();
    assert!(!snapshot.is_farkle());
    assert!(snapshot.can_bank());
    assert!(snapshot.can_continue());
    assert!(!snapshot.can_start_turn());
    assert_eq!(
        snapshot.legal_actions(),
        &[LegalAction::Bank, LegalAction::Continue]
    );
    assert_eq!(actions[0].remaining_dice(), vec![2, 3, 4]);
}

#[test]
fn pending_farkle_forces_bust() {
    // Scenario B.
    let actions = vec![action(1, &[2, 3, 4, 6], &[], 0, None)];
    let snapshot = TurnSnapshot::try_new(&actions).unwrap();
    assert!(snapshot.is_farkle());
    assert!(!snapshot.can_bank());
    assert!(!snapshot.can_continue());
    assert_eq!(snapshot.legal_actions(), &[LegalAction::Bust]);
}

#[test]
fn resolved_turn_offers_start() {
    // Scenario C.
    let actions = vec![action(
        1,
        &[1, 5, 2, 3, 4, 6],
        &[1, 5],
        150,
        Some(TurnOutcome::Bank),
    )];
    let snapshot = TurnSnapshot::try_new(&actions).unwrap();
    assert!(snapshot.can_start_turn());
    assert_eq!(snapshot.legal_actions(), &[LegalAction::StartTurn]);
}

#[test]
fn empty_turn_offers_start() {
    let snapshot = TurnSnapshot::try_new(&[]).unwrap();
    assert!(snapshot.can_start_turn());
    assert!(snapshot.latest().is_none());
    assert!(!snapshot.is_farkle());
    assert_eq!(snapshot.legal_actions(), &[LegalAction::StartTurn]);
    assert_eq!(snapshot.turn_total(), 0);
}

#[test]
fn reduction_is_idempotent() {
    let actions = vec![
        action(1, &[1, 1, 2, 3, 4, 6], &[1, 1], 200, Some(TurnOutcome::Continue)),
        action(2, &[5, 2, 3, 4], &[5], 50, None),
    ];
    let first = TurnSnapshot::try_new(&actions).unwrap().legal_actions();
    let second = TurnSnapshot::try_new(&actions).unwrap().legal_actions();
    assert_eq!(first, second);
    assert_eq!(TurnSnapshot::try_new(&actions).unwrap().turn_total(), 250);
}

#[test]
fn two_pending_actions_are_rejected() {
    // Scenario E.
    let actions = vec![
        action(1, &[1, 2, 3, 4, 5, 6], &[1, 5], 150, None),
        action(2, &[2, 3, 4, 6], &[], 0, None),
    ];
    assert_eq!(
        TurnSnapshot::try_new(&actions),
        Err(InconsistentTurnState::PendingNotLast(1))
    );
}

#[test]
fn sequence_gaps_are_rejected() {
    let actions = vec![
        action(1, &[1, 5], &[1], 100, Some(TurnOutcome::Continue)),
        action(3, &[2, 3], &[], 0, None),
    ];
    assert_eq!(
        TurnSnapshot::try_new(&actions),
        Err(InconsistentTurnState::NonMonotonicSequence {
            index: 1,
            expected: 2,
            got: 3,
        })
    );
}

#[test]
fn score_kept_mismatch_is_rejected() {
    // A farkle must score zero, and a scoring roll must keep dice.
    let zero_with_kept = vec![action(1, &[1, 2, 3], &[1], 0, None)];
    assert!(matches!(
        TurnSnapshot::try_new(&zero_with_kept),
        Err(InconsistentTurnState::ScoreKeptMismatch { .. })
    ));

    let score_without_kept = vec![action(1, &[1, 2, 3], &[], 100, None)];
    assert!(matches!(
        TurnSnapshot::try_new(&score_without_kept),
        Err(InconsistentTurnState::ScoreKeptMismatch { .. })
    ));
}

#[test]
fn kept_dice_outside_roll_are_rejected() {
    let actions = vec![action(1, &[2, 3, 4], &[5], 50, None)];
    assert_eq!(
        TurnSnapshot::try_new(&actions),
        Err(InconsistentTurnState::KeptNotSubset(1))
    );
}

#[test]
fn empty_roll_is_rejected() {
    let actions = vec![action(1, &[], &[], 0, None)];
    assert!(matches!(
        TurnSnapshot::try_new(&actions),
        Err(InconsistentTurnState::BadDiceCount { .. })
    ));
}

#[test]
fn selection_toggle_is_reversible() {
    let a = action(1, &[1, 1, 5, 2], &[1, 1, 5], 250, None);
    let mut selection = DiceSelection::new();
    selection.toggle(0, &a);
    selection.toggle(2, &a);
    let before = selection.clone();
    selection.toggle(1, &a);
    selection.toggle(1, &a);
    assert_eq!(selection, before);
    assert_eq!(selection.selected_values(&a), vec![1, 5]);
}

#[test]
fn selection_preserves_duplicate_faces() {
    let a = action(1, &[1, 1, 1, 2], &[1, 1, 1], 300, None);
    let mut selection = DiceSelection::new();
    selection.toggle(0, &a);
    selection.toggle(1, &a);
    selection.toggle(2, &a);
    assert_eq!(selection.selected_values(&a), vec![1, 1, 1]);
}

#[test]
fn selection_ignores_out_of_bounds_and_resolved_actions() {
    let pending = action(1, &[1, 5], &[1, 5], 150, None);
    let mut selection = DiceSelection::new();
    selection.toggle(7, &pending);
    assert!(selection.is_empty());

    let resolved = action(1, &[1, 5], &[1, 5], 150, Some(TurnOutcome::Bank));
    selection.toggle(0, &resolved);
    assert!(selection.is_empty());
}

#[test]
fn turn_update_wire_shape_is_tagged() {
    let update = TurnUpdate::TurnClosed {
        game_id: Uuid::nil(),
        turn_number: 3,
        outcome: TurnOutcome::Bust,
        banked_score: 0,
        next_player_id: Uuid::nil(),
    };
    let value: serde_json::Value = serde_json::to_value(&update).unwrap();
    assert_eq!(value["type"], "turn_closed");
    assert_eq!(value["outcome"], "bust");
    let decoded: TurnUpdate = serde_json::from_value(value).unwrap();
    assert_eq!(decoded, update);
}
