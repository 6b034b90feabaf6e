use crate::TurnAction;
use std::collections::BTreeSet;

/// Ephemeral, client-only set of dice the player has tentatively marked to
/// keep, stored as indices into the pending action's `dice_values`.
///
/// Never persisted and never applied to resolved actions: history is
/// immutable, so toggles against a resolved action are silent no-ops.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiceSelection {
    selected: BTreeSet<usize>,
}

impl DiceSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of `index` in the selection.
    ///
    /// No-op when `index` is out of bounds for the action's dice, or when
    /// the action is already resolved.
    pub fn toggle(&mut self, index: usize, action: &TurnAction) {
        if !action.is_pending() || index >= action.dice_values.len() {
            return;
        }
        if !self.selected.remove(&index) {
            self.selected.insert(index);
        }
    }

    /// Selected indices, ascending.
    pub fn indices(&self) -> &BTreeSet<usize> {
        &self.selected
    }

    /// Map selected indices back to face values, preserving duplicates.
    pub fn selected_values(&self, action: &TurnAction) -> Vec<u8> {
        self.selected
            .iter()
            .filter_map(|&index| action.dice_values.get(index).copied())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Reset to empty. Called whenever a new pending action arrives or a
    /// bank/continue/bust is dispatched successfully.
    pub fn clear(&mut self) {
        self.selected.clear();
    }
}
