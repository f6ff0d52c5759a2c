use std::collections::HashSet;

use crate::models::ThreadId;

/// Modifier keys held during a click on a thread card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    /// Ctrl, or Cmd on macOS.
    pub toggle: bool,
    pub shift: bool,
}

/// What a click on a thread card should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Plain click: open the thread.
    Open(ThreadId),
    /// The click only changed the multi-selection.
    Selection,
}

/// Multi-selection over the visible threads, with a shift-click anchor.
#[derive(Debug, Clone, Default)]
pub struct SelectionModel {
    selected: HashSet<ThreadId>,
    anchor: Option<ThreadId>,
}

impl SelectionModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> &HashSet<ThreadId> {
        &self.selected
    }

    pub fn anchor(&self) -> Option<ThreadId> {
        self.anchor
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn contains(&self, id: ThreadId) -> bool {
        self.selected.contains(&id)
    }

    /// Selected ids in on-screen order.
    pub fn ordered(&self, visible: &[ThreadId]) -> Vec<ThreadId> {
        visible.iter().copied().filter(|id| self.selected.contains(id)).collect()
    }

    pub fn toggle(&mut self, id: ThreadId, selected: bool) {
        if selected {
            self.selected.insert(id);
        } else {
            self.selected.remove(&id);
        }
    }

    /// Set every visible id between `anchor` and `target` (inclusive) to
    /// `selected`. Both ends must be visible; the target becomes the anchor.
    pub fn range(&mut self, anchor: ThreadId, target: ThreadId, visible: &[ThreadId], selected: bool) -> bool {
        let (Some(a), Some(b)) = (
            visible.iter().position(|id| *id == anchor),
            visible.iter().position(|id| *id == target),
        ) else {
            return false;
        };
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        for id in &visible[start..=end] {
            self.toggle(*id, selected);
        }
        self.anchor = Some(target);
        true
    }

    pub fn select_all(&mut self, visible: &[ThreadId]) {
        self.selected.extend(visible.iter().copied());
        self.anchor = visible.last().copied();
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.anchor = None;
    }

    /// Drop ids that are no longer on screen. An empty list also forgets the anchor.
    pub fn prune(&mut self, visible: &[ThreadId]) {
        if visible.is_empty() {
            self.clear();
            return;
        }
        self.selected.retain(|id| visible.contains(id));
    }

    /// Card click: toggle with ctrl/cmd, range with shift (when an anchor
    /// exists), open otherwise.
    pub fn click(&mut self, id: ThreadId, modifiers: Modifiers, visible: &[ThreadId]) -> ClickOutcome {
        if modifiers.toggle {
            let now_selected = !self.contains(id);
            self.toggle(id, now_selected);
            self.anchor = Some(id);
            return ClickOutcome::Selection;
        }
        if modifiers.shift {
            if let Some(anchor) = self.anchor {
                self.range(anchor, id, visible, true);
                return ClickOutcome::Selection;
            }
        }
        ClickOutcome::Open(id)
    }

    /// The card's checkbox changed to `checked`.
    pub fn checkbox(&mut self, id: ThreadId, checked: bool, shift: bool, visible: &[ThreadId]) {
        match self.anchor {
            Some(anchor) if shift && anchor != id => {
                self.range(anchor, id, visible, checked);
            }
            _ => {
                self.toggle(id, checked);
                self.anchor = Some(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VISIBLE: [ThreadId; 5] = [10, 20, 30, 40, 50];

    #[test]
    fn shift_click_selects_inclusive_range() {
        let mut s = SelectionModel::new();
        assert_eq!(
            s.click(20, Modifiers { toggle: true, shift: false }, &VISIBLE),
            ClickOutcome::Selection
        );
        s.click(40, Modifiers { toggle: false, shift: true }, &VISIBLE);
        assert_eq!(s.ordered(&VISIBLE), vec![20, 30, 40]);
        assert_eq!(s.anchor(), Some(40));

        // Backwards from the new anchor.
        s.click(10, Modifiers { toggle: false, shift: true }, &VISIBLE);
        assert_eq!(s.ordered(&VISIBLE), vec![10, 20, 30, 40]);
    }

    #[test]
    fn shift_without_anchor_opens() {
        let mut s = SelectionModel::new();
        assert_eq!(
            s.click(30, Modifiers { toggle: false, shift: true }, &VISIBLE),
            ClickOutcome::Open(30)
        );
        assert!(s.is_empty());
    }

    #[test]
    fn ctrl_click_toggles() {
        let mut s = SelectionModel::new();
        let ctrl = Modifiers { toggle: true, shift: false };
        s.click(30, ctrl, &VISIBLE);
        assert!(s.contains(30));
        s.click(30, ctrl, &VISIBLE);
        assert!(!s.contains(30));
        assert_eq!(s.anchor(), Some(30));
    }

    #[test]
    fn range_needs_both_ends_visible() {
        let mut s = SelectionModel::new();
        assert!(!s.range(10, 99, &VISIBLE, true));
        assert!(s.is_empty());
    }

    #[test]
    fn checkbox_range_unselects() {
        let mut s = SelectionModel::new();
        s.select_all(&VISIBLE);
        assert_eq!(s.anchor(), Some(50));
        s.checkbox(20, false, true, &VISIBLE);
        assert_eq!(s.ordered(&VISIBLE), vec![10]);
        s.checkbox(10, false, true, &VISIBLE);
        assert!(s.is_empty());
    }

    #[test]
    fn prune_keeps_only_visible() {
        let mut s = SelectionModel::new();
        s.select_all(&VISIBLE);
        s.prune(&[20, 30]);
        assert_eq!(s.len(), 2);
        s.prune(&[]);
        assert!(s.is_empty());
        assert_eq!(s.anchor(), None);
    }
}
