use std::collections::VecDeque;

use crate::graph_utils::graph::GraphSnapshot;

// One step of the whole-graph timeline. The action is the label of the
// change that replaced this snapshot (undo) or produced it (redo).
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub snapshot: GraphSnapshot,
    pub action: String,
}

/// Whole-graph undo/redo timeline: `past` oldest-first, `future` with the
/// nearest redo target at the front, and the deep-copied current snapshot
/// in between.
#[derive(Clone, Debug, Default)]
pub struct GlobalHistory {
    past: Vec<HistoryEntry>,
    present: Option<GraphSnapshot>,
    future: VecDeque<HistoryEntry>,
}

impl GlobalHistory {
    pub fn new() -> Self {
        GlobalHistory {
            past: Vec::new(),
            present: None,
            future: VecDeque::new(),
        }
    }

    // Push the outgoing present into the past under the incoming action's
    // label, make the new snapshot present, and drop any redo branch.
    // The first call only seeds the present.
    pub fn record(&mut self, snapshot: &GraphSnapshot, action: &str) {
        if let Some(present) = self.present.take() {
            self.past.push(HistoryEntry {
                snapshot: present,
                action: action.to_string(),
            });
        }
        self.present = Some(snapshot.clone());
        self.future.clear();
    }

    /// Step back once; returns the label of the undone action.
    pub fn undo(&mut self) -> Option<String> {
        if self.past.is_empty() {
            return None;
        }
        let present = self.present.take()?;
        let previous = self.past.pop()?;
        self.future.push_front(HistoryEntry {
            snapshot: present,
            action: previous.action.clone(),
        });
        self.present = Some(previous.snapshot);
        Some(previous.action)
    }

    /// Step forward once; returns the label of the redone action.
    pub fn redo(&mut self) -> Option<String> {
        if self.future.is_empty() {
            return None;
        }
        let present = self.present.take()?;
        let next = self.future.pop_front()?;
        self.past.push(HistoryEntry {
            snapshot: present,
            action: next.action.clone(),
        });
        self.present = Some(next.snapshot);
        Some(next.action)
    }

    pub fn present(&self) -> Option<&GraphSnapshot> { self.present.as_ref() }
    pub fn past(&self) -> &[HistoryEntry] { &self.past }
    pub fn future(&self) -> &VecDeque<HistoryEntry> { &self.future }
    pub fn can_undo(&self) -> bool { !self.past.is_empty() && self.present.is_some() }
    pub fn can_redo(&self) -> bool { !self.future.is_empty() && self.present.is_some() }
}
