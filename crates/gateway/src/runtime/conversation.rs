//! Conversation state: the ordered turn log replayed to the model.

use bc_domain::tool::Turn;
use bc_domain::trace::TraceEvent;

/// Ordered, bounded log of turns.
///
/// Between exchanges the log holds at most `cap` turns, the most recent
/// ones in their original order. During an exchange it may grow past the
/// cap; [`apply_bound`](Self::apply_bound) trims it once the exchange ends.
#[derive(Debug, Clone)]
pub struct ConversationState {
    turns: Vec<Turn>,
    cap: usize,
}

impl ConversationState {
    /// A cap of zero is treated as one.
    pub fn new(cap: usize) -> Self {
        Self {
            turns: Vec::new(),
            cap: cap.max(1),
        }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// The turns sent with the next completion request, oldest first.
    pub fn window(&self) -> &[Turn] {
        &self.turns
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drop the oldest turns beyond the cap. Returns how many were dropped.
    pub fn apply_bound(&mut self) -> usize {
        let excess = self.turns.len().saturating_sub(self.cap);
        if excess == 0 {
            return 0;
        }
        self.turns.drain(..excess);

        tracing::debug!(dropped = excess, retained = self.turns.len(), "history trimmed");
        TraceEvent::HistoryTrimmed {
            dropped: excess,
            retained: self.turns.len(),
        }
        .emit();
        excess
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_keeps_most_recent_in_order() {
        let mut conv = ConversationState::new(3);
        for i in 0..5 {
            conv.push(Turn::user(format!("m{i}")));
        }
        assert_eq!(conv.len(), 5);
        assert_eq!(conv.apply_bound(), 2);
        assert_eq!(
            conv.window(),
            &[Turn::user("m2"), Turn::user("m3"), Turn::user("m4")]
        );
    }

    #[test]
    fn bound_never_exceeds_cap_for_any_sequence() {
        for cap in 1..6 {
            let mut conv = ConversationState::new(cap);
            let mut all = Vec::new();
            for exchange in 0..20 {
                // Exchanges of varying size: 1..=4 turns.
                for j in 0..(exchange % 4 + 1) {
                    let turn = Turn::model_text(format!("{exchange}.{j}"));
                    all.push(turn.clone());
                    conv.push(turn);
                }
                conv.apply_bound();
                assert!(conv.len() <= cap);
                assert_eq!(conv.window(), &all[all.len() - conv.len()..]);
            }
        }
    }

    #[test]
    fn under_cap_is_untouched() {
        let mut conv = ConversationState::new(10);
        conv.push(Turn::user("hi"));
        assert_eq!(conv.apply_bound(), 0);
        assert_eq!(conv.len(), 1);
    }

    #[test]
    fn zero_cap_is_clamped() {
        let conv = ConversationState::new(0);
        assert_eq!(conv.cap(), 1);
        assert!(conv.is_empty());
    }
}
