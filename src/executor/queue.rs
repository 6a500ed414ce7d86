//! Single-chain command queue.
//!
//! Chains are FIFO at the chain granularity: a chain arriving while one
//! is mid-execution lands behind the current chain's remaining commands,
//! never interleaved. STOP clears everything.

use crate::command::{AtomicCommand, CommandChain};
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct ChainQueue {
    pending: VecDeque<AtomicCommand>,
}

impl ChainQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a whole chain behind anything already queued
    pub fn push_chain(&mut self, chain: CommandChain) {
        self.pending.extend(chain.commands);
    }

    pub fn pop(&mut self) -> Option<AtomicCommand> {
        self.pending.pop_front()
    }

    /// Drop every queued command, returning how many were discarded
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Whether any queued command still needs the offboard stream
    pub fn has_offboard_work(&self) -> bool {
        self.pending.iter().any(|c| c.kind.needs_offboard())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandKind;

    fn cmd(kind: CommandKind) -> AtomicCommand {
        AtomicCommand {
            kind,
            direction: None,
            magnitude: None,
            raw_text: String::new(),
            recognized_at_ms: 0,
        }
    }

    #[test]
    fn test_chains_are_fifo_at_chain_granularity() {
        let mut queue = ChainQueue::new();
        queue.push_chain(CommandChain::new(vec![
            cmd(CommandKind::Arm),
            cmd(CommandKind::Takeoff),
        ]));
        queue.push_chain(CommandChain::new(vec![cmd(CommandKind::Land)]));

        assert_eq!(queue.pop().unwrap().kind, CommandKind::Arm);
        assert_eq!(queue.pop().unwrap().kind, CommandKind::Takeoff);
        assert_eq!(queue.pop().unwrap().kind, CommandKind::Land);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_clear_reports_dropped_count() {
        let mut queue = ChainQueue::new();
        queue.push_chain(CommandChain::new(vec![
            cmd(CommandKind::Arm),
            cmd(CommandKind::Takeoff),
            cmd(CommandKind::Land),
        ]));
        assert_eq!(queue.pop().unwrap().kind, CommandKind::Arm);
        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_offboard_work_detection() {
        let mut queue = ChainQueue::new();
        queue.push_chain(CommandChain::new(vec![cmd(CommandKind::Arm)]));
        assert!(!queue.has_offboard_work());
        queue.push_chain(CommandChain::new(vec![cmd(CommandKind::Move)]));
        assert!(queue.has_offboard_work());
    }
}
