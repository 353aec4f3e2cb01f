use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::document::MemberId;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("index {index} is out of range for a chain of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproverStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproverEntry {
    /// 1-based position in the chain. Recomputed from array order after
    /// every mutation; never assigned independently.
    pub order: u32,
    pub member_id: MemberId,
    pub status: ApproverStatus,
    pub comment: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl ApproverEntry {
    fn new(member_id: MemberId) -> Self {
        Self {
            order: 0,
            member_id,
            status: ApproverStatus::Pending,
            comment: None,
            processed_at: None,
        }
    }
}

/// The ordered approver sequence plus the unordered reference (CC) set.
/// References are informational only; their order carries no workflow
/// meaning even though it can be edited.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalChain {
    approvers: Vec<ApproverEntry>,
    references: Vec<MemberId>,
}

impl ApprovalChain {
    /// Rehydrates a chain from storage. Order values are recomputed from the
    /// given array order, so a repository only has to preserve row order.
    pub fn from_parts(approvers: Vec<ApproverEntry>, references: Vec<MemberId>) -> Self {
        let mut chain = Self { approvers, references };
        chain.renumber();
        chain
    }

    pub fn approvers(&self) -> &[ApproverEntry] {
        &self.approvers
    }

    pub fn approvers_mut(&mut self) -> &mut [ApproverEntry] {
        &mut self.approvers
    }

    pub fn references(&self) -> &[MemberId] {
        &self.references
    }

    pub fn is_empty(&self) -> bool {
        self.approvers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.approvers.len()
    }

    /// Appends an approver. A member already in the chain is left where it
    /// is; being a reference does not exclude being an approver.
    pub fn add_approver(&mut self, member_id: MemberId) {
        if self.approvers.iter().any(|entry| entry.member_id == member_id) {
            return;
        }
        self.approvers.push(ApproverEntry::new(member_id));
        self.renumber();
    }

    pub fn remove_approver(&mut self, member_id: &MemberId) {
        self.approvers.retain(|entry| &entry.member_id != member_id);
        self.renumber();
    }

    /// Splice move: removes the entry at `from` and reinserts it at `to`,
    /// shifting the entries in between. Out-of-range indexes leave the chain
    /// untouched.
    pub fn move_approver(&mut self, from: usize, to: usize) -> Result<(), ChainError> {
        Self::splice(&mut self.approvers, from, to)?;
        self.renumber();
        Ok(())
    }

    pub fn add_reference(&mut self, member_id: MemberId) {
        if self.references.contains(&member_id) {
            return;
        }
        self.references.push(member_id);
    }

    pub fn remove_reference(&mut self, member_id: &MemberId) {
        self.references.retain(|existing| existing != member_id);
    }

    pub fn move_reference(&mut self, from: usize, to: usize) -> Result<(), ChainError> {
        Self::splice(&mut self.references, from, to)
    }

    /// Puts every entry back to `Pending` with no comment or timestamp.
    /// Called once at submission so stale decisions from an earlier edit
    /// round never leak into the live chain.
    pub fn reset_statuses(&mut self) {
        for entry in &mut self.approvers {
            entry.status = ApproverStatus::Pending;
            entry.comment = None;
            entry.processed_at = None;
        }
    }

    /// Index of the lowest-order entry still pending, if any.
    pub fn first_pending_index(&self) -> Option<usize> {
        self.approvers.iter().position(|entry| entry.status == ApproverStatus::Pending)
    }

    fn splice<T>(items: &mut Vec<T>, from: usize, to: usize) -> Result<(), ChainError> {
        let len = items.len();
        if from >= len {
            return Err(ChainError::IndexOutOfRange { index: from, len });
        }
        if to >= len {
            return Err(ChainError::IndexOutOfRange { index: to, len });
        }

        let moved = items.remove(from);
        items.insert(to, moved);
        Ok(())
    }

    fn renumber(&mut self) {
        for (position, entry) in self.approvers.iter_mut().enumerate() {
            entry.order = position as u32 + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ApprovalChain, ApproverStatus, ChainError};
    use crate::domain::document::MemberId;

    fn member(id: &str) -> MemberId {
        MemberId(id.to_string())
    }

    fn chain_of(ids: &[&str]) -> ApprovalChain {
        let mut chain = ApprovalChain::default();
        for id in ids {
            chain.add_approver(member(id));
        }
        chain
    }

    fn orders(chain: &ApprovalChain) -> Vec<u32> {
        chain.approvers().iter().map(|entry| entry.order).collect()
    }

    fn members(chain: &ApprovalChain) -> Vec<String> {
        chain.approvers().iter().map(|entry| entry.member_id.0.clone()).collect()
    }

    #[test]
    fn orders_stay_dense_through_mixed_mutations() {
        let mut chain = chain_of(&["a", "b", "c", "d"]);
        chain.remove_approver(&member("b"));
        chain.move_approver(0, 2).expect("move in range");
        chain.add_approver(member("e"));
        chain.remove_approver(&member("d"));

        assert_eq!(orders(&chain), vec![1, 2, 3]);
    }

    #[test]
    fn move_matches_remove_then_insert() {
        let mut chain = chain_of(&["a", "b", "c", "d", "e"]);
        chain.move_approver(1, 3).expect("move in range");

        assert_eq!(members(&chain), vec!["a", "c", "d", "b", "e"]);
        assert_eq!(orders(&chain), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn move_toward_front_shifts_the_rest_back() {
        let mut chain = chain_of(&["a", "b", "c"]);
        chain.move_approver(2, 0).expect("move in range");

        assert_eq!(members(&chain), vec!["c", "a", "b"]);
    }

    #[test]
    fn out_of_range_move_leaves_chain_unmodified() {
        let mut chain = chain_of(&["a", "b"]);
        let before = chain.clone();

        let error = chain.move_approver(0, 2).expect_err("to index out of range");
        assert_eq!(error, ChainError::IndexOutOfRange { index: 2, len: 2 });
        assert_eq!(chain, before);

        let error = chain.move_approver(5, 0).expect_err("from index out of range");
        assert_eq!(error, ChainError::IndexOutOfRange { index: 5, len: 2 });
        assert_eq!(chain, before);
    }

    #[test]
    fn duplicate_approver_is_a_noop() {
        let mut chain = chain_of(&["a", "b"]);
        chain.add_approver(member("a"));

        assert_eq!(chain.len(), 2);
        assert_eq!(orders(&chain), vec![1, 2]);
    }

    #[test]
    fn member_can_be_both_approver_and_reference() {
        let mut chain = chain_of(&["a"]);
        chain.add_reference(member("a"));

        assert_eq!(chain.len(), 1);
        assert_eq!(chain.references(), &[member("a")]);
    }

    #[test]
    fn removing_absent_members_is_idempotent() {
        let mut chain = chain_of(&["a"]);
        chain.remove_approver(&member("zz"));
        chain.remove_reference(&member("zz"));

        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn reference_move_is_pure_reordering() {
        let mut chain = ApprovalChain::default();
        chain.add_reference(member("x"));
        chain.add_reference(member("y"));
        chain.add_reference(member("z"));

        chain.move_reference(2, 0).expect("move in range");
        assert_eq!(chain.references(), &[member("z"), member("x"), member("y")]);
    }

    #[test]
    fn reset_clears_decisions() {
        let mut chain = chain_of(&["a", "b"]);
        chain.approvers_mut()[0].status = ApproverStatus::Approved;
        chain.approvers_mut()[0].comment = Some("ok".to_string());

        chain.reset_statuses();

        assert!(chain
            .approvers()
            .iter()
            .all(|entry| entry.status == ApproverStatus::Pending
                && entry.comment.is_none()
                && entry.processed_at.is_none()));
    }

    #[test]
    fn first_pending_skips_processed_entries() {
        let mut chain = chain_of(&["a", "b", "c"]);
        chain.approvers_mut()[0].status = ApproverStatus::Approved;

        assert_eq!(chain.first_pending_index(), Some(1));
    }
}
