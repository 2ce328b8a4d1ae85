// ABOUTME: Lifecycle state graphs for ECR, ECO and ECN records
// ABOUTME: Pure edge tables consulted by the engine before any write

use std::fmt;

use crate::types::{EcnApprovalStatus, EcoStatus, EcrStatus, ImplementationStatus};

/// A finite lifecycle with an explicit successor table
pub trait StateGraph: Copy + Eq + fmt::Display + 'static {
    fn successors(&self) -> &'static [Self];

    fn can_transition_to(&self, target: Self) -> bool {
        self.successors().contains(&target)
    }

    fn is_terminal(&self) -> bool {
        self.successors().is_empty()
    }
}

impl StateGraph for EcrStatus {
    fn successors(&self) -> &'static [Self] {
        use EcrStatus::*;
        match self {
            Draft => &[Submitted],
            Submitted => &[UnderReview],
            UnderReview => &[Approved, Rejected, MoreInfoNeeded, CrbReview],
            MoreInfoNeeded => &[Submitted],
            CrbReview => &[Approved, Rejected],
            Approved | Rejected => &[],
        }
    }
}

impl StateGraph for EcoStatus {
    fn successors(&self) -> &'static [Self] {
        use EcoStatus::*;
        match self {
            Backlog => &[InProgress],
            InProgress => &[Review],
            Review => &[Completed, OnHold],
            OnHold => &[InProgress],
            Completed => &[],
        }
    }
}

impl StateGraph for ImplementationStatus {
    fn successors(&self) -> &'static [Self] {
        use ImplementationStatus::*;
        match self {
            Waiting => &[InProgress],
            InProgress => &[Completed],
            Completed => &[],
        }
    }
}

impl StateGraph for EcnApprovalStatus {
    fn successors(&self) -> &'static [Self] {
        use EcnApprovalStatus::*;
        match self {
            Pending => &[Approved, Rejected],
            Approved | Rejected => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(EcrStatus::Approved.is_terminal());
        assert!(EcrStatus::Rejected.is_terminal());
        assert!(!EcrStatus::CrbReview.is_terminal());
        assert!(EcoStatus::Completed.is_terminal());
        assert!(!EcoStatus::OnHold.is_terminal());
        assert!(ImplementationStatus::Completed.is_terminal());
    }

    #[test]
    fn test_no_self_loops() {
        for status in EcrStatus::ALL {
            assert!(!status.can_transition_to(status), "{} loops", status);
        }
        for status in EcoStatus::ALL {
            assert!(!status.can_transition_to(status), "{} loops", status);
        }
    }

    #[test]
    fn test_implementation_cannot_skip() {
        assert!(!ImplementationStatus::Waiting.can_transition_to(ImplementationStatus::Completed));
        assert!(!ImplementationStatus::Completed.can_transition_to(ImplementationStatus::Waiting));
    }
}
