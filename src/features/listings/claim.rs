//! Claim state machine embedded in every listing:
//! `unclaimed -> pending -> claimed`, one outstanding claim at a time.
//!
//! The service applies transitions with guarded UPDATEs; these checks explain
//! why a guarded UPDATE matched no row.

use crate::core::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimState<'a> {
    pub claimed_by: Option<&'a str>,
    pub pending_claim_by: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimDecision {
    Approve,
    Reject,
}

impl<'a> ClaimState<'a> {
    pub fn new(claimed_by: Option<&'a str>, pending_claim_by: Option<&'a str>) -> Self {
        Self {
            claimed_by,
            pending_claim_by,
        }
    }

    /// An actor may claim unless another actor owns the listing or has a claim pending
    pub fn ensure_claimable_by(&self, actor: &str) -> Result<(), AppError> {
        if self.claimed_by.is_some_and(|owner| owner != actor) {
            return Err(AppError::Conflict(
                "This listing is already owned.".to_string(),
            ));
        }
        if self.pending_claim_by.is_some_and(|pending| pending != actor) {
            return Err(AppError::Conflict(
                "Another claim is already pending review.".to_string(),
            ));
        }
        Ok(())
    }

    pub fn ensure_pending(&self, decision: ClaimDecision) -> Result<(), AppError> {
        if self.pending_claim_by.is_none() {
            let verb = match decision {
                ClaimDecision::Approve => "approve",
                ClaimDecision::Reject => "reject",
            };
            return Err(AppError::BadRequest(format!(
                "No pending claim to {}.",
                verb
            )));
        }
        Ok(())
    }
}

/// Moderation note for a claim: `Relationship: <r> | <notes>`, or `None` when both are blank
pub fn compose_claim_note(relationship: Option<&str>, notes: Option<&str>) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(relationship) = relationship.map(str::trim).filter(|r| !r.is_empty()) {
        parts.push(format!("Relationship: {}", relationship));
    }
    if let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) {
        parts.push(notes.to_string());
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unclaimed_is_claimable() {
        assert!(ClaimState::new(None, None).ensure_claimable_by("alice").is_ok());
    }

    #[test]
    fn test_owned_by_other_conflicts() {
        let err = ClaimState::new(Some("bob"), None)
            .ensure_claimable_by("alice")
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == "This listing is already owned."));
    }

    #[test]
    fn test_pending_for_other_conflicts() {
        let err = ClaimState::new(None, Some("bob"))
            .ensure_claimable_by("alice")
            .unwrap_err();
        assert!(
            matches!(err, AppError::Conflict(ref m) if m == "Another claim is already pending review.")
        );
    }

    #[test]
    fn test_same_actor_may_reclaim() {
        assert!(ClaimState::new(Some("alice"), Some("alice"))
            .ensure_claimable_by("alice")
            .is_ok());
    }

    #[test]
    fn test_decisions_require_pending() {
        let idle = ClaimState::new(Some("alice"), None);
        assert!(matches!(
            idle.ensure_pending(ClaimDecision::Approve),
            Err(AppError::BadRequest(ref m)) if m == "No pending claim to approve."
        ));
        assert!(matches!(
            idle.ensure_pending(ClaimDecision::Reject),
            Err(AppError::BadRequest(ref m)) if m == "No pending claim to reject."
        ));
        assert!(ClaimState::new(None, Some("bob"))
            .ensure_pending(ClaimDecision::Approve)
            .is_ok());
    }

    #[test]
    fn test_compose_claim_note() {
        assert_eq!(
            compose_claim_note(Some("Owner"), Some("Call me")),
            Some("Relationship: Owner | Call me".to_string())
        );
        assert_eq!(compose_claim_note(Some("  "), Some("x")), Some("x".to_string()));
        assert_eq!(compose_claim_note(None, None), None);
    }
}
