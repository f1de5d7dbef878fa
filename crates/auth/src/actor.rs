use serde::{Deserialize, Serialize};

use almacen_core::ActorId;

use crate::Claim;

/// A resolved actor for authorization decisions.
///
/// Construction is intentionally decoupled from storage and transport: the
/// identity collaborator decodes/validates whatever token is in use and hands
/// the ledger a claim set. The ledger only ever asks boolean capability
/// questions against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub actor_id: ActorId,
    pub claims: Vec<Claim>,
}

impl Actor {
    pub fn new(actor_id: ActorId, claims: Vec<Claim>) -> Self {
        Self { actor_id, claims }
    }

    /// Actor with no claims (ordinary consumption movements).
    pub fn unprivileged(actor_id: ActorId) -> Self {
        Self::new(actor_id, Vec::new())
    }

    /// Capability check: does this actor hold `claim` (or the wildcard)?
    ///
    /// - No IO
    /// - No panics
    /// - No business logic (pure policy check)
    pub fn has(&self, claim: &Claim) -> bool {
        self.claims
            .iter()
            .any(|c| c.is_wildcard() || c == claim)
    }

    /// Does this actor satisfy the elevated authorization required by
    /// authorization-gated adjustment types?
    pub fn can_authorize_adjustments(&self) -> bool {
        self.has(&Claim::adjust_authorize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unprivileged_actor_cannot_authorize() {
        let actor = Actor::unprivileged(ActorId::new());
        assert!(!actor.can_authorize_adjustments());
    }

    #[test]
    fn explicit_claim_grants_authorization() {
        let actor = Actor::new(ActorId::new(), vec![Claim::adjust_authorize()]);
        assert!(actor.can_authorize_adjustments());
    }

    #[test]
    fn wildcard_grants_everything() {
        let actor = Actor::new(ActorId::new(), vec![Claim::new("*")]);
        assert!(actor.can_authorize_adjustments());
        assert!(actor.has(&Claim::new("inventory.read")));
    }

    #[test]
    fn unrelated_claim_does_not_grant() {
        let actor = Actor::new(ActorId::new(), vec![Claim::new("inventory.read")]);
        assert!(!actor.can_authorize_adjustments());
    }
}
