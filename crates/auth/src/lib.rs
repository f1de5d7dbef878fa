//! `almacen-auth` — pure authorization boundary for the inventory core.
//!
//! Authentication, sessions and token decoding live in the identity
//! collaborator; this crate only models the resolved actor and its
//! capability claims. The ledger asks exactly one question here: does the
//! actor satisfy elevated authorization for a gated adjustment?

pub mod actor;
pub mod claim;

pub use actor::Actor;
pub use claim::Claim;
