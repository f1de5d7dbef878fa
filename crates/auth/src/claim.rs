use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Capability claim identifier.
///
/// Claims are modeled as opaque strings (e.g. "inventory.adjust.authorize").
/// A special wildcard claim `"*"` can be used by policy layers to indicate
/// "allow all" without hardcoding domain claims into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claim(Cow<'static, str>);

impl Claim {
    /// Elevated claim required by authorization-gated adjustment exits.
    pub const ADJUST_AUTHORIZE: &'static str = "inventory.adjust.authorize";

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn adjust_authorize() -> Self {
        Self::new(Self::ADJUST_AUTHORIZE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Claim {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
