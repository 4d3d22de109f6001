use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

use crate::csrf;

/// Opaque browser-session identifier, carried in the encrypted session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(csrf::generate_session_id())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
