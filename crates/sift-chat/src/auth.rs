//! Authorization policy consulted by the transport before dispatching to
//! the orchestrator. An empty allow-list means open access.

use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct AuthPolicy {
    allowed: HashSet<String>,
}

impl AuthPolicy {
    /// Open policy: every user is permitted.
    pub fn open() -> Self {
        Self::default()
    }

    pub fn allow_users<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: users.into_iter().map(Into::into).collect(),
        }
    }

    pub fn permits(&self, user_id: &str) -> bool {
        self.allowed.is_empty() || self.allowed.contains(user_id)
    }
}
