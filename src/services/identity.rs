//! Identity service
//!
//! The worry flow is only reachable for an authenticated owner. The
//! external identity provider is abstracted to the minimum the engine
//! needs: a current user with a stable id, and sign-out. Locally the
//! profile comes from the settings file, so the owner id is stable
//! across restarts.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// The authenticated owner all record operations are scoped to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub display_name: String,
}

/// Holds the session's authentication state
#[derive(Debug, Default)]
pub struct IdentityService {
    current: Option<CurrentUser>,
}

impl IdentityService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&mut self, user: CurrentUser) {
        tracing::info!("Signed in as {} ({})", user.display_name, user.id);
        self.current = Some(user);
    }

    pub fn current_user(&self) -> Option<&CurrentUser> {
        self.current.as_ref()
    }

    /// The current user, or `NotAuthenticated` when nobody is signed in
    pub fn require_user(&self) -> Result<CurrentUser> {
        self.current.clone().ok_or(AppError::NotAuthenticated)
    }

    pub fn sign_out(&mut self) {
        if let Some(user) = self.current.take() {
            tracing::info!("Signed out {}", user.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> CurrentUser {
        CurrentUser {
            id: "user-1".to_string(),
            display_name: "Test User".to_string(),
        }
    }

    #[test]
    fn test_require_user_gates_on_sign_in() {
        let mut identity = IdentityService::new();

        assert!(matches!(
            identity.require_user(),
            Err(AppError::NotAuthenticated)
        ));

        identity.sign_in(user());
        assert_eq!(identity.require_user().unwrap().id, "user-1");

        identity.sign_out();
        assert!(identity.current_user().is_none());
        assert!(identity.require_user().is_err());
    }
}
