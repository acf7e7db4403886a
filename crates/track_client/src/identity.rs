use std::sync::RwLock;

use shared::domain::UserId;

/// Session-local record of who is signed in, used to stamp ownership on new
/// trackouts.
pub trait IdentityStore: Send + Sync {
    fn current_user_id(&self) -> Option<UserId>;
}

pub struct StaticIdentity(Option<UserId>);

impl StaticIdentity {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self(Some(user_id.into()))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityStore for StaticIdentity {
    fn current_user_id(&self) -> Option<UserId> {
        self.0.clone().filter(|id| !id.is_empty())
    }
}

#[derive(Default)]
pub struct SessionIdentity {
    user_id: RwLock<Option<UserId>>,
}

impl SessionIdentity {
    pub fn sign_in(&self, user_id: impl Into<UserId>) {
        let mut guard = self.user_id.write().unwrap_or_else(|p| p.into_inner());
        *guard = Some(user_id.into());
    }

    pub fn sign_out(&self) {
        let mut guard = self.user_id.write().unwrap_or_else(|p| p.into_inner());
        *guard = None;
    }
}

impl IdentityStore for SessionIdentity {
    fn current_user_id(&self) -> Option<UserId> {
        self.user_id
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
            .filter(|id| !id.is_empty())
    }
}
