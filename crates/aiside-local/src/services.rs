//! Fixed user and credit services, for hosts (and the CLI) that already know who is asking.

use aiside_core::{CourseKey, CreditService, CreditState, User, UserService};

#[derive(Debug, Clone, Default)]
pub struct StaticUser(pub Option<User>);

impl UserService for StaticUser {
    fn current_user(&self) -> Option<User> {
        self.0.clone()
    }
}

/// Reports the same credit state for every user and course.
#[derive(Debug, Clone, Default)]
pub struct StaticCredit(pub Option<CreditState>);

impl StaticCredit {
    pub fn enrolled(mode: impl Into<String>) -> Self {
        Self(Some(CreditState {
            enrollment_mode: Some(mode.into()),
        }))
    }
}

impl CreditService for StaticCredit {
    fn credit_state(&self, _user_id: &str, _course: &CourseKey) -> Option<CreditState> {
        self.0.clone()
    }
}
