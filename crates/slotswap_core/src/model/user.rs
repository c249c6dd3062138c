//! User identity projection.
//!
//! Users are owned by the identity collaborator; core only keeps the fields
//! needed to embed owner and counterpart detail on read views.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of an authenticated caller.
pub type UserId = Uuid;

/// Public profile of one user, embedded in slot and proposal views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub uuid: UserId,
    pub display_name: String,
    pub email: Option<String>,
}

impl UserProfile {
    pub fn new(uuid: UserId, display_name: impl Into<String>) -> Self {
        Self {
            uuid,
            display_name: display_name.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}
