use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A persisted login session carrying the user it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            id: SessionId::new_v4(),
            user_id,
            created_at: Utc::now(),
        }
    }
}

/// The identity every state update is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub session_id: Option<SessionId>,
}

impl Principal {
    /// The well-known identity used when a work item carries no session.
    pub const SYSTEM_USER_ID: Uuid = Uuid::nil();

    pub fn system() -> Self {
        Self {
            user_id: Self::SYSTEM_USER_ID,
            session_id: None,
        }
    }

    pub fn from_session(session: &Session) -> Self {
        Self {
            user_id: session.user_id,
            session_id: Some(session.id),
        }
    }

    pub fn is_system(&self) -> bool {
        self.user_id == Self::SYSTEM_USER_ID
    }
}
