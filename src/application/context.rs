use crate::domain::ports::SessionStore;
use crate::domain::principal::{Principal, SessionId};
use crate::error::{EngineError, Result};

/// Per-work-item context: who the state updates are attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionContext {
    pub principal: Principal,
}

impl ExecutionContext {
    /// Loads the session's user when a session id is supplied, otherwise acts
    /// as the system identity. An unknown session id is an error.
    pub async fn resolve(
        sessions: &dyn SessionStore,
        session_id: Option<SessionId>,
    ) -> Result<Self> {
        let principal = match session_id {
            Some(id) => {
                let session = sessions
                    .get_session(id)
                    .await?
                    .ok_or(EngineError::SessionNotFound(id))?;
                Principal::from_session(&session)
            }
            None => Principal::system(),
        };
        Ok(Self { principal })
    }

    pub fn system() -> Self {
        Self {
            principal: Principal::system(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::principal::Session;
    use crate::infrastructure::in_memory::InMemorySessionStore;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_resolves_system_identity_without_session() {
        let sessions = InMemorySessionStore::new();
        let context = ExecutionContext::resolve(&sessions, None).await.unwrap();
        assert_eq!(context, ExecutionContext::system());
        assert!(context.principal.is_system());
    }

    #[tokio::test]
    async fn test_resolves_session_user() {
        let sessions = InMemorySessionStore::new();
        let session = Session::new(Uuid::new_v4());
        sessions.store_session(session.clone()).await.unwrap();

        let context = ExecutionContext::resolve(&sessions, Some(session.id))
            .await
            .unwrap();
        assert_eq!(context.principal.user_id, session.user_id);
        assert_eq!(context.principal.session_id, Some(session.id));
    }

    #[tokio::test]
    async fn test_unknown_session_is_an_error() {
        let sessions = InMemorySessionStore::new();
        let missing = SessionId::new_v4();

        let result = ExecutionContext::resolve(&sessions, Some(missing)).await;
        assert!(matches!(result, Err(EngineError::SessionNotFound(id)) if id == missing));
    }
}
