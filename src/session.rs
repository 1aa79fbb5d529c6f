// Identity sessions: one explicit context per signed-in browser
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::identity::Identity;
use crate::model::{now_nanos, Principal, UserProfile};
use crate::remote::{RemoteConnector, RemoteService};
use crate::view::ViewModelStore;

/// Everything derived from one sign-in.
#[derive(Clone)]
pub struct Session {
    pub identity: Identity,
    pub proxy: Arc<dyn RemoteService>,
    /// Profile shown in the header; the registered profile or the default one.
    pub profile: UserProfile,
    pub view: ViewModelStore,
    expires_at: Instant,
}

impl Session {
    /// Build a session for a freshly resolved identity.
    ///
    /// Registers the default profile (failures are logged and ignored), waits
    /// for that call to finish, then fetches the stored profile. If the fetch
    /// fails or finds nothing the default profile is used.
    pub async fn establish(
        identity: Identity,
        connector: &dyn RemoteConnector,
        ttl: Duration,
    ) -> Self {
        let proxy = connector.connect(Some(&identity));
        let default_profile = UserProfile::default_for(&identity.principal, now_nanos());

        if let Err(e) = proxy.register_user(&default_profile).await {
            tracing::debug!("registerUser for {} ignored: {}", identity.principal, e);
        }

        let profile = match proxy.fetch_user(&identity.principal).await {
            Ok(Some(profile)) => profile,
            Ok(None) => default_profile,
            Err(e) => {
                tracing::warn!("Profile fetch for {} failed: {}", identity.principal, e);
                default_profile
            }
        };

        tracing::info!("Session established for {}", identity.principal);

        Self {
            identity,
            proxy,
            profile,
            view: ViewModelStore::new(),
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.identity.principal
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Live sessions keyed by the opaque cookie token.
#[derive(Default)]
pub struct SessionStore {
    sessions: HashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `session` and return its cookie token.
    pub fn insert(&mut self, session: Session) -> String {
        self.clear_stale();
        let token = generate_token();
        self.sessions.insert(token.clone(), session);
        token
    }

    pub fn get(&self, token: &str) -> Option<&Session> {
        self.sessions
            .get(token)
            .filter(|s| !s.is_expired(Instant::now()))
    }

    pub fn get_mut(&mut self, token: &str) -> Option<&mut Session> {
        self.sessions
            .get_mut(token)
            .filter(|s| !s.is_expired(Instant::now()))
    }

    /// Tear down a session (sign-out).
    pub fn remove(&mut self, token: &str) -> Option<Session> {
        self.sessions.remove(token)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn clear_stale(&mut self) {
        let now = Instant::now();
        self.sessions.retain(|_, s| !s.is_expired(now));
    }
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Post, PostId, Role};
    use crate::remote::{InMemoryBackend, RemoteError};
    use async_trait::async_trait;

    const HOUR: Duration = Duration::from_secs(3600);

    fn identity(name: &str) -> Identity {
        Identity {
            principal: Principal::new(name),
            credential: name.to_string(),
        }
    }

    /// Backend that rejects every call.
    struct Unreachable;

    #[async_trait]
    impl RemoteService for Unreachable {
        async fn fetch_all_posts(&self) -> Result<Vec<Post>, RemoteError> {
            Err(RemoteError::Rejected("down".into()))
        }
        async fn create_post(&self, _: &str, _: &str, _: &Principal) -> Result<(), RemoteError> {
            Err(RemoteError::Rejected("down".into()))
        }
        async fn update_post(
            &self,
            _: PostId,
            _: Option<&str>,
            _: Option<&str>,
        ) -> Result<(), RemoteError> {
            Err(RemoteError::Rejected("down".into()))
        }
        async fn delete_post(&self, _: PostId) -> Result<(), RemoteError> {
            Err(RemoteError::Rejected("down".into()))
        }
        async fn add_response(&self, _: PostId, _: &Principal, _: &str) -> Result<(), RemoteError> {
            Err(RemoteError::Rejected("down".into()))
        }
        async fn fetch_user(&self, _: &Principal) -> Result<Option<UserProfile>, RemoteError> {
            Err(RemoteError::Rejected("down".into()))
        }
        async fn register_user(&self, _: &UserProfile) -> Result<(), RemoteError> {
            Err(RemoteError::Rejected("down".into()))
        }
    }

    impl RemoteConnector for Unreachable {
        fn connect(&self, _: Option<&Identity>) -> Arc<dyn RemoteService> {
            Arc::new(Unreachable)
        }
    }

    #[tokio::test]
    async fn establish_registers_default_profile() {
        let backend = InMemoryBackend::new();
        let session = Session::establish(identity("alice"), &backend, HOUR).await;

        assert_eq!(session.profile.username, "alice");
        assert_eq!(session.profile.role, Role::Patient);

        let stored = backend
            .handle(None)
            .fetch_user(&Principal::new("alice"))
            .await
            .unwrap();
        assert_eq!(stored, Some(session.profile.clone()));
    }

    #[tokio::test]
    async fn establish_keeps_existing_profile() {
        let backend = InMemoryBackend::new();
        let mut existing = UserProfile::default_for(&Principal::new("doc"), 1);
        existing.role = Role::Professional;
        existing.username = "Dr. Ruiz".into();
        backend
            .handle(Some(Principal::new("doc")))
            .register_user(&existing)
            .await
            .unwrap();

        let session = Session::establish(identity("doc"), &backend, HOUR).await;
        assert_eq!(session.profile, existing);
    }

    #[tokio::test]
    async fn establish_falls_back_when_backend_is_down() {
        let session = Session::establish(identity("carol"), &Unreachable, HOUR).await;
        assert_eq!(session.principal(), &Principal::new("carol"));
        assert_eq!(session.profile.username, "carol");
        assert!(session.profile.specialization.is_empty());
    }

    #[tokio::test]
    async fn store_hands_out_unique_tokens_and_tears_down() {
        let backend = InMemoryBackend::new();
        let mut store = SessionStore::new();

        let a = store.insert(Session::establish(identity("a"), &backend, HOUR).await);
        let b = store.insert(Session::establish(identity("b"), &backend, HOUR).await);
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
        assert_eq!(store.get(&a).unwrap().principal().as_str(), "a");

        assert!(store.remove(&a).is_some());
        assert!(store.get(&a).is_none());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn expired_sessions_are_not_returned() {
        let backend = InMemoryBackend::new();
        let mut store = SessionStore::new();
        let token = store.insert(Session::establish(identity("a"), &backend, Duration::ZERO).await);

        assert!(store.get(&token).is_none());
        assert!(store.get_mut(&token).is_none());

        store.insert(Session::establish(identity("b"), &backend, HOUR).await);
        assert_eq!(store.len(), 1);
    }
}
