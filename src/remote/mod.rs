// Remote service proxy - one method per backend call, nothing more
pub mod http;
pub mod memory;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::identity::Identity;
use crate::model::{Post, PostId, Principal, UserProfile};

pub use http::HttpConnector;
pub use memory::InMemoryBackend;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Rejected: {0}")]
    Rejected(String),
}

/// Typed calls against the forum backend.
///
/// Implementations forward each call as-is: no retries, no timeouts, no batching.
#[async_trait]
pub trait RemoteService: Send + Sync {
    async fn fetch_all_posts(&self) -> Result<Vec<Post>, RemoteError>;

    async fn create_post(
        &self,
        title: &str,
        description: &str,
        creator: &Principal,
    ) -> Result<(), RemoteError>;

    /// `None` leaves the field unchanged.
    async fn update_post(
        &self,
        id: PostId,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<(), RemoteError>;

    async fn delete_post(&self, id: PostId) -> Result<(), RemoteError>;

    async fn add_response(
        &self,
        post_id: PostId,
        responder: &Principal,
        content: &str,
    ) -> Result<(), RemoteError>;

    async fn fetch_user(&self, id: &Principal) -> Result<Option<UserProfile>, RemoteError>;

    async fn register_user(&self, profile: &UserProfile) -> Result<(), RemoteError>;
}

/// Builds proxies bound to a caller identity (or anonymous).
pub trait RemoteConnector: Send + Sync {
    fn connect(&self, identity: Option<&Identity>) -> Arc<dyn RemoteService>;
}
