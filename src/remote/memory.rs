// Local stand-in for the forum backend, used when no backend URL is configured
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{RemoteConnector, RemoteError, RemoteService};
use crate::identity::Identity;
use crate::model::{now_nanos, Post, PostId, Principal, Response, UserProfile};

#[derive(Default)]
struct Forum {
    next_id: PostId,
    posts: Vec<Post>,
    users: HashMap<Principal, UserProfile>,
}

/// Shared in-process forum. Every connected handle sees the same data.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    forum: Arc<Mutex<Forum>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle acting on behalf of `caller` (anonymous when `None`).
    pub fn handle(&self, caller: Option<Principal>) -> InMemoryHandle {
        InMemoryHandle {
            forum: self.forum.clone(),
            caller,
        }
    }
}

impl RemoteConnector for InMemoryBackend {
    fn connect(&self, identity: Option<&Identity>) -> Arc<dyn RemoteService> {
        Arc::new(self.handle(identity.map(|i| i.principal.clone())))
    }
}

pub struct InMemoryHandle {
    forum: Arc<Mutex<Forum>>,
    caller: Option<Principal>,
}

impl InMemoryHandle {
    fn lock(&self) -> Result<MutexGuard<'_, Forum>, RemoteError> {
        self.forum
            .lock()
            .map_err(|_| RemoteError::Rejected("forum state poisoned".into()))
    }

    fn require_caller(&self) -> Result<&Principal, RemoteError> {
        self.caller
            .as_ref()
            .ok_or_else(|| RemoteError::Rejected("anonymous caller".into()))
    }

    fn owned_post<'a>(
        forum: &'a mut Forum,
        id: PostId,
        caller: &Principal,
    ) -> Result<&'a mut Post, RemoteError> {
        let post = forum
            .posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| RemoteError::Rejected(format!("post {} not found", id)))?;
        if &post.created_by != caller {
            return Err(RemoteError::Rejected(format!(
                "post {} is not owned by {}",
                id, caller
            )));
        }
        Ok(post)
    }
}

#[async_trait]
impl RemoteService for InMemoryHandle {
    async fn fetch_all_posts(&self) -> Result<Vec<Post>, RemoteError> {
        Ok(self.lock()?.posts.clone())
    }

    async fn create_post(
        &self,
        title: &str,
        description: &str,
        creator: &Principal,
    ) -> Result<(), RemoteError> {
        self.require_caller()?;
        let mut forum = self.lock()?;
        let id = forum.next_id;
        forum.next_id += 1;
        forum.posts.push(Post {
            id,
            title: title.to_string(),
            description: description.to_string(),
            created_by: creator.clone(),
            created_at: now_nanos(),
            responses: Vec::new(),
        });
        tracing::debug!("Created post {}", id);
        Ok(())
    }

    async fn update_post(
        &self,
        id: PostId,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<(), RemoteError> {
        let caller = self.require_caller()?;
        let mut forum = self.lock()?;
        let post = Self::owned_post(&mut forum, id, caller)?;
        if let Some(title) = title {
            post.title = title.to_string();
        }
        if let Some(description) = description {
            post.description = description.to_string();
        }
        Ok(())
    }

    async fn delete_post(&self, id: PostId) -> Result<(), RemoteError> {
        let caller = self.require_caller()?;
        let mut forum = self.lock()?;
        Self::owned_post(&mut forum, id, caller)?;
        forum.posts.retain(|p| p.id != id);
        Ok(())
    }

    async fn add_response(
        &self,
        post_id: PostId,
        responder: &Principal,
        content: &str,
    ) -> Result<(), RemoteError> {
        self.require_caller()?;
        let mut forum = self.lock()?;
        let post = forum
            .posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| RemoteError::Rejected(format!("post {} not found", post_id)))?;
        post.responses.push(Response {
            responder: responder.clone(),
            content: content.to_string(),
            created_at: now_nanos(),
        });
        Ok(())
    }

    async fn fetch_user(&self, id: &Principal) -> Result<Option<UserProfile>, RemoteError> {
        Ok(self.lock()?.users.get(id).cloned())
    }

    async fn register_user(&self, profile: &UserProfile) -> Result<(), RemoteError> {
        self.require_caller()?;
        let mut forum = self.lock()?;
        if forum.users.contains_key(&profile.id) {
            return Err(RemoteError::Rejected(format!(
                "user {} already registered",
                profile.id
            )));
        }
        forum.users.insert(profile.id.clone(), profile.clone());
        Ok(())
    }
}
