use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use super::{RemoteConnector, RemoteError, RemoteService};
use crate::identity::Identity;
use crate::model::{opt_vec, Post, PostId, Principal, UserProfile};

/// Connector for a backend reachable at `POST {base_url}/rpc/{method}`.
pub struct HttpConnector {
    client: Client,
    base_url: String,
}

impl HttpConnector {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl RemoteConnector for HttpConnector {
    fn connect(&self, identity: Option<&Identity>) -> Arc<dyn RemoteService> {
        Arc::new(HttpRemoteService {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            credential: identity.map(|i| i.credential.clone()),
        })
    }
}

pub struct HttpRemoteService {
    client: Client,
    base_url: String,
    credential: Option<String>,
}

#[derive(Serialize)]
struct UpdatePostArgs<'a> {
    id: PostId,
    #[serde(with = "opt_vec")]
    title: Option<&'a str>,
    #[serde(with = "opt_vec")]
    description: Option<&'a str>,
}

#[derive(serde::Deserialize)]
struct MaybeUser(#[serde(with = "opt_vec")] Option<UserProfile>);

impl HttpRemoteService {
    async fn call<A, R>(&self, method: &str, args: &A) -> Result<R, RemoteError>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/rpc/{}", self.base_url, method);
        tracing::debug!("Calling backend: {}", method);

        let mut request = self.client.post(&url).json(args);
        if let Some(ref credential) = self.credential {
            request = request.bearer_auth(credential);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        let body: &[u8] = if body.is_empty() { b"null" } else { &body };
        Ok(serde_json::from_slice(body)?)
    }

    /// Calls whose result carries no data; the body is ignored.
    async fn call_unit<A>(&self, method: &str, args: &A) -> Result<(), RemoteError>
    where
        A: Serialize + ?Sized,
    {
        let _: serde_json::Value = self.call(method, args).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteService for HttpRemoteService {
    async fn fetch_all_posts(&self) -> Result<Vec<Post>, RemoteError> {
        self.call("getAllPosts", &json!({})).await
    }

    async fn create_post(
        &self,
        title: &str,
        description: &str,
        creator: &Principal,
    ) -> Result<(), RemoteError> {
        self.call_unit(
            "createPost",
            &json!({ "title": title, "description": description, "creator": creator }),
        )
        .await
    }

    async fn update_post(
        &self,
        id: PostId,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<(), RemoteError> {
        self.call_unit(
            "updatePost",
            &UpdatePostArgs {
                id,
                title,
                description,
            },
        )
        .await
    }

    async fn delete_post(&self, id: PostId) -> Result<(), RemoteError> {
        self.call_unit("deletePost", &json!({ "id": id })).await
    }

    async fn add_response(
        &self,
        post_id: PostId,
        responder: &Principal,
        content: &str,
    ) -> Result<(), RemoteError> {
        self.call_unit(
            "addResponse",
            &json!({ "postId": post_id, "responder": responder, "content": content }),
        )
        .await
    }

    async fn fetch_user(&self, id: &Principal) -> Result<Option<UserProfile>, RemoteError> {
        let MaybeUser(user) = self.call("getUser", &json!({ "id": id })).await?;
        Ok(user)
    }

    async fn register_user(&self, profile: &UserProfile) -> Result<(), RemoteError> {
        self.call_unit("registerUser", &json!({ "user": profile }))
            .await
    }
}
