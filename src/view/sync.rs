// Write-then-refetch: the local post list never gets patched in place
use crate::model::{Post, PostId, Principal};
use crate::remote::{RemoteError, RemoteService};

/// A mutating call against the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create {
        title: String,
        description: String,
        creator: Principal,
    },
    Update {
        id: PostId,
        title: Option<String>,
        description: Option<String>,
    },
    Delete {
        id: PostId,
    },
    Respond {
        post_id: PostId,
        responder: Principal,
        content: String,
    },
}

impl Command {
    /// Edit form submission. Blank fields mean "leave unchanged".
    pub fn update(id: PostId, title: &str, description: &str) -> Self {
        let keep_if_present = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Command::Update {
            id,
            title: keep_if_present(title),
            description: keep_if_present(description),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Create { .. } => "createPost",
            Command::Update { .. } => "updatePost",
            Command::Delete { .. } => "deletePost",
            Command::Respond { .. } => "addResponse",
        }
    }

    async fn apply(&self, proxy: &dyn RemoteService) -> Result<(), RemoteError> {
        match self {
            Command::Create {
                title,
                description,
                creator,
            } => proxy.create_post(title, description, creator).await,
            Command::Update {
                id,
                title,
                description,
            } => {
                proxy
                    .update_post(*id, title.as_deref(), description.as_deref())
                    .await
            }
            Command::Delete { id } => proxy.delete_post(*id).await,
            Command::Respond {
                post_id,
                responder,
                content,
            } => proxy.add_response(*post_id, responder, content).await,
        }
    }
}

/// Run `command`, then fetch the full post collection.
///
/// The returned list replaces the store wholesale. A failed command skips the
/// fetch and leaves the caller's copy as it was.
pub async fn execute(
    proxy: &dyn RemoteService,
    command: &Command,
) -> Result<Vec<Post>, RemoteError> {
    command.apply(proxy).await?;
    proxy.fetch_all_posts().await
}
