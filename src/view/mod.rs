// Per-browser view-model: the fetched data plus the form and toggle state
pub mod derive;
pub mod sync;

use std::collections::HashSet;

use crate::model::{Post, PostId, UserProfile};

pub use derive::Timestamp;
pub use sync::{execute, Command};

#[derive(Debug, Clone, Default)]
pub struct ViewModelStore {
    posts: Vec<Post>,
    /// Result of the last "view my information" lookup.
    pub profile_lookup: Option<UserProfile>,
    pub search_term: String,
    compose_open: bool,
    draft_title: String,
    draft_description: String,
    editing: HashSet<PostId>,
    response_target: Option<PostId>,
    response_draft: String,
}

impl ViewModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// Swap in a freshly fetched collection. Edit toggles for posts that no
    /// longer exist are dropped.
    pub fn replace_posts(&mut self, posts: Vec<Post>) {
        self.editing.retain(|id| posts.iter().any(|p| p.id == *id));
        if let Some(target) = self.response_target {
            if !posts.iter().any(|p| p.id == target) {
                self.clear_response();
            }
        }
        self.posts = posts;
    }

    pub fn filtered_posts(&self) -> Vec<&Post> {
        derive::filter_posts(&self.posts, &self.search_term)
    }

    pub fn answered_count(&self) -> usize {
        derive::answered_count(&self.posts)
    }

    pub fn unanswered_count(&self) -> usize {
        derive::unanswered_count(&self.posts)
    }

    // -- Create form --

    pub fn is_compose_open(&self) -> bool {
        self.compose_open
    }

    pub fn open_compose(&mut self) {
        self.compose_open = true;
    }

    /// Hide the form; typed text is kept for the next open.
    pub fn close_compose(&mut self) {
        self.compose_open = false;
    }

    pub fn set_draft(&mut self, title: &str, description: &str) {
        self.draft_title = title.to_string();
        self.draft_description = description.to_string();
    }

    pub fn draft(&self) -> (&str, &str) {
        (&self.draft_title, &self.draft_description)
    }

    pub fn can_create(&self) -> bool {
        !self.draft_title.is_empty() && !self.draft_description.is_empty()
    }

    /// After a successful create: clear the fields and hide the form.
    pub fn reset_compose(&mut self) {
        self.draft_title.clear();
        self.draft_description.clear();
        self.compose_open = false;
    }

    // -- Edit mode --

    pub fn begin_edit(&mut self, id: PostId) {
        self.editing.insert(id);
    }

    pub fn end_edit(&mut self, id: PostId) {
        self.editing.remove(&id);
    }

    pub fn is_editing(&self, id: PostId) -> bool {
        self.editing.contains(&id)
    }

    // -- Response draft (one post at a time) --

    /// Bind the response draft to `id`, replacing any draft for another post.
    pub fn select_for_response(&mut self, id: PostId, content: &str) {
        self.response_target = Some(id);
        self.response_draft = content.to_string();
    }

    /// Text shown in the response box of `id`; empty unless it is the selected post.
    pub fn response_draft_for(&self, id: PostId) -> &str {
        if self.response_target == Some(id) {
            &self.response_draft
        } else {
            ""
        }
    }

    pub fn can_submit_response(&self, id: PostId) -> bool {
        self.response_target == Some(id) && !self.response_draft.trim().is_empty()
    }

    pub fn clear_response(&mut self) {
        self.response_target = None;
        self.response_draft.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Principal;

    fn post(id: PostId) -> Post {
        Post {
            id,
            title: format!("post {}", id),
            description: "d".into(),
            created_by: Principal::new("x"),
            created_at: 1,
            responses: Vec::new(),
        }
    }

    #[test]
    fn response_draft_is_bound_to_one_post() {
        let mut store = ViewModelStore::new();
        store.replace_posts(vec![post(1), post(2)]);

        store.select_for_response(1, "take ibuprofen");
        assert!(store.can_submit_response(1));
        assert!(!store.can_submit_response(2));
        assert_eq!(store.response_draft_for(2), "");

        store.select_for_response(2, "rest");
        assert_eq!(store.response_draft_for(1), "");
        assert_eq!(store.response_draft_for(2), "rest");
    }

    #[test]
    fn blank_response_cannot_be_submitted() {
        let mut store = ViewModelStore::new();
        store.select_for_response(1, "   ");
        assert!(!store.can_submit_response(1));
    }

    #[test]
    fn create_requires_title_and_description() {
        let mut store = ViewModelStore::new();
        store.set_draft("Title", "");
        assert!(!store.can_create());
        store.set_draft("Title", "Body");
        assert!(store.can_create());

        store.open_compose();
        store.reset_compose();
        assert!(!store.is_compose_open());
        assert_eq!(store.draft(), ("", ""));
    }

    #[test]
    fn cancel_keeps_the_typed_draft() {
        let mut store = ViewModelStore::new();
        store.open_compose();
        store.set_draft("T", "D");
        store.close_compose();
        assert!(!store.is_compose_open());
        assert_eq!(store.draft(), ("T", "D"));
    }

    #[test]
    fn replace_drops_state_for_vanished_posts() {
        let mut store = ViewModelStore::new();
        store.replace_posts(vec![post(1), post(2)]);
        store.begin_edit(1);
        store.begin_edit(2);
        store.select_for_response(2, "hello");

        store.replace_posts(vec![post(1)]);
        assert!(store.is_editing(1));
        assert!(!store.is_editing(2));
        assert!(!store.can_submit_response(2));
        assert_eq!(store.posts().len(), 1);
    }

    #[test]
    fn search_term_drives_filtered_posts() {
        let mut store = ViewModelStore::new();
        store.replace_posts(vec![post(1), post(22)]);
        store.search_term = "POST 2".into();
        let ids: Vec<_> = store.filtered_posts().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![22]);
    }
}
