//! In-memory application state and its read accessors.
//!
//! State only changes through [`Mutation`](crate::mutations::Mutation)s
//! committed by store actions.

use std::collections::HashMap;

use crate::models::models::{Comment, Post, Theme, User};

#[derive(Debug, Default, Clone)]
pub struct AppState {
    pub(crate) users: Vec<User>,
    pub(crate) posts: Vec<Post>,
    pub(crate) theme: Theme,
    pub(crate) current_user: Option<User>,
    pub(crate) selected_user: Option<User>,
    /// Keyed by post id. A missing key means the post's comments were never fetched.
    pub(crate) comments: HashMap<String, Vec<Comment>>,
}

impl AppState {
    pub fn with_theme(theme: Theme) -> Self {
        Self {
            theme,
            ..Default::default()
        }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn user_by_id(&self, user_id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == user_id)
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn post_by_id(&self, post_id: &str) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == post_id)
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    pub fn selected_user(&self) -> Option<&User> {
        self.selected_user.as_ref()
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Cached comments for a post; empty when none were fetched yet.
    pub fn comments(&self, post_id: &str) -> &[Comment] {
        self.comments
            .get(post_id)
            .map(|c| c.as_slice())
            .unwrap_or(&[])
    }

    pub fn comments_loaded(&self, post_id: &str) -> bool {
        self.comments.contains_key(post_id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.current_user.as_ref().map(|u| u.is_admin).unwrap_or(false)
    }
}
