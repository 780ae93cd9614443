//! Client-side state store for a small social board.
//!
//! A [`Store`] owns the in-memory [`AppState`] (users, posts, comments by
//! post, current and selected user, theme), a [`DocumentStore`] for the
//! remote `users`/`posts`/`comments` collections and a [`KeyValue`] backend
//! for durable local storage (session marker and theme).

pub mod auth;
pub mod comments;
pub mod config;
pub mod core;
pub mod follow;
pub mod models;
pub mod mutations;
pub mod posts;
pub mod state;
pub mod store;
pub mod theme;
pub mod users;

// === Re-exports ===
pub use crate::config::{init_tracing, StoreConfig};
pub use crate::core::db::{DocumentStore, KvDocumentStore};
pub use crate::core::errors::{StoreError, StoreResult};
pub use crate::core::hasher::CredentialHasher;
pub use crate::core::kv::{KeyValue, MemoryKv, SpinKv};
pub use crate::follow::FollowOutcome;
pub use crate::models::models::{
    Comment, NewComment, NewPost, NewUser, Post, ProfileUpdate, Session, Theme, User,
};
pub use crate::state::AppState;
pub use crate::store::{Freshness, Store};
