//! Follow graph actions.
//!
//! An edge is stored on both endpoints: the follower's `following` list and
//! the target's `follower` list. The two writes are not atomic, so when the
//! second one fails the first is reverted before reporting failure.

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::USERS_COLLECTION;
use crate::core::db::{Document, DocumentStore};
use crate::core::errors::{StoreError, StoreResult};
use crate::core::kv::KeyValue;
use crate::models::models::User;
use crate::mutations::Mutation;
use crate::store::Store;
use crate::users::find_user_by_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    /// Both sides of the edge were written.
    Followed,
    /// Nothing to do.
    AlreadyFollowing,
    Unfollowed,
    NotFollowing,
    /// Logged; local state and the database were left as they were.
    Failed,
}

fn ids_patch(field: &str, ids: &[String]) -> Document {
    let mut patch = Document::new();
    patch.insert(
        field.to_string(),
        Value::Array(ids.iter().cloned().map(Value::String).collect()),
    );
    patch
}

impl<D: DocumentStore, S: KeyValue> Store<D, S> {
    /// Idempotent: following someone twice leaves a single entry.
    pub async fn follow_user(&mut self, target_id: &str) -> FollowOutcome {
        debug!(target_id = %target_id, "follow_user action");

        match self.try_follow(target_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(target_id = %target_id, error = %e, "Error following user");
                FollowOutcome::Failed
            }
        }
    }

    pub async fn unfollow_user(&mut self, target_id: &str) -> FollowOutcome {
        debug!(target_id = %target_id, "unfollow_user action");

        match self.try_unfollow(target_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(target_id = %target_id, error = %e, "Error unfollowing user");
                FollowOutcome::Failed
            }
        }
    }

    async fn try_follow(&mut self, target_id: &str) -> StoreResult<FollowOutcome> {
        let current = self.require_current_user()?.clone();

        if current.following.iter().any(|id| id == target_id) {
            info!(target_id = %target_id, "User already followed");
            return Ok(FollowOutcome::AlreadyFollowing);
        }
        if current.id == target_id {
            return Err(StoreError::Validation("Cannot follow yourself".to_string()));
        }

        let target = find_user_by_id(&self.db, target_id)
            .await?
            .ok_or_else(|| StoreError::UserNotFound(target_id.to_string()))?;

        let mut following = current.following.clone();
        following.push(target_id.to_string());

        let mut followers = target.follower.clone();
        if !followers.contains(&current.id) {
            followers.push(current.id.clone());
        }

        self.write_edge(&current, &following, &target, &followers).await?;

        self.commit(Mutation::UpdateFollowing(following.clone()));
        self.commit(Mutation::UpdateUserInfo(User {
            following,
            ..current
        }));
        self.commit(Mutation::UpdateUserInfo(User {
            follower: followers,
            ..target
        }));
        info!(target_id = %target_id, "Successfully followed the user");
        Ok(FollowOutcome::Followed)
    }

    async fn try_unfollow(&mut self, target_id: &str) -> StoreResult<FollowOutcome> {
        let current = self.require_current_user()?.clone();

        if !current.following.iter().any(|id| id == target_id) {
            return Ok(FollowOutcome::NotFollowing);
        }

        let following: Vec<String> = current
            .following
            .iter()
            .filter(|id| *id != target_id)
            .cloned()
            .collect();

        // A vanished target only needs our side cleaned up.
        let target = find_user_by_id(&self.db, target_id).await?;

        match target {
            Some(target) => {
                let followers: Vec<String> = target
                    .follower
                    .iter()
                    .filter(|id| **id != current.id)
                    .cloned()
                    .collect();
                self.write_edge(&current, &following, &target, &followers).await?;
                self.commit(Mutation::UpdateUserInfo(User {
                    follower: followers,
                    ..target
                }));
            }
            None => {
                self.db
                    .update(USERS_COLLECTION, &current.id, ids_patch("following", &following))
                    .await?;
            }
        }

        self.commit(Mutation::UpdateFollowing(following.clone()));
        self.commit(Mutation::UpdateUserInfo(User {
            following,
            ..current
        }));
        info!(target_id = %target_id, "Unfollowed user");
        Ok(FollowOutcome::Unfollowed)
    }

    /// Writes the follower side then the target side, reverting the first
    /// write if the second fails.
    async fn write_edge(
        &self,
        current: &User,
        following: &[String],
        target: &User,
        followers: &[String],
    ) -> StoreResult<()> {
        self.db
            .update(USERS_COLLECTION, &current.id, ids_patch("following", following))
            .await?;

        if let Err(e) = self
            .db
            .update(USERS_COLLECTION, &target.id, ids_patch("follower", followers))
            .await
        {
            warn!(user_id = %current.id, target_id = %target.id, "Rolling back following list");
            if let Err(rollback) = self
                .db
                .update(USERS_COLLECTION, &current.id, ids_patch("following", &current.following))
                .await
            {
                error!(
                    user_id = %current.id,
                    target_id = %target.id,
                    error = %rollback,
                    "Rollback failed, follow edge is one-sided"
                );
            }
            return Err(e.into());
        }

        Ok(())
    }
}
