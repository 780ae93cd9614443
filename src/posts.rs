use serde_json::Value;
use tracing::{debug, error, info};

use crate::config::{MAX_POST_LENGTH, POSTS_COLLECTION};
use crate::core::db::{decode, encode, fetch_all_as, DocumentStore};
use crate::core::errors::{StoreError, StoreResult};
use crate::core::helpers::{is_blank, now_iso};
use crate::core::kv::KeyValue;
use crate::models::models::{NewPost, Post};
use crate::mutations::Mutation;
use crate::store::{Freshness, Store};

fn validate_content(content: &str) -> StoreResult<()> {
    if is_blank(content) || content.chars().count() > MAX_POST_LENGTH {
        return Err(StoreError::Validation("Invalid content".to_string()));
    }
    Ok(())
}

impl<D: DocumentStore, S: KeyValue> Store<D, S> {
    /// Replaces the posts cache. Failures are logged and the cache kept.
    pub async fn fetch_posts(&mut self) -> Freshness {
        debug!("fetch_posts action");

        match fetch_all_as::<Post, _>(&self.db, POSTS_COLLECTION).await {
            Ok(posts) => {
                debug!(count = posts.len(), "Posts fetched");
                self.commit(Mutation::SetPosts(posts));
                Freshness::Fresh
            }
            Err(e) => {
                error!(error = %e, "Error fetching posts");
                Freshness::Stale
            }
        }
    }

    pub async fn create_new_post(&mut self, post: NewPost) -> StoreResult<Post> {
        debug!(user_id = %post.user_id, "create_new_post action");
        validate_content(&post.content)?;

        let mut doc = encode(&post)?;
        doc.insert("createdAt".to_string(), Value::String(now_iso()));

        let id = self
            .db
            .insert(POSTS_COLLECTION, doc.clone())
            .await
            .inspect_err(|e| error!(error = %e, "Error creating new post"))?;
        doc.insert("id".to_string(), Value::String(id.clone()));
        let created: Post = decode(doc)?;

        self.commit(Mutation::AddNewPost(created.clone()));
        info!(post_id = %id, "Post created");
        Ok(created)
    }

    pub async fn delete_post(&mut self, post_id: &str) -> StoreResult<()> {
        debug!(post_id = %post_id, "delete_post action");

        self.db
            .delete(POSTS_COLLECTION, post_id)
            .await
            .inspect_err(|e| error!(error = %e, "Error deleting post"))?;

        self.commit(Mutation::RemovePost(post_id.to_string()));
        info!(post_id = %post_id, "Post deleted");
        Ok(())
    }

    /// Writes every field of `post` over the stored document and stamps `updatedAt`.
    pub async fn update_post(&mut self, post: Post) -> StoreResult<Post> {
        debug!(post_id = %post.id, "update_post action");
        validate_content(&post.content)?;

        let updated = Post {
            updated_at: Some(now_iso()),
            ..post
        };

        let mut patch = encode(&updated)?;
        patch.remove("id");
        self.db
            .update(POSTS_COLLECTION, &updated.id, patch)
            .await
            .inspect_err(|e| error!(error = %e, "Error updating post"))?;

        self.commit(Mutation::UpdatePost(updated.clone()));
        info!(post_id = %updated.id, "Post updated");
        Ok(updated)
    }
}
