use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::config::{COMMENTS_COLLECTION, MAX_COMMENT_LENGTH};
use crate::core::db::{decode, encode, fetch_where_as, DocumentStore};
use crate::core::errors::{StoreError, StoreResult};
use crate::core::helpers::{dedup_ids, is_blank, now_iso};
use crate::core::kv::KeyValue;
use crate::models::models::{Comment, Likes, NewComment};
use crate::mutations::Mutation;
use crate::store::{Freshness, Store};

impl<D: DocumentStore, S: KeyValue> Store<D, S> {
    /// Replaces the cached comments of one post. Failures are logged and the
    /// cache kept, including the "never fetched" state.
    pub async fn fetch_comments(&mut self, post_id: &str) -> Freshness {
        debug!(post_id = %post_id, "fetch_comments action");

        let filter = Value::String(post_id.to_string());
        match fetch_where_as::<Comment, _>(&self.db, COMMENTS_COLLECTION, "idPost", &filter).await {
            Ok(comments) => {
                self.commit(Mutation::SetComments {
                    post_id: post_id.to_string(),
                    comments,
                });
                Freshness::Fresh
            }
            Err(e) => {
                error!(post_id = %post_id, error = %e, "Error fetching comments");
                Freshness::Stale
            }
        }
    }

    /// Comments as the signed-in user, with no likes yet.
    pub async fn add_comment(&mut self, post_id: &str, content: &str) -> StoreResult<Comment> {
        let author = self.require_current_user()?;
        debug!(post_id = %post_id, user_id = %author.id, "add_comment action");

        if is_blank(content) || content.chars().count() > MAX_COMMENT_LENGTH {
            return Err(StoreError::Validation("Invalid comment".to_string()));
        }

        let new_comment = NewComment {
            id_post: post_id.to_string(),
            user_id: author.id.clone(),
            user_name: author.user_name.clone(),
            content: content.to_string(),
            created_at: now_iso(),
            likes: Vec::new(),
        };

        let mut doc = encode(&new_comment)?;
        let id = self
            .db
            .insert(COMMENTS_COLLECTION, doc.clone())
            .await
            .inspect_err(|e| error!(error = %e, "Error adding comment"))?;
        doc.insert("id".to_string(), Value::String(id.clone()));
        let comment: Comment = decode(doc)?;

        self.commit(Mutation::AddComment {
            post_id: post_id.to_string(),
            comment: comment.clone(),
        });
        info!(comment_id = %id, post_id = %post_id, "Comment added");
        Ok(comment)
    }

    pub async fn remove_comment(&mut self, post_id: &str, comment_id: &str) -> StoreResult<()> {
        debug!(post_id = %post_id, comment_id = %comment_id, "remove_comment action");

        self.db
            .delete(COMMENTS_COLLECTION, comment_id)
            .await
            .inspect_err(|e| error!(error = %e, "Error removing comment"))?;

        self.commit(Mutation::RemoveComment {
            post_id: post_id.to_string(),
            comment_id: comment_id.to_string(),
        });
        Ok(())
    }

    /// Overwrites the liker list of a comment, wherever it is cached.
    pub async fn update_comment_likes(
        &mut self,
        comment_id: &str,
        likes: Likes,
    ) -> StoreResult<()> {
        debug!(comment_id = %comment_id, likes = likes.len(), "update_comment_likes action");

        let likes = dedup_ids(likes);
        let mut patch = Map::new();
        patch.insert(
            "likes".to_string(),
            Value::Array(likes.iter().cloned().map(Value::String).collect()),
        );

        self.db
            .update(COMMENTS_COLLECTION, comment_id, patch)
            .await
            .inspect_err(|e| error!(error = %e, "Error updating comment likes"))?;

        self.commit(Mutation::UpdateCommentLikes {
            comment_id: comment_id.to_string(),
            likes,
        });
        Ok(())
    }
}
