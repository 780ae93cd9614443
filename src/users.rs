use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::config::{MAX_DISPLAY_NAME_LENGTH, USERS_COLLECTION};
use crate::core::db::{decode, encode, fetch_all_as, DocumentStore};
use crate::core::errors::{StoreError, StoreResult};
use crate::core::helpers::{dedup_ids, is_blank, sanitize_text};
use crate::core::kv::KeyValue;
use crate::models::models::{NewUser, ProfileUpdate, User};
use crate::mutations::Mutation;
use crate::store::{Freshness, Store};

/// Keys owned by the store; free-form profile maps never set them.
const RESERVED_FIELDS: [&str; 7] = [
    "id",
    "email",
    "password",
    "userName",
    "following",
    "follower",
    "isAdmin",
];

fn strip_reserved(profile: &mut Map<String, Value>) {
    for key in RESERVED_FIELDS {
        profile.remove(key);
    }
}

fn validate_display_name(user_name: &str) -> StoreResult<String> {
    let sanitized = sanitize_text(user_name.trim());
    if sanitized.chars().count() > MAX_DISPLAY_NAME_LENGTH {
        return Err(StoreError::Validation(format!(
            "Display name must be at most {} characters",
            MAX_DISPLAY_NAME_LENGTH
        )));
    }
    Ok(sanitized)
}

pub(crate) async fn find_user_by_email<D: DocumentStore>(
    db: &D,
    email: &str,
) -> anyhow::Result<Option<User>> {
    let docs = db
        .fetch_where(USERS_COLLECTION, "email", &Value::String(email.to_string()))
        .await?;
    match docs.into_iter().next() {
        Some(doc) => Ok(Some(decode(doc)?)),
        None => Ok(None),
    }
}

pub(crate) async fn find_user_by_id<D: DocumentStore>(
    db: &D,
    user_id: &str,
) -> anyhow::Result<Option<User>> {
    match db.fetch_by_id(USERS_COLLECTION, user_id).await? {
        Some(doc) => Ok(Some(decode(doc)?)),
        None => Ok(None),
    }
}

impl<D: DocumentStore, S: KeyValue> Store<D, S> {
    /// Registers a user. The password is hashed before it leaves the process.
    pub async fn add_user(&mut self, new_user: NewUser) -> StoreResult<User> {
        let NewUser {
            email,
            password,
            user_name,
            following,
            follower,
            is_admin,
            mut profile,
        } = new_user;
        let email = email.trim().to_string();
        debug!(email = %email, "add_user action");

        if is_blank(&email) {
            return Err(StoreError::Validation("Email is required".to_string()));
        }
        if password.is_empty() {
            return Err(StoreError::Validation("Password is required".to_string()));
        }
        let user_name = validate_display_name(&user_name)?;

        if find_user_by_email(&self.db, &email).await?.is_some() {
            return Err(StoreError::Conflict("Email already registered".to_string()));
        }

        strip_reserved(&mut profile);
        let record = NewUser {
            email,
            password: self.hasher.hash_blocking(&password).await?,
            user_name,
            following: dedup_ids(following),
            follower: dedup_ids(follower),
            is_admin,
            profile,
        };

        let mut doc = encode(&record)?;
        let id = self
            .db
            .insert(USERS_COLLECTION, doc.clone())
            .await
            .inspect_err(|e| error!(error = %e, "Error adding user"))?;
        doc.insert("id".to_string(), Value::String(id.clone()));
        let user: User = decode(doc)?;

        self.commit(Mutation::AddUser(user.clone()));
        info!(user_id = %id, "User registered");
        Ok(user)
    }

    /// Loads another user (post author, commenter) into `selected_user`.
    pub async fn fetch_user_by_id(&mut self, user_id: &str) -> StoreResult<User> {
        debug!(user_id = %user_id, "fetch_user_by_id action");

        let user = find_user_by_id(&self.db, user_id)
            .await
            .inspect_err(|e| error!(error = %e, "Error fetching user by id"))?
            .ok_or_else(|| StoreError::UserNotFound(user_id.to_string()))?;

        self.commit(Mutation::SetSelectedUser(user.clone()));
        Ok(user)
    }

    pub fn clear_selected_user(&mut self) {
        self.commit(Mutation::ClearSelectedUser);
    }

    /// Replaces the users cache. Failures are logged and the cache kept.
    pub async fn fetch_users(&mut self) -> Freshness {
        debug!("fetch_users action");

        let result = fetch_all_as::<User, _>(&self.db, USERS_COLLECTION).await;

        match result {
            Ok(users) => {
                debug!(count = users.len(), "Users fetched");
                self.commit(Mutation::SetUsers(users));
                Freshness::Fresh
            }
            Err(e) => {
                error!(error = %e, "Error fetching users");
                Freshness::Stale
            }
        }
    }

    /// Applies a partial edit to the signed-in user and commits the record
    /// as the database now holds it.
    pub async fn update_user_profile(&mut self, update: ProfileUpdate) -> StoreResult<User> {
        let current = self.require_current_user()?;
        let user_id = current.id.clone();
        let previous_email = current.email.clone();
        debug!(user_id = %user_id, "update_user_profile action");

        let mut update = update;
        if let Some(user_name) = update.user_name.take() {
            update.user_name = Some(validate_display_name(&user_name)?);
        }
        if let Some(email) = update.email.take() {
            let email = email.trim().to_string();
            if is_blank(&email) {
                return Err(StoreError::Validation("Email is required".to_string()));
            }
            if let Some(other) = find_user_by_email(&self.db, &email).await? {
                if other.id != user_id {
                    return Err(StoreError::Conflict("Email already registered".to_string()));
                }
            }
            update.email = Some(email);
        }

        strip_reserved(&mut update.profile);
        let patch = encode(&update)?;

        self.db
            .update(USERS_COLLECTION, &user_id, patch)
            .await
            .inspect_err(|e| error!(error = %e, "Error updating user profile"))?;

        let user = find_user_by_id(&self.db, &user_id)
            .await?
            .ok_or_else(|| StoreError::UserNotFound(user_id.clone()))?;

        self.commit(Mutation::UpdateUserInfo(user.clone()));
        if user.email != previous_email {
            // The session marker is keyed by email.
            if let Err(e) = self.write_session(&user.email) {
                warn!(user_id = %user_id, error = %e, "Failed to move session to new email");
            }
        }
        info!(user_id = %user_id, "Profile updated");
        Ok(user)
    }
}
