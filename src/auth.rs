use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::config::{LEGACY_SESSION_KEY, USERS_COLLECTION};
use crate::core::db::DocumentStore;
use crate::core::errors::{StoreError, StoreResult};
use crate::core::helpers::now_iso;
use crate::core::kv::KeyValue;
use crate::models::models::{Session, StoredSession, User};
use crate::mutations::Mutation;
use crate::store::Store;
use crate::users::find_user_by_email;

impl<D: DocumentStore, S: KeyValue> Store<D, S> {
    fn read_marker(&self, key: &str) -> StoreResult<Option<StoredSession>> {
        let raw = self
            .storage
            .get_string(key)
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        match raw {
            Some(raw) => StoredSession::parse(&raw)
                .map(Some)
                .map_err(|e| StoreError::Storage(format!("Unreadable session marker: {}", e))),
            None => Ok(None),
        }
    }

    /// Session record currently in local storage, if any. Falls back to the
    /// marker older front-ends left under `loggedInUser`.
    pub fn session(&self) -> StoreResult<Option<Session>> {
        let stored = match self.read_marker(&self.config.session_key)? {
            Some(stored) => Some(stored),
            None => self.read_marker(LEGACY_SESSION_KEY)?,
        };

        Ok(stored.and_then(|s| {
            let email = s.email().to_string();
            if email.is_empty() {
                return None;
            }
            Some(match s {
                StoredSession::Record(session) => Session { email, ..session },
                StoredSession::Legacy(_) => Session {
                    email,
                    signed_in_at: String::new(),
                },
            })
        }))
    }

    pub(crate) fn write_session(&self, email: &str) -> StoreResult<()> {
        let session = Session {
            email: email.to_string(),
            signed_in_at: now_iso(),
        };
        self.storage
            .set_json(&self.config.session_key, &session)
            .map_err(|e| StoreError::Storage(e.to_string()))
    }

    /// Checks credentials, records the session and makes the user current.
    pub async fn login(&mut self, email: &str, password: &str) -> StoreResult<User> {
        let email = email.trim();
        debug!(email = %email, "login action");

        let user = find_user_by_email(&self.db, email)
            .await?
            .ok_or(StoreError::InvalidCredentials)?;

        if !self.hasher.verify_blocking(password, &user.password).await? {
            warn!(email = %email, "Login rejected");
            return Err(StoreError::InvalidCredentials);
        }

        let user = if self.hasher.needs_rehash(&user.password) {
            self.upgrade_password_hash(user, password).await
        } else {
            user
        };

        self.write_session(&user.email)?;
        self.commit(Mutation::SetCurrentUser(user.clone()));
        info!(user_id = %user.id, "Signed in");
        Ok(user)
    }

    /// Replaces a legacy digest with an Argon2id one after a successful
    /// login. Best-effort: the old digest keeps working if this fails.
    async fn upgrade_password_hash(&mut self, user: User, password: &str) -> User {
        let hashed = match self.hasher.hash_blocking(password).await {
            Ok(hashed) => hashed,
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "Failed to rehash password");
                return user;
            }
        };

        let mut patch = Map::new();
        patch.insert("password".to_string(), Value::String(hashed.clone()));
        if let Err(e) = self.db.update(USERS_COLLECTION, &user.id, patch).await {
            warn!(user_id = %user.id, error = %e, "Failed to store upgraded password hash");
            return user;
        }

        let user = User {
            password: hashed,
            ..user
        };
        self.commit(Mutation::UpdateUserInfo(user.clone()));
        info!(user_id = %user.id, "Password hash upgraded");
        user
    }

    /// Restores the current user from the session marker in local storage.
    pub async fn fetch_user_by_email(&mut self) -> StoreResult<User> {
        debug!("fetch_user_by_email action");

        let session = self.session()?.ok_or(StoreError::NoSession)?;

        let user = find_user_by_email(&self.db, &session.email)
            .await
            .inspect_err(|e| error!(error = %e, "Error fetching user by email"))?
            .ok_or_else(|| StoreError::UserNotFound(session.email.clone()))?;

        self.commit(Mutation::SetCurrentUser(user.clone()));
        Ok(user)
    }

    /// Nothing is written unless `old_password` matches the stored hash.
    pub async fn change_password(
        &mut self,
        old_password: &str,
        new_password: &str,
    ) -> StoreResult<()> {
        let user = self.require_current_user()?.clone();
        debug!(user_id = %user.id, "change_password action");

        if new_password.is_empty() {
            return Err(StoreError::Validation("Password is required".to_string()));
        }

        if !self.hasher.verify_blocking(old_password, &user.password).await? {
            warn!(user_id = %user.id, "Old password is incorrect");
            return Err(StoreError::IncorrectPassword);
        }

        let hashed = self.hasher.hash_blocking(new_password).await?;

        let mut patch = Map::new();
        patch.insert("password".to_string(), Value::String(hashed.clone()));
        self.db
            .update(USERS_COLLECTION, &user.id, patch)
            .await
            .inspect_err(|e| error!(error = %e, "Error changing password"))?;

        let user_id = user.id.clone();
        self.commit(Mutation::UpdateUserInfo(User {
            password: hashed,
            ..user
        }));
        info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    /// Clears the session marker and the current user.
    pub fn logout(&mut self) {
        for key in [self.config.session_key.as_str(), LEGACY_SESSION_KEY] {
            if let Err(e) = self.storage.delete(key) {
                warn!(key = %key, error = %e, "Failed to clear session from local storage");
            }
        }
        self.commit(Mutation::ClearCurrentUser);
        info!("Signed out");
    }
}
