use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub following: Vec<String>,
    #[serde(default)]
    pub follower: Vec<String>,
    #[serde(default)]
    pub is_admin: bool,
    /// Any other profile fields (bio, avatar, ...).
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

/// Registration payload; `password` is plaintext until the store hashes it.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub following: Vec<String>,
    #[serde(default)]
    pub follower: Vec<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

impl NewUser {
    pub fn new(email: &str, password: &str, user_name: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
            user_name: user_name.to_string(),
            ..Default::default()
        }
    }
}

/// Partial profile edit. Unset fields are left alone.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub content: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub user_id: String,
    pub content: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewPost {
    pub fn new(user_id: &str, content: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            content: content.to_string(),
            extra: Map::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub id_post: String,
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    pub content: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub likes: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub id_post: String,
    pub user_id: String,
    pub user_name: String,
    pub content: String,
    pub created_at: String,
    pub likes: Vec<String>,
}

/// Signed-in marker kept in local storage.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub email: String,
    pub signed_in_at: String,
}

/// What may be found under the session key: the structured record, or the
/// bare quoted email older front-ends wrote.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum StoredSession {
    Record(Session),
    Legacy(String),
}

impl StoredSession {
    /// Reads a stored marker. Anything that is not a JSON object and fails
    /// to parse is taken as a raw email.
    pub(crate) fn parse(raw: &str) -> serde_json::Result<Self> {
        match serde_json::from_str(raw) {
            Ok(stored) => Ok(stored),
            Err(_) if !raw.trim_start().starts_with('{') => {
                Ok(StoredSession::Legacy(raw.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    pub(crate) fn email(&self) -> &str {
        match self {
            StoredSession::Record(session) => session.email.trim(),
            StoredSession::Legacy(email) => email.trim().trim_matches('"').trim(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_matches('"') {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => anyhow::bail!("Unknown theme: {}", other),
        }
    }
}

pub type Following = Vec<String>;
pub type Likes = Vec<String>;
