//! Synchronous state transitions.
//!
//! Every change to [`AppState`] goes through [`AppState::commit`]; actions
//! commit only after the database has confirmed the write.

use tracing::trace;

use crate::models::models::{Comment, Following, Likes, Post, Theme, User};
use crate::state::AppState;

#[derive(Debug, Clone)]
pub(crate) enum Mutation {
    AddUser(User),
    SetUsers(Vec<User>),
    SetPosts(Vec<Post>),
    SetTheme(Theme),
    SetCurrentUser(User),
    SetSelectedUser(User),
    ClearCurrentUser,
    ClearSelectedUser,
    /// Replaces the user in the cache and, if it is the signed-in user, the current user.
    UpdateUserInfo(User),
    AddNewPost(Post),
    RemovePost(String),
    UpdatePost(Post),
    UpdateFollowing(Following),
    SetComments { post_id: String, comments: Vec<Comment> },
    AddComment { post_id: String, comment: Comment },
    RemoveComment { post_id: String, comment_id: String },
    UpdateCommentLikes { comment_id: String, likes: Likes },
}

impl Mutation {
    fn name(&self) -> &'static str {
        match self {
            Mutation::AddUser(_) => "addUser",
            Mutation::SetUsers(_) => "setUsers",
            Mutation::SetPosts(_) => "setPosts",
            Mutation::SetTheme(_) => "setTheme",
            Mutation::SetCurrentUser(_) => "setCurrentUser",
            Mutation::SetSelectedUser(_) => "setSelectedUser",
            Mutation::ClearCurrentUser => "clearCurrentUser",
            Mutation::ClearSelectedUser => "clearSelectedUser",
            Mutation::UpdateUserInfo(_) => "updateUserInfo",
            Mutation::AddNewPost(_) => "addNewPost",
            Mutation::RemovePost(_) => "removePost",
            Mutation::UpdatePost(_) => "updatePost",
            Mutation::UpdateFollowing(_) => "updateFollowing",
            Mutation::SetComments { .. } => "setComments",
            Mutation::AddComment { .. } => "addComment",
            Mutation::RemoveComment { .. } => "removeComment",
            Mutation::UpdateCommentLikes { .. } => "updateCommentLikes",
        }
    }
}

impl AppState {
    pub(crate) fn commit(&mut self, mutation: Mutation) {
        trace!(mutation = mutation.name(), "commit");

        match mutation {
            Mutation::AddUser(user) => self.users.push(user),
            Mutation::SetUsers(users) => self.users = users,
            Mutation::SetPosts(posts) => self.posts = posts,
            Mutation::SetTheme(theme) => self.theme = theme,
            Mutation::SetCurrentUser(user) => self.current_user = Some(user),
            Mutation::SetSelectedUser(user) => self.selected_user = Some(user),
            Mutation::ClearCurrentUser => self.current_user = None,
            Mutation::ClearSelectedUser => self.selected_user = None,
            Mutation::UpdateUserInfo(user) => {
                if let Some(existing) = self.users.iter_mut().find(|u| u.id == user.id) {
                    *existing = user.clone();
                }
                if let Some(current) = self.current_user.as_mut() {
                    if current.id == user.id {
                        *current = user;
                    }
                }
            }
            Mutation::AddNewPost(post) => self.posts.push(post),
            Mutation::RemovePost(post_id) => self.posts.retain(|p| p.id != post_id),
            Mutation::UpdatePost(post) => {
                if let Some(existing) = self.posts.iter_mut().find(|p| p.id == post.id) {
                    *existing = post;
                }
            }
            Mutation::UpdateFollowing(following) => {
                if let Some(current) = self.current_user.as_mut() {
                    current.following = following;
                }
            }
            Mutation::SetComments { post_id, comments } => {
                self.comments.insert(post_id, comments);
            }
            Mutation::AddComment { post_id, comment } => {
                self.comments.entry(post_id).or_default().push(comment);
            }
            Mutation::RemoveComment { post_id, comment_id } => {
                if let Some(list) = self.comments.get_mut(&post_id) {
                    if let Some(index) = list.iter().position(|c| c.id == comment_id) {
                        list.remove(index);
                    }
                }
            }
            Mutation::UpdateCommentLikes { comment_id, likes } => {
                let found = self
                    .comments
                    .values_mut()
                    .flat_map(|list| list.iter_mut())
                    .find(|c| c.id == comment_id);
                if let Some(comment) = found {
                    comment.likes = likes;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            password: "digest".to_string(),
            user_name: id.to_uppercase(),
            following: vec![],
            follower: vec![],
            is_admin: false,
            profile: Map::new(),
        }
    }

    fn post(id: &str, content: &str) -> Post {
        Post {
            id: id.to_string(),
            user_id: "u1".to_string(),
            content: content.to_string(),
            created_at: String::new(),
            updated_at: None,
            extra: Map::new(),
        }
    }

    fn comment(id: &str, post_id: &str) -> Comment {
        Comment {
            id: id.to_string(),
            id_post: post_id.to_string(),
            user_id: "u1".to_string(),
            user_name: "U1".to_string(),
            content: format!("comment {}", id),
            created_at: String::new(),
            likes: vec![],
        }
    }

    #[test]
    fn remove_post_only_drops_matching_id() {
        let mut state = AppState::default();
        state.commit(Mutation::SetPosts(vec![post("a", "1"), post("b", "2"), post("c", "3")]));

        state.commit(Mutation::RemovePost("b".to_string()));
        let ids: Vec<&str> = state.posts().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);

        state.commit(Mutation::RemovePost("zzz".to_string()));
        assert_eq!(state.posts().len(), 2);
    }

    #[test]
    fn update_post_replaces_in_place() {
        let mut state = AppState::default();
        state.commit(Mutation::SetPosts(vec![post("a", "old"), post("b", "keep")]));
        state.commit(Mutation::UpdatePost(post("a", "new")));

        assert_eq!(state.post_by_id("a").unwrap().content, "new");
        assert_eq!(state.post_by_id("b").unwrap().content, "keep");
        assert_eq!(state.posts()[0].id, "a");
    }

    #[test]
    fn update_user_info_touches_cache_and_current_user() {
        let mut state = AppState::default();
        state.commit(Mutation::SetUsers(vec![user("u1"), user("u2")]));
        state.commit(Mutation::SetCurrentUser(user("u1")));

        let mut renamed = user("u1");
        renamed.user_name = "Renamed".to_string();
        state.commit(Mutation::UpdateUserInfo(renamed));

        assert_eq!(state.user_by_id("u1").unwrap().user_name, "Renamed");
        assert_eq!(state.current_user().unwrap().user_name, "Renamed");
        assert_eq!(state.user_by_id("u2").unwrap().user_name, "U2");
    }

    #[test]
    fn update_user_info_leaves_other_current_user() {
        let mut state = AppState::default();
        state.commit(Mutation::SetCurrentUser(user("u1")));
        let mut other = user("u2");
        other.user_name = "Other".to_string();
        state.commit(Mutation::UpdateUserInfo(other));
        assert_eq!(state.current_user().unwrap().user_name, "U1");
    }

    #[test]
    fn comments_distinguish_unfetched_from_empty() {
        let mut state = AppState::default();
        assert!(!state.comments_loaded("p1"));
        assert!(state.comments("p1").is_empty());

        state.commit(Mutation::SetComments {
            post_id: "p1".to_string(),
            comments: vec![],
        });
        assert!(state.comments_loaded("p1"));
        assert!(state.comments("p1").is_empty());
    }

    #[test]
    fn add_comment_creates_list_on_demand() {
        let mut state = AppState::default();
        state.commit(Mutation::AddComment {
            post_id: "p1".to_string(),
            comment: comment("c1", "p1"),
        });
        assert_eq!(state.comments("p1").len(), 1);
    }

    #[test]
    fn remove_comment_is_a_no_op_when_absent() {
        let mut state = AppState::default();
        state.commit(Mutation::RemoveComment {
            post_id: "p1".to_string(),
            comment_id: "c1".to_string(),
        });
        assert!(!state.comments_loaded("p1"));

        state.commit(Mutation::SetComments {
            post_id: "p1".to_string(),
            comments: vec![comment("c1", "p1"), comment("c2", "p1")],
        });
        state.commit(Mutation::RemoveComment {
            post_id: "p1".to_string(),
            comment_id: "c1".to_string(),
        });
        assert_eq!(state.comments("p1").len(), 1);
        assert_eq!(state.comments("p1")[0].id, "c2");
    }

    #[test]
    fn comment_likes_are_found_under_any_post() {
        let mut state = AppState::default();
        state.commit(Mutation::SetComments {
            post_id: "p1".to_string(),
            comments: vec![comment("c1", "p1")],
        });
        state.commit(Mutation::SetComments {
            post_id: "p2".to_string(),
            comments: vec![comment("c2", "p2")],
        });

        state.commit(Mutation::UpdateCommentLikes {
            comment_id: "c2".to_string(),
            likes: vec!["u9".to_string()],
        });

        assert_eq!(state.comments("p2")[0].likes, vec!["u9".to_string()]);
        assert!(state.comments("p1")[0].likes.is_empty());
    }

    #[test]
    fn following_and_session_transitions() {
        let mut state = AppState::default();
        state.commit(Mutation::UpdateFollowing(vec!["x".to_string()]));
        assert!(state.current_user().is_none());

        state.commit(Mutation::SetCurrentUser(user("u1")));
        state.commit(Mutation::UpdateFollowing(vec!["u2".to_string()]));
        assert_eq!(state.current_user().unwrap().following, vec!["u2".to_string()]);
        assert!(state.is_authenticated());
        assert!(!state.is_admin());

        state.commit(Mutation::SetSelectedUser(user("u2")));
        state.commit(Mutation::ClearSelectedUser);
        state.commit(Mutation::ClearCurrentUser);
        assert!(state.selected_user().is_none());
        assert!(!state.is_authenticated());
    }

    #[test]
    fn theme_and_user_list() {
        let mut state = AppState::with_theme(Theme::Dark);
        assert_eq!(state.theme(), Theme::Dark);
        state.commit(Mutation::SetTheme(Theme::Light));
        assert_eq!(state.theme(), Theme::Light);

        state.commit(Mutation::AddUser(user("u1")));
        assert_eq!(state.users().len(), 1);
        assert!(state.user_by_id("u1").is_some());
    }
}
