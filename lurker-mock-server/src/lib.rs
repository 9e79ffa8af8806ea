use std::{
    collections::HashSet,
    sync::Mutex,
};

use async_trait::async_trait;
use lurker_api::{Error, Transport};
use serde_json::{json, Value};

/// Server-side page cap, as the real API enforces it.
const MAX_PAGE: usize = 100;

/// In-memory stand-in for the remote API, driven through the same
/// [`Transport`] interface production code uses.
///
/// Holds one group: its wall, the likes and comment threads of every post,
/// and the subscriber roster. Every call is recorded, so tests can assert on
/// fan-out shapes (how many pages were fetched, with which offsets).
pub struct MockServer {
    group_id: i64,
    group_name: String,
    posts: Vec<MockPost>,
    members: Vec<i64>,
    fail_removal: HashSet<i64>,
    calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
    removed: Mutex<Vec<i64>>,
}

pub struct MockPost {
    pub id: i64,
    pub likes: Vec<i64>,
    pub comments: Vec<MockComment>,
}

impl MockPost {
    pub fn new(id: i64) -> MockPost {
        MockPost {
            id,
            likes: Vec::new(),
            comments: Vec::new(),
        }
    }

    pub fn liked_by(mut self, users: &[i64]) -> MockPost {
        self.likes.extend_from_slice(users);
        self
    }

    pub fn with_comment(mut self, comment: MockComment) -> MockPost {
        self.comments.push(comment);
        self
    }

    pub fn with_comments(mut self, comments: impl IntoIterator<Item = MockComment>) -> MockPost {
        self.comments.extend(comments);
        self
    }
}

pub struct MockComment {
    pub id: i64,
    pub from: i64,
    /// Reply thread as (comment id, author id) pairs.
    pub replies: Vec<(i64, i64)>,
}

impl MockComment {
    pub fn new(id: i64, from: i64) -> MockComment {
        MockComment {
            id,
            from,
            replies: Vec::new(),
        }
    }

    pub fn with_replies(mut self, replies: &[(i64, i64)]) -> MockComment {
        self.replies.extend_from_slice(replies);
        self
    }
}

impl MockServer {
    pub fn new(group_id: i64, group_name: &str) -> MockServer {
        MockServer {
            group_id,
            group_name: group_name.to_string(),
            posts: Vec::new(),
            members: Vec::new(),
            fail_removal: HashSet::new(),
            calls: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
        }
    }

    pub fn with_members(mut self, members: &[i64]) -> MockServer {
        self.members.extend_from_slice(members);
        self
    }

    pub fn with_post(mut self, post: MockPost) -> MockServer {
        self.posts.push(post);
        self
    }

    /// Make `groups.removeUser` fail for this user with a permission error.
    pub fn fail_removal_for(mut self, user: i64) -> MockServer {
        self.fail_removal.insert(user);
        self
    }

    /// Number of calls made to `method` so far.
    pub fn test_call_count(&self, method: &str) -> usize {
        self.test_calls_for(method).len()
    }

    /// Parameters of every call made to `method`, in call order.
    pub fn test_calls_for(&self, method: &str) -> Vec<Vec<(String, String)>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }

    pub fn test_total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Users removed from the roster so far, in removal order.
    pub fn test_removed(&self) -> Vec<i64> {
        self.removed.lock().unwrap().clone()
    }

    fn get_by_id(&self, params: &[(&str, String)]) -> Result<Value, Error> {
        let wanted = param(params, "group_id").unwrap_or_default();
        if wanted == self.group_id.to_string() || wanted == self.group_name {
            Ok(json!([{"id": self.group_id, "name": self.group_name}]))
        } else {
            Err(Error::remote(100, "invalid group_id"))
        }
    }

    fn wall_get(&self, params: &[(&str, String)]) -> Result<Value, Error> {
        self.check_owner(params)?;
        let offset = int_param(params, "offset").unwrap_or(0) as usize;
        let count = int_param(params, "count").unwrap_or(20) as usize;
        let items: Vec<Value> = self
            .posts
            .iter()
            .skip(offset)
            .take(count.min(MAX_PAGE))
            .map(|post| {
                json!({
                    "id": post.id,
                    "comments": {"count": post.comments.len()},
                })
            })
            .collect();
        Ok(json!({"count": self.posts.len(), "items": items}))
    }

    fn likes_get_list(&self, params: &[(&str, String)]) -> Result<Value, Error> {
        self.check_owner(params)?;
        let post = self.find_post(int_param(params, "item_id"))?;
        Ok(json!({"count": post.likes.len(), "items": post.likes}))
    }

    fn wall_get_comments(&self, params: &[(&str, String)]) -> Result<Value, Error> {
        self.check_owner(params)?;
        let post = self.find_post(int_param(params, "post_id"))?;
        let offset = int_param(params, "offset").unwrap_or(0) as usize;
        let count = (int_param(params, "count").unwrap_or(10) as usize).min(MAX_PAGE);

        match int_param(params, "comment_id") {
            Some(comment_id) => {
                let comment = post
                    .comments
                    .iter()
                    .find(|c| c.id == comment_id)
                    .ok_or_else(|| Error::remote(212, "access to post comments denied"))?;
                let items: Vec<Value> = comment
                    .replies
                    .iter()
                    .skip(offset)
                    .take(count)
                    .map(|(id, from)| json!({"id": id, "from_id": from}))
                    .collect();
                Ok(json!({"count": comment.replies.len(), "items": items}))
            }
            None => {
                let items: Vec<Value> = post
                    .comments
                    .iter()
                    .skip(offset)
                    .take(count)
                    .map(|c| {
                        json!({
                            "id": c.id,
                            "from_id": c.from,
                            "thread": {"count": c.replies.len()},
                        })
                    })
                    .collect();
                Ok(json!({"count": post.comments.len(), "items": items}))
            }
        }
    }

    fn get_members(&self, params: &[(&str, String)]) -> Result<Value, Error> {
        match param(params, "group_id") {
            Some(group) if group == self.group_id.to_string() => {
                Ok(json!({"count": self.members.len(), "items": self.members}))
            }
            _ => Err(Error::remote(100, "invalid group_id")),
        }
    }

    fn remove_user(&self, params: &[(&str, String)]) -> Result<Value, Error> {
        let user =
            int_param(params, "user_id").ok_or_else(|| Error::remote(100, "user_id missing"))?;
        if self.fail_removal.contains(&user) {
            return Err(Error::remote(15, "Access denied"));
        }
        self.removed.lock().unwrap().push(user);
        Ok(json!(1))
    }

    fn users_get(&self, params: &[(&str, String)]) -> Result<Value, Error> {
        let ids = param(params, "user_ids").unwrap_or_default();
        let records: Vec<Value> = ids
            .split(',')
            .filter_map(|id| id.trim().parse::<i64>().ok())
            .map(|id| {
                json!({
                    "id": id,
                    "first_name": "User",
                    "last_name": format!("{id}"),
                    "screen_name": format!("id{id}"),
                })
            })
            .collect();
        Ok(json!(records))
    }

    fn check_owner(&self, params: &[(&str, String)]) -> Result<(), Error> {
        match param(params, "owner_id") {
            Some(owner) if owner == (-self.group_id).to_string() => Ok(()),
            _ => Err(Error::remote(100, "invalid owner_id")),
        }
    }

    fn find_post(&self, id: Option<i64>) -> Result<&MockPost, Error> {
        id.and_then(|id| self.posts.iter().find(|p| p.id == id))
            .ok_or_else(|| Error::remote(100, "no such post"))
    }
}

#[async_trait]
impl Transport for MockServer {
    async fn call(&self, method: &str, params: &[(&str, String)]) -> Result<Value, Error> {
        self.calls.lock().unwrap().push((
            method.to_string(),
            params
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        ));
        match method {
            "groups.getById" => self.get_by_id(params),
            "wall.get" => self.wall_get(params),
            "likes.getList" => self.likes_get_list(params),
            "wall.getComments" => self.wall_get_comments(params),
            "groups.getMembers" => self.get_members(params),
            "groups.removeUser" => self.remove_user(params),
            "users.get" => self.users_get(params),
            _ => Err(Error::remote(3, format!("Unknown method passed: {method}"))),
        }
    }
}

fn param<'a>(params: &'a [(&str, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.as_str())
}

fn int_param(params: &[(&str, String)], key: &str) -> Option<i64> {
    param(params, key).and_then(|v| v.parse().ok())
}
