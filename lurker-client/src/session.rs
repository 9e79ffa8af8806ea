use std::{collections::HashSet, sync::Arc};

use futures::future::join_all;
use lurker_api::{
    Comment, CommentId, Error, Group, Page, Post, Transport, UserId, UserRecord, PAGE_SIZE,
};

use crate::{progress, Gateway, ProgressObserver};

/// Outcome of a sweep: how many removals succeeded out of how many attempted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SweepStats {
    pub removed: usize,
    pub attempted: usize,
}

impl std::fmt::Display for SweepStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}", self.removed, self.attempted)
    }
}

/// One front-end session: a group resolved once, and, after a search, the set
/// of its subscribers that neither liked nor commented the sampled posts.
///
/// The inactive set is cached for a subsequent [`delete_inactive`] in the same
/// session and dropped on [`reset`].
///
/// [`delete_inactive`]: Session::delete_inactive
/// [`reset`]: Session::reset
pub struct Session {
    gateway: Gateway,
    group: Option<Group>,
    inactive: Option<HashSet<UserId>>,
}

impl Session {
    pub fn new(transport: Arc<dyn Transport>) -> Session {
        Session {
            gateway: Gateway::new(transport),
            group: None,
            inactive: None,
        }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn group(&self) -> Option<&Group> {
        self.group.as_ref()
    }

    pub fn inactive(&self) -> Option<&HashSet<UserId>> {
        self.inactive.as_ref()
    }

    /// Drop all per-session state, keeping the transport.
    pub fn reset(&mut self) {
        self.group = None;
        self.inactive = None;
    }

    /// Resolve a group by id or short name and remember it for the session.
    ///
    /// A remote error here means the group does not exist or is not visible;
    /// both decode to `Ok(None)` rather than a failure.
    pub async fn find_group(&mut self, group: &str) -> Result<Option<String>, Error> {
        let res = self
            .gateway
            .fetch::<Vec<Group>>("groups.getById", &[("group_id", group.to_string())])
            .await;
        match res {
            Ok(groups) => match groups.into_iter().next() {
                Some(group) => {
                    tracing::info!(id = group.id.0, name = %group.name, "resolved group");
                    let name = group.name.clone();
                    self.group = Some(group);
                    Ok(Some(name))
                }
                None => {
                    tracing::info!(group, "group not found");
                    Ok(None)
                }
            },
            Err(Error::Remote { code, message }) => {
                tracing::info!(group, code, error = %message, "group not found");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Build the inactive set over the `post_amount` most recent posts, under
    /// a fresh `rps` request budget.
    ///
    /// Likes and comments (including reply threads) of every sampled post are
    /// fanned out concurrently; each stage is a barrier, and the union of all
    /// author ids is subtracted from the full subscriber roster.
    pub async fn find_inactive(
        &mut self,
        post_amount: u64,
        rps: u32,
        observer: &dyn ProgressObserver,
    ) -> Result<HashSet<UserId>, Error> {
        if post_amount == 0 {
            return Err(Error::InvalidPostAmount(post_amount));
        }
        let group = self.group.clone().ok_or(Error::NoGroup)?;
        tracing::info!(rps, post_amount, "searching for inactive subscribers");
        self.gateway.reset_completed();
        self.gateway.set_rate_limit(rps);

        let gather = async {
            let posts = self.fetch_posts(&group, post_amount).await?;
            tracing::debug!(posts = posts.len(), "fetched wall");

            let likes = join_all(posts.iter().map(|p| self.fetch_likers(&group, p))).await;
            let comments = join_all(posts.iter().map(|p| self.fetch_commenters(&group, p))).await;

            let mut active = HashSet::new();
            for likers in likes {
                active.extend(likers?);
            }
            for authors in comments {
                active.extend(authors?);
            }
            tracing::info!(active = active.len(), "found active users");

            let mut subscribers = self.fetch_subscribers(&group).await?;
            for uid in &active {
                subscribers.remove(uid);
            }
            Ok::<_, Error>(subscribers)
        };
        let inactive = progress::observed(&self.gateway, observer, gather).await?;

        tracing::info!(inactive = inactive.len(), "search finished");
        self.inactive = Some(inactive.clone());
        Ok(inactive)
    }

    /// Remove every subscriber found inactive by the last search, under a
    /// fresh `rps` request budget.
    ///
    /// One removal call per id, fanned out concurrently; a failed removal is
    /// tallied and logged, never fatal for the remaining ids.
    pub async fn delete_inactive(
        &mut self,
        rps: u32,
        observer: &dyn ProgressObserver,
    ) -> Result<SweepStats, Error> {
        let group = self.group.clone().ok_or(Error::NoGroup)?;
        let targets: Vec<UserId> = match &self.inactive {
            Some(set) if !set.is_empty() => set.iter().copied().collect(),
            _ => return Err(Error::NothingToSweep),
        };
        tracing::info!(rps, targets = targets.len(), "removing inactive subscribers");
        self.gateway.reset_completed();
        self.gateway.set_rate_limit(rps);

        let gather = async {
            let results = join_all(targets.iter().map(|uid| self.remove_user(&group, *uid))).await;
            let mut removed = 0;
            for (uid, res) in targets.iter().zip(results) {
                match res {
                    Ok(value) if value == serde_json::json!(1) => removed += 1,
                    Ok(value) => {
                        tracing::warn!(user = uid.0, %value, "unexpected removal response")
                    }
                    Err(err) => tracing::warn!(user = uid.0, %err, "could not remove user"),
                }
            }
            removed
        };
        let removed = progress::observed(&self.gateway, observer, gather).await;

        let stats = SweepStats {
            removed,
            attempted: targets.len(),
        };
        tracing::info!(%stats, "sweep finished");
        Ok(stats)
    }

    /// Batch profile lookup for the given users, for report files.
    pub async fn users_info(&self, ids: &HashSet<UserId>) -> Result<Vec<UserRecord>, Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let list = ids
            .iter()
            .map(|uid| uid.0.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.gateway
            .fetch(
                "users.get",
                &[("user_ids", list), ("fields", "screen_name".to_string())],
            )
            .await
    }

    /// The `post_amount` most recent wall posts, in wall order: a single
    /// probe for the wall size, then one concurrent task per page of 100.
    async fn fetch_posts(&self, group: &Group, post_amount: u64) -> Result<Vec<Post>, Error> {
        let probe: Page<Post> = self.wall_page(group, 0, 1).await?;
        let count = post_amount.min(probe.total());
        if count == 0 {
            return Ok(Vec::new());
        }

        let pages = count / PAGE_SIZE + 1;
        let fetches =
            (0..pages).map(|i| self.wall_page(group, i * PAGE_SIZE, count - i * PAGE_SIZE));
        let mut posts = Vec::with_capacity(count as usize);
        for page in join_all(fetches).await {
            posts.extend(page?.items);
        }
        Ok(posts)
    }

    async fn wall_page(&self, group: &Group, offset: u64, count: u64) -> Result<Page<Post>, Error> {
        self.gateway
            .fetch(
                "wall.get",
                &[
                    ("owner_id", group.id.as_owner().to_string()),
                    ("offset", offset.to_string()),
                    ("count", count.to_string()),
                ],
            )
            .await
    }

    /// Everyone who liked the post.
    async fn fetch_likers(&self, group: &Group, post: &Post) -> Result<Vec<UserId>, Error> {
        let page: Page<UserId> = self
            .gateway
            .fetch(
                "likes.getList",
                &[
                    ("type", "post".to_string()),
                    ("owner_id", group.id.as_owner().to_string()),
                    ("item_id", post.id.0.to_string()),
                ],
            )
            .await?;
        Ok(page.items)
    }

    /// Everyone who commented the post, including authors of reply threads.
    ///
    /// Comments come in pages of 100; a `count` that is an exact multiple of
    /// 100 issues one extra, empty page. A comment with a non-empty thread
    /// triggers the same paginated sub-fetch on that thread.
    async fn fetch_commenters(&self, group: &Group, post: &Post) -> Result<HashSet<UserId>, Error> {
        let mut authors = HashSet::new();
        for i in 0..(post.comments.count / PAGE_SIZE + 1) {
            let page: Page<Comment> = self.comment_page(group, post, i * PAGE_SIZE, None).await?;
            for comment in &page.items {
                if comment.thread.count > 0 {
                    for j in 0..(comment.thread.count / PAGE_SIZE + 1) {
                        let thread: Page<Comment> = self
                            .comment_page(group, post, j * PAGE_SIZE, Some(comment.id))
                            .await?;
                        authors.extend(thread.items.iter().map(|reply| reply.from_id));
                    }
                }
                authors.insert(comment.from_id);
            }
        }
        Ok(authors)
    }

    async fn comment_page(
        &self,
        group: &Group,
        post: &Post,
        offset: u64,
        thread_of: Option<CommentId>,
    ) -> Result<Page<Comment>, Error> {
        let mut params = vec![
            ("owner_id", group.id.as_owner().to_string()),
            ("post_id", post.id.0.to_string()),
            ("count", PAGE_SIZE.to_string()),
            ("offset", offset.to_string()),
            ("sort", "asc".to_string()),
            ("preview_length", "1".to_string()),
        ];
        if let Some(comment) = thread_of {
            params.push(("comment_id", comment.0.to_string()));
        }
        self.gateway.fetch("wall.getComments", &params).await
    }

    /// The full current roster.
    async fn fetch_subscribers(&self, group: &Group) -> Result<HashSet<UserId>, Error> {
        let page: Page<UserId> = self
            .gateway
            .fetch(
                "groups.getMembers",
                &[("group_id", group.id.0.to_string())],
            )
            .await?;
        Ok(page.items.into_iter().collect())
    }

    async fn remove_user(&self, group: &Group, user: UserId) -> Result<serde_json::Value, Error> {
        self.gateway
            .call(
                "groups.removeUser",
                &[
                    ("group_id", group.id.0.to_string()),
                    ("user_id", user.0.to_string()),
                ],
            )
            .await
    }
}
