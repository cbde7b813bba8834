//! Home feed
//!
//! Posts and live classes are two independent slots: one failing leaves
//! the other untouched.

use chrono::{DateTime, Utc};
use serde_json::json;

use super::ServiceContext;
use crate::api::{EntityId, Endpoint, LiveClass, MediaAttachment, Post};
use crate::error::{AppError, Result};
use crate::resource::{
    FetchStatus, ItemPatch, LocalPatch, MutationApplier, MutationKind, MutationOutcome,
    Projection, ResourceSlot, SortOrder, project,
};

/// Flip `liked` and move the counter by one
struct LikePatch {
    liked: bool,
}

impl LikePatch {
    fn delta(&self) -> i64 {
        if self.liked { 1 } else { -1 }
    }
}

impl ItemPatch<Post> for LikePatch {
    fn apply(&self, post: &mut Post) {
        if post.liked != self.liked {
            post.liked = self.liked;
            post.likes_count += self.delta();
        }
    }

    fn revert(&self, post: &mut Post) {
        if post.liked == self.liked {
            post.liked = !self.liked;
            post.likes_count -= self.delta();
        }
    }

    /// The server's count already includes the like
    fn reconcile(&self, post: &mut Post) {
        post.liked = self.liked;
    }
}

struct ReadlistPatch;

impl ItemPatch<Post> for ReadlistPatch {
    fn apply(&self, post: &mut Post) {
        post.in_readlist = true;
    }

    fn revert(&self, post: &mut Post) {
        post.in_readlist = false;
    }
}

fn created_at(post: &Post) -> DateTime<Utc> {
    post.created_at
}

fn starts_at(class: &LiveClass) -> DateTime<Utc> {
    class.starts_at
}

fn is_live(class: &LiveClass) -> bool {
    class.is_live
}

/// Feed screen
pub struct FeedService {
    ctx: ServiceContext,
    posts: ResourceSlot<Post>,
    live_classes: ResourceSlot<LiveClass>,
    mutations: MutationApplier<Post>,
}

impl FeedService {
    pub fn new(ctx: ServiceContext) -> Self {
        let posts = ctx.list_slot("posts", Endpoint::posts());
        let live_classes = ctx.list_slot("live_classes", Endpoint::live_classes());
        let mutations = MutationApplier::new(posts.clone());
        Self {
            ctx,
            posts,
            live_classes,
            mutations,
        }
    }

    pub fn posts(&self) -> &ResourceSlot<Post> {
        &self.posts
    }

    pub fn live_classes(&self) -> &ResourceSlot<LiveClass> {
        &self.live_classes
    }

    /// Load posts and live classes concurrently
    pub async fn load(&self) -> (FetchStatus, FetchStatus) {
        tokio::join!(self.posts.load(), self.live_classes.load())
    }

    /// Pull-to-refresh
    pub async fn refresh(&self) -> (FetchStatus, FetchStatus) {
        tokio::join!(self.posts.refresh(), self.live_classes.refresh())
    }

    /// Posts as displayed, newest first
    pub fn visible_posts(&self) -> Vec<Post> {
        project(&self.posts.snapshot().items, &Projection::newest_first(created_at))
    }

    /// Live classes, running ones first, then by start time
    pub fn upcoming_classes(&self) -> Vec<LiveClass> {
        let projection = Projection {
            sort_key: Some(starts_at as fn(&LiveClass) -> DateTime<Utc>),
            sort_order: SortOrder::Ascending,
            ..Projection::default()
        }
        .with_pinned(is_live);
        project(&self.live_classes.snapshot().items, &projection)
    }

    /// Like or unlike a post, depending on what is displayed now
    ///
    /// A second toggle while the first is unanswered is ignored.
    pub async fn toggle_like(&self, post_id: &EntityId) -> MutationOutcome {
        let Some(post) = self.posts.get(post_id) else {
            tracing::debug!(%post_id, "Like on a post that is not loaded");
            return MutationOutcome::Ignored;
        };

        let liked = !post.liked;
        let endpoint = if liked {
            Endpoint::like_post(post_id)
        } else {
            Endpoint::unlike_post(post_id)
        };
        let api = self.ctx.api.clone();
        let token = self.ctx.auth.token();

        self.mutations
            .apply(
                post_id.clone(),
                MutationKind::Like,
                LocalPatch::update(LikePatch { liked }),
                async move { api.submit_optional::<Post>(&endpoint, json!({}), token).await },
            )
            .await
    }

    /// Save a post to the reading list
    pub async fn add_to_readlist(&self, post_id: &EntityId) -> MutationOutcome {
        match self.posts.get(post_id) {
            Some(post) if !post.in_readlist => {}
            _ => return MutationOutcome::Ignored,
        }

        let api = self.ctx.api.clone();
        let token = self.ctx.auth.token();
        let body = json!({ "post_id": post_id });

        self.mutations
            .apply(
                post_id.clone(),
                MutationKind::AddToReadlist,
                LocalPatch::update(ReadlistPatch),
                async move {
                    api.submit_optional::<Post>(&Endpoint::add_to_readlist(), body, token)
                        .await
                },
            )
            .await
    }

    /// Publish a post, then refresh the feed so it appears in place
    pub async fn create_post(&self, content: &str, media: Vec<MediaAttachment>) -> Result<Post> {
        let content = content.trim();
        if content.is_empty() && media.is_empty() {
            return Err(AppError::Validation(
                "Write something or attach a file before posting.".to_string(),
            ));
        }

        let post: Post = self
            .ctx
            .api
            .submit(
                &Endpoint::create_post(),
                json!({ "content": content, "media": media }),
                self.ctx.auth.token(),
            )
            .await?;
        tracing::info!(post_id = %post.id, "Post created");

        self.posts.refresh().await;
        Ok(post)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::http::HttpError;
    use crate::http::testing::ScriptedTransport;
    use crate::service::testing::signed_in;

    fn feed(transport: &std::sync::Arc<ScriptedTransport>) -> FeedService {
        FeedService::new(signed_in(transport))
    }

    #[tokio::test]
    async fn like_is_confirmed_by_the_server() {
        let transport = ScriptedTransport::new();
        transport.reply(Ok(json!({ "posts": [{ "id": 1, "likes_count": 0 }] })));
        transport.reply(Ok(json!({ "post": { "id": 1, "likes_count": 1, "liked": true } })));
        let feed = feed(&transport);

        assert_eq!(feed.posts().load().await, FetchStatus::Ready);
        let outcome = feed.toggle_like(&"1".into()).await;

        assert_eq!(outcome, MutationOutcome::Confirmed);
        let post = feed.posts().get(&"1".into()).unwrap();
        assert_eq!(post.likes_count, 1);
        assert!(post.liked);
        assert_eq!(transport.requests()[1].path, "/posts/1/like");
    }

    #[tokio::test]
    async fn failed_unlike_restores_count_and_flag() {
        let transport = ScriptedTransport::new();
        transport.reply(Ok(json!({
            "posts": [{ "id": "p", "likes_count": 5, "liked": true }]
        })));
        transport.reply(Err(HttpError::server(500, "Could not update like")));
        let feed = feed(&transport);
        feed.posts().load().await;

        let outcome = feed.toggle_like(&"p".into()).await;

        assert_eq!(
            outcome,
            MutationOutcome::RolledBack {
                notice: "Could not update like".to_string()
            }
        );
        let post = feed.posts().get(&"p".into()).unwrap();
        assert_eq!((post.likes_count, post.liked), (5, true));
        assert_eq!(transport.requests()[1].path, "/posts/p/unlike");
    }

    #[tokio::test]
    async fn one_slot_failing_leaves_the_other() {
        let transport = ScriptedTransport::new();
        transport.reply_for("/posts", Ok(json!({ "posts": [{ "id": 1 }] })));
        transport.reply_for(
            "/live-classes",
            Err(HttpError::server(503, "Live classes unavailable")),
        );
        let feed = feed(&transport);

        let (posts, classes) = feed.load().await;

        assert_eq!(posts, FetchStatus::Ready);
        assert_eq!(classes, FetchStatus::Error);
        assert_eq!(
            feed.live_classes().snapshot().error.as_deref(),
            Some("Live classes unavailable")
        );
    }

    #[tokio::test]
    async fn visible_posts_are_newest_first() {
        let transport = ScriptedTransport::new();
        transport.reply(Ok(json!({ "posts": [
            { "id": "old", "created_at": "2024-05-01T08:00:00Z" },
            { "id": "new", "created_at": "2024-05-02T08:00:00Z" }
        ] })));
        let feed = feed(&transport);
        feed.posts().load().await;

        let ids: Vec<_> = feed.visible_posts().into_iter().map(|p| p.id.0).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn readlist_is_added_once() {
        let transport = ScriptedTransport::new();
        transport.reply(Ok(json!({ "posts": [{ "id": 1 }] })));
        transport.reply(Ok(json!({})));
        let feed = feed(&transport);
        feed.posts().load().await;

        assert_eq!(feed.add_to_readlist(&"1".into()).await, MutationOutcome::Confirmed);
        assert!(feed.posts().get(&"1".into()).unwrap().in_readlist);
        assert_eq!(feed.add_to_readlist(&"1".into()).await, MutationOutcome::Ignored);
        assert_eq!(transport.request_count(), 2);
        assert_eq!(transport.requests()[1].body, Some(json!({ "post_id": "1" })));
    }

    #[tokio::test]
    async fn confirmed_readlist_add_keeps_the_flag() {
        let transport = ScriptedTransport::new();
        transport.reply(Ok(json!({ "posts": [{ "id": 1 }] })));
        transport.reply(Ok(json!({ "post": { "id": 1, "content": "edited" } })));
        let feed = feed(&transport);
        feed.posts().load().await;

        assert_eq!(feed.add_to_readlist(&"1".into()).await, MutationOutcome::Confirmed);

        let post = feed.posts().get(&"1".into()).unwrap();
        assert!(post.in_readlist);
        assert_eq!(post.content, "edited");
        assert_eq!(feed.add_to_readlist(&"1".into()).await, MutationOutcome::Ignored);
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn like_reply_without_the_flag_keeps_it_and_takes_the_count() {
        let transport = ScriptedTransport::new();
        transport.reply(Ok(json!({ "posts": [{ "id": 1, "likes_count": 4 }] })));
        transport.reply(Ok(json!({ "post": { "id": 1, "likes_count": 5 } })));
        let feed = feed(&transport);
        feed.posts().load().await;

        assert_eq!(feed.toggle_like(&"1".into()).await, MutationOutcome::Confirmed);

        let post = feed.posts().get(&"1".into()).unwrap();
        assert_eq!((post.likes_count, post.liked), (5, true));
    }

    #[tokio::test]
    async fn live_classes_lead_then_follow_start_time() {
        let transport = ScriptedTransport::new();
        transport.reply(Ok(json!({ "live_classes": [
            { "id": "later", "starts_at": "2024-05-03T08:00:00Z" },
            { "id": "live", "starts_at": "2024-05-02T08:00:00Z", "is_live": true },
            { "id": "soon", "starts_at": "2024-05-01T08:00:00Z" }
        ] })));
        let feed = feed(&transport);
        feed.live_classes().load().await;

        let ids: Vec<_> = feed.upcoming_classes().into_iter().map(|c| c.id.0).collect();
        assert_eq!(ids, vec!["live", "soon", "later"]);
    }

    #[tokio::test]
    async fn empty_post_is_rejected_before_any_request() {
        let transport = ScriptedTransport::new();
        let feed = feed(&transport);

        let result = feed.create_post("   ", Vec::new()).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn created_post_triggers_a_refresh() {
        let transport = ScriptedTransport::new();
        transport.reply(Ok(json!({ "post": { "id": 9, "content": "hello" } })));
        transport.reply(Ok(json!({ "posts": [{ "id": 9, "content": "hello" }] })));
        let feed = feed(&transport);

        let post = feed.create_post(" hello ", Vec::new()).await.unwrap();

        assert_eq!(post.id, EntityId::from(9u64));
        assert_eq!(transport.requests()[0].body, Some(json!({ "content": "hello", "media": [] })));
        assert_eq!(feed.posts().snapshot().items.len(), 1);
    }
}
