//! Comments under a post

use chrono::{DateTime, Utc};
use serde_json::json;

use super::ServiceContext;
use crate::api::{Comment, EntityId, Endpoint, UserSummary};
use crate::error::{AppError, Result};
use crate::resource::{
    FetchStatus, LocalPatch, MutationApplier, MutationKind, MutationOutcome, Projection,
    ResourceSlot, SortOrder, project,
};

fn created_at(comment: &Comment) -> DateTime<Utc> {
    comment.created_at
}

pub struct CommentsService {
    ctx: ServiceContext,
    post_id: EntityId,
    comments: ResourceSlot<Comment>,
    mutations: MutationApplier<Comment>,
}

impl CommentsService {
    pub fn new(ctx: ServiceContext, post_id: EntityId) -> Self {
        let comments = ctx.list_slot("comments", Endpoint::comments(&post_id));
        let mutations = MutationApplier::new(comments.clone());
        Self {
            ctx,
            post_id,
            comments,
            mutations,
        }
    }

    pub fn post_id(&self) -> &EntityId {
        &self.post_id
    }

    pub fn comments(&self) -> &ResourceSlot<Comment> {
        &self.comments
    }

    pub async fn load(&self) -> FetchStatus {
        self.comments.load().await
    }

    pub async fn refresh(&self) -> FetchStatus {
        self.comments.refresh().await
    }

    /// Oldest first, as a thread reads
    pub fn visible(&self) -> Vec<Comment> {
        let projection = Projection {
            sort_key: Some(created_at as fn(&Comment) -> DateTime<Utc>),
            sort_order: SortOrder::Ascending,
            ..Projection::default()
        };
        project(&self.comments.snapshot().items, &projection)
    }

    /// Post a comment
    ///
    /// The comment shows up at once as pending and is swapped for the
    /// server's copy on success, or removed on failure.
    pub async fn add_comment(&self, body: &str) -> Result<MutationOutcome> {
        let body = body.trim().to_string();
        if body.is_empty() {
            return Err(AppError::Validation("Comment cannot be empty.".to_string()));
        }
        let Some(user) = self.ctx.auth.user() else {
            return Err(AppError::Unauthorized);
        };

        let provisional = Comment {
            id: EntityId::provisional(),
            author: Some(UserSummary::from(&user)),
            body: body.clone(),
            created_at: Utc::now(),
            pending: true,
        };
        let target = provisional.id.clone();
        let api = self.ctx.api.clone();
        let token = self.ctx.auth.token();
        let endpoint = Endpoint::create_comment(&self.post_id);

        Ok(self
            .mutations
            .apply(
                target,
                MutationKind::Send,
                LocalPatch::Insert(provisional),
                async move {
                    api.submit::<Comment>(&endpoint, json!({ "body": body }), token)
                        .await
                        .map(Some)
                },
            )
            .await)
    }
}
