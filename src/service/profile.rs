//! Profile screen and onboarding follow suggestions

use futures::FutureExt;
use serde_json::json;

use super::ServiceContext;
use crate::api::{EntityId, Endpoint, FollowOption, Profile};
use crate::error::{AppError, Result};
use crate::resource::{
    FetchStatus, ItemPatch, LocalPatch, MutationApplier, MutationKind, MutationOutcome,
    ResourceSlot,
};

/// Flip `is_following` and move the follower count by one
struct FollowPatch {
    following: bool,
}

impl FollowPatch {
    fn delta(&self) -> i64 {
        if self.following { 1 } else { -1 }
    }
}

impl ItemPatch<Profile> for FollowPatch {
    fn apply(&self, profile: &mut Profile) {
        if profile.is_following != self.following {
            profile.is_following = self.following;
            profile.followers_count += self.delta();
        }
    }

    fn revert(&self, profile: &mut Profile) {
        if profile.is_following == self.following {
            profile.is_following = !self.following;
            profile.followers_count -= self.delta();
        }
    }

    /// The server's count already includes the follow
    fn reconcile(&self, profile: &mut Profile) {
        profile.is_following = self.following;
    }
}

/// One user's profile page
pub struct ProfileService {
    ctx: ServiceContext,
    user_id: EntityId,
    profile: ResourceSlot<Profile>,
    mutations: MutationApplier<Profile>,
}

impl ProfileService {
    pub fn new(ctx: ServiceContext, user_id: EntityId) -> Self {
        let api = ctx.api.clone();
        let auth = ctx.auth.clone();
        let endpoint = Endpoint::profile(&user_id);
        // The profile is a collection of one so it shares slot semantics
        let profile = ResourceSlot::new("profile", ctx.freshness, move || {
            let api = api.clone();
            let token = auth.token();
            let endpoint = endpoint.clone();
            async move {
                api.fetch::<Profile>(&endpoint, &[], token)
                    .await
                    .map(|profile| vec![profile])
            }
            .boxed()
        });
        let mutations = MutationApplier::new(profile.clone());
        Self {
            ctx,
            user_id,
            profile,
            mutations,
        }
    }

    pub fn user_id(&self) -> &EntityId {
        &self.user_id
    }

    pub fn slot(&self) -> &ResourceSlot<Profile> {
        &self.profile
    }

    pub async fn load(&self) -> FetchStatus {
        self.profile.load().await
    }

    pub async fn refresh(&self) -> FetchStatus {
        self.profile.refresh().await
    }

    pub fn profile(&self) -> Option<Profile> {
        self.profile.snapshot().items.into_iter().next()
    }

    /// Whether the page belongs to the signed-in user
    pub fn is_own(&self) -> bool {
        self.ctx
            .auth
            .user()
            .is_some_and(|user| user.id == self.user_id)
    }

    /// Follow or unfollow, depending on what is displayed now
    pub async fn toggle_follow(&self) -> MutationOutcome {
        let Some(profile) = self.profile.get(&self.user_id) else {
            tracing::debug!(user_id = %self.user_id, "Follow before the profile loaded");
            return MutationOutcome::Ignored;
        };
        if self.is_own() {
            return MutationOutcome::Ignored;
        }

        let following = !profile.is_following;
        let endpoint = if following {
            Endpoint::follow(&self.user_id)
        } else {
            Endpoint::unfollow(&self.user_id)
        };
        let api = self.ctx.api.clone();
        let token = self.ctx.auth.token();

        self.mutations
            .apply(
                self.user_id.clone(),
                MutationKind::Follow,
                LocalPatch::update(FollowPatch { following }),
                async move { api.submit_optional::<Profile>(&endpoint, json!({}), token).await },
            )
            .await
    }

    /// Ask a tutor to take the signed-in user on
    pub async fn send_hire_request(&self, message: &str) -> Result<()> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::Validation(
                "Tell the tutor what you need help with.".to_string(),
            ));
        }
        if self.is_own() {
            return Err(AppError::Validation("You cannot hire yourself.".to_string()));
        }
        if self.profile().is_some_and(|p| !p.is_tutor) {
            return Err(AppError::Validation(
                "This user is not accepting hire requests.".to_string(),
            ));
        }

        self.ctx
            .api
            .call(
                &Endpoint::hire_request(),
                &[],
                Some(json!({ "tutor_id": self.user_id, "message": message })),
                self.ctx.auth.token(),
            )
            .await?;
        tracing::info!(tutor_id = %self.user_id, "Hire request sent");
        Ok(())
    }
}

/// Accounts suggested during onboarding; readable without a session
pub fn follow_options(ctx: &ServiceContext) -> ResourceSlot<FollowOption> {
    ctx.list_slot("follow_options", Endpoint::follow_options())
}
