//! People search
//!
//! Keystrokes go through a [`DebouncedQuery`]; only the text that stays
//! unchanged for the configured delay reaches the server.

use std::time::Duration;

use futures::FutureExt;
use tokio::sync::broadcast;

use super::ServiceContext;
use crate::api::{Endpoint, UserSummary};
use crate::resource::{DebouncedQuery, QueryEvent, QuerySnapshot};

pub struct SearchService {
    query: DebouncedQuery<UserSummary>,
}

impl SearchService {
    pub fn new(ctx: ServiceContext, delay: Duration) -> Self {
        let api = ctx.api.clone();
        let auth = ctx.auth.clone();
        let query = DebouncedQuery::new("people", delay, move |text: String| {
            let api = api.clone();
            let token = auth.token();
            async move {
                api.fetch::<Vec<UserSummary>>(&Endpoint::search(), &[("q", text.as_str())], token)
                    .await
            }
            .boxed()
        });
        Self { query }
    }

    /// Feed the search box text; must run inside a Tokio runtime
    pub fn set_input(&self, text: impl Into<String>) {
        self.query.set_input(text);
    }

    pub fn clear(&self) {
        self.query.clear();
    }

    pub fn snapshot(&self) -> QuerySnapshot<UserSummary> {
        self.query.snapshot()
    }

    pub fn results(&self) -> Vec<UserSummary> {
        self.query.snapshot().results
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueryEvent<UserSummary>> {
        self.query.subscribe()
    }
}
