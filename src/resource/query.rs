//! Debounced query controller
//!
//! Coalesces rapid input changes into a single delayed remote call. Each
//! dispatch is tagged with a generation; a response is applied only if its
//! generation is still the latest one, whatever order responses arrive in.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::error::AppError;

/// Runs one remote search for a query string
pub type SearchFn<T> =
    Arc<dyn Fn(String) -> BoxFuture<'static, Result<Vec<T>, AppError>> + Send + Sync>;

const EVENT_CAPACITY: usize = 16;

/// Input bookkeeping of the controller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryState {
    /// Latest text passed to `set_input`
    pub raw_input: String,
    /// Text of the latest dispatched query
    pub debounced_input: String,
    /// Incremented on every dispatch (and on clear)
    pub generation: u64,
}

/// Delivered to subscribers when displayed results change
#[derive(Debug, Clone)]
pub enum QueryEvent<T> {
    Results {
        generation: u64,
        query: String,
        items: Vec<T>,
    },
    Failed {
        generation: u64,
        query: String,
        message: String,
    },
    Cleared,
}

/// What the UI renders for the search box
#[derive(Debug, Clone)]
pub struct QuerySnapshot<T> {
    pub state: QueryState,
    pub results: Vec<T>,
    pub error: Option<String>,
    /// A dispatched query has not answered yet
    pub searching: bool,
}

struct QueryInner<T> {
    state: QueryState,
    /// Identifies the armed timer; bumped by every `set_input`
    armed: u64,
    timer: Option<JoinHandle<()>>,
    results: Vec<T>,
    error: Option<String>,
    searching: bool,
}

/// Debounced search controller
pub struct DebouncedQuery<T> {
    name: &'static str,
    delay: Duration,
    search: SearchFn<T>,
    inner: Arc<Mutex<QueryInner<T>>>,
    events: broadcast::Sender<QueryEvent<T>>,
}

impl<T> DebouncedQuery<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a controller
    ///
    /// # Arguments
    /// * `name` - Label used in logs and metrics
    /// * `delay` - Quiet period before a query is dispatched (default 500ms)
    /// * `search` - Remote call for a trimmed, non-empty query
    pub fn new<F>(name: &'static str, delay: Duration, search: F) -> Self
    where
        F: Fn(String) -> BoxFuture<'static, Result<Vec<T>, AppError>> + Send + Sync + 'static,
    {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            name,
            delay,
            search: Arc::new(search),
            inner: Arc::new(Mutex::new(QueryInner {
                state: QueryState::default(),
                armed: 0,
                timer: None,
                results: Vec::new(),
                error: None,
                searching: false,
            })),
            events,
        }
    }

    /// Receive result, error and clear events
    pub fn subscribe(&self) -> broadcast::Receiver<QueryEvent<T>> {
        self.events.subscribe()
    }

    /// Record new input and restart the debounce timer
    ///
    /// Blank input clears the results immediately without a network call.
    /// Must be called from within a Tokio runtime.
    pub fn set_input(&self, text: impl Into<String>) {
        let text = text.into();
        let mut inner = self.inner.lock();
        inner.state.raw_input = text.clone();
        inner.armed += 1;
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }

        let query = text.trim().to_string();
        if query.is_empty() {
            inner.state.generation += 1;
            inner.state.debounced_input.clear();
            inner.results.clear();
            inner.error = None;
            inner.searching = false;
            drop(inner);
            tracing::debug!(query = self.name, "Search input cleared");
            let _ = self.events.send(QueryEvent::Cleared);
            return;
        }

        let token = inner.armed;
        let delay = self.delay;
        let dispatcher = self.dispatcher();
        inner.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            dispatcher.dispatch(token, query).await;
        }));
    }

    /// Equivalent to `set_input("")`
    pub fn clear(&self) {
        self.set_input(String::new());
    }

    pub fn state(&self) -> QueryState {
        self.inner.lock().state.clone()
    }

    pub fn snapshot(&self) -> QuerySnapshot<T> {
        let inner = self.inner.lock();
        QuerySnapshot {
            state: inner.state.clone(),
            results: inner.results.clone(),
            error: inner.error.clone(),
            searching: inner.searching,
        }
    }

    /// Apply a response tagged with `generation`
    ///
    /// Returns `false` and leaves displayed state untouched when a newer
    /// generation has been dispatched since.
    pub fn apply_response(
        &self,
        generation: u64,
        query: String,
        result: Result<Vec<T>, AppError>,
    ) -> bool {
        self.dispatcher().complete(generation, query, result)
    }

    fn dispatcher(&self) -> Dispatcher<T> {
        Dispatcher {
            name: self.name,
            search: self.search.clone(),
            inner: self.inner.clone(),
            events: self.events.clone(),
        }
    }
}

impl<T> Drop for DebouncedQuery<T> {
    fn drop(&mut self) {
        if let Some(timer) = self.inner.lock().timer.take() {
            timer.abort();
        }
    }
}

/// The pieces of the controller a timer task needs
struct Dispatcher<T> {
    name: &'static str,
    search: SearchFn<T>,
    inner: Arc<Mutex<QueryInner<T>>>,
    events: broadcast::Sender<QueryEvent<T>>,
}

impl<T> Dispatcher<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn dispatch(self, token: u64, query: String) {
        let generation = {
            let mut inner = self.inner.lock();
            if inner.armed != token {
                return;
            }
            // Detach: later input must not abort the request, only outdate it.
            inner.timer = None;
            inner.state.generation += 1;
            inner.state.debounced_input = query.clone();
            inner.searching = true;
            inner.state.generation
        };

        tracing::debug!(query = self.name, generation, text = %query, "Dispatching search");
        let result = (self.search)(query.clone()).await;
        self.complete(generation, query, result);
    }

    fn complete(&self, generation: u64, query: String, result: Result<Vec<T>, AppError>) -> bool {
        let event = {
            let mut inner = self.inner.lock();
            if generation != inner.state.generation {
                tracing::debug!(
                    query = self.name,
                    generation,
                    latest = inner.state.generation,
                    "Dropping stale search response"
                );
                crate::metrics::STALE_RESPONSES_TOTAL
                    .with_label_values(&[self.name])
                    .inc();
                return false;
            }

            inner.searching = false;
            match result {
                Ok(items) => {
                    inner.results = items.clone();
                    inner.error = None;
                    QueryEvent::Results {
                        generation,
                        query,
                        items,
                    }
                }
                Err(error) => {
                    tracing::warn!(query = self.name, %error, "Search failed");
                    let message = error.user_message();
                    inner.error = Some(message.clone());
                    QueryEvent::Failed {
                        generation,
                        query,
                        message,
                    }
                }
            }
        };

        let _ = self.events.send(event);
        true
    }
}
