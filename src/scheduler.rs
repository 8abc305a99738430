//! Serialized, self-throttling queue for outbound calls.
//!
//! All calls to one upstream go through a single [`RequestScheduler`]. A lone
//! worker task drains an unbounded channel in FIFO order, so at most one call
//! is in flight and consecutive call starts are spaced by the policy's
//! minimum interval. A throttled call is retried inside its own queue slot:
//! everything enqueued behind it waits until it settles.
//!
//! ```text
//! enqueue() ──► [ QueuedRequest | QueuedRequest | ... ] ──► worker ──► upstream
//!     ▲                                                       │
//!     └──────────────────── oneshot result ◄─────────────────┘
//! ```

use std::{future::Future, sync::Arc, time::Duration};

use futures::{FutureExt, future::BoxFuture};
use tokio::{
    sync::{mpsc, oneshot},
    time::{Instant, sleep, sleep_until},
};
use tracing::{debug, warn};

use crate::error::{ProxyError, Result};

/// Hints above this are honored but reported, the queue stalls meanwhile.
const ABNORMAL_RETRY_AFTER_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct SchedulerPolicy {
    /// Minimum spacing between the starts of two upstream calls.
    pub min_interval: Duration,
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Wait used when a throttling response carries no hint.
    pub default_retry_after: Duration,
    /// Added on top of every hinted wait.
    pub retry_padding: Duration,
}

impl Default for SchedulerPolicy {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(350),
            max_retries: 3,
            default_retry_after: Duration::from_secs(5),
            retry_padding: Duration::from_secs(1),
        }
    }
}

impl SchedulerPolicy {
    /// How long to back off after a throttling response.
    pub fn backoff(&self, retry_after: Option<Duration>) -> Duration {
        retry_after.unwrap_or(self.default_retry_after) + self.retry_padding
    }
}

/// What a single attempt of an operation produced.
#[derive(Debug)]
pub enum Attempt<T> {
    Done(T),
    /// The upstream asked us to slow down, optionally saying for how long.
    Throttled { retry_after: Option<Duration> },
}

/// Tracks when the last upstream call started. Owned by the worker only.
#[derive(Debug)]
struct Pacer {
    min_interval: Duration,
    last_call: Option<Instant>,
}

impl Pacer {
    async fn wait_turn(&mut self) {
        if let Some(last) = self.last_call {
            sleep_until(last + self.min_interval).await;
        }
        self.last_call = Some(Instant::now());
    }
}

type Run = Box<dyn FnOnce(Pacer) -> BoxFuture<'static, Pacer> + Send>;

/// One queued operation together with the channel its result goes to.
struct QueuedRequest {
    label: String,
    run: Run,
}

#[derive(Clone)]
pub struct RequestScheduler {
    name: Arc<str>,
    policy: Arc<SchedulerPolicy>,
    sender: mpsc::UnboundedSender<QueuedRequest>,
}

impl RequestScheduler {
    /// Creates the queue and spawns its worker on the current tokio runtime.
    pub fn new(name: &str, policy: SchedulerPolicy) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let pacer = Pacer {
            min_interval: policy.min_interval,
            last_call: None,
        };
        let name: Arc<str> = Arc::from(name);
        tokio::spawn(run_worker(Arc::clone(&name), receiver, pacer));

        Self {
            name,
            policy: Arc::new(policy),
            sender,
        }
    }

    pub fn policy(&self) -> &SchedulerPolicy {
        &self.policy
    }

    /// Queues `operation` and resolves once it has settled.
    ///
    /// `operation` is invoked once per attempt. Returning
    /// [`Attempt::Throttled`] makes the scheduler back off and call it again,
    /// up to `max_retries` times, before failing with
    /// [`ProxyError::RateLimitExhausted`]. Errors returned by the operation are
    /// passed through without retrying.
    ///
    /// There is no cancellation: dropping the returned future does not remove
    /// the operation from the queue.
    pub async fn enqueue<T, F, Fut>(&self, label: impl Into<String>, mut operation: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Attempt<T>>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let label = label.into();
        let policy = Arc::clone(&self.policy);
        let name = Arc::clone(&self.name);
        let job_label = label.clone();

        let run: Run = Box::new(move |mut pacer: Pacer| {
            async move {
                let result =
                    run_attempts(&name, &policy, &job_label, &mut pacer, &mut operation).await;
                // caller may have gone away, the slot is still consumed
                let _ = tx.send(result);
                pacer
            }
            .boxed()
        });

        self.sender
            .send(QueuedRequest { label, run })
            .map_err(|_| ProxyError::QueueClosed)?;

        rx.await.map_err(|_| ProxyError::QueueClosed)?
    }
}

async fn run_worker(
    name: Arc<str>,
    mut receiver: mpsc::UnboundedReceiver<QueuedRequest>,
    mut pacer: Pacer,
) {
    while let Some(request) = receiver.recv().await {
        debug!(queue = %name, path = %request.label, "Dequeued request");
        pacer = (request.run)(pacer).await;
    }
    debug!(queue = %name, "Request queue closed");
}

async fn run_attempts<T, F, Fut>(
    name: &str,
    policy: &SchedulerPolicy,
    label: &str,
    pacer: &mut Pacer,
    operation: &mut F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Attempt<T>>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        pacer.wait_turn().await;
        debug!(queue = name, path = label, attempt, "Calling upstream");

        let retry_after = match operation().await? {
            Attempt::Done(value) => return Ok(value),
            Attempt::Throttled { retry_after } => retry_after,
        };

        if attempt > policy.max_retries {
            warn!(
                queue = name,
                path = label,
                attempts = attempt,
                status = 429,
                "Rate limit retries exhausted"
            );
            return Err(ProxyError::RateLimitExhausted {
                path: label.to_string(),
                attempts: attempt,
            });
        }

        let wait = policy.backoff(retry_after);
        if wait.as_secs() > ABNORMAL_RETRY_AFTER_SECS {
            warn!(
                queue = name,
                path = label,
                wait_secs = wait.as_secs(),
                "Abnormally long retry-after hint, queue is stalled meanwhile"
            );
        }
        warn!(
            queue = name,
            path = label,
            status = 429,
            wait_ms = wait.as_millis() as u64,
            retry = attempt,
            max_retries = policy.max_retries,
            "Throttled by upstream, backing off"
        );
        sleep(wait).await;
    }
}
