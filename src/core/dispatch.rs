//! Concurrent batch dispatch with bounded concurrency
//!
//! The dispatcher fans a sequence of request descriptors out to an
//! [`Invoker`] with sliding-window admission: a new invocation starts as soon
//! as any in-flight slot frees, never exceeding the concurrency limit.
//! Results are collected in submission order and every descriptor resolves to
//! exactly one outcome; a failing item never aborts its siblings.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::core::aggregate::{BatchItem, BatchResult, Outcome};
use crate::core::errors::{Result, ZabanError};
use crate::core::models::{RequestDescriptor, ResponsePayload};

/// Executes one request against the remote service
///
/// The [`Zaban`](crate::core::client::Zaban) client implements this; tests
/// substitute in-memory fakes.
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(&self, request: &RequestDescriptor) -> Result<ResponsePayload>;
}

/// What to do with in-flight invocations when a batch is cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancelPolicy {
    /// Let in-flight invocations finish; only un-started ones are skipped
    #[default]
    Drain,
    /// Abort in-flight invocations as well
    Abandon,
}

/// Cloneable handle for cooperative batch cancellation
///
/// Cancellation takes effect at the next suspension point: un-started
/// invocations are never issued and resolve to a transport failure.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the batch
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once cancellation has been requested
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Batch dispatcher over an [`Invoker`]
#[derive(Debug)]
pub struct BatchDispatcher<I> {
    invoker: Arc<I>,
    limit: usize,
    cancel_policy: CancelPolicy,
    cancel: CancelHandle,
}

impl<I: Invoker + 'static> BatchDispatcher<I> {
    /// Create a dispatcher with the given concurrency limit
    pub fn new(invoker: Arc<I>, limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(ZabanError::Config {
                message: "concurrency limit must be greater than 0".to_string(),
            });
        }

        Ok(Self {
            invoker,
            limit,
            cancel_policy: CancelPolicy::default(),
            cancel: CancelHandle::new(),
        })
    }

    pub fn with_cancel_policy(mut self, policy: CancelPolicy) -> Self {
        self.cancel_policy = policy;
        self
    }

    /// Handle that cancels batches run on this dispatcher
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Dispatch all requests and collect outcomes in submission order
    pub async fn run(&self, requests: Vec<RequestDescriptor>) -> BatchResult {
        self.run_with(requests, |_| {}).await
    }

    /// Like [`run`](Self::run), invoking `on_item` as each item settles
    ///
    /// Settlement order follows completion, not submission; the returned
    /// result is still submission-ordered.
    pub async fn run_with<F>(&self, requests: Vec<RequestDescriptor>, mut on_item: F) -> BatchResult
    where
        F: FnMut(&BatchItem),
    {
        let started_at = chrono::Utc::now();
        let start = Instant::now();
        let total = requests.len();

        debug!("Dispatching batch of {} requests, limit {}", total, self.limit);

        let semaphore = Arc::new(Semaphore::new(self.limit));
        let mut set: JoinSet<(usize, RequestDescriptor, Outcome)> = JoinSet::new();
        let mut admitted: HashMap<usize, RequestDescriptor> = HashMap::new();
        let mut slots: Vec<Option<BatchItem>> = Vec::with_capacity(total);
        slots.resize_with(total, || None);

        for (index, request) in requests.into_iter().enumerate() {
            // Drain already-completed invocations so settled items surface
            // while admission is still in progress.
            while let Some(Ok((done, descriptor, outcome))) = set.try_join_next() {
                admitted.remove(&done);
                let item = BatchItem { descriptor, outcome };
                on_item(&item);
                slots[done] = Some(item);
            }

            // Admission in submission order: one permit per in-flight call.
            let permit = if self.cancel.is_cancelled() {
                None
            } else {
                tokio::select! {
                    permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
                    _ = self.cancel.cancelled() => None,
                }
            };

            let Some(permit) = permit else {
                debug!("Batch cancelled, skipping request {}", request.id());
                let item = BatchItem {
                    descriptor: request,
                    outcome: Outcome::Failure(cancelled_error()),
                };
                on_item(&item);
                slots[index] = Some(item);
                continue;
            };

            admitted.insert(index, request.clone());
            let invoker = Arc::clone(&self.invoker);
            set.spawn(async move {
                let outcome = invoke_one(invoker.as_ref(), &request).await;
                drop(permit);
                (index, request, outcome)
            });
        }

        loop {
            if self.cancel.is_cancelled() && self.cancel_policy == CancelPolicy::Abandon {
                set.abort_all();
            }

            tokio::select! {
                joined = set.join_next() => match joined {
                    None => break,
                    Some(Ok((index, descriptor, outcome))) => {
                        admitted.remove(&index);
                        let item = BatchItem { descriptor, outcome };
                        on_item(&item);
                        slots[index] = Some(item);
                    }
                    Some(Err(err)) => {
                        debug!("Dispatched task did not complete: {}", err);
                    }
                },
                _ = self.cancel.cancelled(), if !self.cancel.is_cancelled() => {}
            }
        }

        // Aborted invocations still owe the caller a definite outcome.
        for (index, descriptor) in admitted {
            warn!("Request {} abandoned before completion", descriptor.id());
            let item = BatchItem {
                descriptor,
                outcome: Outcome::Failure(cancelled_error()),
            };
            on_item(&item);
            slots[index] = Some(item);
        }

        let items = slots
            .into_iter()
            .map(|slot| slot.expect("every dispatched request yields an outcome"))
            .collect();

        BatchResult::new(items, started_at, start.elapsed())
    }
}

/// Run one invocation, applying the descriptor's timeout if present
async fn invoke_one<I: Invoker + ?Sized>(invoker: &I, request: &RequestDescriptor) -> Outcome {
    let result = match request.timeout() {
        Some(limit) => match tokio::time::timeout(limit, invoker.invoke(request)).await {
            Ok(result) => result,
            Err(_) => Err(ZabanError::Transport {
                message: format!("request {} timed out after {:?}", request.id(), limit),
            }),
        },
        None => invoker.invoke(request).await,
    };

    if let Err(err) = &result {
        warn!("Request {} ({}) failed: {}", request.id(), request.operation().kind(), err);
    }

    Outcome::from(result)
}

fn cancelled_error() -> ZabanError {
    ZabanError::Transport {
        message: "batch cancelled".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Operation, Translation, TranslationRequest};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory invoker with controllable delays and failures
    #[derive(Debug)]
    struct FakeInvoker {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        invocations: AtomicUsize,
        started: Mutex<Vec<u64>>,
        delay_ms: u64,
        delays: HashMap<u64, u64>,
        fail_ids: Vec<u64>,
        auth_reject: bool,
    }

    impl FakeInvoker {
        fn new(delay_ms: u64) -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                invocations: AtomicUsize::new(0),
                started: Mutex::new(Vec::new()),
                delay_ms,
                delays: HashMap::new(),
                fail_ids: Vec::new(),
                auth_reject: false,
            }
        }

        fn with_delays(mut self, delays: &[(u64, u64)]) -> Self {
            self.delays = delays.iter().copied().collect();
            self
        }

        fn with_failures(mut self, ids: &[u64]) -> Self {
            self.fail_ids = ids.to_vec();
            self
        }

        fn rejecting_credentials(mut self) -> Self {
            self.auth_reject = true;
            self
        }

        fn started_ids(&self) -> Vec<u64> {
            self.started.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Invoker for FakeInvoker {
        async fn invoke(&self, request: &RequestDescriptor) -> Result<ResponsePayload> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            self.started.lock().unwrap().push(request.id());

            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);

            let delay = self.delays.get(&request.id()).copied().unwrap_or(self.delay_ms);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.auth_reject {
                return Err(ZabanError::Authentication {
                    message: "invalid API key".to_string(),
                });
            }
            if self.fail_ids.contains(&request.id()) {
                return Err(ZabanError::Api {
                    status: 500,
                    message: "server error".to_string(),
                });
            }

            Ok(ResponsePayload::Translation(Translation {
                translated_text: format!("translated-{}", request.id()),
                source_lang: Some("eng_Latn".to_string()),
                model: Some("zaban-nmt-1".to_string()),
            }))
        }
    }

    fn descriptors(count: u64) -> Vec<RequestDescriptor> {
        (1..=count)
            .map(|id| {
                let request = TranslationRequest::new(format!("text {}", id), "hin_Deva").unwrap();
                RequestDescriptor::with_id(id, Operation::Translate(request))
            })
            .collect()
    }

    fn result_ids(result: &BatchResult) -> Vec<u64> {
        result.iter().map(|item| item.descriptor.id()).collect()
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let dispatcher = BatchDispatcher::new(Arc::new(FakeInvoker::new(0)), 4).unwrap();
        let result = dispatcher.run(Vec::new()).await;
        assert_eq!(result.len(), 0);
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_zero_limit_rejected() {
        let err = BatchDispatcher::new(Arc::new(FakeInvoker::new(0)), 0).unwrap_err();
        assert!(matches!(err, ZabanError::Config { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_preserved_regardless_of_completion() {
        // Earlier submissions take longer, so completion order inverts
        // submission order.
        let invoker = Arc::new(FakeInvoker::new(0).with_delays(&[
            (1, 100),
            (2, 80),
            (3, 60),
            (4, 40),
            (5, 20),
        ]));
        let dispatcher = BatchDispatcher::new(Arc::clone(&invoker), 2).unwrap();

        let result = dispatcher.run(descriptors(5)).await;

        assert_eq!(result.len(), 5);
        assert_eq!(result_ids(&result), vec![1, 2, 3, 4, 5]);
        assert!(result.iter().all(|item| item.outcome.is_success()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_cap_is_respected() {
        let invoker = Arc::new(FakeInvoker::new(10));
        let dispatcher = BatchDispatcher::new(Arc::clone(&invoker), 3).unwrap();

        let result = dispatcher.run(descriptors(8)).await;

        assert_eq!(result.len(), 8);
        assert_eq!(invoker.invocations.load(Ordering::SeqCst), 8);
        assert!(invoker.max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_isolated() {
        let invoker = Arc::new(FakeInvoker::new(5).with_failures(&[3]));
        let dispatcher = BatchDispatcher::new(invoker, 2).unwrap();

        let result = dispatcher.run(descriptors(5)).await;

        for item in &result {
            if item.descriptor.id() == 3 {
                assert!(matches!(
                    item.outcome.error(),
                    Some(ZabanError::Api { status: 500, .. })
                ));
            } else {
                assert!(item.outcome.is_success());
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_credential_fails_every_item() {
        let invoker = Arc::new(FakeInvoker::new(5).rejecting_credentials());
        let dispatcher = BatchDispatcher::new(invoker, 4).unwrap();

        // Dispatch itself must not error; every item settles to a failure.
        let result = dispatcher.run(descriptors(6)).await;

        assert_eq!(result.len(), 6);
        assert!(result.iter().all(|item| matches!(
            item.outcome.error(),
            Some(ZabanError::Authentication { .. })
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_limit_one_is_strictly_sequential() {
        let sequential = Arc::new(FakeInvoker::new(10));
        let dispatcher = BatchDispatcher::new(Arc::clone(&sequential), 1).unwrap();
        let result_seq = dispatcher.run(descriptors(5)).await;

        assert_eq!(sequential.started_ids(), vec![1, 2, 3, 4, 5]);
        assert_eq!(sequential.max_in_flight.load(Ordering::SeqCst), 1);

        let wide = Arc::new(FakeInvoker::new(10));
        let dispatcher = BatchDispatcher::new(Arc::clone(&wide), 10).unwrap();
        let result_wide = dispatcher.run(descriptors(5)).await;

        let texts = |result: &BatchResult| -> Vec<String> {
            result
                .successes()
                .iter()
                .filter_map(|payload| payload.as_translation())
                .map(|t| t.translated_text.clone())
                .collect()
        };
        assert_eq!(texts(&result_seq), texts(&result_wide));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_deduplication_of_identical_descriptors() {
        let invoker = Arc::new(FakeInvoker::new(5));
        let dispatcher = BatchDispatcher::new(Arc::clone(&invoker), 2).unwrap();

        let request = TranslationRequest::new("Hello", "hin_Deva").unwrap();
        let descriptor = RequestDescriptor::with_id(7, Operation::Translate(request));
        let result = dispatcher.run(vec![descriptor.clone(), descriptor]).await;

        assert_eq!(result.len(), 2);
        assert_eq!(invoker.invocations.load(Ordering::SeqCst), 2);
        assert!(result.iter().all(|item| item.outcome.is_success()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_item_timeout_resolves_to_transport_failure() {
        let invoker = Arc::new(FakeInvoker::new(5).with_delays(&[(2, 200)]));
        let dispatcher = BatchDispatcher::new(invoker, 3).unwrap();

        let mut requests = descriptors(3);
        requests[1] = requests[1].clone().with_timeout(Duration::from_millis(10));

        let result = dispatcher.run(requests).await;

        assert_eq!(result.len(), 3);
        assert!(result.items()[0].outcome.is_success());
        assert!(matches!(
            result.items()[1].outcome.error(),
            Some(ZabanError::Transport { .. })
        ));
        assert!(result.items()[2].outcome.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drain_skips_unstarted_items() {
        let invoker = Arc::new(FakeInvoker::new(50));
        let dispatcher = Arc::new(BatchDispatcher::new(Arc::clone(&invoker), 1).unwrap());
        let handle = dispatcher.cancel_handle();

        let runner = {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move { dispatcher.run(descriptors(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(120)).await;
        handle.cancel();
        let result = runner.await.unwrap();

        // Items 1-3 were admitted before cancellation; 4 and 5 never start.
        assert_eq!(result.len(), 5);
        assert_eq!(invoker.invocations.load(Ordering::SeqCst), 3);
        for item in &result {
            if item.descriptor.id() <= 3 {
                assert!(item.outcome.is_success());
            } else {
                assert!(matches!(
                    item.outcome.error(),
                    Some(ZabanError::Transport { .. })
                ));
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_abandon_aborts_in_flight_items() {
        let invoker = Arc::new(FakeInvoker::new(100));
        let dispatcher = Arc::new(
            BatchDispatcher::new(Arc::clone(&invoker), 2)
                .unwrap()
                .with_cancel_policy(CancelPolicy::Abandon),
        );
        let handle = dispatcher.cancel_handle();

        let runner = {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move { dispatcher.run(descriptors(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.cancel();
        let result = runner.await.unwrap();

        // Only the first window was ever issued; everything fails.
        assert_eq!(result.len(), 5);
        assert_eq!(invoker.invocations.load(Ordering::SeqCst), 2);
        assert!(result.iter().all(|item| matches!(
            item.outcome.error(),
            Some(ZabanError::Transport { .. })
        )));
        assert_eq!(result_ids(&result), vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_with_reports_every_settled_item() {
        let invoker = Arc::new(FakeInvoker::new(5).with_failures(&[2]));
        let dispatcher = BatchDispatcher::new(invoker, 2).unwrap();

        let settled = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&settled);
        let result = dispatcher
            .run_with(descriptors(4), |_item| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert_eq!(result.len(), 4);
        assert_eq!(settled.load(Ordering::SeqCst), 4);
    }
}
