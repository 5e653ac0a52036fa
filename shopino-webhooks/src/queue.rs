//! Handler queue for acknowledged events
//!
//! The dispatcher only ever calls [`EventSink::submit`], which must not
//! block. [`HandlerQueue`] is the production sink: a bounded channel drained
//! by a fixed pool of worker tasks that call one [`ResourceHandler`] per
//! resource family.

use crate::{Resource, ResourceEvent, Result, WebhookError, WebhookEvent};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Non-blocking destination for routed events.
pub trait EventSink: Send + Sync {
    /// Hand an event over for processing. Fails immediately when the event
    /// cannot be accepted.
    fn submit(&self, event: WebhookEvent) -> Result<()>;
}

/// Business logic for one resource family.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    async fn handle(&self, event: &ResourceEvent) -> Result<()>;
}

/// Default handler: records the event in the log and does nothing else.
#[derive(Debug, Clone, Copy)]
pub struct LoggingHandler {
    resource: Resource,
}

impl LoggingHandler {
    pub fn new(resource: Resource) -> Self {
        Self { resource }
    }
}

#[async_trait]
impl ResourceHandler for LoggingHandler {
    async fn handle(&self, event: &ResourceEvent) -> Result<()> {
        match event.resource_id {
            Some(id) => info!(
                topic = %event.topic,
                delivery_id = %event.delivery_id,
                "Processing {} for {} {}",
                event.topic,
                self.resource,
                id
            ),
            None => info!(
                topic = %event.topic,
                delivery_id = %event.delivery_id,
                "Processing {} for {} without id",
                event.topic,
                self.resource
            ),
        }
        Ok(())
    }
}

/// One handler per resource family.
#[derive(Clone)]
pub struct HandlerSet {
    order: Arc<dyn ResourceHandler>,
    product: Arc<dyn ResourceHandler>,
    customer: Arc<dyn ResourceHandler>,
}

impl Default for HandlerSet {
    fn default() -> Self {
        Self {
            order: Arc::new(LoggingHandler::new(Resource::Order)),
            product: Arc::new(LoggingHandler::new(Resource::Product)),
            customer: Arc::new(LoggingHandler::new(Resource::Customer)),
        }
    }
}

impl std::fmt::Debug for HandlerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerSet").finish_non_exhaustive()
    }
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_order(mut self, handler: impl ResourceHandler + 'static) -> Self {
        self.order = Arc::new(handler);
        self
    }

    pub fn with_product(mut self, handler: impl ResourceHandler + 'static) -> Self {
        self.product = Arc::new(handler);
        self
    }

    pub fn with_customer(mut self, handler: impl ResourceHandler + 'static) -> Self {
        self.customer = Arc::new(handler);
        self
    }

    pub fn handler_for(&self, resource: Resource) -> &Arc<dyn ResourceHandler> {
        match resource {
            Resource::Order => &self.order,
            Resource::Product => &self.product,
            Resource::Customer => &self.customer,
        }
    }

    /// Run the matching handler. Handshakes have no handler.
    pub async fn handle(&self, event: &WebhookEvent) -> Result<()> {
        match event.resource_event() {
            Some(inner) => self.handler_for(inner.resource()).handle(inner).await,
            None => Ok(()),
        }
    }
}

/// Queue sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// Events buffered before `submit` starts failing
    pub capacity: usize,

    /// Worker tasks draining the queue
    pub workers: usize,

    /// Longest a single handler call may run before it is abandoned
    pub handler_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            workers: 4,
            handler_timeout: Duration::from_secs(60),
        }
    }
}

/// Bounded queue drained by a pool of worker tasks.
pub struct HandlerQueue {
    sender: mpsc::Sender<WebhookEvent>,
    accepting: AtomicBool,
    shutdown: watch::Sender<bool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    processed: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl std::fmt::Debug for HandlerQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerQueue")
            .field("accepting", &self.accepting.load(Ordering::SeqCst))
            .field("processed", &self.processed())
            .field("failed", &self.failed())
            .finish()
    }
}

impl HandlerQueue {
    /// Spawn the workers. Must be called inside a Tokio runtime.
    pub fn start(handlers: HandlerSet, config: QueueConfig) -> Self {
        let capacity = config.capacity.max(1);
        let worker_count = config.workers.max(1);
        let handler_timeout = config.handler_timeout;

        let (sender, receiver) = mpsc::channel(capacity);
        let (shutdown, _) = watch::channel(false);
        let receiver = Arc::new(Mutex::new(receiver));
        let handlers = Arc::new(handlers);
        let processed = Arc::new(AtomicU64::new(0));
        let failed = Arc::new(AtomicU64::new(0));

        let workers = (0..worker_count)
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    receiver.clone(),
                    handlers.clone(),
                    handler_timeout,
                    shutdown.subscribe(),
                    processed.clone(),
                    failed.clone(),
                ))
            })
            .collect();

        info!(
            capacity,
            workers = worker_count,
            handler_timeout_ms = handler_timeout.as_millis() as u64,
            "handler queue started"
        );

        Self {
            sender,
            accepting: AtomicBool::new(true),
            shutdown,
            workers: Mutex::new(workers),
            processed,
            failed,
        }
    }

    /// Events whose handler returned `Ok`.
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::SeqCst)
    }

    /// Events whose handler returned an error, panicked or timed out.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    /// Stop accepting events, let the workers finish everything already
    /// queued, and wait for them to exit.
    pub async fn shutdown(&self) {
        if !self.accepting.swap(false, Ordering::SeqCst) {
            debug!("handler queue already shut down");
        }
        let _ = self.shutdown.send(true);

        let workers: Vec<JoinHandle<()>> = self.workers.lock().await.drain(..).collect();
        for worker in workers {
            if let Err(e) = worker.await {
                error!(error = %e, "handler worker panicked");
            }
        }
        info!(
            processed = self.processed(),
            failed = self.failed(),
            "handler queue stopped"
        );
    }
}

impl EventSink for HandlerQueue {
    fn submit(&self, event: WebhookEvent) -> Result<()> {
        if !self.is_accepting() {
            return Err(WebhookError::InternalDispatch(
                "handler queue is shut down".to_string(),
            ));
        }
        self.sender.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                WebhookError::InternalDispatch("handler queue is full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => {
                WebhookError::InternalDispatch("handler queue is closed".to_string())
            }
        })
    }
}

async fn run_worker(
    id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<WebhookEvent>>>,
    handlers: Arc<HandlerSet>,
    handler_timeout: Duration,
    mut shutdown: watch::Receiver<bool>,
    processed: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
) {
    debug!(worker_id = id, "handler worker starting");

    loop {
        // After close() the receiver yields what is buffered, then None.
        let next = {
            let mut rx = receiver.lock().await;
            tokio::select! {
                biased;
                event = rx.recv() => event,
                _ = shutdown.changed() => {
                    rx.close();
                    rx.recv().await
                }
            }
        };

        let Some(event) = next else {
            break;
        };

        let topic = event.topic().map(|t| t.to_string());
        let task_handlers = handlers.clone();
        // A separate task turns a handler panic into a JoinError.
        let mut task = tokio::spawn(async move { task_handlers.handle(&event).await });

        match tokio::time::timeout(handler_timeout, &mut task).await {
            Ok(Ok(Ok(()))) => {
                processed.fetch_add(1, Ordering::SeqCst);
            }
            Ok(Ok(Err(e))) => {
                failed.fetch_add(1, Ordering::SeqCst);
                warn!(worker_id = id, topic = ?topic, error = %e, "webhook handler failed");
            }
            Ok(Err(e)) => {
                failed.fetch_add(1, Ordering::SeqCst);
                error!(worker_id = id, topic = ?topic, error = %e, "webhook handler panicked");
            }
            Err(_) => {
                task.abort();
                failed.fetch_add(1, Ordering::SeqCst);
                warn!(
                    worker_id = id,
                    topic = ?topic,
                    timeout_ms = handler_timeout.as_millis() as u64,
                    "webhook handler timed out"
                );
            }
        }
    }

    debug!(worker_id = id, "handler worker stopped");
}
