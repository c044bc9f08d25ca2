//! The decision request queue: priority dispatch with bounded concurrency.
//!
//! Requests enter through [`DecisionRequestQueue::enqueue`] and come back
//! through the returned [`DecisionTicket`]. Between the two sits a
//! dispatch loop that pops the highest-priority pending request whenever
//! one of K provider slots frees, calls the provider under a deadline,
//! retries once with backoff, and falls back to the rule engine when the
//! provider stays unusable. Every non-cancelled ticket therefore resolves
//! to a valid decision; a cancelled ticket resolves to `None` and the
//! late provider response is dropped without touching anything.
//!
//! Must be constructed inside a tokio runtime (the loop is spawned).

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rust_decimal::prelude::ToPrimitive;
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use hearth_core::config::ProviderSection;
use hearth_types::{AgentId, Decision, DecisionKind, DecisionRequest, ItemCatalog, RequestId};

use crate::fallback::{FallbackThresholds, rule_decision};
use crate::provider::ReasoningProvider;
use crate::validate::parse_decision;

/// Hunger values within the same 10-point band share a cache entry.
const HUNGER_BUCKET: u64 = 10;

/// Money values within the same 25-coin band share a cache entry.
const MONEY_BUCKET: u32 = 25;

/// Tunables for the dispatch loop, usually taken from the provider
/// section of the config.
#[derive(Debug, Clone)]
pub struct QueueSettings {
    /// Per-call deadline.
    pub request_timeout: Duration,
    /// Retries after a failed or timed-out call, before falling back.
    pub max_retries: u32,
    /// Pause between retries.
    pub retry_backoff: Duration,
    /// Maximum provider calls in flight at once.
    pub concurrency: usize,
    /// Response cache time-to-live (zero disables the cache).
    pub cache_ttl: Duration,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(7),
            max_retries: 1,
            retry_backoff: Duration::from_millis(250),
            concurrency: 4,
            cache_ttl: Duration::from_secs(30),
        }
    }
}

impl From<&ProviderSection> for QueueSettings {
    fn from(section: &ProviderSection) -> Self {
        Self {
            request_timeout: Duration::from_millis(section.request_timeout_ms),
            max_retries: section.max_retries,
            retry_backoff: Duration::from_millis(section.retry_backoff_ms),
            concurrency: section.concurrency,
            cache_ttl: Duration::from_millis(section.cache_ttl_ms),
        }
    }
}

/// A claim on one future decision.
#[derive(Debug)]
pub struct DecisionTicket {
    request_id: RequestId,
    receiver: oneshot::Receiver<Option<Decision>>,
}

impl DecisionTicket {
    /// The request this ticket belongs to.
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Wait for the decision. `None` means the request was cancelled (or
    /// the queue was torn down under it) -- never a provider failure.
    pub async fn decision(self) -> Option<Decision> {
        self.receiver.await.ok().flatten()
    }
}

struct Envelope {
    request: DecisionRequest,
    reply: oneshot::Sender<Option<Decision>>,
}

/// Heap entry: priority first, then FIFO within a tier.
struct Pending {
    sequence: u64,
    envelope: Envelope,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.sequence == other.sequence
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        self.envelope
            .request
            .priority
            .cmp(&other.envelope.request.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Cache key: agent, decision kind, and coarse vitals buckets. A cached
/// decision is reused only while the situation class is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Fingerprint {
    agent: AgentId,
    kind: DecisionKind,
    hunger_bucket: u64,
    money_bucket: u32,
}

impl Fingerprint {
    fn of(request: &DecisionRequest) -> Self {
        Self {
            agent: request.agent_id,
            kind: request.kind,
            hunger_bucket: request
                .snapshot
                .hunger
                .to_u64()
                .unwrap_or(0)
                .checked_div(HUNGER_BUCKET)
                .unwrap_or(0),
            money_bucket: request
                .snapshot
                .money
                .checked_div(MONEY_BUCKET)
                .unwrap_or(0),
        }
    }
}

/// Everything a resolver task needs, cheaply cloneable.
#[derive(Clone)]
struct Worker {
    provider: Arc<ReasoningProvider>,
    catalog: Arc<ItemCatalog>,
    thresholds: Arc<FallbackThresholds>,
    settings: QueueSettings,
    cancelled: Arc<Mutex<HashSet<AgentId>>>,
    cache: Arc<Mutex<HashMap<Fingerprint, (Decision, Instant)>>>,
}

impl Worker {
    fn is_cancelled(&self, agent: AgentId) -> bool {
        let Ok(guard) = self.cancelled.lock() else {
            return false;
        };
        guard.contains(&agent)
    }

    fn cache_get(&self, fingerprint: Fingerprint) -> Option<Decision> {
        if self.settings.cache_ttl.is_zero() {
            return None;
        }
        let Ok(mut guard) = self.cache.lock() else {
            return None;
        };
        match guard.get(&fingerprint) {
            Some((decision, stored_at)) if stored_at.elapsed() < self.settings.cache_ttl => {
                Some(decision.clone())
            }
            Some(_) => {
                guard.remove(&fingerprint);
                None
            }
            None => None,
        }
    }

    fn cache_put(&self, fingerprint: Fingerprint, decision: &Decision) {
        if self.settings.cache_ttl.is_zero() {
            return;
        }
        let Ok(mut guard) = self.cache.lock() else {
            return;
        };
        guard.insert(fingerprint, (decision.clone(), Instant::now()));
    }

    /// Resolve one request to a decision, or `None` if cancelled.
    async fn resolve(&self, request: &DecisionRequest) -> Option<Decision> {
        if self.is_cancelled(request.agent_id) {
            debug!(agent = %request.agent_id, request = %request.id, "request cancelled before dispatch");
            return None;
        }

        let fingerprint = Fingerprint::of(request);
        if let Some(hit) = self.cache_get(fingerprint) {
            debug!(agent = %request.agent_id, "decision served from cache");
            return Some(hit);
        }

        let decision = self.call_with_retry(request, fingerprint).await;

        // A death or cancellation while the provider was thinking makes
        // the response moot; drop it rather than let it mutate anything.
        if self.is_cancelled(request.agent_id) {
            debug!(agent = %request.agent_id, request = %request.id, "late response dropped");
            return None;
        }
        Some(decision)
    }

    /// Call the provider under the deadline, retrying transport failures;
    /// malformed responses and exhausted retries both land in the rule
    /// fallback.
    async fn call_with_retry(
        &self,
        request: &DecisionRequest,
        fingerprint: Fingerprint,
    ) -> Decision {
        let mut attempt: u32 = 0;
        loop {
            let outcome = timeout(
                self.settings.request_timeout,
                self.provider.complete(request),
            )
            .await;

            let failure = match outcome {
                Ok(Ok(raw)) => match parse_decision(&raw) {
                    Ok(decision) => {
                        self.cache_put(fingerprint, &decision);
                        return decision;
                    }
                    Err(err) => {
                        warn!(
                            agent = %request.agent_id,
                            error = %err,
                            raw_response = raw,
                            "unparseable provider response, using rule fallback"
                        );
                        return self.fallback(request);
                    }
                },
                Ok(Err(err)) => err.to_string(),
                Err(_elapsed) => "deadline exceeded".to_owned(),
            };

            if attempt >= self.settings.max_retries {
                warn!(
                    agent = %request.agent_id,
                    error = failure,
                    attempts = attempt.saturating_add(1),
                    "provider unusable, using rule fallback"
                );
                return self.fallback(request);
            }
            attempt = attempt.saturating_add(1);
            debug!(agent = %request.agent_id, error = failure, attempt, "retrying provider call");
            sleep(self.settings.retry_backoff).await;
        }
    }

    fn fallback(&self, request: &DecisionRequest) -> Decision {
        rule_decision(&request.snapshot, &self.catalog, &self.thresholds)
    }
}

/// Handle for submitting decision requests.
///
/// Cloneable; all clones feed the same dispatch loop. The loop exits
/// when every handle has been dropped and the backlog is drained.
#[derive(Clone)]
pub struct DecisionRequestQueue {
    sender: mpsc::UnboundedSender<Envelope>,
    cancelled: Arc<Mutex<HashSet<AgentId>>>,
}

impl DecisionRequestQueue {
    /// Build the queue and spawn its dispatch loop on the current runtime.
    pub fn new(
        provider: ReasoningProvider,
        catalog: ItemCatalog,
        thresholds: FallbackThresholds,
        settings: QueueSettings,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let cancelled = Arc::new(Mutex::new(HashSet::new()));
        let worker = Worker {
            provider: Arc::new(provider),
            catalog: Arc::new(catalog),
            thresholds: Arc::new(thresholds),
            settings,
            cancelled: Arc::clone(&cancelled),
            cache: Arc::new(Mutex::new(HashMap::new())),
        };
        tokio::spawn(dispatch_loop(receiver, worker));
        Self { sender, cancelled }
    }

    /// Submit a request; the ticket resolves when a decision (or a
    /// cancellation) does.
    pub fn enqueue(&self, request: DecisionRequest) -> DecisionTicket {
        let request_id = request.id;
        let (reply, receiver) = oneshot::channel();
        if self.sender.send(Envelope { request, reply }).is_err() {
            // Loop gone; the dropped reply sender resolves the ticket None.
            warn!(request = %request_id, "decision queue is shut down");
        }
        DecisionTicket {
            request_id,
            receiver,
        }
    }

    /// Cancel all pending and in-flight requests for an agent. Their
    /// tickets resolve `None`; late provider responses are dropped.
    pub fn cancel(&self, agent: AgentId) {
        let Ok(mut guard) = self.cancelled.lock() else {
            return;
        };
        guard.insert(agent);
    }
}

async fn dispatch_loop(mut receiver: mpsc::UnboundedReceiver<Envelope>, worker: Worker) {
    let semaphore = Arc::new(Semaphore::new(worker.settings.concurrency.max(1)));
    let mut heap: BinaryHeap<Pending> = BinaryHeap::new();
    let mut sequence: u64 = 0;

    loop {
        if heap.is_empty() {
            // Nothing pending: block until work arrives or all handles drop.
            let Some(envelope) = receiver.recv().await else {
                break;
            };
            push(&mut heap, envelope, &mut sequence);
        }
        drain(&mut receiver, &mut heap, &mut sequence);

        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };
        // New arrivals while waiting for a slot still outrank the backlog.
        drain(&mut receiver, &mut heap, &mut sequence);

        let Some(pending) = heap.pop() else {
            drop(permit);
            continue;
        };
        let worker = worker.clone();
        tokio::spawn(async move {
            let decision = worker.resolve(&pending.envelope.request).await;
            // A dropped ticket is fine; the decision just goes unused.
            let _ = pending.envelope.reply.send(decision);
            drop(permit);
        });
    }
}

fn push(heap: &mut BinaryHeap<Pending>, envelope: Envelope, sequence: &mut u64) {
    heap.push(Pending {
        sequence: *sequence,
        envelope,
    });
    *sequence = sequence.saturating_add(1);
}

fn drain(
    receiver: &mut mpsc::UnboundedReceiver<Envelope>,
    heap: &mut BinaryHeap<Pending>,
    sequence: &mut u64,
) {
    while let Ok(envelope) = receiver.try_recv() {
        push(heap, envelope, sequence);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal::Decimal;

    use hearth_types::{
        ActionParameters, AgentSnapshot, ItemKind, KnownSite, Place, Priority, SiteId,
    };

    use crate::provider::ScriptedProvider;

    use super::*;

    fn snapshot(agent_id: AgentId, hunger: u32, money: u32) -> AgentSnapshot {
        AgentSnapshot {
            agent_id,
            name: String::from("Mara"),
            hunger: Decimal::from(hunger),
            money,
            place: Place::TownSquare,
            inventory: BTreeMap::new(),
            nearby_agents: Vec::new(),
            known_sites: vec![KnownSite {
                id: SiteId::new(),
                place: Place::Mine,
            }],
            known_shops: Vec::new(),
            game_minutes: 0,
        }
    }

    fn request(agent_id: AgentId, priority: Priority) -> DecisionRequest {
        DecisionRequest::new(DecisionKind::NextAction, priority, snapshot(agent_id, 80, 100))
    }

    fn queue_with(provider: ScriptedProvider, settings: QueueSettings) -> DecisionRequestQueue {
        DecisionRequestQueue::new(
            ReasoningProvider::Scripted(provider),
            ItemCatalog::standard(),
            FallbackThresholds::default(),
            settings,
        )
    }

    fn fast_settings() -> QueueSettings {
        QueueSettings {
            request_timeout: Duration::from_millis(200),
            max_retries: 1,
            retry_backoff: Duration::from_millis(1),
            concurrency: 4,
            cache_ttl: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn valid_response_resolves_the_ticket() {
        let provider = ScriptedProvider::always(
            r#"{"action": "move", "parameters": {"destination": "market"}}"#,
        );
        let queue = queue_with(provider, fast_settings());

        let ticket = queue.enqueue(request(AgentId::new(), Priority::Routine));
        let decision = ticket.decision().await.unwrap();
        assert_eq!(
            decision.parameters,
            ActionParameters::Move {
                destination: Place::Market
            }
        );
    }

    #[tokio::test]
    async fn starvation_outranks_routine() {
        // One slot, responses consumed in dispatch order: the starvation
        // request must get the first response even though it was enqueued
        // second.
        let provider = ScriptedProvider::new([
            r#"{"action": "idle", "parameters": {}, "rationale": "first"}"#,
            r#"{"action": "idle", "parameters": {}, "rationale": "second"}"#,
        ]);
        let mut settings = fast_settings();
        settings.concurrency = 1;
        let queue = queue_with(provider, settings);

        let routine = queue.enqueue(request(AgentId::new(), Priority::Routine));
        let starving = queue.enqueue(request(AgentId::new(), Priority::Starvation));

        let (routine, starving) = tokio::join!(routine.decision(), starving.decision());
        assert_eq!(starving.unwrap().rationale.as_deref(), Some("first"));
        assert_eq!(routine.unwrap().rationale.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn cancelled_tickets_resolve_none() {
        let provider = ScriptedProvider::always(r#"{"action": "idle", "parameters": {}}"#);
        let queue = queue_with(provider, fast_settings());

        let agent = AgentId::new();
        queue.cancel(agent);
        let ticket = queue.enqueue(request(agent, Priority::Routine));
        assert!(ticket.decision().await.is_none());
    }

    #[tokio::test]
    async fn provider_outage_degrades_to_fallback() {
        let queue = queue_with(ScriptedProvider::failing(), fast_settings());

        // Hungry and holding bread: the fallback must say eat.
        let agent = AgentId::new();
        let mut snap = snapshot(agent, 20, 100);
        snap.inventory.insert(ItemKind::Bread, 1);
        let ticket = queue.enqueue(DecisionRequest::new(
            DecisionKind::NextAction,
            Priority::Starvation,
            snap,
        ));

        let decision = ticket.decision().await.unwrap();
        assert_eq!(
            decision.parameters,
            ActionParameters::Eat {
                item: ItemKind::Bread
            }
        );
    }

    #[tokio::test]
    async fn malformed_response_degrades_to_fallback() {
        let provider = ScriptedProvider::always("I would like to dance in the square.");
        let queue = queue_with(provider, fast_settings());

        let ticket = queue.enqueue(request(AgentId::new(), Priority::Routine));
        let decision = ticket.decision().await.unwrap();
        // Fed and solvent: the fallback idles.
        assert_eq!(decision.parameters, ActionParameters::Idle);
    }

    #[tokio::test]
    async fn cache_serves_repeat_situations_without_a_provider_call() {
        // One good response, then outage. The second, identical request
        // must come from the cache, not the fallback.
        let provider = ScriptedProvider::then_failing([
            r#"{"action": "idle", "parameters": {}, "rationale": "from provider"}"#,
        ]);
        let mut settings = fast_settings();
        settings.cache_ttl = Duration::from_secs(60);
        settings.max_retries = 0;
        let queue = queue_with(provider, settings);

        let agent = AgentId::new();
        let first = queue
            .enqueue(DecisionRequest::new(
                DecisionKind::NextAction,
                Priority::Routine,
                snapshot(agent, 80, 100),
            ))
            .decision()
            .await
            .unwrap();
        assert_eq!(first.rationale.as_deref(), Some("from provider"));

        let second = queue
            .enqueue(DecisionRequest::new(
                DecisionKind::NextAction,
                Priority::Routine,
                snapshot(agent, 80, 100),
            ))
            .decision()
            .await
            .unwrap();
        assert_eq!(second.rationale.as_deref(), Some("from provider"));
    }

    #[tokio::test]
    async fn every_ticket_resolves_under_load() {
        let queue = queue_with(ScriptedProvider::failing(), fast_settings());

        let tickets: Vec<_> = (0..32)
            .map(|_| queue.enqueue(request(AgentId::new(), Priority::Routine)))
            .collect();
        let decisions = futures::future::join_all(
            tickets.into_iter().map(DecisionTicket::decision),
        )
        .await;
        assert!(decisions.iter().all(Option::is_some));
    }
}
