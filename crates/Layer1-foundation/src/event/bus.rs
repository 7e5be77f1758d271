//! Event Bus - 토픽 기반 발행/구독
//!
//! 구독은 토픽별로 색인되므로 발행 비용은 해당 토픽의 구독 수에만 비례합니다.
//! 발행자는 리스너 실행을 기다리지 않습니다. 동기 리스너는 워커 풀에서,
//! 비동기/fire-and-forget 리스너는 추적되는 런타임 태스크에서 실행됩니다.

use super::listener::{DeliveryMode, Listener, SubscriptionId};
use super::types::Event;
use crate::runtime::WorkerPool;
use crate::{Error, Result};
use futures::FutureExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

// ============================================================================
// EventBusConfig
// ============================================================================

/// 이벤트 버스 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventBusConfig {
    /// 동기 리스너용 워커 수 (0 = CPU 수)
    pub worker_threads: usize,

    /// 종료 시 진행 중인 리스너를 기다리는 시간 (ms)
    pub shutdown_grace_ms: u64,

    /// 디버그 모드 (전달마다 trace 로그)
    pub debug_mode: bool,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            shutdown_grace_ms: 5_000,
            debug_mode: false,
        }
    }
}

impl EventBusConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

// ============================================================================
// DeliveryReport
// ============================================================================

/// `publish_and_wait` 결과
///
/// `completed`/`failed`/`skipped` 는 기다린 리스너(blocking-sync, blocking-async)
/// 만 셉니다. fire-and-forget 은 `scheduled` 에만 포함됩니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub scheduled: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
}

// ============================================================================
// Subscription Index
// ============================================================================

struct Subscription {
    id: SubscriptionId,
    pattern: Arc<str>,
    prefix: bool,
    owner: Option<Arc<str>>,
    mode: DeliveryMode,
    listener: Listener,
    active: AtomicBool,
}

impl Subscription {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }
}

/// 구독 색인 (키는 생성 순번)
#[derive(Default)]
struct Index {
    exact: HashMap<Arc<str>, BTreeMap<u64, Arc<Subscription>>>,
    prefixes: BTreeMap<u64, Arc<Subscription>>,
    by_id: HashMap<u64, Arc<Subscription>>,
    by_owner: HashMap<Arc<str>, BTreeSet<u64>>,
}

impl Index {
    fn insert(&mut self, sub: Arc<Subscription>) {
        let seq = sub.id.0;
        if sub.prefix {
            self.prefixes.insert(seq, Arc::clone(&sub));
        } else {
            self.exact
                .entry(Arc::clone(&sub.pattern))
                .or_default()
                .insert(seq, Arc::clone(&sub));
        }
        if let Some(owner) = &sub.owner {
            self.by_owner
                .entry(Arc::clone(owner))
                .or_default()
                .insert(seq);
        }
        self.by_id.insert(seq, sub);
    }

    fn remove(&mut self, seq: u64) -> Option<Arc<Subscription>> {
        let sub = self.by_id.remove(&seq)?;
        sub.deactivate();

        if sub.prefix {
            self.prefixes.remove(&seq);
        } else if let Some(slot) = self.exact.get_mut(&*sub.pattern) {
            slot.remove(&seq);
            if slot.is_empty() {
                self.exact.remove(&*sub.pattern);
            }
        }

        if let Some(owner) = &sub.owner {
            if let Some(ids) = self.by_owner.get_mut(owner) {
                ids.remove(&seq);
                if ids.is_empty() {
                    self.by_owner.remove(owner);
                }
            }
        }

        Some(sub)
    }

    /// 정확히 일치하는 구독 먼저, 그다음 prefix 구독 (각각 생성 순서)
    fn matching(&self, topic: &str) -> Vec<Arc<Subscription>> {
        let mut out: Vec<Arc<Subscription>> = self
            .exact
            .get(topic)
            .map(|slot| slot.values().cloned().collect())
            .unwrap_or_default();

        if !self.prefixes.is_empty() {
            out.extend(
                self.prefixes
                    .values()
                    .filter(|s| topic.starts_with(&*s.pattern))
                    .cloned(),
            );
        }
        out
    }

    fn clear(&mut self) -> usize {
        let count = self.by_id.len();
        for sub in self.by_id.values() {
            sub.deactivate();
        }
        self.exact.clear();
        self.prefixes.clear();
        self.by_id.clear();
        self.by_owner.clear();
        count
    }
}

// ============================================================================
// 전달
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed,
    Failed,
    Skipped,
}

#[derive(Default)]
struct Tally {
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl Tally {
    fn record(&self, outcome: Outcome) {
        match outcome {
            Outcome::Completed => {
                self.completed.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Failed => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Skipped => {}
        }
    }
}

/// 기다리는 발행에서 각 작업이 들고 있는 완료 신호
///
/// 모든 복제본이 drop 되면 수신 측이 깨어납니다.
#[derive(Clone)]
struct Waiter {
    tally: Arc<Tally>,
    _done: mpsc::Sender<()>,
}

fn call_blocking(sub: &Subscription, event: &Event, debug_mode: bool) -> Outcome {
    if !sub.is_active() {
        return Outcome::Skipped;
    }
    let Listener::Blocking(listener) = &sub.listener else {
        return Outcome::Skipped;
    };

    if debug_mode {
        trace!(
            subscription = %sub.id,
            listener = listener.name(),
            topic = %event.topic,
            event_id = %event.id,
            "Delivering event"
        );
    }

    match std::panic::catch_unwind(AssertUnwindSafe(|| listener.on_event(event))) {
        Ok(Ok(())) => Outcome::Completed,
        Ok(Err(e)) => {
            warn!(
                subscription = %sub.id,
                listener = listener.name(),
                topic = %event.topic,
                error = %e,
                "Listener failed"
            );
            Outcome::Failed
        }
        Err(_) => {
            warn!(
                subscription = %sub.id,
                listener = listener.name(),
                topic = %event.topic,
                "Listener panicked"
            );
            Outcome::Failed
        }
    }
}

async fn call_async(sub: &Subscription, event: Arc<Event>, debug_mode: bool) -> Outcome {
    if !sub.is_active() {
        return Outcome::Skipped;
    }
    let Listener::Async(listener) = &sub.listener else {
        return Outcome::Skipped;
    };

    if debug_mode {
        trace!(
            subscription = %sub.id,
            listener = listener.name(),
            topic = %event.topic,
            event_id = %event.id,
            "Delivering event"
        );
    }

    let topic = event.topic.clone();
    match AssertUnwindSafe(listener.on_event(event)).catch_unwind().await {
        Ok(Ok(())) => Outcome::Completed,
        Ok(Err(e)) => {
            warn!(
                subscription = %sub.id,
                listener = listener.name(),
                topic = %topic,
                error = %e,
                "Listener failed"
            );
            Outcome::Failed
        }
        Err(_) => {
            warn!(
                subscription = %sub.id,
                listener = listener.name(),
                topic = %topic,
                "Listener panicked"
            );
            Outcome::Failed
        }
    }
}

// ============================================================================
// EventBus
// ============================================================================

/// 이벤트 버스
///
/// ## 사용법
///
/// ```ignore
/// use reactor_foundation::event::{blocking_fn, DeliveryMode, EventBus};
///
/// let bus = EventBus::default();
///
/// let id = bus.subscribe(
///     "asset.exported",
///     blocking_fn("audit", |event| {
///         println!("exported: {}", event.payload);
///         Ok(())
///     }),
///     DeliveryMode::BlockingSync,
/// )?;
///
/// bus.publish("asset.exported", json!({ "path": "out.glb" }));
/// bus.unsubscribe(id);
/// ```
pub struct EventBus {
    config: EventBusConfig,
    pool: Arc<WorkerPool>,
    index: RwLock<Index>,
    next_id: AtomicU64,
    published: AtomicU64,
    closed: AtomicBool,
}

impl EventBus {
    /// 자체 워커 풀과 함께 생성
    pub fn new(config: EventBusConfig) -> Self {
        let pool = Arc::new(WorkerPool::new(config.worker_threads));
        Self::with_pool(config, pool)
    }

    /// 공유 워커 풀로 생성
    pub fn with_pool(config: EventBusConfig, pool: Arc<WorkerPool>) -> Self {
        Self {
            config,
            pool,
            index: RwLock::new(Index::default()),
            next_id: AtomicU64::new(1),
            published: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    /// 동기 리스너가 실행되는 워커 풀
    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    // ========================================================================
    // 구독
    // ========================================================================

    /// 토픽 구독
    pub fn subscribe(
        &self,
        topic: &str,
        listener: Listener,
        mode: DeliveryMode,
    ) -> Result<SubscriptionId> {
        self.insert(topic, false, None, listener, mode)
    }

    /// 소유자 태그와 함께 구독 (`unsubscribe_owner` 로 일괄 해제)
    pub fn subscribe_owned(
        &self,
        owner: &str,
        topic: &str,
        listener: Listener,
        mode: DeliveryMode,
    ) -> Result<SubscriptionId> {
        self.insert(topic, false, Some(owner), listener, mode)
    }

    /// prefix 구독 (예: "plugin." 은 모든 라이프사이클 이벤트)
    pub fn subscribe_prefix(
        &self,
        prefix: &str,
        listener: Listener,
        mode: DeliveryMode,
    ) -> Result<SubscriptionId> {
        self.insert(prefix, true, None, listener, mode)
    }

    /// 소유자 태그와 함께 prefix 구독
    pub fn subscribe_prefix_owned(
        &self,
        owner: &str,
        prefix: &str,
        listener: Listener,
        mode: DeliveryMode,
    ) -> Result<SubscriptionId> {
        self.insert(prefix, true, Some(owner), listener, mode)
    }

    fn insert(
        &self,
        pattern: &str,
        prefix: bool,
        owner: Option<&str>,
        listener: Listener,
        mode: DeliveryMode,
    ) -> Result<SubscriptionId> {
        if pattern.is_empty() {
            return Err(Error::InvalidSubscription("topic must not be empty".into()));
        }
        if !listener.supports(mode) {
            let kind = if listener.is_blocking() { "blocking" } else { "async" };
            return Err(Error::InvalidSubscription(format!(
                "{} listener '{}' cannot be delivered as {}",
                kind,
                listener.name(),
                mode
            )));
        }
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::InvalidSubscription("event bus is shut down".into()));
        }

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));

        debug!(
            subscription = %id,
            listener = listener.name(),
            topic = pattern,
            prefix,
            owner = owner.unwrap_or("-"),
            mode = %mode,
            "Subscribing listener"
        );

        let sub = Arc::new(Subscription {
            id,
            pattern: Arc::from(pattern),
            prefix,
            owner: owner.map(Arc::from),
            mode,
            listener,
            active: AtomicBool::new(true),
        });

        self.index.write().insert(sub);
        Ok(id)
    }

    /// 구독 해제
    ///
    /// 반환 이후로는 이미 진행 중인 발행을 포함해 더 이상 전달되지 않습니다.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.index.write().remove(id.0).is_some();
        if removed {
            debug!(subscription = %id, "Unsubscribed listener");
        }
        removed
    }

    /// 소유자의 구독 전부 해제
    pub fn unsubscribe_owner(&self, owner: &str) -> usize {
        let mut index = self.index.write();
        let ids: Vec<u64> = index
            .by_owner
            .get(owner)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();

        let removed = ids.into_iter().filter(|seq| index.remove(*seq).is_some()).count();
        drop(index);

        if removed > 0 {
            debug!(owner, removed, "Released owner subscriptions");
        }
        removed
    }

    /// 소유자의 구독 목록
    pub fn subscriptions_of(&self, owner: &str) -> Vec<SubscriptionId> {
        self.index
            .read()
            .by_owner
            .get(owner)
            .map(|ids| ids.iter().map(|seq| SubscriptionId(*seq)).collect())
            .unwrap_or_default()
    }

    // ========================================================================
    // 발행
    // ========================================================================

    /// 이벤트 발행
    ///
    /// 예약된 리스너 수를 반환하며 리스너 완료는 기다리지 않습니다.
    pub fn publish(&self, topic: &str, payload: Value) -> usize {
        self.publish_event(Event::new(topic, payload))
    }

    /// 미리 만든 이벤트 발행
    pub fn publish_event(&self, event: Event) -> usize {
        self.schedule(event, None)
    }

    /// 발행 후 blocking-sync / blocking-async 리스너 완료까지 대기
    pub async fn publish_and_wait(&self, topic: &str, payload: Value) -> DeliveryReport {
        self.publish_event_and_wait(Event::new(topic, payload)).await
    }

    /// 미리 만든 이벤트를 발행하고 대기
    pub async fn publish_event_and_wait(&self, event: Event) -> DeliveryReport {
        let tally = Arc::new(Tally::default());
        let (done_tx, mut done_rx) = mpsc::channel::<()>(1);
        let waiter = Waiter {
            tally: Arc::clone(&tally),
            _done: done_tx,
        };

        let waited = Arc::new(AtomicUsize::new(0));
        let scheduled = self.schedule(event, Some((waiter, Arc::clone(&waited))));

        // 모든 Waiter 가 drop 되면 None
        let _ = done_rx.recv().await;

        let completed = tally.completed.load(Ordering::Relaxed);
        let failed = tally.failed.load(Ordering::Relaxed);
        DeliveryReport {
            scheduled,
            completed,
            failed,
            skipped: waited
                .load(Ordering::Relaxed)
                .saturating_sub(completed + failed),
        }
    }

    /// 제한 시간 안에서만 대기
    ///
    /// 시간을 넘기면 `None`. 리스너는 취소되지 않고 계속 실행됩니다.
    pub async fn publish_event_within(
        &self,
        event: Event,
        limit: Duration,
    ) -> Option<DeliveryReport> {
        tokio::time::timeout(limit, self.publish_event_and_wait(event))
            .await
            .ok()
    }

    fn schedule(&self, event: Event, wait: Option<(Waiter, Arc<AtomicUsize>)>) -> usize {
        let count = self.published.fetch_add(1, Ordering::Relaxed) + 1;

        if self.closed.load(Ordering::Acquire) {
            debug!(topic = %event.topic, "Event bus is shut down, dropping event");
            return 0;
        }

        let subs = self.index.read().matching(&event.topic);
        if subs.is_empty() {
            return 0;
        }

        let debug_mode = self.config.debug_mode;
        if debug_mode {
            trace!(
                event_id = %event.id,
                topic = %event.topic,
                listeners = subs.len(),
                "Publishing event #{}", count
            );
        }

        let (waiter, waited) = match wait {
            Some((waiter, waited)) => (Some(waiter), Some(waited)),
            None => (None, None),
        };

        let event = Arc::new(event);
        let mut scheduled = 0;
        let mut batch = Vec::new();

        for sub in subs {
            match sub.mode {
                DeliveryMode::BlockingSync => batch.push(sub),
                DeliveryMode::BlockingAsync => {
                    let event = Arc::clone(&event);
                    let waiter = waiter.clone();
                    let spawned = self.pool.spawn(async move {
                        let outcome = call_async(&sub, event, debug_mode).await;
                        if let Some(w) = &waiter {
                            w.tally.record(outcome);
                        }
                    });
                    if spawned {
                        scheduled += 1;
                        if let Some(waited) = &waited {
                            waited.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
                DeliveryMode::FireAndForget => {
                    if self.spawn_fire_and_forget(sub, Arc::clone(&event), debug_mode) {
                        scheduled += 1;
                    }
                }
            }
        }

        if !batch.is_empty() {
            let size = batch.len();
            if self.spawn_blocking_batch(batch, event, waiter, debug_mode) {
                scheduled += size;
                if let Some(waited) = &waited {
                    waited.fetch_add(size, Ordering::Relaxed);
                }
            }
        }

        scheduled
    }

    /// 한 발행의 동기 리스너들을 등록 순서대로 하나의 워커 작업에서 실행
    fn spawn_blocking_batch(
        &self,
        batch: Vec<Arc<Subscription>>,
        event: Arc<Event>,
        waiter: Option<Waiter>,
        debug_mode: bool,
    ) -> bool {
        let pool = Arc::clone(&self.pool);
        let token = self.pool.cancel_token().clone();

        self.pool.spawn(async move {
            let topic = event.topic.clone();
            let result = pool
                .run(move || {
                    batch
                        .iter()
                        .map(|sub| {
                            if token.is_cancelled() {
                                Outcome::Skipped
                            } else {
                                call_blocking(sub, &event, debug_mode)
                            }
                        })
                        .collect::<Vec<_>>()
                })
                .await;

            match result {
                Ok(outcomes) => {
                    if let Some(w) = &waiter {
                        for outcome in outcomes {
                            w.tally.record(outcome);
                        }
                    }
                }
                Err(e) => warn!(topic = %topic, error = %e, "Blocking delivery aborted"),
            }
        })
    }

    fn spawn_fire_and_forget(
        &self,
        sub: Arc<Subscription>,
        event: Arc<Event>,
        debug_mode: bool,
    ) -> bool {
        if sub.listener.is_blocking() {
            let pool = Arc::clone(&self.pool);
            self.pool.spawn(async move {
                if let Err(e) = pool
                    .run(move || call_blocking(&sub, &event, debug_mode))
                    .await
                {
                    warn!(error = %e, "Fire-and-forget delivery aborted");
                }
            })
        } else {
            self.pool.spawn(async move {
                call_async(&sub, event, debug_mode).await;
            })
        }
    }

    // ========================================================================
    // 종료 / 통계
    // ========================================================================

    /// 버스 종료
    ///
    /// 새 발행을 막고 `grace` 만큼 진행 중인 리스너를 기다린 뒤 나머지를 취소합니다.
    /// 남은 구독은 모두 해제됩니다. 시간 안에 모두 끝났으면 `true`.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return true;
        }

        let drained = self.pool.shutdown(grace).await;
        let released = self.index.write().clear();

        debug!(drained, released, "Event bus shut down");
        drained
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// 활성 구독 수
    pub fn subscription_count(&self) -> usize {
        self.index.read().by_id.len()
    }

    /// 구독자가 있는 토픽 수 (prefix 제외)
    pub fn topic_count(&self) -> usize {
        self.index.read().exact.len()
    }

    /// 지금까지 발행된 이벤트 수
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EventBusConfig::default())
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::listener::{async_fn, blocking_fn};
    use serde_json::json;
    use std::sync::OnceLock;
    use std::time::Instant;

    fn recorder(
        name: &'static str,
        log: &Arc<parking_lot::Mutex<Vec<&'static str>>>,
    ) -> Listener {
        let log = Arc::clone(log);
        blocking_fn(name, move |_| {
            log.lock().push(name);
            Ok(())
        })
    }

    async fn wait_for(counter: &AtomicUsize, expected: usize) {
        for _ in 0..200 {
            if counter.load(Ordering::SeqCst) >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        assert_eq!(bus.publish("nobody.listens", json!({})), 0);
        assert_eq!(bus.published_count(), 1);

        let report = bus.publish_and_wait("nobody.listens", Value::Null).await;
        assert_eq!(report, DeliveryReport::default());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_sync_listeners_in_registration_order() {
        let bus = EventBus::default();
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));

        for name in ["L1", "L2", "L3"] {
            bus.subscribe("asset.exported", recorder(name, &log), DeliveryMode::BlockingSync)
                .unwrap();
        }

        let report = bus.publish_and_wait("asset.exported", json!({})).await;
        assert_eq!(report.scheduled, 3);
        assert_eq!(report.completed, 3);
        assert_eq!(*log.lock(), vec!["L1", "L2", "L3"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unsubscribe_during_publish() {
        let bus = Arc::new(EventBus::default());
        let second_calls = Arc::new(AtomicUsize::new(0));
        let second_id: Arc<OnceLock<SubscriptionId>> = Arc::new(OnceLock::new());

        {
            let bus_ref = Arc::clone(&bus);
            let second_id = Arc::clone(&second_id);
            bus.subscribe(
                "job.done",
                blocking_fn("first", move |_| {
                    if let Some(id) = second_id.get() {
                        bus_ref.unsubscribe(*id);
                    }
                    Ok(())
                }),
                DeliveryMode::BlockingSync,
            )
            .unwrap();
        }

        let calls = Arc::clone(&second_calls);
        let id = bus
            .subscribe(
                "job.done",
                blocking_fn("second", move |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
                DeliveryMode::BlockingSync,
            )
            .unwrap();
        second_id.set(id).unwrap();

        let report = bus.publish_and_wait("job.done", Value::Null).await;
        assert_eq!(report.scheduled, 2);
        assert_eq!(report.completed, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);

        assert_eq!(bus.publish("job.done", Value::Null), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failing_fire_and_forget_is_isolated() {
        let bus = EventBus::default();
        let sibling_calls = Arc::new(AtomicUsize::new(0));

        bus.subscribe(
            "asset.exported",
            async_fn("broken", |_| async { Err(Error::Internal("always fails".into())) }),
            DeliveryMode::FireAndForget,
        )
        .unwrap();

        let calls = Arc::clone(&sibling_calls);
        bus.subscribe(
            "asset.exported",
            async_fn("sibling", move |_| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
            DeliveryMode::FireAndForget,
        )
        .unwrap();

        assert_eq!(bus.publish("asset.exported", json!({})), 2);
        wait_for(&sibling_calls, 1).await;
        assert_eq!(sibling_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panicking_listener_does_not_stop_siblings() {
        let bus = EventBus::default();
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));

        bus.subscribe(
            "t",
            blocking_fn("panics", |_| panic!("listener bug")),
            DeliveryMode::BlockingSync,
        )
        .unwrap();
        bus.subscribe("t", recorder("after", &log), DeliveryMode::BlockingSync)
            .unwrap();
        bus.subscribe(
            "t",
            async_fn("async-fails", |_| async { Err(Error::listener("async-fails", "nope")) }),
            DeliveryMode::BlockingAsync,
        )
        .unwrap();

        let report = bus.publish_and_wait("t", Value::Null).await;
        assert_eq!(report.scheduled, 3);
        assert_eq!(report.completed, 1);
        assert_eq!(report.failed, 2);
        assert_eq!(*log.lock(), vec!["after"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_slow_sync_listener_does_not_stall_publisher() {
        let bus = EventBus::default();
        bus.subscribe(
            "slow",
            blocking_fn("sleeper", |_| {
                std::thread::sleep(Duration::from_millis(300));
                Ok(())
            }),
            DeliveryMode::BlockingSync,
        )
        .unwrap();

        let started = Instant::now();
        assert_eq!(bus.publish("slow", Value::Null), 1);
        assert!(started.elapsed() < Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_mode_mismatch_rejected() {
        let bus = EventBus::default();

        let result = bus.subscribe(
            "t",
            async_fn("a", |_| async { Ok(()) }),
            DeliveryMode::BlockingSync,
        );
        assert!(matches!(result, Err(Error::InvalidSubscription(_))));

        let result = bus.subscribe("", blocking_fn("b", |_| Ok(())), DeliveryMode::BlockingSync);
        assert!(matches!(result, Err(Error::InvalidSubscription(_))));
        assert_eq!(bus.subscription_count(), 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_owner() {
        let bus = EventBus::default();
        for topic in ["a", "b", "b"] {
            bus.subscribe_owned("exporter", topic, blocking_fn("x", |_| Ok(())), DeliveryMode::BlockingSync)
                .unwrap();
        }
        bus.subscribe("b", blocking_fn("other", |_| Ok(())), DeliveryMode::BlockingSync)
            .unwrap();

        assert_eq!(bus.subscriptions_of("exporter").len(), 3);
        assert_eq!(bus.topic_count(), 2);

        assert_eq!(bus.unsubscribe_owner("exporter"), 3);
        assert_eq!(bus.subscription_count(), 1);
        assert_eq!(bus.topic_count(), 1);
        assert!(bus.subscriptions_of("exporter").is_empty());
        assert_eq!(bus.unsubscribe_owner("exporter"), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_prefix_after_exact() {
        let bus = EventBus::default();
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));

        bus.subscribe_prefix("plugin.", recorder("prefix", &log), DeliveryMode::BlockingSync)
            .unwrap();
        bus.subscribe("plugin.failed", recorder("exact", &log), DeliveryMode::BlockingSync)
            .unwrap();

        let report = bus.publish_and_wait("plugin.failed", Value::Null).await;
        assert_eq!(report.completed, 2);
        assert_eq!(*log.lock(), vec!["exact", "prefix"]);

        assert_eq!(bus.publish("system.ready", Value::Null), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_no_replay_for_late_subscribers() {
        let bus = EventBus::default();
        bus.publish("late", Value::Null);

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        bus.subscribe(
            "late",
            blocking_fn("late", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
            DeliveryMode::BlockingSync,
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_cancels_in_flight_async() {
        let bus = EventBus::default();
        let finished = Arc::new(AtomicUsize::new(0));

        let flag = Arc::clone(&finished);
        bus.subscribe(
            "long",
            async_fn("sleeper", move |_| {
                let flag = Arc::clone(&flag);
                async move {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    flag.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
            DeliveryMode::BlockingAsync,
        )
        .unwrap();

        assert_eq!(bus.publish("long", Value::Null), 1);
        assert!(!bus.shutdown(Duration::from_millis(20)).await);

        assert_eq!(finished.load(Ordering::SeqCst), 0);
        assert!(bus.is_shut_down());
        assert_eq!(bus.subscription_count(), 0);
        assert_eq!(bus.publish("long", Value::Null), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_bounded_wait_gives_up_on_hung_listener() {
        let bus = EventBus::default();
        bus.subscribe(
            "plugin.loaded",
            async_fn("stuck", |_| async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }),
            DeliveryMode::BlockingAsync,
        )
        .unwrap();

        let started = Instant::now();
        let report = bus
            .publish_event_within(Event::new("plugin.loaded", Value::Null), Duration::from_millis(50))
            .await;
        assert!(report.is_none());
        assert!(started.elapsed() < Duration::from_secs(2));

        let report = bus
            .publish_event_within(Event::new("plugin.other", Value::Null), Duration::from_millis(50))
            .await;
        assert_eq!(report, Some(DeliveryReport::default()));

        assert!(!bus.shutdown(Duration::from_millis(20)).await);
    }
}
