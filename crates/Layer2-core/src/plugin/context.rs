//! PluginContext - 플러그인에 전달되는 실행 컨텍스트
//!
//! 부트 시 한 번 만들어져 `initialize`/`shutdown` 에 넘겨집니다.
//! 전역 상태 대신 이 값을 통해 설정, 이벤트 버스, 도구 레지스트리, 워커 풀에 접근합니다.

use crate::tool::{ToolDefinition, ToolRegistry};
use parking_lot::Mutex;
use reactor_foundation::{
    ConfigView, DeliveryMode, DeliveryReport, Error, Event, EventBus, Listener, PluginManifest,
    Result, SubscriptionId,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// 플러그인 컨텍스트
pub struct PluginContext {
    manifest: Arc<PluginManifest>,
    config: ConfigView,
    events: Arc<EventBus>,
    tools: Arc<ToolRegistry>,

    /// initialize 동안 모아두는 도구 (성공 시 한 번에 커밋)
    staged: Mutex<Option<Vec<ToolDefinition>>>,
}

impl PluginContext {
    /// 새 컨텍스트 생성
    pub fn new(
        manifest: Arc<PluginManifest>,
        config: ConfigView,
        events: Arc<EventBus>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            manifest,
            config,
            events,
            tools,
            staged: Mutex::new(None),
        }
    }

    /// 플러그인 이름
    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    /// 읽기 전용 설정
    pub fn config(&self) -> &ConfigView {
        &self.config
    }

    // ========================================================================
    // Tool 등록
    // ========================================================================

    /// 도구 등록
    ///
    /// initialize 중에는 모아두었다가 초기화가 성공하면 한 번에 등록됩니다.
    /// 실행 중(Running)에 호출하면 즉시 레지스트리에 등록됩니다.
    pub fn register_tool(&self, definition: ToolDefinition) -> Result<()> {
        let definition = definition.with_owner(self.name());

        let mut staged = self.staged.lock();
        if let Some(pending) = staged.as_mut() {
            if pending.iter().any(|d| d.name() == definition.name()) {
                return Err(Error::DuplicateToolName {
                    name: definition.name().to_string(),
                    owner: self.name().to_string(),
                    existing_owner: self.name().to_string(),
                });
            }
            debug!(plugin = %self.name(), tool = definition.name(), "Staged tool");
            pending.push(definition);
            return Ok(());
        }
        drop(staged);

        self.tools.register(definition)
    }

    pub(crate) fn begin_staging(&self) {
        *self.staged.lock() = Some(Vec::new());
    }

    pub(crate) fn take_staged(&self) -> Vec<ToolDefinition> {
        self.staged.lock().take().unwrap_or_default()
    }

    /// 도구 레지스트리 (조회/호출용)
    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// 다른 플러그인의 도구 호출
    pub async fn call_tool(&self, name: &str, args: Value) -> Result<Value> {
        self.tools.call(name, args).await
    }

    // ========================================================================
    // 이벤트
    // ========================================================================

    /// 토픽 구독 (플러그인 종료 시 자동 해제)
    pub fn subscribe(
        &self,
        topic: &str,
        listener: Listener,
        mode: DeliveryMode,
    ) -> Result<SubscriptionId> {
        self.events.subscribe_owned(self.name(), topic, listener, mode)
    }

    /// prefix 구독 (플러그인 종료 시 자동 해제)
    pub fn subscribe_prefix(
        &self,
        prefix: &str,
        listener: Listener,
        mode: DeliveryMode,
    ) -> Result<SubscriptionId> {
        self.events
            .subscribe_prefix_owned(self.name(), prefix, listener, mode)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// 이벤트 발행 (source = 플러그인 이름)
    pub fn publish(&self, topic: &str, payload: Value) -> usize {
        self.events
            .publish_event(Event::new(topic, payload).with_source(self.name()))
    }

    /// 이벤트 발행 후 리스너 완료까지 대기
    pub async fn publish_and_wait(&self, topic: &str, payload: Value) -> DeliveryReport {
        self.events
            .publish_event_and_wait(Event::new(topic, payload).with_source(self.name()))
            .await
    }

    /// 이벤트 버스
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    // ========================================================================
    // 블로킹 작업
    // ========================================================================

    /// 공유 워커 풀에서 블로킹 작업 실행
    pub async fn run_blocking<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.events.pool().run(f).await
    }
}
