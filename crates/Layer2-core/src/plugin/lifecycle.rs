//! Lifecycle Registry - 플러그인 초기화/종료 순서 관리
//!
//! - `load(order)`: 해석된 순서대로 Loaded → Initializing → Running
//! - `shutdown_all()`: 실제로 시도된 순서의 역순으로 종료
//!
//! 플러그인 하나의 실패는 격리됩니다. Failed 가 되면 그 플러그인의
//! 구독과 도구는 즉시 해제되고 다음 플러그인으로 넘어갑니다.

use super::catalog::{PluginCatalog, PluginSource};
use super::context::PluginContext;
use super::events as lifecycle_events;
use super::instance::{PluginInstance, PluginState};
use super::traits::Plugin;
use crate::tool::ToolRegistry;
use futures::FutureExt;
use parking_lot::RwLock;
use reactor_foundation::{
    ConfigView, Error, Event, EventBus, FailedDependencyPolicy, PluginKind, PluginManifest,
    ReactorConfig, Result,
};
use serde::Serialize;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

// ============================================================================
// Reports
// ============================================================================

/// 실패/거부된 플러그인과 사유
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginFailure {
    pub plugin: String,
    pub reason: String,
}

impl PluginFailure {
    pub fn new(plugin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            reason: reason.into(),
        }
    }

    /// 에러에서 플러그인 이름을 뽑아 생성
    pub fn from_error(err: &Error) -> Self {
        let plugin = match err {
            Error::ManifestValidation { plugin, .. }
            | Error::PluginLoad { plugin, .. }
            | Error::PluginInitialization { plugin, .. }
            | Error::PluginShutdown { plugin, .. }
            | Error::InvalidTransition { plugin, .. } => plugin.clone(),
            Error::DuplicateManifest(name) | Error::PluginNotFound(name) => name.clone(),
            Error::DependencyResolution(e) => e.plugin().to_string(),
            Error::DuplicateToolName { owner, .. } => owner.clone(),
            _ => String::from("-"),
        };
        Self::new(plugin, err.to_string())
    }
}

/// `load` 결과
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    /// 초기화를 시도한 순서
    pub attempted: Vec<String>,

    /// Running 에 도달한 플러그인
    pub running: Vec<String>,

    /// Failed 가 된 플러그인
    pub failed: Vec<PluginFailure>,

    /// 인스턴스를 만들 수 없어 거부된 플러그인 (팩토리 없음, 중복)
    pub rejected: Vec<PluginFailure>,
}

/// `shutdown_all` 결과
#[derive(Debug, Clone, Default, Serialize)]
pub struct ShutdownReport {
    /// 처리 순서 (시도된 순서의 역순, 플러그인마다 한 번)
    pub order: Vec<String>,

    /// 정상 종료된 플러그인
    pub stopped: Vec<String>,

    /// 종료 중 실패한 플러그인
    pub failed: Vec<PluginFailure>,

    /// 걸린 시간
    pub elapsed: Duration,
}

// ============================================================================
// LifecycleRegistry
// ============================================================================

/// 라이프사이클 레지스트리
///
/// 플러그인 인스턴스와 상태를 독점적으로 소유합니다.
/// 도구 레지스트리와 이벤트 버스는 공유 서비스로 참조만 합니다.
pub struct LifecycleRegistry {
    config: Arc<ReactorConfig>,
    catalog: PluginCatalog,
    events: Arc<EventBus>,
    tools: Arc<ToolRegistry>,
    instances: RwLock<HashMap<String, Arc<PluginInstance>>>,
    order: RwLock<Vec<String>>,
}

impl LifecycleRegistry {
    /// 새 레지스트리 생성
    pub fn new(
        config: Arc<ReactorConfig>,
        catalog: PluginCatalog,
        events: Arc<EventBus>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            config,
            catalog,
            events,
            tools,
            instances: RwLock::new(HashMap::new()),
            order: RwLock::new(Vec::new()),
        }
    }

    // ========================================================================
    // 로드
    // ========================================================================

    /// 순서대로 플러그인 초기화
    ///
    /// 실패한 플러그인이 있어도 나머지는 계속 진행합니다.
    pub async fn load(&self, order: Vec<PluginManifest>) -> LoadReport {
        let mut report = LoadReport::default();

        for manifest in order {
            let name = manifest.name.clone();

            if self.instances.read().contains_key(&name) {
                let err = Error::DuplicateManifest(name.clone());
                error!(plugin = %name, "Plugin is already loaded");
                report.rejected.push(PluginFailure::from_error(&err));
                continue;
            }

            let Some(source) = self.catalog.source_for(&manifest) else {
                let err = Error::PluginLoad {
                    plugin: name.clone(),
                    reason: "no factory registered".into(),
                };
                error!(plugin = %name, kind = %manifest.kind, "No factory registered for plugin");
                report.rejected.push(PluginFailure::from_error(&err));
                continue;
            };

            let instance = self.instantiate(manifest);
            self.instances
                .write()
                .insert(name.clone(), Arc::clone(&instance));
            self.order.write().push(name.clone());
            report.attempted.push(name.clone());

            match self.start(&instance, source).await {
                Ok(()) => report.running.push(name),
                Err(e) => report.failed.push(PluginFailure::new(name, e.to_string())),
            }
        }

        info!(
            running = report.running.len(),
            failed = report.failed.len(),
            rejected = report.rejected.len(),
            "Plugin load finished"
        );
        report
    }

    fn instantiate(&self, manifest: PluginManifest) -> Arc<PluginInstance> {
        let view = ConfigView::new(Arc::clone(&self.config), self.config.plugin_config(&manifest));
        let manifest = Arc::new(manifest);
        let context = Arc::new(PluginContext::new(
            Arc::clone(&manifest),
            view,
            Arc::clone(&self.events),
            Arc::clone(&self.tools),
        ));
        Arc::new(PluginInstance::new(manifest, context))
    }

    async fn start(&self, instance: &Arc<PluginInstance>, source: PluginSource) -> Result<()> {
        let name = instance.name().to_string();

        instance.transition(PluginState::Loaded)?;
        self.announce(lifecycle_events::loaded(instance.manifest())).await;

        if self.config.lifecycle.failed_dependency_policy == FailedDependencyPolicy::Skip {
            // 인스턴스가 없는 의존성은 로드 단계에서 거부된 것
            let failed_dep = instance
                .manifest()
                .dependencies
                .iter()
                .find(|dep| matches!(self.state(dep.as_str()), None | Some(PluginState::Failed)))
                .cloned();
            if let Some(dep) = failed_dep {
                let err =
                    Error::plugin_init(&name, format!("dependency '{}' is unavailable", dep));
                self.fail(instance, &err).await;
                return Err(err);
            }
        }

        instance.transition(PluginState::Initializing)?;
        info!(plugin = %name, kind = %instance.manifest().kind, "Initializing plugin");

        let plugin = match std::panic::catch_unwind(AssertUnwindSafe(|| {
            source.create(instance.manifest())
        })) {
            Ok(Ok(plugin)) => plugin,
            Ok(Err(e)) => {
                let err = Error::plugin_init(&name, format!("construction failed: {}", e));
                self.fail(instance, &err).await;
                return Err(err);
            }
            Err(_) => {
                let err = Error::plugin_init(&name, "factory panicked");
                self.fail(instance, &err).await;
                return Err(err);
            }
        };
        instance.attach(Arc::clone(&plugin));

        let started = Instant::now();
        let result = self.run_initialize(&name, &plugin, instance.context()).await;
        let staged = instance.context().take_staged();

        if let Err(err) = result {
            self.fail(instance, &err).await;
            return Err(err);
        }

        let tool_count = staged.len();
        if let Err(err) = self.tools.register_all(&name, staged) {
            self.fail(instance, &err).await;
            return Err(err);
        }

        instance.transition(PluginState::Running)?;
        info!(
            plugin = %name,
            tools = tool_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Plugin running"
        );
        self.announce(lifecycle_events::initialized(instance.manifest(), tool_count))
            .await;
        Ok(())
    }

    async fn run_initialize(
        &self,
        name: &str,
        plugin: &Arc<dyn Plugin>,
        ctx: &Arc<PluginContext>,
    ) -> Result<()> {
        ctx.begin_staging();

        let budget = self.config.lifecycle.init_timeout();
        let outcome =
            tokio::time::timeout(budget, AssertUnwindSafe(plugin.initialize(ctx)).catch_unwind())
                .await;

        match outcome {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(e @ Error::PluginInitialization { .. }))) => Err(e),
            Ok(Ok(Err(e))) => Err(Error::plugin_init(name, e)),
            Ok(Err(_)) => Err(Error::plugin_init(name, "panicked during initialize")),
            Err(_) => Err(Error::plugin_init(
                name,
                format!("initialize exceeded {}ms", budget.as_millis()),
            )),
        }
    }

    /// Failed 로 전이, 등록 해제, 이벤트 발행
    async fn fail(&self, instance: &PluginInstance, err: &Error) {
        let reason = err.to_string();
        match instance.fail(reason.clone()) {
            Ok(previous) => {
                warn!(plugin = %instance.name(), from = %previous, error = %reason, "Plugin failed")
            }
            Err(e) => warn!(plugin = %instance.name(), error = %e, "Could not mark plugin failed"),
        }

        self.release(instance.name());
        self.announce(lifecycle_events::failed(instance.name(), &reason)).await;
    }

    /// 라이프사이클 이벤트 발행. 리스너는 `event_timeout` 까지만 기다림
    async fn announce(&self, event: Event) {
        let topic = event.topic.clone();
        let limit = self.config.lifecycle.event_timeout();
        if self.events.publish_event_within(event, limit).await.is_none() {
            warn!(
                topic = %topic,
                timeout_ms = limit.as_millis() as u64,
                "Lifecycle event listeners did not finish in time"
            );
        }
    }

    /// 플러그인이 등록한 구독과 도구 해제
    fn release(&self, name: &str) {
        let subscriptions = self.events.unsubscribe_owner(name);
        let tools = self.tools.unregister_all(name);
        if subscriptions + tools > 0 {
            debug!(plugin = %name, subscriptions, tools, "Released plugin registrations");
        }
    }

    /// 실행 중인 플러그인을 Failed 로 전이 (런타임 장애)
    ///
    /// 구독과 도구는 해제되지만 종료 순서에는 남습니다.
    pub async fn mark_failed(&self, name: &str, reason: &str) -> Result<()> {
        let instance = self
            .instance(name)
            .ok_or_else(|| Error::PluginNotFound(name.to_string()))?;

        let state = instance.state();
        if state != PluginState::Running {
            return Err(Error::InvalidTransition {
                plugin: name.to_string(),
                from: state.to_string(),
                to: PluginState::Failed.to_string(),
            });
        }

        let err = Error::Internal(reason.to_string());
        self.fail(&instance, &err).await;
        Ok(())
    }

    // ========================================================================
    // 종료
    // ========================================================================

    /// 시도된 순서의 역순으로 모든 플러그인 종료
    ///
    /// Running 인 플러그인만 `shutdown` 훅이 호출되고, 모든 플러그인의 등록이 해제됩니다.
    /// 한 플러그인의 종료 실패는 기록만 하고 계속 진행합니다.
    pub async fn shutdown_all(&self) -> ShutdownReport {
        let started = Instant::now();
        let order: Vec<String> = self.order.read().clone();
        let mut report = ShutdownReport::default();

        info!(plugins = order.len(), "Shutting down plugins");

        for name in order.iter().rev() {
            let Some(instance) = self.instance(name) else {
                continue;
            };

            match self.stop_instance(&instance).await {
                Ok(true) => report.stopped.push(name.clone()),
                Ok(false) => {}
                Err(e) => report.failed.push(PluginFailure::new(name.clone(), e.to_string())),
            }
            report.order.push(name.clone());
        }

        report.elapsed = started.elapsed();
        info!(
            stopped = report.stopped.len(),
            failed = report.failed.len(),
            shutdown_ms = report.elapsed.as_millis() as u64,
            "Plugins shut down"
        );
        report
    }

    /// 플러그인 하나 종료. 훅이 정상 완료되면 `Ok(true)`, Running 이 아니었으면 `Ok(false)`.
    async fn stop_instance(&self, instance: &Arc<PluginInstance>) -> Result<bool> {
        let name = instance.name().to_string();

        if instance.state() != PluginState::Running {
            self.release(&name);
            return Ok(false);
        }

        instance.transition(PluginState::ShuttingDown)?;

        let result = match instance.plugin() {
            Some(plugin) => self.run_shutdown(&name, &plugin, instance.context()).await,
            None => Ok(()),
        };

        self.release(&name);

        match result {
            Ok(()) => {
                instance.transition(PluginState::Stopped)?;
                info!(plugin = %name, "Plugin stopped");
                self.announce(lifecycle_events::stopped(&name)).await;
                Ok(true)
            }
            Err(err) => {
                let reason = err.to_string();
                if let Err(e) = instance.fail(reason.clone()) {
                    warn!(plugin = %name, error = %e, "Could not mark plugin failed");
                }
                warn!(plugin = %name, error = %reason, "Plugin shutdown failed");
                self.announce(lifecycle_events::failed(&name, &reason)).await;
                Err(err)
            }
        }
    }

    async fn run_shutdown(
        &self,
        name: &str,
        plugin: &Arc<dyn Plugin>,
        ctx: &Arc<PluginContext>,
    ) -> Result<()> {
        let budget = self.config.lifecycle.shutdown_timeout();
        let outcome =
            tokio::time::timeout(budget, AssertUnwindSafe(plugin.shutdown(ctx)).catch_unwind())
                .await;

        match outcome {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(e @ Error::PluginShutdown { .. }))) => Err(e),
            Ok(Ok(Err(e))) => Err(Error::plugin_shutdown(name, e)),
            Ok(Err(_)) => Err(Error::plugin_shutdown(name, "panicked during shutdown")),
            Err(_) => Err(Error::plugin_shutdown(
                name,
                format!("shutdown exceeded {}ms", budget.as_millis()),
            )),
        }
    }

    /// 플러그인 하나를 종료하고 레지스트리에서 제거
    pub async fn unload(&self, name: &str) -> Result<()> {
        let instance = self
            .instance(name)
            .ok_or_else(|| Error::PluginNotFound(name.to_string()))?;

        let result = self.stop_instance(&instance).await;

        self.instances.write().remove(name);
        self.order.write().retain(|n| n != name);
        info!(plugin = %name, "Plugin unloaded");

        result.map(|_| ())
    }

    // ========================================================================
    // 조회
    // ========================================================================

    /// 플러그인 상태
    pub fn state(&self, name: &str) -> Option<PluginState> {
        self.instances.read().get(name).map(|i| i.state())
    }

    /// 플러그인 인스턴스
    pub fn instance(&self, name: &str) -> Option<Arc<PluginInstance>> {
        self.instances.read().get(name).cloned()
    }

    /// 플러그인 로직 (다운캐스팅은 `as_any`)
    pub fn plugin(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.instance(name).and_then(|i| i.plugin())
    }

    /// 종류별 플러그인 이름 (시도 순서)
    pub fn plugins_by_kind(&self, kind: PluginKind) -> Vec<String> {
        let instances = self.instances.read();
        self.order
            .read()
            .iter()
            .filter(|name| instances.get(*name).is_some_and(|i| i.manifest().kind == kind))
            .cloned()
            .collect()
    }

    /// 매니페스트 (시도 순서)
    pub fn manifests(&self) -> Vec<PluginManifest> {
        let instances = self.instances.read();
        self.order
            .read()
            .iter()
            .filter_map(|name| instances.get(name).map(|i| PluginManifest::clone(i.manifest())))
            .collect()
    }

    /// 실제로 초기화를 시도한 순서
    pub fn achieved_order(&self) -> Vec<String> {
        self.order.read().clone()
    }

    /// Running 상태인 플러그인 (시도 순서)
    pub fn running(&self) -> Vec<String> {
        self.with_state(PluginState::Running)
    }

    /// Failed 상태인 플러그인과 사유
    pub fn failed(&self) -> Vec<PluginFailure> {
        let instances = self.instances.read();
        self.order
            .read()
            .iter()
            .filter_map(|name| instances.get(name))
            .filter(|i| i.state() == PluginState::Failed)
            .map(|i| PluginFailure::new(i.name(), i.failure().unwrap_or_default()))
            .collect()
    }

    fn with_state(&self, state: PluginState) -> Vec<String> {
        let instances = self.instances.read();
        self.order
            .read()
            .iter()
            .filter(|name| instances.get(*name).is_some_and(|i| i.state() == state))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.read().is_empty()
    }

    pub fn config(&self) -> &Arc<ReactorConfig> {
        &self.config
    }
}
