//! Reactor - 부트/종료 순서를 고정하는 파사드
//!
//! ```text
//! start:  manifests → overrides → validate → resolve → load → system.ready
//! stop:   system.shutdown → shutdown_all → bus.shutdown → tools.clear
//! ```
//!
//! 알고리즘은 없습니다. `LifecycleRegistry` 와 `ToolRegistry` 만으로
//! 다른 드라이버(테스트 하네스 등)를 구성할 수 있습니다.

use crate::plugin::{resolve, LifecycleRegistry, PluginCatalog, PluginFailure, ShutdownReport};
use crate::tool::ToolRegistry;
use chrono::{DateTime, Utc};
use reactor_foundation::{
    topics, validate_manifest_set, Error, Event, EventBus, ManifestSource, PluginManifest,
    ReactorConfig, Result, StaticManifestSource, WorkerPool,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// 파사드가 발행하는 이벤트의 source
pub const SYSTEM_SOURCE: &str = "reactor.system";

// ============================================================================
// BootReport
// ============================================================================

/// 부트 결과
///
/// 일부 플러그인이 실패해도 부트는 성공하며, 실패 내역은 여기에 남습니다.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BootReport {
    /// 초기화를 시도한 순서
    pub order: Vec<String>,

    /// 검증/해석/로드 단계에서 거부된 플러그인
    pub rejected: Vec<PluginFailure>,

    /// Running 에 도달한 플러그인
    pub running: Vec<String>,

    /// 초기화에 실패한 플러그인
    pub failed: Vec<PluginFailure>,

    /// 부트에 걸린 시간
    pub startup: Duration,

    /// 부트 완료 시각
    pub booted_at: DateTime<Utc>,
}

impl BootReport {
    /// 거부/실패가 하나도 없는지
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.failed.is_empty()
    }
}

// ============================================================================
// Reactor (builder)
// ============================================================================

/// 부트 진입점
pub struct Reactor;

impl Reactor {
    pub fn builder() -> ReactorBuilder {
        ReactorBuilder::default()
    }
}

/// Reactor 빌더
#[derive(Default)]
pub struct ReactorBuilder {
    config: ReactorConfig,
    catalog: PluginCatalog,
    source: Option<Box<dyn ManifestSource>>,
}

impl ReactorBuilder {
    /// 설정
    pub fn config(mut self, config: ReactorConfig) -> Self {
        self.config = config;
        self
    }

    /// 플러그인 팩토리 카탈로그
    pub fn catalog(mut self, catalog: PluginCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// 매니페스트 공급자
    pub fn source(mut self, source: impl ManifestSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// 메모리 매니페스트 (테스트용 단축)
    pub fn manifests(self, manifests: Vec<PluginManifest>) -> Self {
        self.source(StaticManifestSource::new(manifests))
    }

    /// 부트
    ///
    /// 설정이 잘못되었거나 매니페스트를 읽을 수 없으면 `Error::Boot`.
    /// 개별 플러그인 문제는 `BootReport` 에 기록됩니다.
    pub async fn start(self) -> Result<RunningSystem> {
        let started = Instant::now();

        self.config
            .validate()
            .map_err(|e| Error::Boot(format!("invalid configuration: {}", e)))?;

        let source = self
            .source
            .ok_or_else(|| Error::Boot("no manifest source configured".into()))?;
        let discovered = source
            .manifests()
            .map_err(|e| Error::Boot(format!("failed to read manifests: {}", e)))?;

        info!(discovered = discovered.len(), "Booting reactor");

        let config = Arc::new(self.config);
        let mut report = BootReport::default();

        // 1. 오버라이드 + 검증
        let manifests = config.apply_overrides(discovered);
        let (manifests, invalid) = validate_manifest_set(manifests);
        for err in &invalid {
            error!(error = %err, "Manifest rejected");
            report.rejected.push(PluginFailure::from_error(err));
        }

        // 2. 해석
        let resolution = resolve(&manifests);
        for err in resolution.rejected {
            error!(plugin = %err.plugin(), error = %err, "Plugin rejected by resolver");
            report
                .rejected
                .push(PluginFailure::from_error(&Error::DependencyResolution(err)));
        }

        // 3. 공유 서비스 (워커 풀 하나를 버스와 도구 레지스트리가 공유)
        let pool = Arc::new(WorkerPool::new(config.events.worker_threads));
        let events = Arc::new(EventBus::with_pool(config.events.clone(), Arc::clone(&pool)));
        let tools = Arc::new(ToolRegistry::with_pool(pool));
        let lifecycle = LifecycleRegistry::new(
            Arc::clone(&config),
            self.catalog,
            Arc::clone(&events),
            Arc::clone(&tools),
        );

        // 4. 로드
        let loaded = lifecycle.load(resolution.order).await;
        report.order = loaded.attempted;
        report.running = loaded.running;
        report.failed = loaded.failed;
        report.rejected.extend(loaded.rejected);
        report.startup = started.elapsed();
        report.booted_at = Utc::now();

        announce(
            &events,
            &config,
            Event::new(
                topics::SYSTEM_READY,
                json!({
                    "running": report.running,
                    "failed": report.failed.len(),
                    "rejected": report.rejected.len(),
                }),
            ),
        )
        .await;

        info!(
            running = report.running.len(),
            failed = report.failed.len(),
            rejected = report.rejected.len(),
            tools = tools.len(),
            startup_ms = report.startup.as_millis() as u64,
            "Reactor ready"
        );

        Ok(RunningSystem {
            config,
            events,
            tools,
            lifecycle,
            report,
        })
    }
}

// ============================================================================
// RunningSystem
// ============================================================================

/// 부트가 끝난 시스템
pub struct RunningSystem {
    config: Arc<ReactorConfig>,
    events: Arc<EventBus>,
    tools: Arc<ToolRegistry>,
    lifecycle: LifecycleRegistry,
    report: BootReport,
}

impl RunningSystem {
    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn lifecycle(&self) -> &LifecycleRegistry {
        &self.lifecycle
    }

    /// 부트 결과
    pub fn report(&self) -> &BootReport {
        &self.report
    }

    pub fn config(&self) -> &ReactorConfig {
        &self.config
    }

    /// 도구 호출
    pub async fn call_tool(&self, name: &str, args: Value) -> Result<Value> {
        self.tools.call(name, args).await
    }

    /// 종료 (부트의 역순)
    pub async fn stop(self) -> ShutdownReport {
        let started = Instant::now();

        announce(
            &self.events,
            &self.config,
            Event::new(
                topics::SYSTEM_SHUTDOWN,
                json!({ "plugins": self.lifecycle.len() }),
            ),
        )
        .await;

        let report = self.lifecycle.shutdown_all().await;

        let grace = self.config.events.shutdown_grace();
        if !self.events.shutdown(grace).await {
            warn!(grace_ms = grace.as_millis() as u64, "Listeners cancelled after grace period");
        }
        let leftover = self.tools.clear();
        if leftover > 0 {
            warn!(tools = leftover, "Tools left registered at shutdown");
        }

        info!(
            stopped = report.stopped.len(),
            failed = report.failed.len(),
            shutdown_ms = started.elapsed().as_millis() as u64,
            "Reactor stopped"
        );
        report
    }
}

/// 시스템 이벤트 발행. 리스너는 `lifecycle.event_timeout` 까지만 기다림
async fn announce(events: &EventBus, config: &ReactorConfig, event: Event) {
    let topic = event.topic.clone();
    let limit = config.lifecycle.event_timeout();
    let event = event.with_source(SYSTEM_SOURCE);
    if events.publish_event_within(event, limit).await.is_none() {
        warn!(
            topic = %topic,
            timeout_ms = limit.as_millis() as u64,
            "System event listeners did not finish in time"
        );
    }
}
