//! # reactor-foundation
//!
//! Foundation layer for Reactor:
//! - Error: 에러 분류 (구조적 / 런타임)
//! - Config: 통합 설정 (ReactorConfig, 플러그인별 오버라이드, ConfigView)
//! - Manifest: 플러그인 매니페스트 모델과 검증, 매니페스트 소스
//! - Runtime: 제한된 워커 풀
//! - Event: 토픽 기반 이벤트 버스
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  ManifestSource ──► PluginManifest (validate)           │
//! │                          │                              │
//! │  ReactorConfig ──► apply_overrides / ConfigView         │
//! │                                                         │
//! │  EventBus ──► WorkerPool (blocking listeners)           │
//! │      └──────► TaskTracker (async / fire-and-forget)     │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod manifest;
pub mod runtime;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, ResolutionError, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{ConfigView, FailedDependencyPolicy, LifecycleConfig, PluginOverride, ReactorConfig};

// ============================================================================
// Manifest (매니페스트)
// ============================================================================
pub use manifest::{
    is_kebab_case, validate_manifest_set, LoadPhase, ManifestSource, PluginKind, PluginManifest,
    PluginVersion, StaticManifestSource,
};

// ============================================================================
// Runtime
// ============================================================================
pub use runtime::WorkerPool;

// ============================================================================
// Event (이벤트 시스템)
// ============================================================================
pub use event::{
    async_fn, blocking_fn, topics, BlockingListener, DeliveryMode, DeliveryReport, Event,
    EventBus, EventBusConfig, EventId, EventListener, Listener, SubscriptionId,
};
