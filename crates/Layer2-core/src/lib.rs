//! reactor-core: Plugin runtime for Reactor
//!
//! Layer2 - 의존성 해석, 플러그인 라이프사이클, 도구, 부트 오케스트레이션
//!
//! # 주요 모듈
//!
//! - `plugin`: 매니페스트 해석(`resolve`), `LifecycleRegistry`, `PluginContext`
//! - `tool`: `ToolDefinition` 빌더와 `ToolRegistry`
//! - `system`: `Reactor` 부트/종료 파사드
//!
//! # 사용 예시
//!
//! ```ignore
//! use reactor_core::{PluginCatalog, Reactor};
//! use reactor_foundation::StaticManifestSource;
//!
//! let system = Reactor::builder()
//!     .catalog(PluginCatalog::new().with("exporter", exporter_factory))
//!     .source(StaticManifestSource::from_toml_str(&manifests)?)
//!     .start()
//!     .await?;
//!
//! let result = system.call_tool("export", json!({ "path": "dist" })).await?;
//! let report = system.stop().await;
//! ```

pub mod plugin;
pub mod system;
pub mod tool;

// Re-exports: Plugin
pub use plugin::{
    resolve, DeclarativePlugin, LifecycleRegistry, LoadReport, Plugin, PluginCatalog,
    PluginContext, PluginFactory, PluginFailure, PluginInstance, PluginState, Resolution,
    ShutdownReport,
};

// Re-exports: Tool
pub use tool::{
    AsyncToolFn, InvocationMode, ParameterType, SyncToolFn, ToolDefinition, ToolDefinitionBuilder,
    ToolHandler, ToolParameter, ToolRegistry,
};

// Re-exports: System
pub use system::{BootReport, Reactor, ReactorBuilder, RunningSystem, SYSTEM_SOURCE};
