//! # Plugin System
//!
//! 매니페스트 기반 플러그인 라이프사이클
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  resolve(manifests)                                          │
//! │  └── 단계(phase) → 의존성 → 우선순위 → 이름 순서로 정렬        │
//! │      누락/순환/단계 위반은 해당 플러그인과 의존자만 거부        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  LifecycleRegistry                                           │
//! │  ├── PluginCatalog - 이름별 팩토리                            │
//! │  ├── PluginInstance - 상태 기계 + 컨텍스트                    │
//! │  └── PluginContext                                           │
//! │       - ConfigView (읽기 전용)                                │
//! │       - EventBus (구독은 플러그인 소유)                        │
//! │       - ToolRegistry (initialize 성공 시 커밋)                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 예시
//!
//! ```ignore
//! struct Exporter;
//!
//! #[async_trait]
//! impl Plugin for Exporter {
//!     async fn initialize(&self, ctx: &PluginContext) -> Result<()> {
//!         ctx.register_tool(
//!             ToolDefinition::builder("export")
//!                 .param(ToolParameter::new("path", ParameterType::String))
//!                 .sync_handler(|args| Ok(json!({ "exported": args["path"] })))
//!                 .build()?,
//!         )
//!     }
//!
//!     fn as_any(&self) -> &dyn Any { self }
//! }
//!
//! let catalog = PluginCatalog::new().with("exporter", |_| Ok(Arc::new(Exporter) as Arc<dyn Plugin>));
//! ```

mod catalog;
mod context;
pub mod events;
mod instance;
mod lifecycle;
mod resolver;
mod traits;

pub use catalog::{PluginCatalog, PluginFactory};
pub use context::PluginContext;
pub use instance::{PluginInstance, PluginState};
pub use lifecycle::{LifecycleRegistry, LoadReport, PluginFailure, ShutdownReport};
pub use resolver::{resolve, Resolution};
pub use traits::{DeclarativePlugin, Plugin};
