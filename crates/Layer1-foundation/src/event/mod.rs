//! Event System - 토픽 기반 발행/구독
//!
//! ## 아키텍처
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         EventBus                             │
//! │   publish(topic) ──► topic index ──► snapshot (생성 순서)     │
//! │                                          │                   │
//! │        ┌─────────────────────┬───────────┴─────────┐         │
//! │        ▼                     ▼                     ▼         │
//! │  blocking-sync         blocking-async       fire-and-forget  │
//! │  (WorkerPool, 순서대로)  (tracked task)       (tracked task)   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 사용법
//!
//! ```ignore
//! use reactor_foundation::event::{async_fn, DeliveryMode, EventBus};
//!
//! let bus = EventBus::default();
//! bus.subscribe(
//!     "plugin.failed",
//!     async_fn("alert", |event| async move {
//!         tracing::warn!(plugin = ?event.field_str("plugin"), "plugin failed");
//!         Ok(())
//!     }),
//!     DeliveryMode::FireAndForget,
//! )?;
//! ```

pub mod bus;
pub mod listener;
pub mod types;

pub use bus::{DeliveryReport, EventBus, EventBusConfig};
pub use listener::{
    async_fn, blocking_fn, BlockingListener, DeliveryMode, EventListener, Listener,
    SubscriptionId,
};
pub use types::{topics, Event, EventId};
