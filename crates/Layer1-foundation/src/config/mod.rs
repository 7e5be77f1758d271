//! Config - 통합 설정 관리
//!
//! - `reactor.rs` - ReactorConfig, LifecycleConfig, PluginOverride
//! - `view.rs` - 플러그인용 읽기 전용 ConfigView

mod reactor;
mod view;

pub use reactor::{FailedDependencyPolicy, LifecycleConfig, PluginOverride, ReactorConfig};
pub use view::ConfigView;
