//! Plugin Events - 라이프사이클 이벤트 생성
//!
//! 토픽 상수는 `reactor_foundation::topics` 에 있습니다.

use reactor_foundation::{topics, Event, PluginManifest};
use serde_json::json;

/// 라이프사이클 이벤트 발행자
pub const LIFECYCLE_SOURCE: &str = "reactor.lifecycle";

/// `plugin.loaded`
pub fn loaded(manifest: &PluginManifest) -> Event {
    Event::new(
        topics::PLUGIN_LOADED,
        json!({
            "plugin": manifest.name,
            "kind": manifest.kind,
            "version": manifest.version,
            "phase": manifest.phase,
        }),
    )
    .with_source(LIFECYCLE_SOURCE)
}

/// `plugin.initialized`
pub fn initialized(manifest: &PluginManifest, tools: usize) -> Event {
    Event::new(
        topics::PLUGIN_INITIALIZED,
        json!({
            "plugin": manifest.name,
            "kind": manifest.kind,
            "tools": tools,
        }),
    )
    .with_source(LIFECYCLE_SOURCE)
}

/// `plugin.failed`
pub fn failed(plugin: &str, reason: &str) -> Event {
    Event::new(
        topics::PLUGIN_FAILED,
        json!({
            "plugin": plugin,
            "reason": reason,
        }),
    )
    .with_source(LIFECYCLE_SOURCE)
}

/// `plugin.stopped`
pub fn stopped(plugin: &str) -> Event {
    Event::new(topics::PLUGIN_STOPPED, json!({ "plugin": plugin })).with_source(LIFECYCLE_SOURCE)
}
