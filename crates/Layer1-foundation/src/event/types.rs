//! Event Types - 버스 위를 오가는 이벤트 정의

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Event ID
// ============================================================================

/// 이벤트 고유 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub uuid::Uuid);

impl EventId {
    /// 새 이벤트 ID 생성
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Event
// ============================================================================

/// 버스 이벤트
///
/// 리스너에게는 `Arc<Event>` 로 공유되므로 발행 후에는 변경되지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// 이벤트 ID
    pub id: EventId,

    /// 토픽 (예: "plugin.initialized")
    pub topic: String,

    /// 페이로드
    #[serde(default)]
    pub payload: Value,

    /// 발행자 (플러그인 이름 등)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// 발행 시각
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// 새 이벤트 생성
    pub fn new(topic: impl Into<String>, payload: Value) -> Self {
        Self {
            id: EventId::new(),
            topic: topic.into(),
            payload,
            source: None,
            timestamp: Utc::now(),
        }
    }

    /// 발행자 설정
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// 페이로드 필드 조회
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// 페이로드 문자열 필드 조회
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}

// ============================================================================
// 시스템 토픽
// ============================================================================

/// 라이프사이클/시스템 토픽 상수
pub mod topics {
    /// 플러그인 인스턴스 생성 (Loaded)
    pub const PLUGIN_LOADED: &str = "plugin.loaded";
    /// 플러그인 초기화 완료 (Running)
    pub const PLUGIN_INITIALIZED: &str = "plugin.initialized";
    /// 플러그인 실패 (Failed)
    pub const PLUGIN_FAILED: &str = "plugin.failed";
    /// 플러그인 종료 (Stopped)
    pub const PLUGIN_STOPPED: &str = "plugin.stopped";
    /// 부트 완료
    pub const SYSTEM_READY: &str = "system.ready";
    /// 종료 직전
    pub const SYSTEM_SHUTDOWN: &str = "system.shutdown";

    /// 라이프사이클 토픽 prefix
    pub const PLUGIN_PREFIX: &str = "plugin.";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_fields() {
        let event = Event::new("asset.exported", json!({ "path": "out.glb", "size": 42 }))
            .with_source("exporter");

        assert_eq!(event.topic, "asset.exported");
        assert_eq!(event.source.as_deref(), Some("exporter"));
        assert_eq!(event.field_str("path"), Some("out.glb"));
        assert_eq!(event.field("size"), Some(&json!(42)));
        assert!(event.field("missing").is_none());
    }

    #[test]
    fn test_event_ids_unique() {
        let a = Event::new("t", Value::Null);
        let b = Event::new("t", Value::Null);
        assert_ne!(a.id, b.id);
    }
}
