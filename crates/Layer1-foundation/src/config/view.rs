//! ConfigView - 플러그인에게 전달되는 읽기 전용 설정

use super::reactor::ReactorConfig;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;

/// 읽기 전용 설정 뷰
///
/// 전역 설정과 해당 플러그인의 병합된 설정 테이블을 함께 담습니다.
#[derive(Debug, Clone, Default)]
pub struct ConfigView {
    global: Arc<ReactorConfig>,
    plugin: Arc<Map<String, Value>>,
}

impl ConfigView {
    pub fn new(global: Arc<ReactorConfig>, plugin: Map<String, Value>) -> Self {
        Self {
            global,
            plugin: Arc::new(plugin),
        }
    }

    /// 전역 설정
    pub fn global(&self) -> &ReactorConfig {
        &self.global
    }

    /// 플러그인 설정 원본 값
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.plugin.get(key)
    }

    /// 타입 변환된 플러그인 설정 값
    ///
    /// 키가 없거나 타입이 맞지 않으면 `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.plugin
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// 기본값과 함께 조회
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// 플러그인 설정 전체
    pub fn all(&self) -> &Map<String, Value> {
        &self.plugin
    }
}
