//! ReactorConfig - 통합 설정
//!
//! 파일을 읽는 일은 호출자 몫입니다. 여기서는 TOML 문자열 파싱과
//! 기본값, 검증, 플러그인별 오버라이드 적용만 담당합니다.

use crate::event::EventBusConfig;
use crate::manifest::{LoadPhase, PluginManifest};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::info;

// ============================================================================
// ReactorConfig
// ============================================================================

/// Reactor 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactorConfig {
    /// 라이프사이클 설정
    pub lifecycle: LifecycleConfig,

    /// 이벤트 버스 설정
    pub events: EventBusConfig,

    /// 플러그인별 오버라이드 (이름 -> 설정)
    pub plugins: HashMap<String, PluginOverride>,
}

impl ReactorConfig {
    /// TOML 문자열에서 로드
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ReactorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 설정 검증
    pub fn validate(&self) -> Result<()> {
        if self.lifecycle.init_timeout_ms == 0 {
            return Err(Error::Config("lifecycle.init_timeout_ms must be greater than 0".into()));
        }
        if self.lifecycle.shutdown_timeout_ms == 0 {
            return Err(Error::Config(
                "lifecycle.shutdown_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.lifecycle.event_timeout_ms == 0 {
            return Err(Error::Config(
                "lifecycle.event_timeout_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// 발견된 매니페스트에 오버라이드 적용
    ///
    /// `enabled = false` 인 플러그인은 제외되고, priority/phase 는 교체됩니다.
    pub fn apply_overrides(&self, manifests: Vec<PluginManifest>) -> Vec<PluginManifest> {
        manifests
            .into_iter()
            .filter_map(|mut manifest| {
                let Some(over) = self.plugins.get(&manifest.name) else {
                    return Some(manifest);
                };

                if over.enabled == Some(false) {
                    info!(plugin = %manifest.name, "Plugin disabled by config");
                    return None;
                }

                if let Some(priority) = over.priority {
                    manifest.priority = priority;
                }
                if let Some(phase) = over.phase {
                    manifest.phase = phase;
                }

                Some(manifest)
            })
            .collect()
    }

    /// 플러그인 설정 병합 (매니페스트 기본값 위에 오버라이드)
    pub fn plugin_config(&self, manifest: &PluginManifest) -> Map<String, Value> {
        let mut merged = manifest.config.clone();
        if let Some(over) = self.plugins.get(&manifest.name) {
            for (key, value) in &over.config {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged
    }
}

// ============================================================================
// LifecycleConfig
// ============================================================================

/// 실패한 의존성을 가진 플러그인 처리 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailedDependencyPolicy {
    /// 의존성이 실패해도 초기화를 시도 (낙관적)
    #[default]
    Proceed,
    /// 의존성이 실패하면 초기화 없이 Failed 로 전이
    Skip,
}

/// 라이프사이클 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// 플러그인별 initialize 시간 제한 (ms)
    pub init_timeout_ms: u64,

    /// 플러그인별 shutdown 시간 제한 (ms)
    pub shutdown_timeout_ms: u64,

    /// 라이프사이클/시스템 이벤트 리스너를 기다리는 시간 제한 (ms)
    ///
    /// 넘기면 경고만 남기고 부트/종료를 계속 진행합니다.
    pub event_timeout_ms: u64,

    /// 실패한 의존성 처리 정책
    pub failed_dependency_policy: FailedDependencyPolicy,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            init_timeout_ms: 30_000,
            shutdown_timeout_ms: 10_000,
            event_timeout_ms: 5_000,
            failed_dependency_policy: FailedDependencyPolicy::Proceed,
        }
    }
}

impl LifecycleConfig {
    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn event_timeout(&self) -> Duration {
        Duration::from_millis(self.event_timeout_ms)
    }
}

// ============================================================================
// PluginOverride
// ============================================================================

/// 플러그인별 오버라이드
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginOverride {
    /// 활성화 여부 (없으면 활성)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// 우선순위 교체
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,

    /// 로드 단계 교체
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<LoadPhase>,

    /// 플러그인 설정 (매니페스트 config 위에 병합)
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub config: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::PluginKind;

    #[test]
    fn test_defaults() {
        let config = ReactorConfig::default();
        assert_eq!(config.lifecycle.init_timeout(), Duration::from_secs(30));
        assert_eq!(config.lifecycle.event_timeout(), Duration::from_secs(5));
        assert_eq!(config.lifecycle.failed_dependency_policy, FailedDependencyPolicy::Proceed);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_str() {
        let config = ReactorConfig::from_toml_str(
            r#"
            [lifecycle]
            init_timeout_ms = 500
            failed_dependency_policy = "skip"

            [events]
            worker_threads = 2

            [plugins.feature]
            priority = 7
            phase = "post-init"
            config = { export_dir = "dist" }

            [plugins.legacy]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.lifecycle.init_timeout_ms, 500);
        assert_eq!(config.lifecycle.shutdown_timeout_ms, 10_000);
        assert_eq!(config.lifecycle.failed_dependency_policy, FailedDependencyPolicy::Skip);
        assert_eq!(config.events.worker_threads, 2);
        assert_eq!(config.plugins["feature"].priority, Some(7));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = ReactorConfig::from_toml_str("[lifecycle]\ninit_timeout_ms = 0");
        assert!(matches!(result, Err(Error::Config(_))));

        let result = ReactorConfig::from_toml_str("[lifecycle]\nevent_timeout_ms = 0");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = ReactorConfig::default();
        config.plugins.insert(
            "feature".into(),
            PluginOverride {
                priority: Some(9),
                phase: Some(LoadPhase::PostInit),
                ..Default::default()
            },
        );
        config.plugins.insert(
            "legacy".into(),
            PluginOverride {
                enabled: Some(false),
                ..Default::default()
            },
        );

        let manifests = config.apply_overrides(vec![
            PluginManifest::new("feature", PluginKind::App),
            PluginManifest::new("legacy", PluginKind::App),
            PluginManifest::new("db", PluginKind::Core),
        ]);

        assert_eq!(manifests.len(), 2);
        assert_eq!(manifests[0].priority, 9);
        assert_eq!(manifests[0].phase, LoadPhase::PostInit);
        assert_eq!(manifests[1].name, "db");
    }

    #[test]
    fn test_plugin_config_merge() {
        let mut config = ReactorConfig::default();
        let mut over = PluginOverride::default();
        over.config.insert("mode".into(), Value::from("fast"));
        config.plugins.insert("feature".into(), over);

        let manifest = PluginManifest::new("feature", PluginKind::App)
            .with_config("mode", Value::from("slow"))
            .with_config("retries", Value::from(3));

        let merged = config.plugin_config(&manifest);
        assert_eq!(merged["mode"], "fast");
        assert_eq!(merged["retries"], 3);
    }
}
