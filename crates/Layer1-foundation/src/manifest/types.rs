//! Plugin Manifest - 플러그인 메타데이터 정의
//!
//! 매니페스트는 불변 데이터입니다. 동작은 없고 검증만 제공합니다.

use crate::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;

// ============================================================================
// PluginVersion
// ============================================================================

/// 플러그인 버전 (semantic triple)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PluginVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl PluginVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// 버전 문자열 파싱 (예: "1.2.3")
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.trim().split('.');
        let version = Self {
            major: parts.next()?.parse().ok()?,
            minor: parts.next()?.parse().ok()?,
            patch: parts.next()?.parse().ok()?,
        };

        if parts.next().is_some() {
            return None;
        }

        Some(version)
    }

    /// 호환성 검사
    pub fn is_compatible_with(&self, other: &PluginVersion) -> bool {
        // 같은 메이저 버전이면 호환
        self.major == other.major
    }
}

impl std::fmt::Display for PluginVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Default for PluginVersion {
    fn default() -> Self {
        Self::new(1, 0, 0)
    }
}

impl TryFrom<String> for PluginVersion {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid version '{}', expected MAJOR.MINOR.PATCH", value))
    }
}

impl From<PluginVersion> for String {
    fn from(version: PluginVersion) -> Self {
        version.to_string()
    }
}

// ============================================================================
// PluginKind / LoadPhase
// ============================================================================

/// 플러그인 종류 (닫힌 집합)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
    /// 시스템 핵심 기능 확장
    Core,
    /// 외부에 엔드포인트를 노출
    Router,
    /// 외부 애플리케이션 제어
    App,
    /// 모델 제공
    Model,
    /// 에이전트 제공
    Agent,
    /// 정적 UI (코드 없이 선언만으로 동작 가능)
    Ui,
}

impl PluginKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Router => "router",
            Self::App => "app",
            Self::Model => "model",
            Self::Agent => "agent",
            Self::Ui => "ui",
        }
    }
}

impl std::fmt::Display for PluginKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 로드 단계 - 의존성 해석을 나누는 큰 순서 버킷
///
/// `PreInit < Default < PostInit` 순서로 비교됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum LoadPhase {
    #[serde(rename = "pre-init")]
    PreInit,
    #[default]
    #[serde(rename = "default")]
    Default,
    #[serde(rename = "post-init", alias = "after-init")]
    PostInit,
}

impl LoadPhase {
    /// 로드 순서대로 모든 단계
    pub const ALL: [LoadPhase; 3] = [LoadPhase::PreInit, LoadPhase::Default, LoadPhase::PostInit];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreInit => "pre-init",
            Self::Default => "default",
            Self::PostInit => "post-init",
        }
    }
}

impl std::fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// PluginManifest
// ============================================================================

/// 플러그인 매니페스트 - 플러그인의 모든 메타데이터
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// 고유 플러그인 이름 (kebab-case)
    pub name: String,

    /// 버전
    pub version: PluginVersion,

    /// 플러그인 종류
    #[serde(alias = "type")]
    pub kind: PluginKind,

    /// 먼저 로드되어야 하는 플러그인 이름들
    #[serde(default)]
    pub dependencies: BTreeSet<String>,

    /// 로드 단계
    #[serde(default, alias = "timing")]
    pub phase: LoadPhase,

    /// 같은 단계 안에서 높을수록 먼저 로드
    #[serde(default)]
    pub priority: i32,

    /// 요청 권한
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,

    /// 설명
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// 플러그인 기본 설정
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub config: Map<String, Value>,
}

impl PluginManifest {
    /// 새 매니페스트 생성
    pub fn new(name: impl Into<String>, kind: PluginKind) -> Self {
        Self {
            name: name.into(),
            version: PluginVersion::default(),
            kind,
            dependencies: BTreeSet::new(),
            phase: LoadPhase::Default,
            priority: 0,
            permissions: Vec::new(),
            description: None,
            config: Map::new(),
        }
    }

    /// 빌더 패턴: 버전 설정
    pub fn with_version(mut self, version: PluginVersion) -> Self {
        self.version = version;
        self
    }

    /// 빌더 패턴: 의존성 추가
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.insert(name.into());
        self
    }

    /// 빌더 패턴: 로드 단계 설정
    pub fn with_phase(mut self, phase: LoadPhase) -> Self {
        self.phase = phase;
        self
    }

    /// 빌더 패턴: 우선순위 설정
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// 빌더 패턴: 권한 추가
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    /// 빌더 패턴: 설명 설정
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// 빌더 패턴: 기본 설정 값 추가
    pub fn with_config(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    /// 단일 매니페스트 검증
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::manifest("<unnamed>", "name must not be empty"));
        }

        if !is_kebab_case(&self.name) {
            return Err(Error::manifest(
                &self.name,
                "name must be kebab-case (lowercase letters, digits and single dashes)",
            ));
        }

        for dep in &self.dependencies {
            if dep == &self.name {
                return Err(Error::manifest(&self.name, "plugin cannot depend on itself"));
            }
            if !is_kebab_case(dep) {
                return Err(Error::manifest(
                    &self.name,
                    format!("dependency '{}' is not a valid plugin name", dep),
                ));
            }
        }

        Ok(())
    }
}

/// kebab-case 이름인지 확인
pub fn is_kebab_case(name: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(name))
}

/// 매니페스트 집합 검증
///
/// 유효하지 않거나 중복된 매니페스트는 해석 전에 거부됩니다.
/// 중복 시 처음 발견된 매니페스트가 남습니다.
pub fn validate_manifest_set(manifests: Vec<PluginManifest>) -> (Vec<PluginManifest>, Vec<Error>) {
    let mut seen = HashSet::new();
    let mut accepted = Vec::with_capacity(manifests.len());
    let mut rejected = Vec::new();

    for manifest in manifests {
        if let Err(e) = manifest.validate() {
            rejected.push(e);
            continue;
        }

        if !seen.insert(manifest.name.clone()) {
            rejected.push(Error::DuplicateManifest(manifest.name));
            continue;
        }

        accepted.push(manifest);
    }

    (accepted, rejected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse() {
        let v = PluginVersion::parse("1.2.3").unwrap();
        assert_eq!(v, PluginVersion::new(1, 2, 3));
        assert!(PluginVersion::parse("1.2").is_none());
        assert!(PluginVersion::parse("1.2.3.4").is_none());
        assert!(PluginVersion::parse("a.b.c").is_none());
    }

    #[test]
    fn test_version_compatibility() {
        let v1 = PluginVersion::new(1, 0, 0);
        let v2 = PluginVersion::new(1, 2, 0);
        let v3 = PluginVersion::new(2, 0, 0);

        assert!(v1.is_compatible_with(&v2));
        assert!(!v1.is_compatible_with(&v3));
    }

    #[test]
    fn test_phase_ordering() {
        assert!(LoadPhase::PreInit < LoadPhase::Default);
        assert!(LoadPhase::Default < LoadPhase::PostInit);
    }

    #[test]
    fn test_manifest_deserialize() {
        let json = serde_json::json!({
            "name": "asset-export",
            "version": "0.3.1",
            "type": "core",
            "timing": "after-init",
            "priority": 5,
            "dependencies": ["db"]
        });

        let manifest: PluginManifest = serde_json::from_value(json).unwrap();
        assert_eq!(manifest.kind, PluginKind::Core);
        assert_eq!(manifest.phase, LoadPhase::PostInit);
        assert_eq!(manifest.version, PluginVersion::new(0, 3, 1));
        assert!(manifest.dependencies.contains("db"));
    }

    #[test]
    fn test_manifest_rejects_bad_version() {
        let json = serde_json::json!({ "name": "db", "version": "one", "kind": "core" });
        assert!(serde_json::from_value::<PluginManifest>(json).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(PluginManifest::new("asset-export", PluginKind::App).validate().is_ok());
        assert!(PluginManifest::new("", PluginKind::App).validate().is_err());
        assert!(PluginManifest::new("Asset_Export", PluginKind::App).validate().is_err());
        assert!(PluginManifest::new("db", PluginKind::Core)
            .with_dependency("db")
            .validate()
            .is_err());
    }

    #[test]
    fn test_validate_set_rejects_duplicates() {
        let (accepted, rejected) = validate_manifest_set(vec![
            PluginManifest::new("db", PluginKind::Core).with_priority(1),
            PluginManifest::new("db", PluginKind::Core).with_priority(2),
            PluginManifest::new("logging", PluginKind::Core),
        ]);

        assert_eq!(accepted.len(), 2);
        assert_eq!(accepted[0].priority, 1);
        assert!(matches!(&rejected[..], [Error::DuplicateManifest(name)] if name == "db"));
    }
}
