//! Error types for Reactor
//!
//! 모든 에러를 중앙에서 관리
//!
//! 구조적 에러(매니페스트/의존성 해석)는 부트 결과로 호출자에게 전달되고,
//! 런타임 에러(플러그인 하나, 리스너 하나)는 격리되어 로그만 남깁니다.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Reactor 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 매니페스트 관련
    // ========================================================================
    #[error("Invalid manifest '{plugin}': {reason}")]
    ManifestValidation { plugin: String, reason: String },

    #[error("Duplicate manifest: {0}")]
    DuplicateManifest(String),

    // ========================================================================
    // 의존성 해석
    // ========================================================================
    #[error("Dependency resolution failed: {0}")]
    DependencyResolution(#[from] ResolutionError),

    // ========================================================================
    // 플러그인 라이프사이클
    // ========================================================================
    #[error("Plugin load failed: {plugin} - {reason}")]
    PluginLoad { plugin: String, reason: String },

    #[error("Plugin initialization failed: {plugin} - {reason}")]
    PluginInitialization { plugin: String, reason: String },

    #[error("Plugin shutdown failed: {plugin} - {reason}")]
    PluginShutdown { plugin: String, reason: String },

    #[error("Invalid state transition for {plugin}: {from} -> {to}")]
    InvalidTransition {
        plugin: String,
        from: String,
        to: String,
    },

    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    // ========================================================================
    // Tool 관련
    // ========================================================================
    #[error("Duplicate tool name '{name}' from {owner} (already registered by {existing_owner})")]
    DuplicateToolName {
        name: String,
        owner: String,
        existing_owner: String,
    },

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool validation failed: {tool} - {reason}")]
    ToolValidation { tool: String, reason: String },

    #[error("Tool execution failed: {tool} - {message}")]
    ToolExecution { tool: String, message: String },

    // ========================================================================
    // 이벤트 관련
    // ========================================================================
    #[error("Listener failed: {listener} - {message}")]
    Listener { listener: String, message: String },

    #[error("Invalid subscription: {0}")]
    InvalidSubscription(String),

    // ========================================================================
    // 실행 관련
    // ========================================================================
    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Cancelled")]
    Cancelled,

    // ========================================================================
    // 설정 / 부트
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Boot failed: {0}")]
    Boot(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

/// 의존성 해석 에러
///
/// 해당 플러그인과 그 플러그인에 (전이적으로) 의존하는 플러그인만 실패합니다.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("{plugin} depends on unknown plugin '{dependency}'")]
    MissingDependency { plugin: String, dependency: String },

    #[error("{plugin} is part of a dependency cycle: {}", members.join(" -> "))]
    Cycle { plugin: String, members: Vec<String> },

    #[error("{plugin} ({plugin_phase}) depends on '{dependency}' which loads later ({dependency_phase})")]
    PhaseViolation {
        plugin: String,
        plugin_phase: String,
        dependency: String,
        dependency_phase: String,
    },

    #[error("{plugin} depends on rejected plugin '{dependency}'")]
    DependencyRejected { plugin: String, dependency: String },
}

impl ResolutionError {
    /// 실패한 플러그인 이름
    pub fn plugin(&self) -> &str {
        match self {
            Self::MissingDependency { plugin, .. }
            | Self::Cycle { plugin, .. }
            | Self::PhaseViolation { plugin, .. }
            | Self::DependencyRejected { plugin, .. } => plugin,
        }
    }
}

impl Error {
    /// 부트 전에 걸러지는 구조적 에러인지 확인
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::ManifestValidation { .. }
                | Error::DuplicateManifest(_)
                | Error::DependencyResolution(_)
                | Error::PluginLoad { .. }
        )
    }

    /// 사용자에게 보여줄 수 있는 에러인지 확인
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::ToolNotFound(_)
                | Error::ToolValidation { .. }
                | Error::ManifestValidation { .. }
                | Error::Config(_)
                | Error::Cancelled
        )
    }

    /// 매니페스트 검증 에러 생성 헬퍼
    pub fn manifest(plugin: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::ManifestValidation {
            plugin: plugin.into(),
            reason: reason.into(),
        }
    }

    /// 초기화 에러 생성 헬퍼
    pub fn plugin_init(plugin: impl Into<String>, reason: impl ToString) -> Self {
        Error::PluginInitialization {
            plugin: plugin.into(),
            reason: reason.to_string(),
        }
    }

    /// 종료 에러 생성 헬퍼
    pub fn plugin_shutdown(plugin: impl Into<String>, reason: impl ToString) -> Self {
        Error::PluginShutdown {
            plugin: plugin.into(),
            reason: reason.to_string(),
        }
    }

    /// Tool 검증 에러 생성 헬퍼
    pub fn tool_validation(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::ToolValidation {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Tool 실행 에러 생성 헬퍼
    pub fn tool_execution(tool: impl Into<String>, message: impl ToString) -> Self {
        Error::ToolExecution {
            tool: tool.into(),
            message: message.to_string(),
        }
    }

    /// 리스너 에러 생성 헬퍼
    pub fn listener(listener: impl Into<String>, message: impl ToString) -> Self {
        Error::Listener {
            listener: listener.into(),
            message: message.to_string(),
        }
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
