//! Plugin Instance - 플러그인별 상태 기계

use super::context::PluginContext;
use super::traits::Plugin;
use parking_lot::RwLock;
use reactor_foundation::{Error, PluginManifest, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

// ============================================================================
// PluginState
// ============================================================================

/// 라이프사이클 상태
///
/// ```text
/// Discovered → Loaded → Initializing → Running → ShuttingDown → Stopped
///                 │           │            │           │
///                 └───────────┴────────────┴───────────┴──► Failed
/// ```
///
/// 전이는 한 방향이며 `Failed`/`Stopped` 에서는 나갈 수 없습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginState {
    Discovered,
    Loaded,
    Initializing,
    Running,
    ShuttingDown,
    Stopped,
    Failed,
}

impl PluginState {
    /// 허용되는 전이인지 확인
    pub fn can_transition_to(&self, next: PluginState) -> bool {
        use PluginState::*;
        matches!(
            (*self, next),
            (Discovered, Loaded)
                | (Loaded, Initializing)
                | (Loaded, Failed)
                | (Initializing, Running)
                | (Initializing, Failed)
                | (Running, ShuttingDown)
                | (Running, Failed)
                | (ShuttingDown, Stopped)
                | (ShuttingDown, Failed)
        )
    }

    /// 더 이상 전이가 없는 상태
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Loaded => "loaded",
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::ShuttingDown => "shutting_down",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PluginState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// PluginInstance
// ============================================================================

/// 플러그인 인스턴스
///
/// 매니페스트, 현재 상태, 플러그인 로직 핸들(Initializing 에서 생성),
/// 공유 실행 컨텍스트를 가집니다. 라이프사이클 레지스트리만 소유합니다.
pub struct PluginInstance {
    manifest: Arc<PluginManifest>,
    context: Arc<PluginContext>,
    state: RwLock<PluginState>,
    plugin: RwLock<Option<Arc<dyn Plugin>>>,
    failure: RwLock<Option<String>>,
}

impl PluginInstance {
    pub(crate) fn new(manifest: Arc<PluginManifest>, context: Arc<PluginContext>) -> Self {
        Self {
            manifest,
            context,
            state: RwLock::new(PluginState::Discovered),
            plugin: RwLock::new(None),
            failure: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn manifest(&self) -> &Arc<PluginManifest> {
        &self.manifest
    }

    pub fn context(&self) -> &Arc<PluginContext> {
        &self.context
    }

    pub fn state(&self) -> PluginState {
        *self.state.read()
    }

    /// 플러그인 로직 (Initializing 이전에는 없음)
    pub fn plugin(&self) -> Option<Arc<dyn Plugin>> {
        self.plugin.read().clone()
    }

    /// 실패 사유
    pub fn failure(&self) -> Option<String> {
        self.failure.read().clone()
    }

    pub(crate) fn attach(&self, plugin: Arc<dyn Plugin>) {
        *self.plugin.write() = Some(plugin);
    }

    /// 상태 전이 (이전 상태 반환)
    pub(crate) fn transition(&self, next: PluginState) -> Result<PluginState> {
        let mut state = self.state.write();
        let current = *state;
        if !current.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                plugin: self.manifest.name.clone(),
                from: current.to_string(),
                to: next.to_string(),
            });
        }
        *state = next;
        drop(state);

        debug!(plugin = %self.manifest.name, from = %current, to = %next, "State transition");
        Ok(current)
    }

    /// Failed 로 전이하고 사유 기록
    pub(crate) fn fail(&self, reason: impl Into<String>) -> Result<PluginState> {
        let previous = self.transition(PluginState::Failed)?;
        *self.failure.write() = Some(reason.into());
        Ok(previous)
    }
}

impl std::fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginInstance")
            .field("name", &self.manifest.name)
            .field("state", &self.state())
            .field("failure", &self.failure())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PluginState::*;

    #[test]
    fn test_forward_transitions() {
        let path = [Discovered, Loaded, Initializing, Running, ShuttingDown, Stopped];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_failed_reachability() {
        for from in [Loaded, Initializing, Running, ShuttingDown] {
            assert!(from.can_transition_to(Failed));
        }
        assert!(!Discovered.can_transition_to(Failed));
        assert!(!Stopped.can_transition_to(Failed));
    }

    #[test]
    fn test_no_way_back() {
        assert!(!Failed.can_transition_to(Running));
        assert!(!Stopped.can_transition_to(Running));
        assert!(!Running.can_transition_to(Initializing));
        assert!(!Failed.can_transition_to(Failed));
        assert!(Failed.is_terminal());
        assert!(Stopped.is_terminal());
        assert!(!Running.is_terminal());
    }
}
