//! Plugin traits - 핵심 플러그인 인터페이스

use super::context::PluginContext;
use async_trait::async_trait;
use reactor_foundation::Result;
use std::any::Any;
use tracing::debug;

// ============================================================================
// Plugin Trait - 모든 플러그인이 구현해야 하는 인터페이스
// ============================================================================

/// 플러그인 트레이트
///
/// 인스턴스는 `PluginCatalog` 에 등록된 팩토리가 만듭니다.
/// 도구와 이벤트 구독은 `initialize` 안에서 컨텍스트를 통해 명시적으로 등록합니다.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// 초기화 (Initializing → Running)
    ///
    /// 설정된 시간 제한 안에 끝나야 합니다. 에러를 반환하면 플러그인은 Failed 가 됩니다.
    async fn initialize(&self, ctx: &PluginContext) -> Result<()>;

    /// 종료 (ShuttingDown → Stopped)
    async fn shutdown(&self, _ctx: &PluginContext) -> Result<()> {
        Ok(())
    }

    /// 타입 캐스팅을 위한 헬퍼 (다운캐스팅 지원)
    fn as_any(&self) -> &dyn Any;
}

// ============================================================================
// DeclarativePlugin - 코드 없는 플러그인
// ============================================================================

/// 선언만으로 동작하는 플러그인
///
/// 팩토리가 없는 `ui` 종류 매니페스트에 사용됩니다.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclarativePlugin;

#[async_trait]
impl Plugin for DeclarativePlugin {
    async fn initialize(&self, ctx: &PluginContext) -> Result<()> {
        debug!(plugin = %ctx.name(), "Declarative plugin ready");
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
