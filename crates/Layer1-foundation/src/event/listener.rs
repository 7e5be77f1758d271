//! Listener - 리스너 trait 과 구독 관련 타입

use super::types::Event;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;

// ============================================================================
// Subscription ID / Delivery Mode
// ============================================================================

/// 구독 핸들
///
/// `subscribe` 가 반환하며 `unsubscribe` 에 그대로 넘깁니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

impl SubscriptionId {
    /// 생성 순서 (같은 토픽 내 전달 순서)
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// 전달 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryMode {
    /// 동기 리스너, 워커 풀에서 실행
    BlockingSync,
    /// 비동기 리스너, 런타임 태스크로 실행
    BlockingAsync,
    /// 결과를 발행자가 관찰하지 않음
    FireAndForget,
}

impl DeliveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BlockingSync => "blocking-sync",
            Self::BlockingAsync => "blocking-async",
            Self::FireAndForget => "fire-and-forget",
        }
    }
}

impl std::fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Listener Traits
// ============================================================================

/// 동기 리스너
///
/// 워커 풀 스레드에서 호출되므로 블로킹 작업을 해도 됩니다.
pub trait BlockingListener: Send + Sync {
    /// 리스너 이름 (로그용)
    fn name(&self) -> &str {
        "anonymous"
    }

    /// 이벤트 처리
    fn on_event(&self, event: &Event) -> Result<()>;
}

/// 비동기 리스너
#[async_trait]
pub trait EventListener: Send + Sync {
    /// 리스너 이름 (로그용)
    fn name(&self) -> &str {
        "anonymous"
    }

    /// 이벤트 처리
    async fn on_event(&self, event: Arc<Event>) -> Result<()>;
}

/// 등록 가능한 리스너
#[derive(Clone)]
pub enum Listener {
    Blocking(Arc<dyn BlockingListener>),
    Async(Arc<dyn EventListener>),
}

impl Listener {
    /// 동기 리스너로 감싸기
    pub fn blocking<L: BlockingListener + 'static>(listener: L) -> Self {
        Self::Blocking(Arc::new(listener))
    }

    /// 비동기 리스너로 감싸기
    pub fn asynchronous<L: EventListener + 'static>(listener: L) -> Self {
        Self::Async(Arc::new(listener))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Blocking(l) => l.name(),
            Self::Async(l) => l.name(),
        }
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Blocking(_))
    }

    /// 모드와 리스너 종류가 맞는지 확인
    pub fn supports(&self, mode: DeliveryMode) -> bool {
        match mode {
            DeliveryMode::BlockingSync => self.is_blocking(),
            DeliveryMode::BlockingAsync => !self.is_blocking(),
            DeliveryMode::FireAndForget => true,
        }
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_blocking() { "blocking" } else { "async" };
        f.debug_struct("Listener")
            .field("name", &self.name())
            .field("kind", &kind)
            .finish()
    }
}

impl From<Arc<dyn BlockingListener>> for Listener {
    fn from(listener: Arc<dyn BlockingListener>) -> Self {
        Self::Blocking(listener)
    }
}

impl From<Arc<dyn EventListener>> for Listener {
    fn from(listener: Arc<dyn EventListener>) -> Self {
        Self::Async(listener)
    }
}

// ============================================================================
// 클로저 어댑터
// ============================================================================

struct BlockingFn<F> {
    name: String,
    f: F,
}

impl<F> BlockingListener for BlockingFn<F>
where
    F: Fn(&Event) -> Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn on_event(&self, event: &Event) -> Result<()> {
        (self.f)(event)
    }
}

struct AsyncFn<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F, Fut> EventListener for AsyncFn<F>
where
    F: Fn(Arc<Event>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_event(&self, event: Arc<Event>) -> Result<()> {
        (self.f)(event).await
    }
}

/// 동기 클로저를 리스너로 변환
pub fn blocking_fn<F>(name: impl Into<String>, f: F) -> Listener
where
    F: Fn(&Event) -> Result<()> + Send + Sync + 'static,
{
    Listener::blocking(BlockingFn {
        name: name.into(),
        f,
    })
}

/// 비동기 클로저를 리스너로 변환
pub fn async_fn<F, Fut>(name: impl Into<String>, f: F) -> Listener
where
    F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Listener::asynchronous(AsyncFn {
        name: name.into(),
        f,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_support() {
        let sync = blocking_fn("sync", |_| Ok(()));
        let async_ = async_fn("async", |_| async { Ok(()) });

        assert!(sync.supports(DeliveryMode::BlockingSync));
        assert!(!sync.supports(DeliveryMode::BlockingAsync));
        assert!(async_.supports(DeliveryMode::BlockingAsync));
        assert!(!async_.supports(DeliveryMode::BlockingSync));
        assert!(sync.supports(DeliveryMode::FireAndForget));
        assert!(async_.supports(DeliveryMode::FireAndForget));
    }

    #[test]
    fn test_listener_name() {
        let listener = blocking_fn("audit", |_| Ok(()));
        assert_eq!(listener.name(), "audit");
        assert_eq!(DeliveryMode::FireAndForget.to_string(), "fire-and-forget");
    }
}
