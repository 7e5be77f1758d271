//! Tool System - 플러그인이 노출하는 도구
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ToolRegistry                                                │
//! │  ├── register / register_all(owner) - 이름 유일성 강제        │
//! │  ├── unregister_all(owner) - 플러그인 종료 시 정리            │
//! │  ├── lookup / list_by_owner / schemas - 조회                 │
//! │  └── call(name, args) - 검증 후 실행                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ToolDefinition (builder)                                    │
//! │  ├── ToolParameter - 순서 있는 타입 파라미터 + 기본값          │
//! │  └── ToolHandler - Sync (워커 풀) / Async                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod definition;
mod registry;

pub use definition::{
    AsyncToolFn, InvocationMode, ParameterType, SyncToolFn, ToolDefinition, ToolDefinitionBuilder,
    ToolHandler, ToolParameter,
};
pub use registry::ToolRegistry;
