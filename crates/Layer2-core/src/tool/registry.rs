//! Tool Registry - 도구 등록 및 조회
//!
//! 이름은 레지스트리 전체에서 유일합니다. 충돌은 덮어쓰기가 아니라 에러입니다.
//! 이름 색인과 소유자 색인은 하나의 락 아래에서 함께 바뀌므로
//! 조회하는 쪽은 절반만 등록된 상태를 볼 수 없습니다.
//!
//! ```ignore
//! let registry = ToolRegistry::new();
//!
//! registry.register(
//!     ToolDefinition::builder("export")
//!         .owner("exporter")
//!         .param(ToolParameter::new("path", ParameterType::String))
//!         .sync_handler(|args| Ok(args))
//!         .build()?,
//! )?;
//!
//! let result = registry.call("export", json!({ "path": "out.glb" })).await?;
//! ```

use super::definition::{ToolDefinition, ToolHandler};
use parking_lot::RwLock;
use reactor_foundation::{Error, Result, WorkerPool};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Default)]
struct Inner {
    tools: BTreeMap<String, Arc<ToolDefinition>>,
    by_owner: HashMap<String, BTreeSet<String>>,
}

impl Inner {
    fn conflict(&self, definition: &ToolDefinition) -> Option<Error> {
        self.tools
            .get(definition.name())
            .map(|existing| Error::DuplicateToolName {
                name: definition.name().to_string(),
                owner: definition.owner().to_string(),
                existing_owner: existing.owner().to_string(),
            })
    }

    fn insert(&mut self, definition: ToolDefinition) {
        self.by_owner
            .entry(definition.owner().to_string())
            .or_default()
            .insert(definition.name().to_string());
        self.tools
            .insert(definition.name().to_string(), Arc::new(definition));
    }
}

/// 도구 레지스트리
pub struct ToolRegistry {
    inner: RwLock<Inner>,
    pool: Arc<WorkerPool>,
}

impl ToolRegistry {
    /// 자체 워커 풀과 함께 생성
    pub fn new() -> Self {
        Self::with_pool(Arc::new(WorkerPool::new(0)))
    }

    /// 공유 워커 풀로 생성 (동기 핸들러 실행용)
    pub fn with_pool(pool: Arc<WorkerPool>) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            pool,
        }
    }

    // ========================================================================
    // 등록
    // ========================================================================

    /// 도구 등록
    ///
    /// 같은 이름이 이미 있으면 `DuplicateToolName`, 기존 등록은 그대로 남습니다.
    pub fn register(&self, definition: ToolDefinition) -> Result<()> {
        if definition.owner().is_empty() {
            return Err(Error::tool_validation(definition.name(), "tool has no owner"));
        }

        let mut inner = self.inner.write();
        if let Some(err) = inner.conflict(&definition) {
            return Err(err);
        }

        debug!(
            tool = definition.name(),
            owner = definition.owner(),
            mode = ?definition.mode(),
            "Registered tool"
        );
        inner.insert(definition);
        Ok(())
    }

    /// 여러 도구를 한 번에 등록 (전부 성공하거나 아무것도 등록하지 않음)
    pub fn register_all(&self, owner: &str, batch: Vec<ToolDefinition>) -> Result<usize> {
        let batch: Vec<ToolDefinition> = batch.into_iter().map(|d| d.with_owner(owner)).collect();

        let mut inner = self.inner.write();

        let mut names = BTreeSet::new();
        for definition in &batch {
            if let Some(err) = inner.conflict(definition) {
                return Err(err);
            }
            if !names.insert(definition.name()) {
                return Err(Error::DuplicateToolName {
                    name: definition.name().to_string(),
                    owner: owner.to_string(),
                    existing_owner: owner.to_string(),
                });
            }
        }

        let count = batch.len();
        for definition in batch {
            inner.insert(definition);
        }
        drop(inner);

        if count > 0 {
            info!(owner, count, "Registered plugin tools");
        }
        Ok(count)
    }

    /// 소유자의 도구 전부 제거
    pub fn unregister_all(&self, owner: &str) -> usize {
        let mut inner = self.inner.write();
        let Some(names) = inner.by_owner.remove(owner) else {
            return 0;
        };

        for name in &names {
            inner.tools.remove(name);
        }
        drop(inner);

        debug!(owner, count = names.len(), "Unregistered plugin tools");
        names.len()
    }

    /// 모든 도구 제거
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.write();
        let count = inner.tools.len();
        inner.tools.clear();
        inner.by_owner.clear();
        count
    }

    // ========================================================================
    // 조회
    // ========================================================================

    /// 도구 조회
    pub fn lookup(&self, name: &str) -> Option<Arc<ToolDefinition>> {
        self.inner.read().tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().tools.contains_key(name)
    }

    /// 소유자별 도구 (이름순)
    pub fn list_by_owner(&self, owner: &str) -> Vec<Arc<ToolDefinition>> {
        let inner = self.inner.read();
        inner
            .by_owner
            .get(owner)
            .map(|names| {
                names
                    .iter()
                    .filter_map(|name| inner.tools.get(name).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 모든 도구 (이름순)
    pub fn list(&self) -> Vec<Arc<ToolDefinition>> {
        self.inner.read().tools.values().cloned().collect()
    }

    /// 모든 도구 이름
    pub fn names(&self) -> Vec<String> {
        self.inner.read().tools.keys().cloned().collect()
    }

    /// JSON Schema 형식으로 모든 도구 정보 반환
    pub fn schemas(&self) -> Vec<Value> {
        self.inner
            .read()
            .tools
            .values()
            .map(|tool| tool.schema())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().tools.is_empty()
    }

    // ========================================================================
    // 호출
    // ========================================================================

    /// 도구 호출
    ///
    /// 인자를 검증하고 기본값을 채운 뒤 실행합니다. 동기 핸들러는 워커 풀에서 실행됩니다.
    pub async fn call(&self, name: &str, args: Value) -> Result<Value> {
        let tool = self
            .lookup(name)
            .ok_or_else(|| Error::ToolNotFound(name.to_string()))?;

        let args = Value::Object(tool.validate_args(args)?);

        let result = match tool.handler().clone() {
            ToolHandler::Sync(f) => match self.pool.run(move || f(args)).await {
                Ok(result) => result,
                Err(e) => Err(e),
            },
            ToolHandler::Async(f) => f(args).await,
        };

        result.map_err(|e| match e {
            Error::ToolExecution { .. } => e,
            other => Error::tool_execution(name, other),
        })
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::definition::{ParameterType, ToolParameter};
    use serde_json::json;

    fn tool(name: &str, owner: &str) -> ToolDefinition {
        ToolDefinition::builder(name)
            .owner(owner)
            .description(format!("{} tool", name))
            .sync_handler(|_| Ok(Value::Null))
            .build()
            .unwrap()
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let registry = ToolRegistry::new();
        registry.register(tool("export", "exporter")).unwrap();

        let err = registry.register(tool("export", "importer")).unwrap_err();
        match err {
            Error::DuplicateToolName {
                name,
                owner,
                existing_owner,
            } => {
                assert_eq!(name, "export");
                assert_eq!(owner, "importer");
                assert_eq!(existing_owner, "exporter");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(registry.lookup("export").unwrap().owner(), "exporter");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_all_is_atomic() {
        let registry = ToolRegistry::new();
        registry.register(tool("render", "renderer")).unwrap();

        let result = registry.register_all(
            "exporter",
            vec![tool("export", ""), tool("render", "")],
        );
        assert!(matches!(result, Err(Error::DuplicateToolName { .. })));
        assert!(registry.lookup("export").is_none());
        assert!(registry.list_by_owner("exporter").is_empty());

        let count = registry
            .register_all("exporter", vec![tool("export", ""), tool("bundle", "")])
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(registry.lookup("bundle").unwrap().owner(), "exporter");
    }

    #[test]
    fn test_unregister_all_removes_incremental_registrations() {
        let registry = ToolRegistry::new();
        registry.register_all("exporter", vec![tool("export", "")]).unwrap();
        registry.register(tool("bundle", "exporter")).unwrap();
        registry.register(tool("render", "renderer")).unwrap();

        let owned: Vec<String> = registry
            .list_by_owner("exporter")
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        assert_eq!(owned, vec!["bundle", "export"]);

        assert_eq!(registry.unregister_all("exporter"), 2);
        assert_eq!(registry.names(), vec!["render"]);
        assert_eq!(registry.unregister_all("exporter"), 0);
    }

    #[test]
    fn test_register_requires_owner() {
        let registry = ToolRegistry::new();
        assert!(matches!(
            registry.register(tool("export", "")),
            Err(Error::ToolValidation { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_call_sync_and_async() {
        let registry = ToolRegistry::new();

        registry
            .register(
                ToolDefinition::builder("add")
                    .owner("math")
                    .param(ToolParameter::new("a", ParameterType::Integer))
                    .param(ToolParameter::new("b", ParameterType::Integer).with_default(json!(10)))
                    .sync_handler(|args| {
                        let a = args["a"].as_i64().unwrap_or_default();
                        let b = args["b"].as_i64().unwrap_or_default();
                        Ok(json!(a + b))
                    })
                    .build()
                    .unwrap(),
            )
            .unwrap();

        registry
            .register(
                ToolDefinition::builder("greet")
                    .owner("text")
                    .param(ToolParameter::new("name", ParameterType::String))
                    .async_handler(|args| async move {
                        let name = args["name"].as_str().unwrap_or_default().to_string();
                        Ok(json!(format!("hello {}", name)))
                    })
                    .build()
                    .unwrap(),
            )
            .unwrap();

        assert_eq!(registry.call("add", json!({ "a": 5 })).await.unwrap(), json!(15));
        assert_eq!(
            registry.call("greet", json!({ "name": "reactor" })).await.unwrap(),
            json!("hello reactor")
        );

        assert!(matches!(
            registry.call("missing", json!({})).await,
            Err(Error::ToolNotFound(_))
        ));
        assert!(matches!(
            registry.call("add", json!({ "a": "five" })).await,
            Err(Error::ToolValidation { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_handler_error_becomes_execution_error() {
        let registry = ToolRegistry::new();
        registry
            .register(
                ToolDefinition::builder("fail")
                    .owner("broken")
                    .sync_handler(|_| Err(Error::Internal("disk full".into())))
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let err = registry.call("fail", Value::Null).await.unwrap_err();
        assert!(matches!(err, Error::ToolExecution { ref tool, .. } if tool == "fail"));
    }
}
