//! Plugin Catalog - 이름별 플러그인 팩토리
//!
//! 매니페스트는 "무엇"을, 카탈로그는 "어떻게 만드는지"를 제공합니다.
//! 팩토리는 플러그인이 Initializing 에 들어갈 때 호출됩니다.

use super::traits::{DeclarativePlugin, Plugin};
use reactor_foundation::{PluginKind, PluginManifest, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// 플러그인 팩토리
pub type PluginFactory = Arc<dyn Fn(&PluginManifest) -> Result<Arc<dyn Plugin>> + Send + Sync>;

/// 매니페스트에 대한 플러그인 공급원
#[derive(Clone)]
pub(crate) enum PluginSource {
    Factory(PluginFactory),
    Declarative,
}

impl PluginSource {
    pub(crate) fn create(&self, manifest: &PluginManifest) -> Result<Arc<dyn Plugin>> {
        match self {
            Self::Factory(factory) => factory(manifest),
            Self::Declarative => Ok(Arc::new(DeclarativePlugin)),
        }
    }
}

/// 플러그인 카탈로그
///
/// ```ignore
/// let catalog = PluginCatalog::new()
///     .with("exporter", |_| Ok(Arc::new(Exporter::default()) as Arc<dyn Plugin>))
///     .with("db", |manifest| Db::from_manifest(manifest));
/// ```
#[derive(Clone, Default)]
pub struct PluginCatalog {
    factories: HashMap<String, PluginFactory>,
}

impl PluginCatalog {
    /// 빈 카탈로그 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 팩토리 등록 (같은 이름이면 교체)
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&PluginManifest) -> Result<Arc<dyn Plugin>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// 빌더 스타일 등록
    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&PluginManifest) -> Result<Arc<dyn Plugin>> + Send + Sync + 'static,
    {
        self.register(name, factory);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// 등록된 이름 (정렬)
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// 매니페스트에 맞는 공급원
    ///
    /// 팩토리가 없으면 `ui` 종류만 선언형 플러그인으로 대체됩니다.
    pub(crate) fn source_for(&self, manifest: &PluginManifest) -> Option<PluginSource> {
        match self.factories.get(&manifest.name) {
            Some(factory) => Some(PluginSource::Factory(Arc::clone(factory))),
            None if manifest.kind == PluginKind::Ui => Some(PluginSource::Declarative),
            None => None,
        }
    }
}

impl std::fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginCatalog")
            .field("factories", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_resolution() {
        let catalog = PluginCatalog::new().with("db", |_| Ok(Arc::new(DeclarativePlugin) as Arc<dyn Plugin>));

        let db = PluginManifest::new("db", PluginKind::Core);
        let theme = PluginManifest::new("theme", PluginKind::Ui);
        let feature = PluginManifest::new("feature", PluginKind::App);

        assert!(matches!(catalog.source_for(&db), Some(PluginSource::Factory(_))));
        assert!(matches!(catalog.source_for(&theme), Some(PluginSource::Declarative)));
        assert!(catalog.source_for(&feature).is_none());
        assert_eq!(catalog.names(), vec!["db"]);
    }

    #[test]
    fn test_declarative_source_creates_plugin() {
        let theme = PluginManifest::new("theme", PluginKind::Ui);
        let plugin = PluginSource::Declarative.create(&theme).unwrap();
        assert!(plugin.as_any().downcast_ref::<DeclarativePlugin>().is_some());
    }
}
