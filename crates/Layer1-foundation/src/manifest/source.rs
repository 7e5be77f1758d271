//! Manifest Source - 매니페스트 공급자
//!
//! 매니페스트가 파일에서 왔는지, 네트워크에서 왔는지, 테스트 픽스처인지는
//! 코어가 알 필요가 없습니다. 공급자는 구조화된 레코드만 넘겨줍니다.

use super::types::PluginManifest;
use crate::Result;
use serde::Deserialize;

/// 매니페스트 공급자 trait
pub trait ManifestSource: Send + Sync {
    /// 발견된 모든 매니페스트 반환
    fn manifests(&self) -> Result<Vec<PluginManifest>>;
}

/// 메모리 기반 매니페스트 공급자
#[derive(Debug, Clone, Default)]
pub struct StaticManifestSource {
    manifests: Vec<PluginManifest>,
}

#[derive(Deserialize)]
struct ManifestDocument {
    #[serde(default, rename = "plugin")]
    plugins: Vec<PluginManifest>,
}

impl StaticManifestSource {
    pub fn new(manifests: Vec<PluginManifest>) -> Self {
        Self { manifests }
    }

    /// `[[plugin]]` 배열 형식의 TOML 문자열에서 생성
    ///
    /// ```toml
    /// [[plugin]]
    /// name = "db"
    /// version = "1.0.0"
    /// kind = "core"
    /// phase = "pre-init"
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let document: ManifestDocument = toml::from_str(content)?;
        Ok(Self::new(document.plugins))
    }

    /// 빌더 패턴: 매니페스트 추가
    pub fn with(mut self, manifest: PluginManifest) -> Self {
        self.manifests.push(manifest);
        self
    }

    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }
}

impl ManifestSource for StaticManifestSource {
    fn manifests(&self) -> Result<Vec<PluginManifest>> {
        Ok(self.manifests.clone())
    }
}

impl ManifestSource for Vec<PluginManifest> {
    fn manifests(&self) -> Result<Vec<PluginManifest>> {
        Ok(self.clone())
    }
}
