//! 파일 로딩 - 매니페스트 목록과 설정 파일

use anyhow::{Context, Result};
use reactor_foundation::{ManifestSource, PluginManifest, ReactorConfig, StaticManifestSource};
use std::path::Path;

/// `[[plugin]]` 형식의 매니페스트 파일 읽기
pub fn manifests(path: &Path) -> Result<StaticManifestSource> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read manifests from {}", path.display()))?;
    StaticManifestSource::from_toml_str(&content)
        .with_context(|| format!("failed to parse manifests in {}", path.display()))
}

/// 설정 파일 읽기 (없으면 기본값)
pub fn config(path: Option<&Path>) -> Result<ReactorConfig> {
    let Some(path) = path else {
        return Ok(ReactorConfig::default());
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config from {}", path.display()))?;
    ReactorConfig::from_toml_str(&content)
        .with_context(|| format!("invalid config in {}", path.display()))
}

/// 오버라이드까지 적용된 매니페스트
pub fn effective_manifests(
    source: &StaticManifestSource,
    config: &ReactorConfig,
) -> Result<Vec<PluginManifest>> {
    Ok(config.apply_overrides(source.manifests()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_manifests_and_config() {
        let manifests = file(
            r#"
            [[plugin]]
            name = "db"
            version = "1.0.0"
            kind = "core"
            phase = "pre-init"

            [[plugin]]
            name = "legacy"
            version = "0.9.0"
            kind = "app"
            "#,
        );
        let config = file("[plugins.legacy]\nenabled = false\n");

        let source = super::manifests(manifests.path()).unwrap();
        let config = super::config(Some(config.path())).unwrap();
        let effective = effective_manifests(&source, &config).unwrap();

        assert_eq!(source.len(), 2);
        assert_eq!(effective.len(), 1);
        assert_eq!(effective[0].name, "db");
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = super::manifests(Path::new("/nonexistent/manifests.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/manifests.toml"));
    }

    #[test]
    fn test_default_config_without_path() {
        let config = super::config(None).unwrap();
        assert_eq!(config.lifecycle.init_timeout_ms, 30_000);
    }
}
