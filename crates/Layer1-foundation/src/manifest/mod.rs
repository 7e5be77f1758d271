//! Manifest Model - 플러그인 선언 데이터
//!
//! - `types.rs` - PluginManifest, PluginVersion, PluginKind, LoadPhase
//! - `source.rs` - ManifestSource (외부 공급자 경계)

mod source;
mod types;

pub use source::{ManifestSource, StaticManifestSource};
pub use types::{
    is_kebab_case, validate_manifest_set, LoadPhase, PluginKind, PluginManifest, PluginVersion,
};
