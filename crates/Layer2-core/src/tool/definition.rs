//! Tool Definition - 이름, 파라미터 스키마, 핸들러
//!
//! 플러그인은 `ToolDefinition::builder` 로 정의를 만들고
//! `PluginContext::register_tool` 로 명시적으로 등록합니다.

use futures::future::BoxFuture;
use futures::FutureExt;
use reactor_foundation::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

// ============================================================================
// ParameterType / ToolParameter
// ============================================================================

/// 파라미터 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    /// 어떤 JSON 값이든 허용
    Any,
}

impl ParameterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Any => "any",
        }
    }

    /// 값이 이 타입에 맞는지 확인
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Any => true,
        }
    }
}

impl std::fmt::Display for ParameterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 이름 있는 타입 파라미터
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,

    #[serde(rename = "type")]
    pub param_type: ParameterType,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default)]
    pub description: String,
}

impl ToolParameter {
    /// 필수 파라미터
    pub fn new(name: impl Into<String>, param_type: ParameterType) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: true,
            default: None,
            description: String::new(),
        }
    }

    /// 선택 파라미터로 변경
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// 기본값 설정 (선택 파라미터가 됨)
    pub fn with_default(mut self, value: Value) -> Self {
        self.required = false;
        self.default = Some(value);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

// ============================================================================
// ToolHandler
// ============================================================================

/// 동기 핸들러 (워커 풀에서 실행)
pub type SyncToolFn = dyn Fn(Value) -> Result<Value> + Send + Sync;

/// 비동기 핸들러
pub type AsyncToolFn = dyn Fn(Value) -> BoxFuture<'static, Result<Value>> + Send + Sync;

/// 호출 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationMode {
    Sync,
    Async,
}

/// 도구 핸들러
#[derive(Clone)]
pub enum ToolHandler {
    Sync(Arc<SyncToolFn>),
    Async(Arc<AsyncToolFn>),
}

impl ToolHandler {
    /// 동기 클로저로 생성
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    /// 비동기 클로저로 생성
    pub fn asynchronous<F, Fut>(f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self::Async(Arc::new(move |args| f(args).boxed()))
    }

    pub fn mode(&self) -> InvocationMode {
        match self {
            Self::Sync(_) => InvocationMode::Sync,
            Self::Async(_) => InvocationMode::Async,
        }
    }
}

impl std::fmt::Debug for ToolHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ToolHandler::{:?}", self.mode())
    }
}

// ============================================================================
// ToolDefinition
// ============================================================================

/// 도구 정의
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    name: String,
    owner: String,
    description: String,
    parameters: Vec<ToolParameter>,
    handler: ToolHandler,
}

impl ToolDefinition {
    /// 빌더 시작
    pub fn builder(name: impl Into<String>) -> ToolDefinitionBuilder {
        ToolDefinitionBuilder {
            name: name.into(),
            owner: String::new(),
            description: String::new(),
            parameters: Vec::new(),
            handler: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 소유 플러그인 이름
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// 선언 순서대로의 파라미터
    pub fn parameters(&self) -> &[ToolParameter] {
        &self.parameters
    }

    pub fn mode(&self) -> InvocationMode {
        self.handler.mode()
    }

    pub fn handler(&self) -> &ToolHandler {
        &self.handler
    }

    /// 소유자 교체
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    /// 호출 인자 검증
    ///
    /// 객체여야 하며(`null` 은 빈 객체), 모르는 인자/누락된 필수 인자/타입 불일치는
    /// `ToolValidation`. 빠진 선택 인자는 기본값으로 채웁니다.
    pub fn validate_args(&self, args: Value) -> Result<Map<String, Value>> {
        let mut args = match args {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(Error::tool_validation(
                    &self.name,
                    format!("arguments must be an object, got {}", json_type(&other)),
                ))
            }
        };

        if let Some(unknown) = args
            .keys()
            .find(|key| !self.parameters.iter().any(|p| &p.name == *key))
        {
            return Err(Error::tool_validation(
                &self.name,
                format!("unknown argument '{}'", unknown),
            ));
        }

        for param in &self.parameters {
            match args.get(&param.name) {
                Some(value) => {
                    if !param.param_type.accepts(value) {
                        return Err(Error::tool_validation(
                            &self.name,
                            format!(
                                "argument '{}' must be {}, got {}",
                                param.name,
                                param.param_type,
                                json_type(value)
                            ),
                        ));
                    }
                }
                None if param.required => {
                    return Err(Error::tool_validation(
                        &self.name,
                        format!("missing required argument '{}'", param.name),
                    ));
                }
                None => {
                    if let Some(default) = &param.default {
                        args.insert(param.name.clone(), default.clone());
                    }
                }
            }
        }

        Ok(args)
    }

    /// 외부 협력자용 스키마 (JSON Schema 형식)
    pub fn schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let mut prop = Map::new();
            if param.param_type != ParameterType::Any {
                prop.insert("type".into(), json!(param.param_type.as_str()));
            }
            if !param.description.is_empty() {
                prop.insert("description".into(), json!(param.description));
            }
            if let Some(default) = &param.default {
                prop.insert("default".into(), default.clone());
            }
            properties.insert(param.name.clone(), Value::Object(prop));

            if param.required {
                required.push(json!(param.name));
            }
        }

        json!({
            "name": self.name,
            "description": self.description,
            "owner": self.owner,
            "mode": self.mode(),
            "input_schema": {
                "type": "object",
                "properties": properties,
                "required": required,
            }
        })
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Builder
// ============================================================================

/// `ToolDefinition` 빌더
pub struct ToolDefinitionBuilder {
    name: String,
    owner: String,
    description: String,
    parameters: Vec<ToolParameter>,
    handler: Option<ToolHandler>,
}

impl ToolDefinitionBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    pub fn param(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn handler(mut self, handler: ToolHandler) -> Self {
        self.handler = Some(handler);
        self
    }

    /// 동기 핸들러 설정
    pub fn sync_handler<F>(self, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.handler(ToolHandler::sync(f))
    }

    /// 비동기 핸들러 설정
    pub fn async_handler<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.handler(ToolHandler::asynchronous(f))
    }

    /// 정의 완성
    pub fn build(self) -> Result<ToolDefinition> {
        if self.name.trim().is_empty() {
            return Err(Error::tool_validation(&self.name, "tool name must not be empty"));
        }

        let mut seen = HashSet::new();
        for param in &self.parameters {
            if param.name.is_empty() {
                return Err(Error::tool_validation(&self.name, "parameter name must not be empty"));
            }
            if !seen.insert(param.name.as_str()) {
                return Err(Error::tool_validation(
                    &self.name,
                    format!("duplicate parameter '{}'", param.name),
                ));
            }
            if let Some(default) = &param.default {
                if !param.param_type.accepts(default) {
                    return Err(Error::tool_validation(
                        &self.name,
                        format!(
                            "default for '{}' is not a valid {}",
                            param.name, param.param_type
                        ),
                    ));
                }
            }
        }

        let handler = self
            .handler
            .ok_or_else(|| Error::tool_validation(&self.name, "no handler provided"))?;

        Ok(ToolDefinition {
            name: self.name,
            owner: self.owner,
            description: self.description,
            parameters: self.parameters,
            handler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn export_tool() -> ToolDefinition {
        ToolDefinition::builder("export")
            .description("Export the current scene")
            .param(ToolParameter::new("path", ParameterType::String).with_description("Target file"))
            .param(ToolParameter::new("scale", ParameterType::Number).with_default(json!(1.0)))
            .param(ToolParameter::new("tags", ParameterType::Array).optional())
            .sync_handler(|args| Ok(args))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_rejects_bad_definitions() {
        let no_handler = ToolDefinition::builder("export").build();
        assert!(matches!(no_handler, Err(Error::ToolValidation { .. })));

        let duplicate = ToolDefinition::builder("export")
            .param(ToolParameter::new("path", ParameterType::String))
            .param(ToolParameter::new("path", ParameterType::String))
            .sync_handler(|_| Ok(Value::Null))
            .build();
        assert!(duplicate.is_err());

        let bad_default = ToolDefinition::builder("export")
            .param(ToolParameter::new("scale", ParameterType::Integer).with_default(json!("big")))
            .sync_handler(|_| Ok(Value::Null))
            .build();
        assert!(bad_default.is_err());
    }

    #[test]
    fn test_validate_args_fills_defaults() {
        let tool = export_tool();
        let args = tool.validate_args(json!({ "path": "out.glb" })).unwrap();

        assert_eq!(args["path"], "out.glb");
        assert_eq!(args["scale"], 1.0);
        assert!(!args.contains_key("tags"));
        assert_eq!(tool.mode(), InvocationMode::Sync);
    }

    #[test]
    fn test_validate_args_errors() {
        let tool = export_tool();

        assert!(tool.validate_args(json!({})).is_err());
        assert!(tool.validate_args(json!([1, 2])).is_err());
        assert!(tool.validate_args(json!({ "path": 3 })).is_err());
        assert!(tool
            .validate_args(json!({ "path": "a", "colour": "red" }))
            .is_err());
    }

    #[test]
    fn test_schema_shape() {
        let schema = export_tool().with_owner("exporter").schema();

        assert_eq!(schema["name"], "export");
        assert_eq!(schema["owner"], "exporter");
        assert_eq!(schema["mode"], "sync");
        assert_eq!(schema["input_schema"]["required"], json!(["path"]));
        assert_eq!(schema["input_schema"]["properties"]["scale"]["default"], 1.0);
    }
}
