use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::error::{DispatchError, HandlerError, RegistryError};
use crate::types::{Prompt, PromptArgument, PromptMessage, Resource, Tool};

pub type ToolFn = Arc<dyn Fn(&Map<String, Value>) -> Result<Value, HandlerError> + Send + Sync>;
pub type ResourceFn = Arc<dyn Fn() -> Result<String, HandlerError> + Send + Sync>;
pub type PromptFn =
    Arc<dyn Fn(&BTreeMap<String, String>) -> Result<Vec<PromptMessage>, HandlerError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Integer,
    Number,
    String,
    Boolean,
}

impl ParamKind {
    pub fn json_type(self) -> &'static str {
        match self {
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::String => "string",
            ParamKind::Boolean => "boolean",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            ParamKind::Integer => value.is_i64(),
            ParamKind::Number => value.is_number(),
            ParamKind::String => value.is_string(),
            ParamKind::Boolean => value.is_boolean(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }
}

pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
    handler: ToolFn,
}

impl ToolDescriptor {
    /// JSON schema advertised in tools/list.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            properties.insert(
                param.name.clone(),
                json!({ "type": param.kind.json_type() }),
            );
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    pub fn to_tool(&self) -> Tool {
        Tool {
            name: self.name.clone(),
            description: Some(self.description.clone()),
            input_schema: self.input_schema(),
        }
    }

    /// Check arguments against the declared parameters before the handler runs.
    pub fn validate(&self, arguments: &Map<String, Value>) -> Result<(), DispatchError> {
        for key in arguments.keys() {
            if !self.params.iter().any(|p| &p.name == key) {
                return Err(DispatchError::InvalidParams(format!(
                    "Unexpected argument '{}' for tool {}",
                    key, self.name
                )));
            }
        }
        for param in &self.params {
            match arguments.get(&param.name) {
                None if param.required => {
                    return Err(DispatchError::InvalidParams(format!(
                        "Missing required argument '{}' for tool {}",
                        param.name, self.name
                    )));
                }
                Some(value) if !param.kind.accepts(value) => {
                    return Err(DispatchError::InvalidParams(format!(
                        "Argument '{}' for tool {} must be of type {}",
                        param.name,
                        self.name,
                        param.kind.json_type()
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn call(&self, arguments: &Map<String, Value>) -> Result<Value, HandlerError> {
        (self.handler)(arguments)
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

pub struct ResourceDescriptor {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
    handler: ResourceFn,
}

impl ResourceDescriptor {
    pub fn to_resource(&self) -> Resource {
        Resource {
            uri: self.uri.clone(),
            name: self.name.clone(),
            description: Some(self.description.clone()),
            mime_type: Some(self.mime_type.clone()),
        }
    }

    pub fn read(&self) -> Result<String, HandlerError> {
        (self.handler)()
    }
}

impl fmt::Debug for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("uri", &self.uri)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A prompt parameter together with the value used when the client omits it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptParam {
    pub name: String,
    pub default: String,
}

impl PromptParam {
    pub fn new(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: default.into(),
        }
    }
}

pub struct PromptDescriptor {
    pub name: String,
    pub description: String,
    pub params: Vec<PromptParam>,
    handler: PromptFn,
}

impl PromptDescriptor {
    pub fn to_prompt(&self) -> Prompt {
        Prompt {
            name: self.name.clone(),
            description: Some(self.description.clone()),
            arguments: self
                .params
                .iter()
                .map(|p| PromptArgument {
                    name: p.name.clone(),
                    description: Some(format!("defaults to {:?}", p.default)),
                    required: false,
                })
                .collect(),
        }
    }

    /// Merge client arguments over the defaults. Values must be scalars;
    /// numbers and booleans are taken in their JSON text form.
    pub fn resolve_arguments(
        &self,
        arguments: &Map<String, Value>,
    ) -> Result<BTreeMap<String, String>, DispatchError> {
        let mut resolved: BTreeMap<String, String> = self
            .params
            .iter()
            .map(|p| (p.name.clone(), p.default.clone()))
            .collect();

        for (key, value) in arguments {
            if !resolved.contains_key(key) {
                return Err(DispatchError::InvalidParams(format!(
                    "Unexpected argument '{}' for prompt {}",
                    key, self.name
                )));
            }
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => continue,
                _ => {
                    return Err(DispatchError::InvalidParams(format!(
                        "Argument '{}' for prompt {} must be a string",
                        key, self.name
                    )));
                }
            };
            resolved.insert(key.clone(), text);
        }
        Ok(resolved)
    }

    pub fn render(
        &self,
        arguments: &BTreeMap<String, String>,
    ) -> Result<Vec<PromptMessage>, HandlerError> {
        (self.handler)(arguments)
    }
}

impl fmt::Debug for PromptDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Tools, resources and prompts known to the server. Built once at startup
/// and read-only afterwards; entries keep their registration order.
#[derive(Debug, Default)]
pub struct Registry {
    tools: Vec<ToolDescriptor>,
    resources: Vec<ResourceDescriptor>,
    prompts: Vec<PromptDescriptor>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn resources(&self) -> &[ResourceDescriptor] {
        &self.resources
    }

    pub fn prompts(&self) -> &[PromptDescriptor] {
        &self.prompts
    }

    pub fn tool(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn resource(&self, uri: &str) -> Option<&ResourceDescriptor> {
        self.resources.iter().find(|r| r.uri == uri)
    }

    pub fn prompt(&self, name: &str) -> Option<&PromptDescriptor> {
        self.prompts.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registry: Registry,
}

impl RegistryBuilder {
    pub fn register_tool<F>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        params: Vec<ParamSpec>,
        handler: F,
    ) -> Result<&mut Self, RegistryError>
    where
        F: Fn(&Map<String, Value>) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.registry.tool(&name).is_some() {
            return Err(RegistryError::DuplicateTool(name));
        }
        self.registry.tools.push(ToolDescriptor {
            name,
            description: description.into(),
            params,
            handler: Arc::new(handler),
        });
        Ok(self)
    }

    pub fn register_resource<F>(
        &mut self,
        uri: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        handler: F,
    ) -> Result<&mut Self, RegistryError>
    where
        F: Fn() -> Result<String, HandlerError> + Send + Sync + 'static,
    {
        let uri = uri.into();
        match uri.split_once("://") {
            Some((scheme, _)) if !scheme.is_empty() => {}
            _ => return Err(RegistryError::InvalidUri(uri)),
        }
        if self.registry.resource(&uri).is_some() {
            return Err(RegistryError::DuplicateResource(uri));
        }
        self.registry.resources.push(ResourceDescriptor {
            uri,
            name: name.into(),
            description: description.into(),
            mime_type: "text/plain".into(),
            handler: Arc::new(handler),
        });
        Ok(self)
    }

    pub fn register_prompt<F>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        params: Vec<PromptParam>,
        handler: F,
    ) -> Result<&mut Self, RegistryError>
    where
        F: Fn(&BTreeMap<String, String>) -> Result<Vec<PromptMessage>, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        let name = name.into();
        if self.registry.prompt(&name).is_some() {
            return Err(RegistryError::DuplicatePrompt(name));
        }
        self.registry.prompts.push(PromptDescriptor {
            name,
            description: description.into(),
            params,
            handler: Arc::new(handler),
        });
        Ok(self)
    }

    pub fn build(self) -> Registry {
        self.registry
    }
}
