//! Input schema inference
//!
//! Turns a handler's parameter list into the ordered input schema published
//! with each tool, and validates incoming argument maps against it.

use schemars::schema::{InstanceType, Schema, SingleOrVec};
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::ToolError;
use crate::mcp::types::Arguments;

/// Parameter type as published in the input schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Boolean,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
        }
    }

    /// Map a JSON Schema type name; anything unrecognised is a string
    pub fn from_schema_type(name: &str) -> Self {
        match name {
            "number" | "integer" => ParamType::Number,
            "boolean" => ParamType::Boolean,
            _ => ParamType::String,
        }
    }

    fn from_instance_type(instance: &InstanceType) -> Self {
        match instance {
            InstanceType::Number | InstanceType::Integer => ParamType::Number,
            InstanceType::Boolean => ParamType::Boolean,
            _ => ParamType::String,
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared handler parameter: name, optional type annotation, optional default
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub name: String,
    pub annotation: Option<ParamType>,
    pub default: Option<Value>,
}

impl ParamDecl {
    /// An untyped parameter without a default
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotation: None,
            default: None,
        }
    }

    pub fn typed(name: impl Into<String>, annotation: ParamType) -> Self {
        Self::new(name).annotated(annotation)
    }

    pub fn annotated(mut self, annotation: ParamType) -> Self {
        self.annotation = Some(annotation);
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// One entry of an input schema
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub param_type: ParamType,
    pub required: bool,
    pub default: Option<Value>,
}

/// Ordered input schema of a tool
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSchema {
    params: Vec<Param>,
}

impl InputSchema {
    /// A schema for a tool that takes no arguments
    pub fn empty() -> Self {
        Self::default()
    }

    /// Infer the schema from a declared parameter list, keeping declaration order
    pub fn infer(decls: &[ParamDecl]) -> Self {
        let params = decls
            .iter()
            .map(|decl| Param {
                name: decl.name.clone(),
                param_type: decl.annotation.unwrap_or(ParamType::String),
                required: decl.default.is_none(),
                default: decl.default.clone(),
            })
            .collect();

        Self { params }
    }

    /// Infer the schema from a typed argument struct
    pub fn from_type<A: JsonSchema>() -> Self {
        let root = schema_for!(A);
        let Some(object) = root.schema.object.as_ref() else {
            return Self::empty();
        };

        let params = object
            .properties
            .iter()
            .map(|(name, schema)| {
                let (param_type, default) = match schema {
                    Schema::Object(obj) => {
                        let param_type = match &obj.instance_type {
                            Some(SingleOrVec::Single(instance)) => {
                                ParamType::from_instance_type(instance)
                            }
                            Some(SingleOrVec::Vec(instances)) => instances
                                .iter()
                                .find(|i| **i != InstanceType::Null)
                                .map(ParamType::from_instance_type)
                                .unwrap_or(ParamType::String),
                            None => ParamType::String,
                        };
                        let default = obj.metadata.as_ref().and_then(|m| m.default.clone());
                        (param_type, default)
                    }
                    Schema::Bool(_) => (ParamType::String, None),
                };

                Param {
                    name: name.clone(),
                    param_type,
                    required: object.required.contains(name.as_str()),
                    default,
                }
            })
            .collect();

        Self { params }
    }

    /// Parse the JSON Schema wire form back into an ordered schema
    pub fn from_json_schema(schema: &Value) -> Self {
        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let params = schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(name, prop)| Param {
                        name: name.clone(),
                        param_type: prop
                            .get("type")
                            .and_then(Value::as_str)
                            .map(ParamType::from_schema_type)
                            .unwrap_or(ParamType::String),
                        required: required.contains(&name.as_str()),
                        default: prop.get("default").cloned(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self { params }
    }

    /// Render as a JSON Schema object with properties in declaration order
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            let mut prop = Map::new();
            prop.insert("type".to_string(), json!(param.param_type.as_str()));
            if let Some(default) = &param.default {
                prop.insert("default".to_string(), default.clone());
            }
            properties.insert(param.name.clone(), Value::Object(prop));
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
        })
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|p| p.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Validate an argument map and fill in defaults for absent optional parameters.
    ///
    /// A `null` value counts as absent.
    pub fn prepare(&self, mut args: Arguments) -> Result<Arguments, ToolError> {
        if let Some(unexpected) = args.keys().find(|k| self.param(k).is_none()) {
            return Err(ToolError::UnexpectedArgument {
                name: unexpected.clone(),
            });
        }

        let mut prepared = Arguments::new();
        for param in &self.params {
            match args.remove(&param.name) {
                Some(value) if !value.is_null() => {
                    if !param.param_type.accepts(&value) {
                        return Err(ToolError::InvalidArgument {
                            name: param.name.clone(),
                            expected: param.param_type.to_string(),
                            found: json_type_name(&value).to_string(),
                        });
                    }
                    prepared.insert(param.name.clone(), value);
                }
                _ if param.required => {
                    return Err(ToolError::MissingArgument {
                        name: param.name.clone(),
                    });
                }
                _ => {
                    if let Some(default) = &param.default {
                        prepared.insert(param.name.clone(), default.clone());
                    }
                }
            }
        }

        Ok(prepared)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
