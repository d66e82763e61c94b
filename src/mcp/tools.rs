//! Tool definitions and registry
//!
//! A tool is a descriptor (name, description, input schema) bound to a
//! handler. The registry is filled once at startup and is read-only after
//! that, so it can be shared behind an `Arc` without locking.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{RegistryError, ToolError};
use crate::mcp::schema::InputSchema;
use crate::mcp::types::Arguments;

/// Self-description of a tool
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: InputSchema,
}

/// Invocable body of a tool
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: Arguments) -> Result<Value, ToolError>;
}

/// Adapts an async closure into a [`ToolHandler`]
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(Arguments) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
{
    async fn call(&self, args: Arguments) -> Result<Value, ToolError> {
        (self.0)(args).await
    }
}

/// Handler taking a deserialized argument struct
struct TypedHandler<A, F> {
    f: F,
    _args: std::marker::PhantomData<fn(A)>,
}

#[async_trait]
impl<A, F, Fut, R> ToolHandler for TypedHandler<A, F>
where
    A: DeserializeOwned + Send + 'static,
    F: Fn(A) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, ToolError>> + Send + 'static,
    R: Serialize + Send + 'static,
{
    async fn call(&self, args: Arguments) -> Result<Value, ToolError> {
        let typed: A = serde_json::from_value(Value::Object(args)).map_err(|e| {
            ToolError::InvalidArguments {
                message: e.to_string(),
            }
        })?;
        let output = (self.f)(typed).await?;
        serde_json::to_value(output).map_err(|e| ToolError::execution(e.to_string()))
    }
}

/// A registered tool
#[derive(Clone)]
pub struct Tool {
    descriptor: ToolDescriptor,
    handler: Arc<dyn ToolHandler>,
}

impl Tool {
    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Validate `args` against the input schema and run the handler.
    ///
    /// A panicking handler is reported as [`ToolError::Panicked`].
    pub async fn invoke(&self, args: Arguments) -> Result<Value, ToolError> {
        let args = self.descriptor.input_schema.prepare(args)?;

        match AssertUnwindSafe(self.handler.call(args)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => Err(ToolError::Panicked),
        }
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Catalog of tools keyed by name, in registration order
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; names must be unique
    pub fn register<H>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: InputSchema,
        handler: H,
    ) -> Result<(), RegistryError>
    where
        H: ToolHandler + 'static,
    {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(RegistryError::DuplicateTool { name });
        }

        debug!(tool = %name, params = input_schema.len(), "Registering tool");

        self.index.insert(name.clone(), self.tools.len());
        self.tools.push(Tool {
            descriptor: ToolDescriptor {
                name,
                description: description.into(),
                input_schema,
            },
            handler: Arc::new(handler),
        });
        Ok(())
    }

    /// Register an async closure over the raw argument map
    pub fn register_fn<F, Fut>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: InputSchema,
        f: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        self.register(name, description, input_schema, FnHandler(f))
    }

    /// Register an async closure over a typed argument struct.
    ///
    /// The input schema is inferred from `A`.
    pub fn register_typed<A, F, Fut, R>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        f: F,
    ) -> Result<(), RegistryError>
    where
        A: DeserializeOwned + JsonSchema + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ToolError>> + Send + 'static,
        R: Serialize + Send + 'static,
    {
        let handler = TypedHandler {
            f,
            _args: std::marker::PhantomData,
        };
        self.register(name, description, InputSchema::from_type::<A>(), handler)
    }

    /// Descriptors in registration order
    pub fn list(&self) -> Vec<&ToolDescriptor> {
        self.tools.iter().map(Tool::descriptor).collect()
    }

    pub fn get(&self, name: &str) -> Result<&Tool, RegistryError> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| RegistryError::ToolNotFound {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::schema::{ParamDecl, ParamType};
    use serde::Deserialize;
    use serde_json::json;

    fn echo_registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry
            .register_fn(
                "echo",
                "Echo the text back",
                InputSchema::infer(&[ParamDecl::typed("text", ParamType::String)]),
                |args: Arguments| async move { Ok(args["text"].clone()) },
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = echo_registry();
        let err = registry
            .register_fn("echo", "again", InputSchema::empty(), |_| async {
                Ok(Value::Null)
            })
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateTool {
                name: "echo".to_string()
            }
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list()[0].description, "Echo the text back");
    }

    #[test]
    fn test_list_keeps_registration_order() {
        let mut registry = echo_registry();
        registry
            .register_fn("alpha", "", InputSchema::empty(), |_| async { Ok(Value::Null) })
            .unwrap();
        let names: Vec<&str> = registry.list().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["echo", "alpha"]);
    }

    #[test]
    fn test_get_unknown() {
        let registry = echo_registry();
        assert!(matches!(
            registry.get("nope"),
            Err(RegistryError::ToolNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_invoke_validates_first() {
        let registry = echo_registry();
        let tool = registry.get("echo").unwrap();

        let ok = tool.invoke(Arguments::from_iter([("text".to_string(), json!("hi"))])).await;
        assert_eq!(ok, Ok(json!("hi")));

        let missing = tool.invoke(Arguments::new()).await;
        assert!(matches!(missing, Err(ToolError::MissingArgument { .. })));
    }

    #[tokio::test]
    async fn test_panicking_handler_is_contained() {
        let mut registry = ToolRegistry::new();
        registry
            .register_fn("boom", "", InputSchema::empty(), |_| async {
                if true {
                    panic!("handler bug");
                }
                Ok(Value::Null)
            })
            .unwrap();

        let result = registry.get("boom").unwrap().invoke(Arguments::new()).await;
        assert_eq!(result, Err(ToolError::Panicked));
    }

    #[derive(Deserialize, JsonSchema)]
    struct ScaleArgs {
        value: f64,
        #[serde(default = "default_factor")]
        factor: f64,
    }

    fn default_factor() -> f64 {
        2.0
    }

    #[tokio::test]
    async fn test_typed_registration() {
        let mut registry = ToolRegistry::new();
        registry
            .register_typed("scale", "Scale a value", |args: ScaleArgs| async move {
                Ok(args.value * args.factor)
            })
            .unwrap();

        let tool = registry.get("scale").unwrap();
        let names: Vec<&str> = tool.descriptor().input_schema.names().collect();
        assert_eq!(names, vec!["value", "factor"]);
        assert!(!tool.descriptor().input_schema.params()[1].required);

        let result = tool
            .invoke(Arguments::from_iter([("value".to_string(), json!(4.0))]))
            .await
            .unwrap();
        assert_eq!(result, json!(8.0));
    }
}
