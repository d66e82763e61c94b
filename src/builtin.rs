//! Built-in demo tools
//!
//! Small numeric and text tools served by the `simple-mcp-server` binary.

use schemars::JsonSchema;
use serde::Deserialize;

use crate::error::RegistryError;
use crate::mcp::tools::ToolRegistry;

#[derive(Debug, Deserialize, JsonSchema)]
struct BinaryArgs {
    a: f64,
    b: f64,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct TextArgs {
    text: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct NoArgs {}

/// Register every built-in tool, in listing order
pub fn register_all(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    registry.register_typed("add", "Add two numbers", |args: BinaryArgs| async move {
        Ok(args.a + args.b)
    })?;

    registry.register_typed("multiply", "Multiply two numbers", |args: BinaryArgs| async move {
        Ok(args.a * args.b)
    })?;

    registry.register_typed("get_current_time", "Get current date and time", |_: NoArgs| async {
        Ok(chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string())
    })?;

    registry.register_typed("uppercase", "Convert text to uppercase", |args: TextArgs| async move {
        Ok(args.text.to_uppercase())
    })?;

    registry.register_typed("count_words", "Count words in text", |args: TextArgs| async move {
        Ok(args.text.split_whitespace().count())
    })?;

    Ok(())
}

/// A registry holding only the built-in tools
pub fn registry() -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    register_all(&mut registry)?;
    Ok(registry)
}
