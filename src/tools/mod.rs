pub mod builtin;
pub mod catalog;
pub mod definition;
pub mod executor;
pub mod security;

pub use catalog::ToolCatalog;
pub use definition::ToolDefinition;
pub use executor::{Tool, ToolInvoker, ToolRegistry};
