pub mod agent_loop;
pub mod dialect;
pub mod prompt;

pub use agent_loop::{AgentLoop, AgentLoopConfig, AgentOutcome};
pub use dialect::ToolCallDialect;
