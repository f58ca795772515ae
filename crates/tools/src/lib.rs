//! Built-in tools for agentloom.
//!
//! Local tools follow the tagged response contract enforced by the
//! registry; the stdio module extends the same contract to tools hosted
//! by a subprocess.

mod exchange_rate;
mod exit_loop;
mod fee_lookup;
mod recall_memory;
mod stdio;
mod user_info;

pub use exchange_rate::ExchangeRateTool;
pub use exit_loop::ExitLoopTool;
pub use fee_lookup::FeeLookupTool;
pub use recall_memory::RecallMemoryTool;
pub use stdio::{Capability, StdioServerParams, StdioToolset};
pub use user_info::{GetUserInfoTool, SaveUserInfoTool};

use agentloom_core::tool::ToolRegistry;

/// A registry preloaded with every built-in local tool.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ExitLoopTool));
    registry.register(Box::new(SaveUserInfoTool));
    registry.register(Box::new(GetUserInfoTool));
    registry.register(Box::new(FeeLookupTool));
    registry.register(Box::new(ExchangeRateTool));
    registry.register(Box::new(RecallMemoryTool));
    registry
}
