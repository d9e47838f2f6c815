pub mod conversation;
pub mod gateway;
pub mod provider;
pub mod registry;
pub mod runtime;
pub mod schema;
pub mod tool;
pub mod tools;

pub use conversation::{Conversation, ConversationMessage};
pub use gateway::{GatewayError, ToolGateway};
pub use provider::{LlmError, ModelReply, ToolAwareLlmProvider};
pub use registry::{InvokeError, RegistryError, ToolRegistry};
pub use runtime::{Orchestrator, ToolCallRecord, TurnError, TurnOutcome, TurnState};
pub use schema::{validate, SchemaError, TypeMismatch};
pub use tool::{
    Arguments, InputSchema, PrimitiveType, PropertySchema, Tool, ToolCall, ToolCallResult,
    ToolDefinition, ToolError, ToolExecutor,
};
pub use tools::{default_registry, CalculateSumTool, EchoTool, GetWeatherTool};
