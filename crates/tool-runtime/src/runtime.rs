use crate::conversation::{Conversation, ConversationMessage};
use crate::gateway::{GatewayError, ToolGateway};
use crate::provider::{LlmError, ModelReply, ToolAwareLlmProvider};
use crate::tool::{ToolCall, ToolCallResult, ToolDefinition};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where the orchestrator is within the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    AwaitingUserInput,
    ModelTurn,
    ToolDispatch,
    ToolExecution,
    FinalAnswer,
}

/// One tool invocation made during a turn, with its outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRecord {
    pub call: ToolCall,
    pub result: ToolCallResult,
}

/// Result of a successfully completed turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Final assistant answer, also appended to history
    pub answer: String,
    /// Every tool call dispatched during the turn, in dispatch order
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of model calls made
    pub iterations: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("LLM error: {0}")]
    Model(#[from] LlmError),
    #[error("Failed to fetch tool catalog: {0}")]
    Catalog(GatewayError),
    #[error("Model kept requesting tools after {0} iterations")]
    IterationLimit(usize),
    #[error("Turn cancelled")]
    Cancelled,
    #[error("Empty user input")]
    EmptyInput,
}

/// Drives one conversation session: user input → model → tools → model → answer.
///
/// Owns the session history exclusively. A turn either completes, leaving
/// `user`, one `tool` message per dispatched call and the final `assistant`
/// message in history, or fails and leaves history exactly as it was before
/// the turn started.
pub struct Orchestrator {
    provider: Arc<dyn ToolAwareLlmProvider>,
    gateway: Arc<dyn ToolGateway>,
    conversation: Conversation,
    catalog: Option<Vec<ToolDefinition>>,
    state: TurnState,
    /// History length before the turn in flight; set while a turn runs.
    pending_checkpoint: Option<usize>,
    max_iterations: usize,
    model_timeout: Option<Duration>,
    tool_timeout: Option<Duration>,
    parallel_tool_calls: bool,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn ToolAwareLlmProvider>, gateway: Arc<dyn ToolGateway>) -> Self {
        Self {
            provider,
            gateway,
            conversation: Conversation::new(),
            catalog: None,
            state: TurnState::AwaitingUserInput,
            pending_checkpoint: None,
            max_iterations: 5,
            model_timeout: None,
            tool_timeout: None,
            parallel_tool_calls: false,
        }
    }

    /// Seed the session with a system prompt. It is never rolled back.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.conversation = Conversation::with_system_prompt(prompt);
        self
    }

    /// Model turns per user turn that are offered the tool catalog.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = Some(timeout);
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    /// Run independent tool calls of one model reply concurrently.
    /// Results are still appended in request order.
    pub fn with_parallel_tool_calls(mut self, parallel: bool) -> Self {
        self.parallel_tool_calls = parallel;
        self
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn history(&self) -> &[ConversationMessage] {
        self.conversation.messages()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Forget the cached catalog; the next turn fetches it again.
    pub fn refresh_catalog(&mut self) {
        self.catalog = None;
    }

    /// Clear history (keeping the system prompt) and the catalog cache.
    pub fn reset(&mut self) {
        self.recover_abandoned_turn();
        self.conversation.reset();
        self.catalog = None;
        self.state = TurnState::AwaitingUserInput;
    }

    /// Run a single user turn to completion.
    pub async fn run_turn(&mut self, input: &str) -> Result<TurnOutcome, TurnError> {
        self.run_turn_until(input, std::future::pending::<()>()).await
    }

    /// Run a single user turn, aborting it if `cancel` resolves first.
    /// A cancelled turn is rolled back like any other failure.
    pub async fn run_turn_until<C>(&mut self, input: &str, cancel: C) -> Result<TurnOutcome, TurnError>
    where
        C: Future<Output = ()>,
    {
        self.recover_abandoned_turn();

        let input = input.trim();
        if input.is_empty() {
            return Err(TurnError::EmptyInput);
        }

        let checkpoint = self.conversation.len();
        self.pending_checkpoint = Some(checkpoint);

        let result = {
            tokio::pin!(cancel);
            tokio::select! {
                outcome = self.drive_turn(input) => outcome,
                _ = &mut cancel => Err(TurnError::Cancelled),
            }
        };

        self.pending_checkpoint = None;
        self.state = TurnState::AwaitingUserInput;

        match result {
            Ok(outcome) => {
                info!(
                    iterations = outcome.iterations,
                    tool_calls = outcome.tool_calls.len(),
                    "Turn complete"
                );
                Ok(outcome)
            }
            Err(e) => {
                let removed = self.conversation.rollback_to(checkpoint);
                warn!(error = %e, removed, "Turn failed, history rolled back");
                Err(e)
            }
        }
    }

    /// Roll back a turn whose future was dropped before it finished.
    fn recover_abandoned_turn(&mut self) {
        if let Some(checkpoint) = self.pending_checkpoint.take() {
            let removed = self.conversation.rollback_to(checkpoint);
            warn!(removed, "Rolled back abandoned turn");
            self.state = TurnState::AwaitingUserInput;
        }
    }

    async fn drive_turn(&mut self, input: &str) -> Result<TurnOutcome, TurnError> {
        self.conversation.push(ConversationMessage::user(input));
        let catalog = self.catalog().await?;

        let mut dispatched = Vec::new();
        let mut iterations = 0;

        loop {
            let offer_tools = iterations < self.max_iterations;
            iterations += 1;
            self.state = TurnState::ModelTurn;
            debug!(iteration = iterations, offer_tools, "Calling model");

            let tools: &[ToolDefinition] = if offer_tools { &catalog } else { &[] };
            let reply = self.complete(tools).await?;

            let calls = match reply {
                ModelReply::Text(answer) => {
                    self.state = TurnState::FinalAnswer;
                    self.conversation.push(ConversationMessage::assistant(answer.clone()));
                    return Ok(TurnOutcome {
                        answer,
                        tool_calls: dispatched,
                        iterations,
                    });
                }
                ModelReply::ToolCalls(_) if !offer_tools => {
                    return Err(TurnError::IterationLimit(self.max_iterations));
                }
                ModelReply::ToolCalls(calls) if calls.is_empty() => {
                    return Err(TurnError::Model(LlmError::InvalidResponse(
                        "empty tool call list".into(),
                    )));
                }
                ModelReply::ToolCalls(calls) => calls,
            };

            self.state = TurnState::ToolDispatch;
            info!(count = calls.len(), "Executing tool calls");
            self.state = TurnState::ToolExecution;
            let results = self.dispatch(&calls).await;

            for (call, result) in calls.into_iter().zip(results) {
                self.conversation
                    .push(ConversationMessage::tool_result(&call, &result));
                dispatched.push(ToolCallRecord { call, result });
            }
        }
    }

    /// Cached catalog, fetched on first use.
    async fn catalog(&mut self) -> Result<Vec<ToolDefinition>, TurnError> {
        if let Some(catalog) = &self.catalog {
            return Ok(catalog.clone());
        }
        let catalog = self.gateway.list_tools().await.map_err(TurnError::Catalog)?;
        debug!(tools = catalog.len(), "Fetched tool catalog");
        self.catalog = Some(catalog.clone());
        Ok(catalog)
    }

    async fn complete(&self, tools: &[ToolDefinition]) -> Result<ModelReply, LlmError> {
        let call = self
            .provider
            .complete_with_tools(self.conversation.messages(), tools);
        match self.model_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| LlmError::Timeout(limit))?,
            None => call.await,
        }
    }

    async fn dispatch(&self, calls: &[ToolCall]) -> Vec<ToolCallResult> {
        let gateway = self.gateway.as_ref();
        if self.parallel_tool_calls {
            futures::future::join_all(
                calls
                    .iter()
                    .map(|call| call_tool_bounded(gateway, self.tool_timeout, call)),
            )
            .await
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(call_tool_bounded(gateway, self.tool_timeout, call).await);
            }
            results
        }
    }
}

/// Run one tool call, converting every failure into a failed result.
async fn call_tool_bounded(
    gateway: &dyn ToolGateway,
    limit: Option<Duration>,
    call: &ToolCall,
) -> ToolCallResult {
    let request = gateway.call_tool(&call.name, &call.arguments);
    let outcome = match limit {
        Some(limit) => tokio::time::timeout(limit, request)
            .await
            .unwrap_or_else(|_| {
                Err(GatewayError::Transport {
                    message: format!("tool call timed out after {:?}", limit),
                    timeout: true,
                    status: None,
                })
            }),
        None => request.await,
    };

    match outcome {
        Ok(result) => {
            debug!(tool = %call.name, id = %call.id, success = result.success, "Tool call finished");
            result
        }
        Err(e) => {
            warn!(tool = %call.name, id = %call.id, error = %e, "Tool call failed");
            ToolCallResult::failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockLlmProvider;
    use crate::registry::{InvokeError, ToolRegistry};
    use crate::tool::{Arguments, InputSchema, ToolError, ToolExecutor};
    use crate::tools::{default_registry, EchoTool};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-process gateway over a registry, counting catalog fetches.
    struct RegistryGateway {
        registry: ToolRegistry,
        list_calls: AtomicUsize,
        fail_listing: bool,
    }

    impl RegistryGateway {
        fn new(registry: ToolRegistry) -> Self {
            Self {
                registry,
                list_calls: AtomicUsize::new(0),
                fail_listing: false,
            }
        }
    }

    #[async_trait]
    impl ToolGateway for RegistryGateway {
        async fn list_tools(&self) -> Result<Vec<ToolDefinition>, GatewayError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_listing {
                return Err(GatewayError::Transport {
                    message: "connection refused".into(),
                    timeout: false,
                    status: None,
                });
            }
            Ok(self.registry.list())
        }

        async fn call_tool(&self, name: &str, arguments: &Arguments) -> Result<ToolCallResult, GatewayError> {
            self.registry.invoke(name, arguments).await.map_err(|e| {
                let code = match e {
                    InvokeError::ToolNotFound(_) => -32601,
                    InvokeError::InvalidArguments { .. } => -32602,
                };
                GatewayError::Rpc {
                    code,
                    message: e.to_string(),
                }
            })
        }
    }

    struct SlowTool;

    #[async_trait]
    impl ToolExecutor for SlowTool {
        async fn execute(&self, _arguments: &Arguments) -> Result<Value, ToolError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(json!("late"))
        }
    }

    fn setup() -> (Orchestrator, Arc<MockLlmProvider>, Arc<RegistryGateway>) {
        let mut registry = default_registry().unwrap();
        registry.register_tool(EchoTool).unwrap();
        setup_with(RegistryGateway::new(registry))
    }

    fn setup_with(gateway: RegistryGateway) -> (Orchestrator, Arc<MockLlmProvider>, Arc<RegistryGateway>) {
        let provider = Arc::new(MockLlmProvider::new());
        let gateway = Arc::new(gateway);
        let orchestrator = Orchestrator::new(
            provider.clone() as Arc<dyn ToolAwareLlmProvider>,
            gateway.clone() as Arc<dyn ToolGateway>,
        );
        (orchestrator, provider, gateway)
    }

    #[tokio::test]
    async fn test_simple_text_response() {
        let (mut orch, provider, _) = setup();
        provider.queue_text("Hello, I'm an AI assistant!");

        let outcome = orch.run_turn("Hello").await.unwrap();

        assert_eq!(outcome.answer, "Hello, I'm an AI assistant!");
        assert_eq!(outcome.iterations, 1);
        assert!(outcome.tool_calls.is_empty());
        assert_eq!(orch.history().len(), 2);
        assert_eq!(orch.state(), TurnState::AwaitingUserInput);

        let requests = provider.requests();
        assert_eq!(requests[0].tools.len(), 3);
        assert_eq!(requests[0].messages, vec![ConversationMessage::user("Hello")]);
    }

    #[tokio::test]
    async fn test_weather_turn_appends_three_entries() {
        let (mut orch, provider, _) = setup();
        provider.queue_tool_call("call_1", "get_weather", json!({"city": "Paris"}));
        provider.queue_text("It's sunny in Paris.");

        let before = orch.history().len();
        let outcome = orch.run_turn("What's the weather in Paris?").await.unwrap();

        assert_eq!(orch.history().len(), before + 3);
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.tool_calls.len(), 1);
        assert!(outcome.tool_calls[0].result.success);

        match &orch.history()[1] {
            ConversationMessage::Tool {
                tool_call_id,
                content,
                ..
            } => {
                assert_eq!(tool_call_id, "call_1");
                assert_eq!(content, "Paris: sunny, 25°C");
            }
            other => panic!("expected tool message, got {other:?}"),
        }
        assert_eq!(
            orch.history()[2],
            ConversationMessage::assistant("It's sunny in Paris.")
        );

        // Follow-up sees the tool result.
        let second = &provider.requests()[1];
        assert_eq!(second.messages.len(), 2);
        assert_eq!(second.messages[1].role(), "tool");
    }

    #[tokio::test]
    async fn test_multiple_calls_appended_in_request_order() {
        let (mut orch, provider, _) = setup();
        provider.queue_tool_calls(vec![
            ("call_a", "calculate_sum", json!({"a": 1, "b": 2})),
            ("call_b", "echo", json!({"message": "hi"})),
        ]);
        provider.queue_text("3 and hi");

        let outcome = orch.run_turn("do both").await.unwrap();

        assert_eq!(orch.history().len(), 4);
        let ids: Vec<&str> = outcome
            .tool_calls
            .iter()
            .map(|r| r.call.id.as_str())
            .collect();
        assert_eq!(ids, vec!["call_a", "call_b"]);
        assert_eq!(orch.history()[1].content(), "1 + 2 = 3");
        assert_eq!(orch.history()[2].content(), "hi");
    }

    #[tokio::test]
    async fn test_parallel_dispatch_keeps_request_order() {
        let (orch, provider, _) = setup();
        let mut orch = orch.with_parallel_tool_calls(true);
        provider.queue_tool_calls(vec![
            ("call_a", "echo", json!({"message": "first"})),
            ("call_b", "echo", json!({"message": "second"})),
            ("call_c", "echo", json!({"message": "third"})),
        ]);
        provider.queue_text("done");

        orch.run_turn("go").await.unwrap();

        let contents: Vec<&str> = orch.history()[1..4].iter().map(|m| m.content()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_tool_failures_are_narrated_to_the_model() {
        let (mut orch, provider, _) = setup();
        provider.queue_tool_calls(vec![
            ("call_1", "unknown_tool", json!({})),
            ("call_2", "get_weather", json!({})),
        ]);
        provider.queue_text("Sorry, I couldn't check.");

        let outcome = orch.run_turn("weather?").await.unwrap();

        assert_eq!(orch.history().len(), 4);
        assert!(outcome.tool_calls.iter().all(|r| !r.result.success));
        assert!(orch.history()[1].content().starts_with("Error: RPC error -32601"));
        assert!(orch.history()[2].content().starts_with("Error: RPC error -32602"));
        assert!(orch.history()[2].content().contains("city"));
    }

    #[tokio::test]
    async fn test_model_failure_rolls_back_turn() {
        let (mut orch, provider, _) = setup();
        provider.queue_text("first answer");
        orch.run_turn("first").await.unwrap();
        let before = orch.history().len();

        provider.queue_error(LlmError::AuthError);
        let err = orch.run_turn("second").await.unwrap_err();

        assert!(matches!(err, TurnError::Model(LlmError::AuthError)));
        assert_eq!(orch.history().len(), before);

        provider.queue_text("recovered");
        orch.run_turn("third").await.unwrap();
        assert_eq!(orch.history().len(), before + 2);
        assert_eq!(orch.history()[before].content(), "third");
    }

    #[tokio::test]
    async fn test_model_failure_after_tools_rolls_back_tool_messages() {
        let (mut orch, provider, _) = setup();
        provider.queue_tool_call("call_1", "echo", json!({"message": "x"}));
        provider.queue_error(LlmError::RateLimited { retry_after_secs: 5 });

        let err = orch.run_turn("echo x").await.unwrap_err();

        assert!(matches!(err, TurnError::Model(LlmError::RateLimited { .. })));
        assert!(orch.history().is_empty());
    }

    #[tokio::test]
    async fn test_iteration_cap_forces_final_answer_without_catalog() {
        let (orch, provider, _) = setup();
        let mut orch = orch.with_max_iterations(1);
        provider.queue_tool_call("call_1", "echo", json!({"message": "x"}));
        provider.queue_text("final");

        let outcome = orch.run_turn("loop").await.unwrap();

        assert_eq!(outcome.answer, "final");
        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert!(!requests[0].tools.is_empty());
        assert!(requests[1].tools.is_empty());
    }

    #[tokio::test]
    async fn test_iteration_limit_fails_and_rolls_back() {
        let (orch, provider, _) = setup();
        let mut orch = orch.with_max_iterations(2);
        for i in 0..3 {
            provider.queue_tool_call(&format!("call_{i}"), "echo", json!({"message": "again"}));
        }

        let err = orch.run_turn("loop forever").await.unwrap_err();

        assert!(matches!(err, TurnError::IterationLimit(2)));
        assert!(orch.history().is_empty());
        assert_eq!(provider.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_catalog_is_cached_per_session() {
        let (mut orch, provider, gateway) = setup();
        provider.queue_text("one");
        provider.queue_text("two");
        provider.queue_text("three");

        orch.run_turn("a").await.unwrap();
        orch.run_turn("b").await.unwrap();
        assert_eq!(gateway.list_calls.load(Ordering::SeqCst), 1);

        orch.refresh_catalog();
        orch.run_turn("c").await.unwrap();
        assert_eq!(gateway.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_catalog_failure_rolls_back() {
        let mut gateway = RegistryGateway::new(ToolRegistry::new());
        gateway.fail_listing = true;
        let (mut orch, provider, _) = setup_with(gateway);

        let err = orch.run_turn("hello").await.unwrap_err();

        assert!(matches!(err, TurnError::Catalog(GatewayError::Transport { .. })));
        assert!(orch.history().is_empty());
        assert!(provider.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_model_timeout_rolls_back() {
        let (orch, provider, _) = setup();
        let mut orch = orch.with_model_timeout(Duration::from_secs(1));
        provider.queue_delayed_text("too late", Duration::from_secs(30));

        let err = orch.run_turn("hello").await.unwrap_err();

        assert!(matches!(err, TurnError::Model(LlmError::Timeout(_))));
        assert!(orch.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tool_timeout_becomes_failed_result() {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolDefinition::new("slow", "sleeps", InputSchema::object()),
                SlowTool,
            )
            .unwrap();
        let (orch, provider, _) = setup_with(RegistryGateway::new(registry));
        let mut orch = orch.with_tool_timeout(Duration::from_secs(2));
        provider.queue_tool_call("call_1", "slow", json!({}));
        provider.queue_text("the tool timed out");

        let outcome = orch.run_turn("be slow").await.unwrap();

        assert!(!outcome.tool_calls[0].result.success);
        assert!(orch.history()[1].content().contains("timed out"));
        assert_eq!(orch.history().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_rolls_back() {
        let (mut orch, provider, _) = setup();
        provider.queue_delayed_text("never seen", Duration::from_secs(30));

        let err = orch
            .run_turn_until("hello", tokio::time::sleep(Duration::from_secs(1)))
            .await
            .unwrap_err();

        assert!(matches!(err, TurnError::Cancelled));
        assert!(orch.history().is_empty());
        assert_eq!(orch.state(), TurnState::AwaitingUserInput);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_turn_is_rolled_back_on_next_turn() {
        let (mut orch, provider, _) = setup();
        provider.queue_delayed_text("never seen", Duration::from_secs(30));

        let abandoned = tokio::time::timeout(Duration::from_secs(1), orch.run_turn("lost")).await;
        assert!(abandoned.is_err());

        provider.queue_text("fresh");
        orch.run_turn("again").await.unwrap();

        assert_eq!(
            orch.history(),
            &[
                ConversationMessage::user("again"),
                ConversationMessage::assistant("fresh"),
            ]
        );
    }

    #[tokio::test]
    async fn test_system_prompt_survives_rollback_and_reset() {
        let (orch, provider, _) = setup();
        let mut orch = orch.with_system_prompt("You are helpful.");
        provider.queue_error(LlmError::NetworkError("down".into()));

        orch.run_turn("hi").await.unwrap_err();
        assert_eq!(orch.history(), &[ConversationMessage::system("You are helpful.")]);

        provider.queue_text("hello");
        orch.run_turn("hi").await.unwrap();
        orch.reset();
        assert_eq!(orch.history().len(), 1);
        assert_eq!(provider.requests()[1].messages[0].role(), "system");
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected_without_side_effects() {
        let (mut orch, provider, gateway) = setup();
        let err = orch.run_turn("   ").await.unwrap_err();
        assert!(matches!(err, TurnError::EmptyInput));
        assert!(orch.history().is_empty());
        assert!(provider.requests().is_empty());
        assert_eq!(gateway.list_calls.load(Ordering::SeqCst), 0);
    }
}
