use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use persona_core::completion::CompletionService;
use persona_core::ids::ThreadId;
use persona_core::messages::{Message, ToolCallBlock};
use persona_core::state::ConversationState;
use persona_core::tools::ToolContext;
use persona_store::CheckpointRepo;

use crate::assistant::Assistant;
use crate::error::EngineError;
use crate::registry::ToolRegistry;
use crate::router::{Router, RouterState};

/// Configuration for the conversation engine.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Upper bound on assistant steps per turn; trips before a tool-call
    /// loop can run away.
    pub max_steps: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_steps: 25 }
    }
}

/// One user turn, request-scoped. Carries the identity that tools need so
/// no process-wide state has to.
#[derive(Clone, Debug)]
pub struct TurnRequest {
    pub thread_id: ThreadId,
    pub user_id: i64,
    pub user_text: String,
}

/// Drives a turn through the graph: assistant step → route → tool dispatch
/// → assistant step, checkpointing after every step, until the router
/// reaches `Terminal`.
pub struct ConversationEngine {
    completion: Arc<dyn CompletionService>,
    registry: Arc<ToolRegistry>,
    checkpoints: CheckpointRepo,
    assistant: Assistant,
    turn_locks: DashMap<ThreadId, Arc<Mutex<()>>>,
    config: EngineConfig,
}

impl ConversationEngine {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        registry: Arc<ToolRegistry>,
        checkpoints: CheckpointRepo,
        config: EngineConfig,
    ) -> Self {
        let assistant = Assistant::new(Arc::clone(&completion), registry.definitions());
        Self {
            completion,
            registry,
            checkpoints,
            assistant,
            turn_locks: DashMap::new(),
            config,
        }
    }

    /// Run one conversation turn and return the final answer text.
    ///
    /// Turns for the same thread are serialized; different threads proceed
    /// independently.
    #[instrument(skip(self, request), fields(thread_id = %request.thread_id, user_id = request.user_id))]
    pub async fn converse(&self, request: &TurnRequest) -> Result<String, EngineError> {
        let lock = self
            .turn_locks
            .entry(request.thread_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let mut state = self
            .checkpoints
            .load(&request.thread_id)?
            .unwrap_or_default();
        state.merge(vec![Message::user_text(&request.user_text)]);
        self.checkpoints.save(&request.thread_id, &state)?;

        let ctx = ToolContext {
            thread_id: request.thread_id.clone(),
            user_id: request.user_id,
            completion: Arc::clone(&self.completion),
        };

        let mut router = Router::new();
        for step in 0..self.config.max_steps {
            let response = self.assistant.step(&mut state).await?;
            self.checkpoints.save(&request.thread_id, &state)?;

            match router.observe(&state.messages)? {
                RouterState::Terminal => {
                    info!(step, "turn complete");
                    return Ok(response.content);
                }
                RouterState::DispatchingTool => {
                    let results = self.dispatch_tools(&response.tool_calls, &ctx).await?;
                    state.merge(results);
                    router.dispatched()?;
                    self.checkpoints.save(&request.thread_id, &state)?;
                }
                RouterState::AwaitingAssistant => unreachable!("observe never yields this"),
            }
        }

        Err(EngineError::MaxStepsExceeded(self.config.max_steps))
    }

    /// Execute each requested tool call in order, appending one tool message
    /// per call. Tool failures degrade into the message content; an unknown
    /// tool name is fatal.
    async fn dispatch_tools(
        &self,
        tool_calls: &[ToolCallBlock],
        ctx: &ToolContext,
    ) -> Result<Vec<Message>, EngineError> {
        let mut results = Vec::with_capacity(tool_calls.len());

        for tc in tool_calls {
            let tool = self
                .registry
                .get(&tc.name)
                .ok_or_else(|| EngineError::UnknownTool(tc.name.clone()))?;

            let content = match tool.execute(tc.arguments.clone(), ctx).await {
                Ok(r) if r.is_error => format!("[error] {}", r.content),
                Ok(r) => r.content,
                Err(e) => {
                    warn!(tool = %tc.name, error = %e, "tool execution failed");
                    format!("[error] {e}")
                }
            };

            results.push(Message::tool_result(tc.id.clone(), content));
        }

        Ok(results)
    }

    /// Load a thread's state as last checkpointed (for inspection/tests).
    pub fn checkpointed_state(
        &self,
        thread_id: &ThreadId,
    ) -> Result<Option<ConversationState>, EngineError> {
        Ok(self.checkpoints.load(thread_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    use persona_core::errors::CompletionError;
    use persona_core::ids::ToolCallId;
    use persona_core::messages::AssistantMessage;
    use persona_llm::MockCompletion;
    use persona_store::Database;

    use crate::profile::Profile;
    use crate::tools::create_default_registry;

    fn engine_with(completion: MockCompletion, config: EngineConfig) -> ConversationEngine {
        let registry = Arc::new(create_default_registry(Arc::new(Profile::builtin()), false));
        let checkpoints = CheckpointRepo::new(Database::in_memory().unwrap());
        ConversationEngine::new(Arc::new(completion), registry, checkpoints, config)
    }

    fn turn(user_text: &str) -> TurnRequest {
        TurnRequest {
            thread_id: ThreadId::for_user(1),
            user_id: 1,
            user_text: user_text.into(),
        }
    }

    fn profile_call() -> ToolCallBlock {
        ToolCallBlock {
            id: ToolCallId::new(),
            name: "collect_personal_data".into(),
            arguments: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn plain_answer_terminates_immediately() {
        let engine = engine_with(MockCompletion::texts(&["Hello!"]), EngineConfig::default());
        let answer = engine.converse(&turn("hi")).await.unwrap();
        assert_eq!(answer, "Hello!");
    }

    #[tokio::test]
    async fn profile_question_end_to_end() {
        let mock = MockCompletion::tool_call_then_text(
            vec![profile_call()],
            "Saurabh's highest education is a Master of Computer Application.",
        );
        let engine = engine_with(mock, EngineConfig::default());

        let answer = engine
            .converse(&turn("What is Saurabh's highest education?"))
            .await
            .unwrap();
        assert!(answer.contains("Master of Computer Application"));

        // The tool result landed in the checkpointed history with the
        // profile payload for the model to read.
        let state = engine
            .checkpointed_state(&ThreadId::for_user(1))
            .unwrap()
            .unwrap();
        assert_eq!(state.messages.len(), 4); // user, assistant(tool call), tool, assistant
        let tool_msg = &state.messages[2];
        assert!(tool_msg.content().contains("Master of Computer Application"));
        assert!(matches!(tool_msg, Message::Tool(_)));
    }

    #[tokio::test]
    async fn date_question_end_to_end() {
        let today = Local::now().format("%Y-%m-%d").to_string();
        let extraction = format!(
            r#"{{"date_reference_present": true, "start_date": "{today}", "end_date": "{today}"}}"#
        );
        let spoken = Local::now().format("%A, %Y-%m-%d").to_string();

        // Call order: assistant requests the tool, the tool's nested
        // extraction call, then the final answer.
        let mock = MockCompletion::new(vec![
            Ok(AssistantMessage::with_tool_calls(
                "",
                vec![ToolCallBlock {
                    id: ToolCallId::new(),
                    name: "handle_date_question".into(),
                    arguments: serde_json::json!({"user_query": "What's today's date?"}),
                }],
            )),
            Ok(AssistantMessage::text(&extraction)),
            Ok(AssistantMessage::text(format!("Today is {spoken}."))),
        ]);
        let engine = engine_with(mock, EngineConfig::default());

        let answer = engine.converse(&turn("What's today's date?")).await.unwrap();
        assert!(answer.contains(&spoken));

        let state = engine
            .checkpointed_state(&ThreadId::for_user(1))
            .unwrap()
            .unwrap();
        let tool_payload: serde_json::Value =
            serde_json::from_str(state.messages[2].content()).unwrap();
        assert_eq!(tool_payload["date_reference_present"], true);
        assert!(tool_payload["today"].as_str().unwrap().contains(&today));
    }

    #[tokio::test]
    async fn threads_resume_from_checkpoints() {
        let engine = engine_with(
            MockCompletion::texts(&["first answer", "second answer"]),
            EngineConfig::default(),
        );

        engine.converse(&turn("first question")).await.unwrap();
        engine.converse(&turn("second question")).await.unwrap();

        let state = engine
            .checkpointed_state(&ThreadId::for_user(1))
            .unwrap()
            .unwrap();
        let contents: Vec<&str> = state.messages.iter().map(|m| m.content()).collect();
        assert_eq!(
            contents,
            vec!["first question", "first answer", "second question", "second answer"]
        );
    }

    #[tokio::test]
    async fn unknown_tool_is_fatal() {
        let mock = MockCompletion::tool_call_then_text(
            vec![ToolCallBlock {
                id: ToolCallId::new(),
                name: "reboot_production".into(),
                arguments: serde_json::json!({}),
            }],
            "never reached",
        );
        let engine = engine_with(mock, EngineConfig::default());

        let err = engine.converse(&turn("hi")).await.unwrap_err();
        assert!(matches!(err, EngineError::UnknownTool(name) if name == "reboot_production"));
    }

    #[tokio::test]
    async fn completion_failure_is_fatal_for_the_turn() {
        let engine = engine_with(
            MockCompletion::new(vec![Err(CompletionError::ServerError {
                status: 500,
                body: "upstream".into(),
            })]),
            EngineConfig::default(),
        );

        let err = engine.converse(&turn("hi")).await.unwrap_err();
        assert!(matches!(err, EngineError::Completion(_)));
    }

    #[tokio::test]
    async fn tool_failure_stays_inside_the_conversation() {
        // The open-world tool's nested completion call fails; the turn
        // still finishes with the follow-up answer.
        let mock = MockCompletion::new(vec![
            Ok(AssistantMessage::with_tool_calls(
                "",
                vec![ToolCallBlock {
                    id: ToolCallId::new(),
                    name: "handle_open_world_question".into(),
                    arguments: serde_json::json!({"user_query": "what is the speed of light?"}),
                }],
            )),
            Err(CompletionError::NetworkError("refused".into())),
            Ok(AssistantMessage::text("I could not look that up.")),
        ]);
        let engine = engine_with(mock, EngineConfig::default());

        let answer = engine.converse(&turn("speed of light?")).await.unwrap();
        assert_eq!(answer, "I could not look that up.");

        let state = engine
            .checkpointed_state(&ThreadId::for_user(1))
            .unwrap()
            .unwrap();
        assert!(state.messages[2]
            .content()
            .contains("Failed to answer Open Ended user query"));
        assert!(state.messages[2].content().starts_with("[error]"));
    }

    #[tokio::test]
    async fn runaway_tool_loop_trips_max_steps() {
        let engine = engine_with(
            MockCompletion::new(vec![
                Ok(AssistantMessage::with_tool_calls("", vec![profile_call()])),
                Ok(AssistantMessage::with_tool_calls("", vec![profile_call()])),
            ]),
            EngineConfig { max_steps: 2 },
        );

        let err = engine.converse(&turn("loop forever")).await.unwrap_err();
        assert!(matches!(err, EngineError::MaxStepsExceeded(2)));
    }
}
