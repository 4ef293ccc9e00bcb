use persona_core::messages::Message;

/// Where the graph currently is in a turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouterState {
    /// The assistant node runs next (or just ran and awaits classification).
    AwaitingAssistant,
    /// The latest assistant response carries tool calls to execute.
    DispatchingTool,
    /// The latest assistant response is the final answer; the run ends.
    Terminal,
}

/// Routing is exhaustive and fails closed: a response that is neither a
/// plain answer nor a tool-call request ends the turn with an error rather
/// than a guess.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("nothing to route: message history is empty")]
    EmptyHistory,

    #[error("latest message is not an assistant response (role: {0})")]
    UnexpectedRole(&'static str),

    #[error("invalid transition from {0:?}")]
    InvalidTransition(RouterState),
}

#[derive(Debug)]
pub struct Router {
    state: RouterState,
}

impl Router {
    pub fn new() -> Self {
        Self {
            state: RouterState::AwaitingAssistant,
        }
    }

    pub fn state(&self) -> &RouterState {
        &self.state
    }

    /// Classify the latest message after an assistant step. Only legal from
    /// `AwaitingAssistant`; transitions to `Terminal` or `DispatchingTool`.
    pub fn observe(&mut self, messages: &[Message]) -> Result<RouterState, RouteError> {
        if self.state != RouterState::AwaitingAssistant {
            return Err(RouteError::InvalidTransition(self.state.clone()));
        }

        let latest = messages.last().ok_or(RouteError::EmptyHistory)?;
        let assistant = match latest {
            Message::Assistant(m) => m,
            Message::User(_) => return Err(RouteError::UnexpectedRole("user")),
            Message::Tool(_) => return Err(RouteError::UnexpectedRole("tool")),
        };

        self.state = if assistant.has_tool_calls() {
            RouterState::DispatchingTool
        } else {
            RouterState::Terminal
        };
        Ok(self.state.clone())
    }

    /// Mark the pending tool calls as executed; control returns to the
    /// assistant node. Only legal from `DispatchingTool`.
    pub fn dispatched(&mut self) -> Result<(), RouteError> {
        if self.state != RouterState::DispatchingTool {
            return Err(RouteError::InvalidTransition(self.state.clone()));
        }
        self.state = RouterState::AwaitingAssistant;
        Ok(())
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
