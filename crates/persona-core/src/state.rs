use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::MessageId;
use crate::messages::Message;

/// Retained history window. Older turns are dropped at merge time; this is
/// a deliberate lossy policy bounding context growth.
pub const HISTORY_WINDOW: usize = 45;

/// Merge an incoming batch of messages into the existing history.
///
/// - `existing` is truncated to its last [`HISTORY_WINDOW`] entries first.
/// - Messages without an id get one assigned, on both sides.
/// - An incoming message whose id matches an existing entry replaces that
///   entry in place; otherwise it is appended in arrival order.
pub fn merge_messages(existing: Vec<Message>, incoming: Vec<Message>) -> Vec<Message> {
    let skip = existing.len().saturating_sub(HISTORY_WINDOW);
    let mut merged: Vec<Message> = existing.into_iter().skip(skip).collect();

    let mut index: HashMap<MessageId, usize> = HashMap::with_capacity(merged.len());
    for (i, m) in merged.iter_mut().enumerate() {
        index.insert(m.ensure_id().clone(), i);
    }

    for mut m in incoming {
        let id = m.ensure_id().clone();
        match index.get(&id) {
            Some(&pos) => merged[pos] = m,
            None => {
                index.insert(id, merged.len());
                merged.push(m);
            }
        }
    }

    merged
}

/// Push or pop the dialog mode stack.
///
/// `None` leaves the stack unchanged, `"pop"` removes the top (no-op when
/// empty), any other value is pushed as the new top.
pub fn update_dialog_stack(mut stack: Vec<String>, instruction: Option<&str>) -> Vec<String> {
    match instruction {
        None => stack,
        Some("pop") => {
            stack.pop();
            stack
        }
        Some(mode) => {
            stack.push(mode.to_string());
            stack
        }
    }
}

/// Full per-thread conversation state. This is the checkpoint payload:
/// serialized after each graph step and reloaded at turn start.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub user_info: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub user_lang: String,
    #[serde(default)]
    pub dialog_state: Vec<String>,
}

impl ConversationState {
    /// Merge a batch of messages into the history (see [`merge_messages`]).
    pub fn merge(&mut self, incoming: Vec<Message>) {
        let existing = std::mem::take(&mut self.messages);
        self.messages = merge_messages(existing, incoming);
    }

    pub fn apply_dialog(&mut self, instruction: Option<&str>) {
        let stack = std::mem::take(&mut self.dialog_state);
        self.dialog_state = update_dialog_stack(stack, instruction);
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}
