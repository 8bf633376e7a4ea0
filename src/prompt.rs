//! Flattening a conversation into the single prompt a CLI receives.

use crate::message::{Message, Role};

/// Substituted when the conversation carries no user-side text.
pub const FALLBACK_PROMPT: &str = "Please respond based on the system prompt provided.";

const PART_SEPARATOR: &str = "\n\n";
const PREVIOUS_RESPONSE_MARKER: &str = "[Previous Assistant Response]";
const TOOL_RESULT_MARKER: &str = "[Tool Result]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenedPrompt {
    pub system: Option<String>,
    pub user: String,
}

impl FlattenedPrompt {
    /// The payload that crosses the process boundary.
    ///
    /// CLIs cannot reliably tell a system channel from a user channel on the
    /// command line, so the system text is inlined in a delimiter block.
    pub fn combined(&self) -> String {
        match self.system.as_deref() {
            Some(system) if !system.trim().is_empty() => {
                format!("<system>\n{system}\n</system>\n\n{}", self.user)
            }
            _ => self.user.clone(),
        }
    }
}

/// Split a conversation into system and user text, preserving order.
///
/// The returned user prompt is never blank.
pub fn flatten(conversation: &[Message]) -> FlattenedPrompt {
    let mut system_parts = Vec::new();
    let mut user_parts = Vec::new();

    for msg in conversation {
        let content = msg.text_content();
        match &msg.role {
            Role::System => system_parts.push(content),
            Role::User | Role::Other(_) => user_parts.push(content),
            Role::Assistant => user_parts.push(format!("{PREVIOUS_RESPONSE_MARKER}\n{content}")),
            Role::Tool => user_parts.push(format!("{TOOL_RESULT_MARKER}\n{content}")),
        }
    }

    let system = (!system_parts.is_empty()).then(|| system_parts.join(PART_SEPARATOR));
    let mut user = user_parts.join(PART_SEPARATOR);
    if user.trim().is_empty() {
        user = FALLBACK_PROMPT.to_owned();
    }

    FlattenedPrompt { system, user }
}
