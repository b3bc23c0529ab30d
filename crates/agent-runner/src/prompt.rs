//! Prompt composition
//!
//! Translates an agent and its thread into the conversation sent to the
//! model gateway.

use psscript_core::agent::Agent;
use psscript_core::thread::{Message, MessageRole};

use crate::gateway::{ChatMessage, ChatRole};

/// Domain persona appended to every agent's system instruction
pub const POWERSHELL_PREAMBLE: &str = "\
You are PSScriptGPT, a specialized PowerShell scripting assistant with expertise in \
Windows system administration, automation, and scripting best practices. Your primary \
goal is to help users write, understand, and improve PowerShell scripts.

When providing answers:
1. Offer complete, runnable code examples when appropriate
2. Explain the reasoning behind recommendations, not only the steps
3. Highlight security considerations and best practices
4. Consider performance implications of your suggestions
5. Structure solutions to be modular and maintainable
6. Respect PowerShell conventions and style guidelines
7. Acknowledge when you do not know something instead of guessing
8. Format code examples as ```powershell blocks
9. Keep a friendly and professional tone
10. Prefer modern PowerShell approaches when applicable

Your knowledge covers PowerShell 7 language features, Windows administration, common \
modules such as ActiveDirectory and Az, error handling and debugging, ExecutionPolicy and \
script signing, DSC, remoting, module packaging, CI/CD for PowerShell, and PowerShell on \
Linux and macOS. Use Pascal case for functions and cmdlets and comment your examples.";

/// Compose the system instruction for `agent`
pub fn system_instruction(agent: &Agent) -> String {
    let mut instruction = if agent.name.trim().is_empty() {
        "You are an AI assistant.".to_string()
    } else {
        format!("You are {}.", agent.name.trim())
    };

    if !agent.description.trim().is_empty() {
        instruction.push(' ');
        instruction.push_str(agent.description.trim());
    }

    if !agent.capabilities.is_empty() {
        let capabilities: Vec<&str> = agent.capabilities.iter().map(String::as_str).collect();
        instruction.push_str("\nCapabilities: ");
        instruction.push_str(&capabilities.join(", "));
    }

    instruction.push_str("\n\n");
    instruction.push_str(POWERSHELL_PREAMBLE);
    instruction
}

/// Gateway role for a stored message role
///
/// The gateway has no `tool` role; tool output is presented as assistant
/// text. Only the outgoing copy is coerced.
fn gateway_role(role: MessageRole) -> ChatRole {
    match role {
        MessageRole::User => ChatRole::User,
        MessageRole::Assistant | MessageRole::Tool => ChatRole::Assistant,
        MessageRole::System => ChatRole::System,
    }
}

/// Build the gateway conversation for a thread's history
pub fn build_conversation(agent: &Agent, messages: &[Message]) -> Vec<ChatMessage> {
    let mut conversation = Vec::with_capacity(messages.len() + 1);
    conversation.push(ChatMessage::system(system_instruction(agent)));

    conversation.extend(messages.iter().filter_map(|message| {
        message
            .text()
            .map(|text| ChatMessage::new(gateway_role(message.role), text))
    }));

    conversation
}

#[cfg(test)]
mod tests {
    use super::*;
    use psscript_core::agent::NewAgent;
    use uuid::Uuid;

    fn agent() -> Agent {
        NewAgent::named("PSScriptGPT")
            .with_description("Helps with PowerShell scripts.")
            .with_capability("script-analysis")
            .with_capability("security")
            .into_agent("gpt-4o")
    }

    #[test]
    fn test_system_instruction_lists_identity_and_capabilities() {
        let instruction = system_instruction(&agent());

        assert!(instruction.starts_with("You are PSScriptGPT. Helps with PowerShell scripts."));
        assert!(instruction.contains("Capabilities: script-analysis, security"));
        assert!(instruction.ends_with(POWERSHELL_PREAMBLE));
    }

    #[test]
    fn test_system_instruction_for_bare_agent() {
        let bare = NewAgent::default().into_agent("gpt-4o");
        let instruction = system_instruction(&bare);

        assert!(instruction.starts_with("You are an AI assistant.\n\n"));
        assert!(!instruction.contains("Capabilities"));
    }

    #[test]
    fn test_conversation_skips_empty_and_coerces_tool_role() {
        let thread_id = Uuid::new_v4();
        let messages = vec![
            Message::user(thread_id, "Lint my script"),
            Message::new(thread_id, MessageRole::Tool, Some("0 warnings".to_string())),
            Message::new(thread_id, MessageRole::Assistant, None),
            Message::new(thread_id, MessageRole::User, Some(String::new())),
            Message::new(thread_id, MessageRole::System, Some("Be brief".to_string())),
        ];

        let conversation = build_conversation(&agent(), &messages);

        assert_eq!(conversation.len(), 4);
        assert_eq!(conversation[0].role, ChatRole::System);
        assert_eq!(conversation[1], ChatMessage::user("Lint my script"));
        assert_eq!(conversation[2], ChatMessage::assistant("0 warnings"));
        assert_eq!(conversation[3], ChatMessage::system("Be brief"));

        // Stored messages keep their own roles
        assert_eq!(messages[1].role, MessageRole::Tool);
    }
}
