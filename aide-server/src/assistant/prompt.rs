//! Prompt assembly for the chat endpoint.

use crate::assistant::PromptMessage;
use crate::entities::{ContextRecord, DataSourceRecord, MessageRecord, Role};

/// Characters of raw context content used when a context has no summary.
const CONTEXT_EXCERPT_CHARS: usize = 200;

/// Build the static system preamble, listing enabled data sources and a
/// short excerpt of each source's most recent contexts.
pub fn system_prompt(sources: &[(DataSourceRecord, Vec<ContextRecord>)]) -> String {
    let names: Vec<&str> = sources.iter().map(|(s, _)| s.name.as_str()).collect();

    let mut context_lines: Vec<String> = Vec::new();
    for (source, contexts) in sources {
        if contexts.is_empty() {
            continue;
        }
        context_lines.push(format!("\n--- {} Data ---", source.name));
        for ctx in contexts {
            let line = match ctx.summary.as_deref().filter(|s| !s.trim().is_empty()) {
                Some(summary) => summary.to_owned(),
                None => excerpt(&ctx.content, CONTEXT_EXCERPT_CHARS),
            };
            context_lines.push(line);
        }
    }

    let available = if names.is_empty() { "none".to_owned() } else { names.join(", ") };
    let context = if context_lines.is_empty() {
        "No additional context available.".to_owned()
    } else {
        context_lines.join("\n")
    };

    format!(
        "You are a personal AI assistant.\n\
         You have access to various data sources and can provide contextual, intelligent responses.\n\n\
         Available data sources: {available}\n\n\
         {context}\n\n\
         Provide helpful, accurate, and context-aware responses."
    )
}

/// Convert stored history into provider turns.
///
/// The Messages API wants the conversation to open with a user turn and to
/// alternate roles, so leading assistant turns are dropped and consecutive
/// turns of the same role are joined.
pub fn to_turns(history: &[MessageRecord]) -> Vec<PromptMessage> {
    let mut turns: Vec<PromptMessage> = Vec::with_capacity(history.len() + 1);
    for msg in history {
        push_turn(&mut turns, msg.role, &msg.content);
    }
    turns
}

/// Append one turn, keeping the opening-user and alternating-role rules.
pub fn push_turn(turns: &mut Vec<PromptMessage>, role: Role, content: &str) {
    if turns.is_empty() && role == Role::Assistant {
        return;
    }
    match turns.last_mut() {
        Some(last) if last.role == role => {
            last.content.push_str("\n\n");
            last.content.push_str(content);
        }
        _ => turns.push(PromptMessage { role, content: content.to_owned() }),
    }
}

/// First `max_chars` characters of `text`, respecting char boundaries.
fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_owned(),
        None => text.to_owned(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn message(role: Role, content: &str) -> MessageRecord {
        MessageRecord {
            id: 0,
            conversation_id: 1,
            role,
            content: content.into(),
            metadata: json!({}),
            created_at: Utc::now(),
        }
    }

    fn source(name: &str) -> DataSourceRecord {
        DataSourceRecord {
            id: 1,
            name: name.into(),
            source_type: "api".into(),
            enabled: true,
            config: json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn ctx(content: &str, summary: Option<&str>) -> ContextRecord {
        ContextRecord {
            id: 1,
            data_source_id: 1,
            content: content.into(),
            summary: summary.map(str::to_owned),
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    #[test]
    fn empty_sources_mention_no_context() {
        let prompt = system_prompt(&[]);
        assert!(prompt.contains("Available data sources: none"));
        assert!(prompt.contains("No additional context available."));
    }

    #[test]
    fn summary_wins_over_content() {
        let prompt = system_prompt(&[(source("Email"), vec![ctx("long body", Some("2 unread"))])]);
        assert!(prompt.contains("--- Email Data ---"));
        assert!(prompt.contains("2 unread"));
        assert!(!prompt.contains("long body"));
    }

    #[test]
    fn content_is_truncated_on_char_boundary() {
        let long = "é".repeat(300);
        let prompt = system_prompt(&[(source("Notes"), vec![ctx(&long, None)])]);
        assert!(prompt.contains(&"é".repeat(200)));
        assert!(!prompt.contains(&"é".repeat(201)));
    }

    #[test]
    fn turns_start_with_user_and_alternate() {
        let history = vec![
            message(Role::Assistant, "welcome"),
            message(Role::User, "a"),
            message(Role::User, "b"),
            message(Role::Assistant, "c"),
        ];
        let turns = to_turns(&history);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "a\n\nb");
        assert_eq!(turns[1].role, Role::Assistant);
    }
}
