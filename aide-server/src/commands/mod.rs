//! Slash commands typed into the chat box, e.g. `/dailyreview yesterday`.

pub mod daily_review;

use chrono::NaiveDateTime;
use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator};
use tracing::{info, warn};

use crate::assistant::ChatModel;
use crate::browsing::HistorySource;

/// Registered commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumString, EnumIter)]
pub enum Command {
    #[strum(serialize = "dailyreview")]
    DailyReview,
}

/// What a command handler may reach.
#[derive(Clone, Copy)]
pub struct CommandContext<'a> {
    pub history: &'a dyn HistorySource,
    pub model: Option<&'a dyn ChatModel>,
    /// Local wall-clock time the command runs at.
    pub now: NaiveDateTime,
}

/// Reply text plus the lower-cased command name it answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub name: String,
    pub text: String,
}

pub fn is_command(content: &str) -> bool {
    content.trim().starts_with('/')
}

/// Split `"/Name rest of line"` into `("name", "rest of line")`.
///
/// Content that is not a command comes back as `("", content)`.
pub fn parse_command(content: &str) -> (String, String) {
    let content = content.trim();
    let Some(body) = content.strip_prefix('/') else {
        return (String::new(), content.to_owned());
    };
    match body.split_once(char::is_whitespace) {
        Some((name, args)) => (name.to_lowercase(), args.trim().to_owned()),
        None => (body.to_lowercase(), String::new()),
    }
}

fn available_commands() -> String {
    Command::iter().map(|c| format!("/{}", c.as_ref())).collect::<Vec<_>>().join(", ")
}

/// Run the command in `content`. Never fails: unknown commands and handler
/// errors are reported in the reply text.
pub async fn route_command(content: &str, ctx: CommandContext<'_>) -> CommandOutput {
    let (name, args) = parse_command(content);

    let Ok(command) = name.parse::<Command>() else {
        info!(command = %name, "unknown slash command");
        let text = format!("Unknown command: /{name}\n\nAvailable commands: {}", available_commands());
        return CommandOutput { name, text };
    };

    info!(command = %name, args = %args, "running slash command");
    let result = match command {
        Command::DailyReview => daily_review::handle(&args, ctx).await,
    };

    let text = result.unwrap_or_else(|e| {
        warn!(command = %name, error = ?e, "slash command failed");
        format!("Error executing command /{name}: {e}")
    });
    CommandOutput { name, text }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::browsing::testing::FixedHistory;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap().and_hms_opt(18, 0, 0).unwrap()
    }

    #[test]
    fn detects_and_parses_commands() {
        assert!(is_command("  /dailyreview"));
        assert!(!is_command("hello /there"));
        assert_eq!(parse_command("/DailyReview last 3 days"), ("dailyreview".into(), "last 3 days".into()));
        assert_eq!(parse_command("/dailyreview"), ("dailyreview".into(), String::new()));
        assert_eq!(parse_command("plain text"), (String::new(), "plain text".into()));
    }

    #[tokio::test]
    async fn unknown_command_lists_available_ones() {
        let history = FixedHistory::new(Vec::new());
        let ctx = CommandContext { history: &history, model: None, now: now() };
        let out = route_command("/weather today", ctx).await;
        assert_eq!(out.name, "weather");
        assert_eq!(out.text, "Unknown command: /weather\n\nAvailable commands: /dailyreview");
    }

    #[tokio::test]
    async fn known_command_is_dispatched() {
        let history = FixedHistory::new(Vec::new());
        let ctx = CommandContext { history: &history, model: None, now: now() };
        let out = route_command("/dailyreview", ctx).await;
        assert_eq!(out.name, "dailyreview");
        assert!(out.text.starts_with("No browsing history found"));
    }
}
