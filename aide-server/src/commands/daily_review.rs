//! `/dailyreview`: a markdown report of recent browsing.

use anyhow::{Context, anyhow};
use chrono::TimeDelta;

use crate::browsing::{self, HistoryError, report};
use crate::commands::CommandContext;

const NO_HISTORY_REPLY: &str = "No browsing history found for the specified period.\n\n\
     This could mean:\n\
     - You haven't browsed any websites recently\n\
     - Your browsing history has been cleared\n\
     - You've been using incognito/private mode";

/// Look-back window in hours for the command arguments.
///
/// `yesterday` covers 48 hours, `week` 168, `N days` N×24; anything else 24.
/// A day count too large to express in hours is an error.
pub fn parse_time_range(args: &str) -> anyhow::Result<i64> {
    let args = args.to_lowercase();
    if args.contains("yesterday") {
        return Ok(48);
    }
    if args.contains("week") {
        return Ok(168);
    }
    let Some(digits) = days_in(&args) else {
        return Ok(24);
    };
    digits
        .parse::<i64>()
        .ok()
        .and_then(|days| days.checked_mul(24))
        .ok_or_else(|| anyhow!("time range of {digits} days is too large"))
}

/// The digits right before a `day`/`days` word, as in `"last 3 days"` or `"3days"`.
fn days_in(args: &str) -> Option<&str> {
    let idx = args.find("day")?;
    let before = args[..idx].trim_end();
    let start = before
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    Some(&before[start..])
}

pub async fn handle(args: &str, ctx: CommandContext<'_>) -> anyhow::Result<String> {
    let hours = parse_time_range(args)?;
    let since = TimeDelta::try_hours(hours)
        .and_then(|window| ctx.now.checked_sub_signed(window))
        .with_context(|| format!("a {hours} hour look-back window reaches past the earliest supported date"))?;

    let analysis = match browsing::analyze(ctx.history, ctx.model, since).await {
        Ok(analysis) => analysis,
        Err(e @ HistoryError::NotFound(_)) => {
            return Ok(format!(
                "Chrome history not found.\n\nError: {e}\n\n\
                 Please ensure Google Chrome is installed and you've browsed some websites."
            ));
        }
        Err(e @ HistoryError::Access { .. }) => {
            return Ok(format!(
                "Permission denied accessing Chrome history.\n\nError: {e}\n\n\
                 Try closing Chrome and running the command again."
            ));
        }
        Err(e) => return Err(e.into()),
    };

    if analysis.timed.is_empty() {
        return Ok(NO_HISTORY_REPLY.to_owned());
    }
    Ok(report::render(&analysis, ctx.now.date()))
}
