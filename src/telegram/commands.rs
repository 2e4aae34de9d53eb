//! Bot command surface. Thin by design: everything interesting happens in
//! the admission path and the pipelines.

use teloxide::utils::command::BotCommands;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "I can:")]
pub enum Command {
    #[command(description = "show the welcome message")]
    Start,
    #[command(description = "show this help")]
    Help,
    #[command(description = "download the audio track only: /audio <url>")]
    Audio(String),
    #[command(description = "cache and queue statistics")]
    Stats,
    #[command(description = "drop all pending tasks (admin only)")]
    Purge,
    #[command(description = "pull the latest code and restart (admin only)")]
    Update,
}

/// Welcome/help text shown for /start and /help.
pub fn help_text() -> String {
    format!(
        "Send me a link and I'll download it for you.\n\n{}",
        Command::descriptions()
    )
}
