use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(name = "popchat")]
#[command(about = "Chat with OpenAI models from the terminal", long_about = None)]
pub struct Args {
    #[arg(short = 'n', long = "new", help = "Start a new chat")]
    pub new_chat: bool,

    #[arg(long = "chat", value_name = "ID", help = "Send to (and activate) the chat with this id")]
    pub chat_id: Option<String>,

    #[arg(
        short = 'r',
        long = "regenerate",
        help = "Ask the last user message of the active chat again"
    )]
    pub regenerate: bool,

    #[arg(
        short = 'a',
        long = "attach",
        value_name = "FILE",
        help = "Attach a file or image to the message (repeatable)"
    )]
    pub attachments: Vec<String>,

    #[arg(long = "list", help = "List saved chats")]
    pub list_chats: bool,

    #[arg(long = "show", help = "Show the history of the active chat")]
    pub show_history: bool,

    #[arg(long = "clear", help = "Clear the history of the active chat")]
    pub clear_history: bool,

    #[arg(long = "delete", value_name = "ID", help = "Delete a chat")]
    pub delete_chat: Option<String>,

    #[arg(long = "pin", value_name = "ID", help = "Pin a chat to the top of the list")]
    pub pin_chat: Option<String>,

    #[arg(long = "unpin", value_name = "ID", help = "Unpin a chat")]
    pub unpin_chat: Option<String>,

    #[arg(
        long = "rename",
        num_args = 2,
        value_names = ["ID", "TITLE"],
        help = "Rename a chat"
    )]
    pub rename_chat: Option<Vec<String>>,

    #[arg(long = "models", help = "List available models and the current selection")]
    pub list_models: bool,

    #[arg(long = "model", help = "Select the model (e.g. gpt-5.2, gpt-image-1.5)")]
    pub model: Option<String>,

    #[arg(
        long = "thinking",
        help = "Select the thinking level (default, none, minimal, low, medium, high, xhigh)"
    )]
    pub thinking: Option<String>,

    #[arg(long = "web-search", help = "Enable web search", conflicts_with = "no_web_search")]
    pub web_search: bool,

    #[arg(long = "no-web-search", help = "Disable web search")]
    pub no_web_search: bool,

    #[arg(long = "set-api-key", value_name = "KEY", help = "Store an OpenAI API key")]
    pub set_api_key: Option<String>,

    #[arg(long = "remove-api-key", help = "Remove the stored API key")]
    pub remove_api_key: bool,

    #[arg(long = "system-message", value_name = "TEXT", help = "Set a custom system message")]
    pub system_message: Option<String>,

    #[arg(long = "reset-system-message", help = "Restore the default system message")]
    pub reset_system_message: bool,

    #[arg(long = "accent-color", value_name = "HEX", help = "Accent color as #rrggbb")]
    pub accent_color: Option<String>,

    #[arg(long = "language", help = "Language preference (auto, en, de)")]
    pub language: Option<String>,

    #[arg(
        long = "api-endpoint",
        help = "Custom API base URL (e.g., http://localhost:8080/v1)"
    )]
    pub api_endpoint: Option<String>,

    #[arg(short = 'v', long = "verbose", help = "Print diagnostics to stderr")]
    pub verbose: bool,

    #[arg(long = "config-init", help = "Write an example config file")]
    pub config_init: bool,

    #[arg(help = "Message to send")]
    pub message: Vec<String>,
}

impl Args {
    /// `Some(true)` / `Some(false)` when a web search flag was given.
    pub fn web_search_override(&self) -> Option<bool> {
        if self.web_search {
            Some(true)
        } else if self.no_web_search {
            Some(false)
        } else {
            None
        }
    }

    pub fn message_text(&self) -> String {
        self.message.join(" ")
    }
}
