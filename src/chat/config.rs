//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use std::path::PathBuf;
use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::input::InputMode;
use crate::types::Model;

/// Command-line arguments for the palaver tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// API token; falls back to OPENAI_API_TOKEN.
    #[arrrg(optional, "API token (default: $OPENAI_API_TOKEN)", "TOKEN")]
    pub api_token: Option<String>,

    /// Start an interactive session instead of answering one prompt.
    #[arrrg(flag, "Start in interactive mode")]
    pub interactive: bool,

    /// Prompt for single-shot mode.
    #[arrrg(optional, "Prompt to send in single-shot mode", "PROMPT")]
    pub prompt: Option<String>,

    /// File that every turn is appended to.
    #[arrrg(optional, "File to append the chat to", "PATH")]
    pub out_file: Option<String>,

    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: gpt-3.5-turbo)", "MODEL")]
    pub model: Option<String>,

    /// Base URL of an OpenAI-compatible API.
    #[arrrg(optional, "API base URL (default: https://api.openai.com/v1/)", "URL")]
    pub base_url: Option<String>,

    /// Request timeout in seconds.
    #[arrrg(optional, "Request timeout in seconds (default: 60)", "SECS")]
    pub timeout: Option<u64>,

    /// Treat every input line as its own turn.
    #[arrrg(flag, "One line per turn instead of blank-line terminated blocks")]
    pub line_mode: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Whether the session loops over input or answers a single prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChatMode {
    /// Answer one prompt and exit.
    #[default]
    SingleShot,

    /// Read turns until end of input.
    Interactive,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ChatConfig {
    /// Opaque API credential; `None` defers to the environment.
    pub api_token: Option<String>,

    /// Interactive or single-shot.
    pub mode: ChatMode,

    /// The prompt for single-shot mode.
    pub prompt: Option<String>,

    /// Append-only transcript file.
    pub out_file: Option<PathBuf>,

    /// The model to use for generating responses.
    pub model: Model,

    /// Alternate API base URL.
    pub base_url: Option<String>,

    /// Request timeout; `None` uses the client default.
    pub timeout: Option<Duration>,

    /// How input lines are grouped into turns.
    pub input_mode: InputMode,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Mode: single-shot
    /// - Model: gpt-3.5-turbo
    /// - Input: blank-line terminated blocks
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            use_color: true,
            ..Default::default()
        }
    }

    /// Sets the API token.
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Switches to interactive mode.
    pub fn interactive(mut self) -> Self {
        self.mode = ChatMode::Interactive;
        self
    }

    /// Sets the single-shot prompt.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Sets the transcript file.
    pub fn with_out_file(mut self, path: Option<PathBuf>) -> Self {
        self.out_file = path;
        self
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Sets the API base URL.
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets how input lines are grouped into turns.
    pub fn with_input_mode(mut self, input_mode: InputMode) -> Self {
        self.input_mode = input_mode;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl std::fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatConfig")
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("mode", &self.mode)
            .field("prompt", &self.prompt)
            .field("out_file", &self.out_file)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("input_mode", &self.input_mode)
            .field("use_color", &self.use_color)
            .finish()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let model = args
            .model
            .map(|s| s.parse::<Model>().unwrap_or(Model::Custom(s)))
            .unwrap_or_default();

        ChatConfig {
            api_token: args.api_token,
            mode: if args.interactive {
                ChatMode::Interactive
            } else {
                ChatMode::SingleShot
            },
            prompt: args.prompt,
            out_file: args.out_file.map(PathBuf::from),
            model,
            base_url: args.base_url,
            timeout: args.timeout.map(Duration::from_secs),
            input_mode: if args.line_mode {
                InputMode::Line
            } else {
                InputMode::Block
            },
            use_color: !args.no_color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KnownModel;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert_eq!(config.mode, ChatMode::SingleShot);
        assert_eq!(config.model, Model::Known(KnownModel::Gpt35Turbo));
        assert_eq!(config.input_mode, InputMode::Block);
        assert!(config.use_color);
        assert!(config.api_token.is_none());
        assert!(config.prompt.is_none());
        assert!(config.out_file.is_none());
        assert!(config.timeout.is_none());
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::from(ChatArgs::default());
        assert_eq!(config, ChatConfig::new());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            api_token: Some("sk-test".to_string()),
            interactive: true,
            prompt: None,
            out_file: Some("chat.log".to_string()),
            model: Some("gpt-4o".to_string()),
            base_url: Some("http://localhost:8080/v1".to_string()),
            timeout: Some(5),
            line_mode: true,
            no_color: true,
        };
        let config = ChatConfig::from(args);
        assert_eq!(config.api_token.as_deref(), Some("sk-test"));
        assert_eq!(config.mode, ChatMode::Interactive);
        assert_eq!(config.out_file, Some(PathBuf::from("chat.log")));
        assert_eq!(config.model, Model::Known(KnownModel::Gpt4o));
        assert_eq!(
            config.base_url.as_deref(),
            Some("http://localhost:8080/v1")
        );
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.input_mode, InputMode::Line);
        assert!(!config.use_color);
    }

    #[test]
    fn unknown_model_is_custom() {
        let args = ChatArgs {
            model: Some("llama3".to_string()),
            ..ChatArgs::default()
        };
        let config = ChatConfig::from(args);
        assert_eq!(config.model, Model::Custom("llama3".to_string()));
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_api_token("sk-abc")
            .interactive()
            .with_prompt("ignored in interactive mode")
            .with_out_file(Some(PathBuf::from("out.txt")))
            .with_model(Model::Known(KnownModel::Gpt4))
            .with_base_url(Some("https://llm.example.com/".to_string()))
            .with_timeout(Some(Duration::from_secs(10)))
            .with_input_mode(InputMode::Line)
            .without_color();
        assert_eq!(config.api_token.as_deref(), Some("sk-abc"));
        assert_eq!(config.mode, ChatMode::Interactive);
        assert_eq!(config.out_file, Some(PathBuf::from("out.txt")));
        assert_eq!(config.model, Model::Known(KnownModel::Gpt4));
        assert_eq!(config.timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.input_mode, InputMode::Line);
        assert!(!config.use_color);
    }

    #[test]
    fn debug_redacts_token() {
        let config = ChatConfig::new().with_api_token("sk-very-secret");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-very-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
