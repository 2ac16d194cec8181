//! Command-line chat client for OpenAI-compatible chat-completion APIs.
//!
//! # Usage
//!
//! ```bash
//! # Ask one question (token from $OPENAI_API_TOKEN)
//! palaver --prompt "What is a monad?"
//!
//! # Same, with the prompt as positional arguments
//! palaver What is a monad?
//!
//! # Chat interactively, appending every turn to a file
//! palaver --interactive --out-file chat.txt
//!
//! # One line per turn instead of blank-line terminated blocks
//! palaver --interactive --line-mode
//!
//! # Talk to a local OpenAI-compatible server
//! palaver --interactive --base-url http://localhost:11434/v1 --model llama3
//! ```
//!
//! In interactive mode a turn is ended by a blank line (or by end of input).
//! Press Ctrl+D to finish the session.
//!
//! Set `RUST_LOG=palaver=debug` to see request diagnostics on stderr.

use arrrg::CommandLine;
use tracing_subscriber::EnvFilter;

use palaver::chat::{ChatArgs, ChatConfig, ChatMode, ChatSession, PlainTextRenderer, Renderer};
use palaver::{OpenAi, TurnReader};

/// Main entry point for the palaver application.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (args, free) = ChatArgs::from_command_line_relaxed("palaver [OPTIONS] [PROMPT]...");
    let mut config = ChatConfig::from(args);
    if config.prompt.is_none() && !free.is_empty() {
        config.prompt = Some(free.join(" "));
    }
    let use_color = config.use_color;

    if let Err(err) = run(config).await {
        PlainTextRenderer::with_color(use_color).print_error(&err.to_string());
        std::process::exit(1);
    }
}

async fn run(config: ChatConfig) -> palaver::Result<()> {
    let client = OpenAi::with_options(
        config.api_token.clone(),
        config.base_url.clone(),
        config.timeout,
    )?;

    match config.mode {
        ChatMode::Interactive => {
            let mut renderer =
                PlainTextRenderer::with_color(config.use_color).with_user_echo(false);
            let mut reader = TurnReader::stdin(config.input_mode);
            let mut session = ChatSession::new(&client, config);
            session.run(&mut reader, &mut renderer).await
        }
        ChatMode::SingleShot => {
            let prompt = config.prompt.clone().unwrap_or_default();
            let mut renderer = PlainTextRenderer::with_color(config.use_color);
            let mut session = ChatSession::new(&client, config);
            session.single_shot(&prompt, &mut renderer).await.map(|_| ())
        }
    }
}
