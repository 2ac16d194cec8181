//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the transcript of
//! one conversation and drives it through the completion client.

use tokio::io::AsyncBufRead;

use crate::chat::config::ChatConfig;
use crate::client::Completer;
use crate::error::{Error, Result};
use crate::input::TurnReader;
use crate::observability::{SESSION_MALFORMED_RESPONSES, SESSION_TURNS};
use crate::render::Renderer;
use crate::sink::TranscriptSink;
use crate::transcript::Transcript;
use crate::types::{Model, Turn, Usage};

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Input ran out, or the single prompt was answered.
    Normal,
    /// A fatal error stopped the session.
    Error,
}

/// Where the session is in its request cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the next user turn.
    AwaitingInput,
    /// A completion request is in flight.
    Requesting,
    /// A reply has been appended and is being shown and persisted.
    Reporting,
    /// The session is over and accepts no more turns.
    Terminated(Termination),
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStats {
    /// The model used for the session.
    pub model: Model,
    /// The number of turns in the transcript.
    pub turn_count: usize,
    /// Completion requests issued.
    pub total_requests: u64,
    /// Completion requests that failed.
    pub failed_requests: u64,
    /// Total prompt tokens across all requests.
    pub prompt_tokens: u64,
    /// Total completion tokens across all requests.
    pub completion_tokens: u64,
    /// Transcript file writes that failed.
    pub output_write_errors: u64,
}

/// A chat session that manages conversation state and API interactions.
///
/// The session borrows its completion client; the caller owns the client and
/// decides how long it lives.  Requests are strictly sequential: each one
/// completes or fails before the next user turn is read.
pub struct ChatSession<'a, C: Completer + ?Sized> {
    client: &'a C,
    config: ChatConfig,
    transcript: Transcript,
    sink: Option<TranscriptSink>,
    state: SessionState,
    usage_totals: Usage,
    request_count: u64,
    failed_requests: u64,
    output_write_errors: u64,
}

impl<'a, C: Completer + ?Sized> ChatSession<'a, C> {
    /// Creates a new chat session with the given client and configuration.
    pub fn new(client: &'a C, config: ChatConfig) -> Self {
        let sink = config.out_file.clone().map(TranscriptSink::new);
        Self {
            client,
            config,
            transcript: Transcript::new(),
            sink,
            state: SessionState::AwaitingInput,
            usage_totals: Usage::default(),
            request_count: 0,
            failed_requests: 0,
            output_write_errors: 0,
        }
    }

    /// Sends one user turn and records the agent's reply.
    ///
    /// The user turn stays in the transcript even when the request fails, and
    /// a failure terminates the session.  Replies are only accepted as agent
    /// turns with content; anything else is a malformed response.
    ///
    /// # Errors
    ///
    /// Returns the completion failure, or a validation error if the session
    /// has already terminated.
    pub async fn send(&mut self, user_input: &str, renderer: &mut dyn Renderer) -> Result<Turn> {
        if let SessionState::Terminated(how) = self.state {
            return Err(Error::validation(
                format!("session already terminated ({how:?})"),
                None,
            ));
        }

        let user_turn = Turn::user(user_input);
        self.transcript.append(user_turn.clone());
        self.report(&user_turn, renderer);

        self.state = SessionState::Requesting;
        self.request_count = self.request_count.saturating_add(1);
        tracing::debug!(
            model = %self.config.model,
            turns = self.transcript.len(),
            "requesting completion"
        );
        let outcome = self
            .client
            .complete(&self.config.model, self.transcript.snapshot())
            .await
            .and_then(|reply| {
                if !reply.turn.is_agent() {
                    Err(Error::malformed_response(format!(
                        "reply came back as a {} turn",
                        reply.turn.role
                    )))
                } else if reply.turn.content.is_empty() {
                    Err(Error::malformed_response("reply had no content"))
                } else {
                    Ok(reply)
                }
            });

        let reply = match outcome {
            Ok(reply) => reply,
            Err(err) => {
                self.failed_requests = self.failed_requests.saturating_add(1);
                if err.is_malformed_response() {
                    SESSION_MALFORMED_RESPONSES.click();
                }
                self.finish(Termination::Error);
                return Err(err);
            }
        };

        if let Some(usage) = reply.usage {
            self.usage_totals = self.usage_totals + usage;
        }
        self.transcript.append(reply.turn.clone());
        self.state = SessionState::Reporting;
        self.report(&reply.turn, renderer);
        SESSION_TURNS.click();
        self.state = SessionState::AwaitingInput;
        Ok(reply.turn)
    }

    /// Answers a single prompt and terminates.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank prompt (nothing is sent), or the
    /// completion failure.
    pub async fn single_shot(&mut self, prompt: &str, renderer: &mut dyn Renderer) -> Result<Turn> {
        if prompt.trim().is_empty() {
            self.state = SessionState::Terminated(Termination::Error);
            return Err(Error::validation(
                "a prompt is required in single-shot mode",
                Some("prompt".to_string()),
            ));
        }
        let reply = self.send(prompt, renderer).await?;
        self.finish(Termination::Normal);
        Ok(reply)
    }

    /// Reads user turns from `reader` until it is exhausted.
    ///
    /// End of input, including input with no turns at all, ends the session
    /// normally.
    ///
    /// # Errors
    ///
    /// Returns the first input failure or completion failure; turns appended
    /// before the failure remain in the transcript.
    pub async fn run<R>(
        &mut self,
        reader: &mut TurnReader<R>,
        renderer: &mut dyn Renderer,
    ) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        loop {
            if let SessionState::Terminated(how) = self.state {
                return Err(Error::validation(
                    format!("session already terminated ({how:?})"),
                    None,
                ));
            }
            renderer.print_prompt();
            match reader.next_turn().await {
                Ok(Some(text)) => {
                    self.send(&text, renderer).await?;
                }
                Ok(None) => {
                    renderer.close_prompt();
                    self.finish(Termination::Normal);
                    return Ok(());
                }
                Err(err) => {
                    self.finish(Termination::Error);
                    return Err(err);
                }
            }
        }
    }

    /// Returns the transcript so far.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Consumes the session, returning its transcript.
    pub fn into_transcript(self) -> Transcript {
        self.transcript
    }

    /// Returns the current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the model used for requests.
    pub fn model(&self) -> &Model {
        &self.config.model
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            model: self.config.model.clone(),
            turn_count: self.transcript.len(),
            total_requests: self.request_count,
            failed_requests: self.failed_requests,
            prompt_tokens: self.usage_totals.prompt_tokens,
            completion_tokens: self.usage_totals.completion_tokens,
            output_write_errors: self.output_write_errors,
        }
    }

    fn finish(&mut self, how: Termination) {
        self.state = SessionState::Terminated(how);
        let stats = self.stats();
        tracing::info!(
            termination = ?how,
            turns = stats.turn_count,
            requests = stats.total_requests,
            prompt_tokens = stats.prompt_tokens,
            completion_tokens = stats.completion_tokens,
            "chat session finished"
        );
    }

    /// Shows a turn and appends it to the transcript file.
    ///
    /// A file failure is reported once and does not stop the session.
    fn report(&mut self, turn: &Turn, renderer: &mut dyn Renderer) {
        renderer.print_turn(turn);
        if let Some(sink) = &self.sink
            && let Err(err) = sink.write_turn(turn)
        {
            self.output_write_errors = self.output_write_errors.saturating_add(1);
            renderer.print_error(&err.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::layer::SubscriberExt;

    use super::*;
    use crate::input::InputMode;
    use crate::types::{KnownModel, Reply};

    #[derive(Default)]
    struct Recorder {
        turns: Vec<Turn>,
        errors: Vec<String>,
        prompts: usize,
        closed: usize,
    }

    impl Renderer for Recorder {
        fn print_prompt(&mut self) {
            self.prompts += 1;
        }

        fn print_turn(&mut self, turn: &Turn) {
            self.turns.push(turn.clone());
        }

        fn print_error(&mut self, error: &str) {
            self.errors.push(error.to_string());
        }

        fn close_prompt(&mut self) {
            self.closed += 1;
        }
    }

    struct Scripted {
        replies: Mutex<VecDeque<Result<Reply>>>,
        models: Mutex<Vec<Model>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<Reply>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                models: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl Completer for Scripted {
        async fn complete(&self, model: &Model, _: &[Turn]) -> Result<Reply> {
            self.models.lock().unwrap().push(model.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::malformed_response("script exhausted")))
        }
    }

    fn reply(text: &str) -> Result<Reply> {
        Ok(Reply {
            turn: Turn::agent(text),
            usage: Some(Usage::new(10, 2)),
        })
    }

    #[tokio::test]
    async fn new_session_awaits_input() {
        let client = Scripted::new(vec![]);
        let session = ChatSession::new(&client, ChatConfig::new());
        assert_eq!(session.state(), SessionState::AwaitingInput);
        assert!(session.transcript().is_empty());
        assert_eq!(session.model(), &Model::Known(KnownModel::Gpt35Turbo));
    }

    #[tokio::test]
    async fn send_appends_both_turns() {
        let client = Scripted::new(vec![reply("hi")]);
        let mut session = ChatSession::new(&client, ChatConfig::new());
        let mut renderer = Recorder::default();
        let turn = session.send("hello", &mut renderer).await.unwrap();
        assert_eq!(turn, Turn::agent("hi"));
        assert_eq!(session.state(), SessionState::AwaitingInput);
        assert_eq!(
            session.transcript().snapshot(),
            &[Turn::user("hello"), Turn::agent("hi")]
        );
        assert_eq!(renderer.turns, vec![Turn::user("hello"), Turn::agent("hi")]);
        let stats = session.stats();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.prompt_tokens, 10);
        assert_eq!(stats.completion_tokens, 2);
    }

    #[tokio::test]
    async fn request_uses_configured_model() {
        let client = Scripted::new(vec![reply("ok")]);
        let config = ChatConfig::new().with_model(Model::Known(KnownModel::Gpt4o));
        let mut session = ChatSession::new(&client, config);
        session.send("x", &mut Recorder::default()).await.unwrap();
        assert_eq!(
            *client.models.lock().unwrap(),
            vec![Model::Known(KnownModel::Gpt4o)]
        );
    }

    #[tokio::test]
    async fn failure_terminates_and_keeps_user_turn() {
        let client = Scripted::new(vec![Err(Error::rate_limit("slow down", None))]);
        let mut session = ChatSession::new(&client, ChatConfig::new());
        let err = session
            .send("hello", &mut Recorder::default())
            .await
            .unwrap_err();
        assert!(err.is_rate_limit());
        assert_eq!(
            session.state(),
            SessionState::Terminated(Termination::Error)
        );
        assert_eq!(session.transcript().snapshot(), &[Turn::user("hello")]);
        assert_eq!(session.stats().failed_requests, 1);

        let err = session
            .send("again", &mut Recorder::default())
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn empty_or_user_reply_is_malformed() {
        for bad in [Turn::agent(""), Turn::user("echo")] {
            let client = Scripted::new(vec![Ok(Reply {
                turn: bad,
                usage: None,
            })]);
            let mut session = ChatSession::new(&client, ChatConfig::new());
            let err = session
                .send("hello", &mut Recorder::default())
                .await
                .unwrap_err();
            assert!(err.is_malformed_response());
            assert_eq!(session.transcript().len(), 1);
        }
    }

    #[tokio::test]
    async fn single_shot_rejects_blank_prompt() {
        let client = Scripted::new(vec![reply("unused")]);
        let mut session = ChatSession::new(&client, ChatConfig::new());
        let err = session
            .single_shot("   ", &mut Recorder::default())
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(session.transcript().is_empty());
        assert!(client.models.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn run_prompts_before_each_read() {
        let client = Scripted::new(vec![reply("1"), reply("2")]);
        let mut session = ChatSession::new(&client, ChatConfig::new());
        let mut reader = TurnReader::new(&b"a\nb\n"[..], InputMode::Line);
        let mut renderer = Recorder::default();
        session.run(&mut reader, &mut renderer).await.unwrap();
        assert_eq!(renderer.prompts, 3);
        assert_eq!(renderer.closed, 1);
        assert_eq!(
            session.state(),
            SessionState::Terminated(Termination::Normal)
        );
    }

    #[tokio::test]
    async fn sink_failure_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            ChatConfig::new().with_out_file(Some(dir.path().join("no-such-dir").join("chat.txt")));
        let client = Scripted::new(vec![reply("still here")]);
        let mut session = ChatSession::new(&client, config);
        let mut renderer = Recorder::default();
        let turn = session.send("hello", &mut renderer).await.unwrap();
        assert_eq!(turn, Turn::agent("still here"));
        assert_eq!(renderer.errors.len(), 2);
        assert!(renderer.errors[0].starts_with("Output error"));
        assert_eq!(session.stats().output_write_errors, 2);
        assert_eq!(session.state(), SessionState::AwaitingInput);
    }

    /// Counts info-level events from this crate.
    struct InfoEvents(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for InfoEvents {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let meta = event.metadata();
            if *meta.level() == tracing::Level::INFO && meta.target().starts_with("palaver") {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[tokio::test]
    async fn failed_request_in_run_logs_session_end() {
        let events = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(InfoEvents(Arc::clone(&events)));
        let _guard = tracing::subscriber::set_default(subscriber);

        let client = Scripted::new(vec![Err(Error::service_unavailable("down", None))]);
        let mut session = ChatSession::new(&client, ChatConfig::new().interactive());
        let mut reader = TurnReader::new(&b"hello\n"[..], InputMode::Line);
        let mut renderer = Recorder::default();
        let err = session.run(&mut reader, &mut renderer).await.unwrap_err();
        assert!(err.is_server_error());
        assert_eq!(
            session.state(),
            SessionState::Terminated(Termination::Error)
        );
        assert_eq!(events.load(Ordering::SeqCst), 1);
        assert_eq!(renderer.closed, 0);
    }
}
