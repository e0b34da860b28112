use common::Language;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::RunnerConfig;
use crate::error::RunnerError;
use crate::input::{self, InputQueue};
use crate::protocol::{ClientMessage, CodeMessage, ServerMessage};
use crate::transport::RunTransport;

/// What the user does during a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunInput {
    /// Typed or pasted text; split into lines before sending.
    Text(String),
    Exit,
}

/// Streamed to the caller while the session runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    CompileSucceeded,
    Stdout(String),
    Stderr(String),
    /// An input line the program consumed.
    Echo(String),
    /// The sandbox reported a failure without ending the session.
    Error(String),
    /// The input queue was full; the line was never sent.
    InputDropped(String),
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    Exited { return_code: Option<i32> },
    CompileError { stderr: String },
    TimedOut,
    OutputLimitExceeded,
    Disconnected,
    Cancelled,
}

/// One interactive run. Nothing survives the session: there is no retry and
/// no persistence.
pub struct RunSession<T> {
    transport: T,
    config: RunnerConfig,
    queue: InputQueue,
    output_used: usize,
}

enum Step {
    Continue,
    End(SessionEnd),
}

impl<T: RunTransport> RunSession<T> {
    pub fn new(transport: T, config: RunnerConfig) -> Self {
        let queue = InputQueue::new(config.input_queue_capacity);
        Self {
            transport,
            config,
            queue,
            output_used: 0,
        }
    }

    pub async fn run(
        mut self,
        source: String,
        language: Language,
        mut inputs: mpsc::Receiver<RunInput>,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<SessionEnd, RunnerError> {
        let code = ClientMessage::Code(CodeMessage::new(language, source));
        if let Some(end) = self.send(&code).await? {
            return Ok(end);
        }
        info!(%language, "Run session started");

        let deadline = tokio::time::sleep(self.config.session_timeout());
        tokio::pin!(deadline);
        let mut inputs_open = true;

        let end = loop {
            let step = tokio::select! {
                _ = &mut deadline => {
                    warn!(timeout_secs = self.config.session_timeout_secs, "Run session timed out");
                    self.shutdown().await;
                    Step::End(SessionEnd::TimedOut)
                }
                frame = self.transport.recv() => match frame {
                    None => Step::End(SessionEnd::Disconnected),
                    Some(Err(RunnerError::Serialization(e))) => {
                        warn!(error = %e, "Skipping unreadable frame");
                        Step::Continue
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Run channel failed");
                        Step::End(SessionEnd::Disconnected)
                    }
                    Some(Ok(message)) => self.on_server_message(message, &events).await?,
                },
                input = inputs.recv(), if inputs_open => match input {
                    Some(input) => self.on_input(input, &events).await?,
                    None => {
                        inputs_open = false;
                        Step::Continue
                    }
                },
            };
            if let Step::End(end) = step {
                break end;
            }
        };

        info!(?end, "Run session ended");
        Ok(end)
    }

    async fn on_server_message(
        &mut self,
        message: ServerMessage,
        events: &mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Step, RunnerError> {
        match message {
            ServerMessage::CompileSuccess { .. } => {
                let _ = events.send(SessionEvent::CompileSucceeded);
            }
            ServerMessage::CompileError { stderr } => {
                self.close().await;
                return Ok(Step::End(SessionEnd::CompileError { stderr }));
            }
            ServerMessage::Stdout { data } => {
                return self.on_output(data, SessionEvent::Stdout, events).await;
            }
            ServerMessage::Stderr { data } => {
                return self.on_output(data, SessionEvent::Stderr, events).await;
            }
            ServerMessage::Echo { data } => {
                let step = self.on_output(data, SessionEvent::Echo, events).await?;
                if let Step::End(_) = step {
                    return Ok(step);
                }
                let ready = self.queue.on_echo();
                return self.send_lines(ready).await;
            }
            ServerMessage::Error { error } => {
                warn!(%error, "Sandbox reported an error");
                let _ = events.send(SessionEvent::Error(error));
            }
            ServerMessage::Exit { return_code } => {
                self.close().await;
                return Ok(Step::End(SessionEnd::Exited { return_code }));
            }
        }
        Ok(Step::Continue)
    }

    async fn on_output(
        &mut self,
        data: String,
        event: fn(String) -> SessionEvent,
        events: &mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Step, RunnerError> {
        let len = data.chars().count();
        let remaining = self.config.output_budget.saturating_sub(self.output_used);
        if len <= remaining {
            self.output_used += len;
            let _ = events.send(event(data));
            return Ok(Step::Continue);
        }

        if remaining > 0 {
            let _ = events.send(event(data.chars().take(remaining).collect()));
        }
        self.output_used = self.config.output_budget;
        warn!(
            budget = self.config.output_budget,
            "Output limit exceeded, ending run session"
        );
        self.shutdown().await;
        Ok(Step::End(SessionEnd::OutputLimitExceeded))
    }

    async fn on_input(
        &mut self,
        input: RunInput,
        events: &mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Step, RunnerError> {
        let text = match input {
            RunInput::Exit => {
                self.shutdown().await;
                return Ok(Step::End(SessionEnd::Cancelled));
            }
            RunInput::Text(text) => text,
        };

        let mut ready = Vec::new();
        for line in input::lines(&text) {
            match self.queue.push(line.clone()) {
                Ok(lines) => ready.extend(lines),
                Err(e) => {
                    warn!(error = %e, "Dropping input line");
                    let _ = events.send(SessionEvent::InputDropped(line));
                }
            }
        }
        self.send_lines(ready).await
    }

    async fn send_lines(&mut self, lines: Vec<String>) -> Result<Step, RunnerError> {
        for data in lines {
            debug!(len = data.len(), "Sending input line");
            if let Some(end) = self.send(&ClientMessage::Input { data }).await? {
                return Ok(Step::End(end));
            }
        }
        Ok(Step::Continue)
    }

    /// `Some(Disconnected)` when the channel is gone.
    async fn send(&mut self, message: &ClientMessage) -> Result<Option<SessionEnd>, RunnerError> {
        match self.transport.send(message).await {
            Ok(()) => Ok(None),
            Err(RunnerError::Transport(e)) => {
                warn!(error = %e, "Run channel failed");
                Ok(Some(SessionEnd::Disconnected))
            }
            Err(e) => Err(e),
        }
    }

    /// Ask the sandbox to stop, then hang up.
    async fn shutdown(&mut self) {
        if let Err(e) = self.transport.send(&ClientMessage::Exit).await {
            debug!(error = %e, "Could not send exit");
        }
        self.close().await;
    }

    async fn close(&mut self) {
        if let Err(e) = self.transport.close().await {
            debug!(error = %e, "Could not close run channel");
        }
    }
}
