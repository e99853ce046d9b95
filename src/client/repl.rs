use log::{ error, info, warn };
use std::borrow::Cow;
use std::io;
use tokio::io::{ AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt };

use super::session::{ ChatSession, TurnOutcome, TurnRejection };
use crate::config::settings::{ CredentialStore, Settings };
use crate::llm::chat::new_client;
use crate::models::chat::{ Message, Sender };

const INPUT_MARKER: &str = "> ";
const PENDING_INDICATOR: &str = "… waiting for the assistant";
const EMPTY_TITLE: &str = "What do you want to know?";
const EMPTY_SUBTITLE: &str = "Ask anything about Model UN speeches and debates";
const HELP_TEXT: &str = "Commands:
  /new          start a new thread
  /key <value>  store a new API key
  /history      show the whole thread
  /dismiss      close the error banner
  /help         show this help
  /quit         leave
Start a message with // to send text that begins with /.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    NewThread,
    SetKey(String),
    History,
    Dismiss,
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    if let Some(escaped) = trimmed.strip_prefix("//") {
        return Command::Send(format!("/{}", escaped));
    }
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Command::Send(line.to_string());
    };
    let mut parts = rest.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or("");
    let arg = parts.next().unwrap_or("").trim();
    match name {
        "new" => Command::NewThread,
        "key" => Command::SetKey(arg.to_string()),
        "history" => Command::History,
        "dismiss" => Command::Dismiss,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => Command::Unknown(other.to_string()),
    }
}

/// Decodes one raw input line; invalid UTF-8 is replaced rather than ending the session.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    match String::from_utf8_lossy(raw) {
        Cow::Borrowed(line) => line.to_string(),
        Cow::Owned(line) => {
            warn!("Input line was not valid UTF-8; invalid bytes were replaced");
            line
        }
    }
}

pub fn render_message(message: &Message) -> String {
    match message.sender {
        Sender::User => format!("You: {}", message.text),
        Sender::Assistant =>
            match message.timestamp {
                Some(ts) => format!("Assistant ({}): {}", ts.format("%H:%M"), message.text),
                None => format!("Assistant: {}", message.text),
            }
    }
}

pub fn render_error(error: &str) -> String {
    format!("[error] {}  (/dismiss to close)", error)
}

/// Line-oriented chat front end over any reader/writer pair.
pub struct Repl<W> {
    session: ChatSession,
    settings: Settings,
    store: Box<dyn CredentialStore>,
    out: W,
}

impl<W: AsyncWrite + Unpin> Repl<W> {
    pub fn new(settings: Settings, store: Box<dyn CredentialStore>, out: W) -> Self {
        let session = ChatSession::from_settings(&settings);
        Self::with_session(session, settings, store, out)
    }

    pub fn with_session(
        session: ChatSession,
        settings: Settings,
        store: Box<dyn CredentialStore>,
        out: W
    ) -> Self {
        Self { session, settings, store, out }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, mut input: R) -> io::Result<()> {
        info!(
            "Chat client ready: provider={} model={:?}",
            self.settings.llm.llm_type,
            self.settings.llm.completion_model.as_deref().unwrap_or("adapter default")
        );
        if !self.session.has_client() {
            self.write_line("No API key configured. Use /key <value> to set one.").await?;
        }
        self.write_banner().await?;

        let mut raw = Vec::new();
        loop {
            self.out.write_all(INPUT_MARKER.as_bytes()).await?;
            self.out.flush().await?;
            raw.clear();
            if input.read_until(b'\n', &mut raw).await? == 0 {
                break;
            }
            let line = decode_line(&raw);
            match parse_command(&line) {
                Command::Send(text) => self.send(&text).await?,
                Command::NewThread => {
                    match self.session.new_thread() {
                        Ok(()) => self.write_banner().await?,
                        Err(_) => self.write_line("A reply is still pending.").await?,
                    }
                }
                Command::SetKey(key) => self.set_key(&key).await?,
                Command::History => self.write_history().await?,
                Command::Dismiss => self.session.dismiss_error(),
                Command::Help => self.write_line(HELP_TEXT).await?,
                Command::Quit => break,
                Command::Unknown(name) => {
                    self.write_line(&format!("Unknown command '/{}'. Use //{} to send it as text.", name, name)).await?;
                    self.write_line(HELP_TEXT).await?;
                }
            }
        }
        self.out.flush().await
    }

    async fn send(&mut self, text: &str) -> io::Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        self.write_line(PENDING_INDICATOR).await?;
        match self.session.submit(text).await {
            TurnOutcome::Replied(_) => {
                if let Some(reply) = self.session.messages().last() {
                    let rendered = render_message(reply);
                    self.write_line(&rendered).await?;
                }
            }
            TurnOutcome::Failed => {
                let banner = render_error(self.session.error().unwrap_or_default());
                self.write_line(&banner).await?;
            }
            TurnOutcome::Rejected(TurnRejection::Busy) => {
                self.write_line("A reply is still pending.").await?;
            }
            TurnOutcome::Rejected(_) => {}
        }
        Ok(())
    }

    async fn set_key(&mut self, key: &str) -> io::Result<()> {
        if key.trim().is_empty() {
            return self.write_line("Usage: /key <value>").await;
        }
        if let Err(e) = self.store.save_api_key(key) {
            error!("Failed to store API key: {}", e);
            self.write_line("Could not save the API key; it will apply to this run only.").await?;
        }
        self.settings = self.settings.with_api_key(Some(key.to_string()));
        match new_client(&self.settings.llm) {
            Ok(client) => {
                self.session.set_client(Some(client));
                self.write_line("API key updated.").await
            }
            Err(e) => {
                error!("Failed to configure chat provider: {}", e);
                self.session.set_client(None);
                self.write_line(&format!("Could not configure provider: {}", e)).await
            }
        }
    }

    async fn write_banner(&mut self) -> io::Result<()> {
        self.write_line(EMPTY_TITLE).await?;
        self.write_line(EMPTY_SUBTITLE).await
    }

    async fn write_history(&mut self) -> io::Result<()> {
        if self.session.messages().is_empty() {
            return self.write_banner().await;
        }
        let rendered: Vec<String> = self.session.messages().iter().map(render_message).collect();
        for line in rendered {
            self.write_line(&line).await?;
        }
        if let Some(err) = self.session.error() {
            let banner = render_error(err);
            self.write_line(&banner).await?;
        }
        Ok(())
    }

    async fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.out.write_all(line.as_bytes()).await?;
        self.out.write_all(b"\n").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::session::GENERIC_ERROR_MESSAGE;
    use crate::config::prompt::PromptTemplate;
    use crate::config::settings::MemoryCredentialStore;
    use crate::llm::chat::testing::ScriptedClient;
    use crate::llm::chat::ChatClient;
    use crate::llm::{ LlmConfig, LlmType };
    use std::sync::Arc;

    fn settings() -> Settings {
        Settings::new(LlmConfig::new(LlmType::DeepSeek), PromptTemplate::default())
    }

    fn repl_with(client: ScriptedClient) -> Repl<Vec<u8>> {
        let client: Arc<dyn ChatClient> = Arc::new(client);
        let session = ChatSession::new(Some(client), PromptTemplate::default());
        Repl::with_session(session, settings(), Box::new(MemoryCredentialStore::default()), Vec::new())
    }

    #[test]
    fn parses_commands_and_plain_text() {
        assert_eq!(parse_command("/new"), Command::NewThread);
        assert_eq!(parse_command("/key  sk-123 "), Command::SetKey("sk-123".to_string()));
        assert_eq!(parse_command(" /quit"), Command::Quit);
        assert_eq!(parse_command("/vote"), Command::Unknown("vote".to_string()));
        assert_eq!(
            parse_command("//2 majority is required"),
            Command::Send("/2 majority is required".to_string())
        );
        assert_eq!(
            parse_command("Motion for a moderated caucus"),
            Command::Send("Motion for a moderated caucus".to_string())
        );
    }

    #[test]
    fn renders_senders() {
        assert_eq!(render_message(&Message::user("Hello")), "You: Hello");
        let assistant = render_message(&Message::assistant("Greetings"));
        assert!(assistant.starts_with("Assistant ("));
        assert!(assistant.ends_with("): Greetings"));
    }

    #[tokio::test]
    async fn reply_is_rendered_after_pending_indicator() {
        let mut repl = repl_with(ScriptedClient::replying("Resolution 1973 authorizes..."));
        repl.run(&b"What is Resolution 1973?\n/quit\n"[..]).await.unwrap();

        assert_eq!(repl.session().messages().len(), 2);
        let output = String::from_utf8(repl.into_output()).unwrap();
        assert!(output.starts_with(EMPTY_TITLE));
        let pending = output.find(PENDING_INDICATOR).unwrap();
        let reply = output.find("Resolution 1973 authorizes...").unwrap();
        assert!(pending < reply);
    }

    #[tokio::test]
    async fn failure_shows_single_error_banner() {
        let mut repl = repl_with(ScriptedClient::failing());
        repl.run(&b"Draft a speech\n"[..]).await.unwrap();

        let session = repl.session();
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.error(), Some(GENERIC_ERROR_MESSAGE));
        let output = String::from_utf8(repl.into_output()).unwrap();
        assert_eq!(output.matches(GENERIC_ERROR_MESSAGE).count(), 1);
    }

    #[tokio::test]
    async fn blank_lines_do_nothing() {
        let mut repl = repl_with(ScriptedClient::replying("unused"));
        repl.run(&b"\n   \n"[..]).await.unwrap();

        assert!(repl.session().messages().is_empty());
        let output = String::from_utf8(repl.into_output()).unwrap();
        assert!(!output.contains(PENDING_INDICATOR));
    }

    #[tokio::test]
    async fn dismiss_and_new_thread_reset_state() {
        let mut repl = repl_with(ScriptedClient::failing());
        repl.run(&b"hello\n/dismiss\n"[..]).await.unwrap();
        assert_eq!(repl.session().error(), None);
        assert_eq!(repl.session().messages().len(), 1);

        repl.run(&b"/new\n"[..]).await.unwrap();
        assert!(repl.session().messages().is_empty());
    }

    #[tokio::test]
    async fn key_command_stores_key_and_builds_provider() {
        let session = ChatSession::new(None, PromptTemplate::default());
        let mut repl = Repl::with_session(
            session,
            settings(),
            Box::new(MemoryCredentialStore::default()),
            Vec::new()
        );
        repl.run(&b"/key sk-new\n"[..]).await.unwrap();

        assert!(repl.session().has_client());
        assert_eq!(repl.store.load_api_key().unwrap(), Some("sk-new".to_string()));
        assert_eq!(repl.settings.llm.api_key.as_deref(), Some("sk-new"));
        let output = String::from_utf8(repl.into_output()).unwrap();
        assert!(output.contains("No API key configured."));
        assert!(output.contains("API key updated."));
    }

    #[tokio::test]
    async fn invalid_utf8_line_does_not_end_the_session() {
        let mut repl = repl_with(ScriptedClient::new(vec![
            Ok("one".to_string()),
            Ok("two".to_string()),
            Ok("three".to_string())
        ]));
        repl.run(&b"first\ncaf\xe9\nsecond\n"[..]).await.unwrap();

        let messages = repl.session().messages();
        assert_eq!(messages.len(), 6);
        assert_eq!(messages[2].text, "caf\u{FFFD}");
        assert_eq!(messages[4].text, "second");
    }

    #[tokio::test]
    async fn escaped_slash_is_sent_as_text() {
        let mut repl = repl_with(ScriptedClient::replying("Seconded."));
        repl.run(&b"//2 majority is required\r\n"[..]).await.unwrap();

        let messages = repl.session().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "/2 majority is required");
    }

    #[tokio::test]
    async fn history_renders_whole_thread() {
        let mut repl = repl_with(ScriptedClient::replying("Noted."));
        repl.run(&b"Yield to the chair\n/history\n"[..]).await.unwrap();

        let output = String::from_utf8(repl.into_output()).unwrap();
        assert!(output.contains("You: Yield to the chair"));
        assert_eq!(output.matches("Noted.").count(), 2);
    }
}
