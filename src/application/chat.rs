#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;

use std::io::IsTerminal;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use owo_colors::Style;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::ContentGenerator;
use crate::domain::models::Event;
use crate::domain::models::GenerationError;
use crate::domain::models::MediaUploader;
use crate::domain::models::RequestId;
use crate::domain::models::SlashCommand;
use crate::domain::services::Conversation;
use crate::domain::services::GENERATION_ERROR_TEXT;
use crate::infrastructure::backends::Gemini;
use crate::infrastructure::uploads::ImageKitSettings;
use crate::infrastructure::uploads::ImageKitUploader;
use crate::infrastructure::uploads::UploadAuthClient;

pub fn help_text() -> String {
    let text = r#"
COMMANDS:
- /upload (/u) [PATH] - Uploads an image. It is sent to the model along with your next message.
- /quit /exit (/q) - Exit.
- /help (/h) - Provides this help menu.

HOTKEYS:
- CTRL+C - Stop the answer being generated, otherwise exit.
        "#;

    return text.trim().to_string();
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

struct ActiveGeneration {
    id: RequestId,
    cancel: CancellationToken,
}

/// Line based chat session. Input lines and worker events are applied to the
/// conversation one at a time; network work happens in spawned workers.
pub struct Chat<W: Write> {
    conversation: Conversation,
    generator: Arc<dyn ContentGenerator + Send + Sync>,
    uploader: Arc<dyn MediaUploader + Send + Sync>,
    imagekit: ImageKitSettings,
    event_tx: mpsc::UnboundedSender<Event>,
    event_rx: mpsc::UnboundedReceiver<Event>,
    active: Option<ActiveGeneration>,
    uploads: usize,
    printed: usize,
    color: bool,
    out: W,
}

impl<W: Write> Chat<W> {
    pub fn new(
        generator: Arc<dyn ContentGenerator + Send + Sync>,
        uploader: Arc<dyn MediaUploader + Send + Sync>,
        imagekit: ImageKitSettings,
        out: W,
        color: bool,
    ) -> Chat<W> {
        let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();
        return Chat {
            conversation: Conversation::default(),
            generator,
            uploader,
            imagekit,
            event_tx,
            event_rx,
            active: None,
            uploads: 0,
            printed: 0,
            color,
            out,
        };
    }

    pub fn conversation(&self) -> &Conversation {
        return &self.conversation;
    }

    pub fn is_generating(&self) -> bool {
        return self.active.is_some();
    }

    /// True while a generation or an upload has yet to report back.
    pub fn is_busy(&self) -> bool {
        return self.is_generating() || self.uploads > 0;
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.color {
            return style.style(text).to_string();
        }

        return text.to_string();
    }

    fn prompt(&mut self) -> Result<()> {
        let label = self.paint("you>", Style::new().green().bold());
        write!(self.out, "{label} ")?;
        self.out.flush()?;
        return Ok(());
    }

    fn notice(&mut self, text: &str, error: bool) -> Result<()> {
        let style = if error {
            Style::new().red()
        } else {
            Style::new().dimmed()
        };
        let painted = self.paint(text, style);
        writeln!(self.out, "{painted}")?;
        return Ok(());
    }

    pub fn greet(&mut self) -> Result<()> {
        self.notice("Hey there! What can I do for you? Type /help for commands.", false)?;
        return self.prompt();
    }

    pub fn handle_input(&mut self, line: &str) -> Result<Flow> {
        let text = line.trim_end_matches(['\r', '\n']);
        if text.trim().is_empty() {
            if !self.is_generating() {
                self.prompt()?;
            }
            return Ok(Flow::Continue);
        }

        if let Some(command) = SlashCommand::parse(text) {
            if command.is_quit() {
                return Ok(Flow::Quit);
            }
            if command.is_help() {
                self.notice(&help_text(), false)?;
            }
            if command.is_upload() && self.is_generating() {
                self.notice(
                    "Still answering your last message. Upload once it is done, or press CTRL+C to stop it.",
                    true,
                )?;
                return Ok(Flow::Continue);
            }
            if command.is_upload() {
                match command.upload_path() {
                    Some(path) => self.start_upload(PathBuf::from(path))?,
                    None => self.notice("You must specify a file with `/upload`.", true)?,
                }
            }
            if !self.is_generating() {
                self.prompt()?;
            }
            return Ok(Flow::Continue);
        }

        if self.is_generating() {
            self.notice(
                "Still answering your last message. Press CTRL+C to stop it.",
                true,
            )?;
            return Ok(Flow::Continue);
        }

        self.start_generation(text)?;
        return Ok(Flow::Continue);
    }

    fn start_upload(&mut self, path: PathBuf) -> Result<()> {
        self.notice(&format!("Uploading {}...", path.display()), false)?;
        self.uploads += 1;

        let uploader = self.uploader.clone();
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let event = match uploader.upload(&path).await {
                Ok(res) => Event::UploadFinished(res),
                Err(err) => Event::UploadFailed(err),
            };
            if tx.send(event).is_err() {
                tracing::debug!("Chat loop is gone, dropping upload result");
            }
        });

        return Ok(());
    }

    fn start_generation(&mut self, text: &str) -> Result<()> {
        let pending = match self.conversation.begin_text(text) {
            Some(pending) => pending,
            None => return Ok(()),
        };

        let id = pending.id;
        let cancel = CancellationToken::new();
        self.active = Some(ActiveGeneration {
            id,
            cancel: cancel.clone(),
        });
        self.printed = 0;

        let label = self.paint("gemini>", Style::new().cyan().bold());
        write!(self.out, "{label} ")?;
        self.out.flush()?;

        let generator = self.generator.clone();
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let chunk_tx = tx.clone();
            let mut on_chunk = move |cumulative: &str| {
                if chunk_tx
                    .send(Event::GenerationChunk(id, cumulative.to_string()))
                    .is_err()
                {
                    tracing::debug!(request_id = %id, "Chat loop is gone, dropping chunk");
                }
            };

            let res = generator
                .generate_stream(&pending.history, &cancel, &mut on_chunk)
                .await;

            let event = match res {
                Ok(_) => Event::GenerationDone(id),
                Err(GenerationError::Cancelled) => Event::GenerationCancelled(id),
                Err(err) => Event::GenerationFailed(id, err),
            };
            if tx.send(event).is_err() {
                tracing::debug!(request_id = %id, "Chat loop is gone, dropping result");
            }
        });

        return Ok(());
    }

    /// CTRL+C stops the running generation, or leaves when there is none.
    pub fn interrupt(&mut self) -> Flow {
        match &self.active {
            Some(active) => {
                active.cancel.cancel();
                return Flow::Continue;
            }
            None => return Flow::Quit,
        }
    }

    fn is_active(&self, id: RequestId) -> bool {
        return self.active.as_ref().map(|active| return active.id) == Some(id);
    }

    fn finish_generation(&mut self, id: RequestId) -> Result<()> {
        if !self.is_active(id) {
            return Ok(());
        }

        self.active = None;
        self.printed = 0;
        writeln!(self.out)?;
        return self.prompt();
    }

    pub fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::GenerationChunk(id, cumulative) => {
                if !self.conversation.apply_chunk(id, &cumulative) {
                    return Ok(());
                }
                if let Some(delta) = cumulative.get(self.printed..) {
                    write!(self.out, "{delta}")?;
                    self.out.flush()?;
                }
                self.printed = cumulative.len();
            }
            Event::GenerationDone(id) => {
                self.conversation.complete(id);
                self.finish_generation(id)?;
            }
            Event::GenerationFailed(id, err) => {
                tracing::error!(request_id = %id, error = %err, "Generation failed");
                self.conversation.fail(id);
                if self.is_active(id) {
                    writeln!(self.out)?;
                    self.notice(GENERATION_ERROR_TEXT, true)?;
                }
                self.finish_generation(id)?;
            }
            Event::GenerationCancelled(id) => {
                self.conversation.cancel(id);
                if self.is_active(id) {
                    writeln!(self.out)?;
                    self.notice("(stopped)", false)?;
                }
                self.finish_generation(id)?;
            }
            Event::UploadFinished(res) => {
                self.uploads = self.uploads.saturating_sub(1);
                let preview = res
                    .path()
                    .map(|path| return self.imagekit.preview_url(path));
                if self.conversation.submit_image(res) {
                    let preview = preview.unwrap_or_default();
                    self.notice(&format!("Attached image {preview}"), false)?;
                } else {
                    self.notice("Upload finished without a usable file path.", true)?;
                }
                if !self.is_generating() {
                    self.prompt()?;
                }
            }
            Event::UploadFailed(err) => {
                self.uploads = self.uploads.saturating_sub(1);
                tracing::error!(error = ?err, "Upload failed");
                self.notice(&format!("Upload failed: {err}"), true)?;
                if !self.is_generating() {
                    self.prompt()?;
                }
            }
        }

        return Ok(());
    }

    pub async fn next_event(&mut self) -> Option<Event> {
        return self.event_rx.recv().await;
    }

    /// Reads input until it ends or the user quits. Once input ends, work
    /// already started is drained before returning.
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, input: R) -> Result<()> {
        let mut lines = input.lines();
        let mut input_open = true;

        loop {
            if !input_open && !self.is_busy() {
                break;
            }

            tokio::select! {
                line = lines.next_line(), if input_open => {
                    match line? {
                        Some(line) => {
                            if self.handle_input(&line)? == Flow::Quit {
                                break;
                            }
                        }
                        None => input_open = false,
                    }
                }
                Some(event) = self.event_rx.recv() => {
                    self.handle_event(event)?;
                }
                _ = tokio::signal::ctrl_c() => {
                    if self.interrupt() == Flow::Quit {
                        break;
                    }
                }
            }
        }

        if let Some(active) = self.active.take() {
            active.cancel.cancel();
        }

        return Ok(());
    }
}

pub async fn start() -> Result<()> {
    let gemini = Gemini::new(Config::gemini_settings()?);
    let imagekit = Config::imagekit_settings();
    let uploader = ImageKitUploader::new(
        imagekit.clone(),
        UploadAuthClient::new(&Config::get(ConfigKey::UploadAuthURL)),
    );

    let health = gemini.health_check().await;

    let color = std::io::stdout().is_terminal();
    let mut chat = Chat::new(
        Arc::new(gemini),
        Arc::new(uploader),
        imagekit,
        std::io::stdout(),
        color,
    );

    if let Err(err) = health {
        chat.notice(
            &format!(
                "Hey, it looks like Gemini isn't reachable with model {}. Double check your token and model before we start talking.\n\nError: {err}",
                Config::get(ConfigKey::Model)
            ),
            true,
        )?;
    }

    chat.greet()?;
    return chat.run(BufReader::new(tokio::io::stdin())).await;
}
