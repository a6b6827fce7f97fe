use log::{ error, info, warn };
use std::path::Path;
use tokio::io::{ AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt };
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;

use crate::connectivity::ConnectivitySignal;
use crate::controller::{ ConversationController, SendOutcome };
use crate::error::{ ChatError, RetryNotice, ValidationError };
use crate::models::chat::{ ChatMessage, DocumentItem };
use crate::models::console::Command;

const MAX_LINE_SIZE: usize = 1 * 1024 * 1024;
const NOTE_TYPE: &str = "text/plain";

const HELP: &str =
    "Type a question to send it. Commands:
  /attach <path>         attach a text file as a document
  /note <name> <text>    attach inline text as a document
  /docs                  list attached documents
  /remove <number>       remove an attached document
  /title <text>          set the title of this chat
  /new                   save this chat and start a new one
  /list                  list saved chats
  /load <id>             open a saved chat
  /rename <id> <title>   rename a saved chat
  /delete <id>           delete a saved chat
  /key <api key>         store the API key
  /online, /offline      toggle connectivity
  /history               show this chat's messages
  /status                show the status line
  /quit                  save and exit";

enum Flow {
    Continue,
    Quit,
}

enum InputLine {
    Text(String),
    TooLong(usize),
}

/// Reads one line, buffering at most `MAX_LINE_SIZE + 1` bytes. The remainder
/// of an oversized line is consumed in bounded chunks and dropped.
async fn read_line<R>(input: &mut R) -> Result<Option<InputLine>, ChatError>
    where R: AsyncBufRead + Unpin
{
    let limit = (MAX_LINE_SIZE as u64) + 1;
    let mut buf = Vec::new();
    if (&mut *input).take(limit).read_until(b'\n', &mut buf).await? == 0 {
        return Ok(None);
    }
    if buf.len() > MAX_LINE_SIZE && !buf.ends_with(b"\n") {
        let mut skipped = buf.len();
        loop {
            buf.clear();
            let n = (&mut *input).take(limit).read_until(b'\n', &mut buf).await?;
            skipped += n;
            if n == 0 || buf.ends_with(b"\n") {
                break;
            }
        }
        return Ok(Some(InputLine::TooLong(skipped)));
    }
    let line = String::from_utf8_lossy(&buf);
    Ok(Some(InputLine::Text(line.trim_end_matches(['\r', '\n']).to_string())))
}

/// Line-oriented front end over a [`ConversationController`].
pub struct Console<'a, W> {
    controller: &'a mut ConversationController,
    out: W,
}

impl<'a, W> Console<'a, W> where W: AsyncWrite + Unpin {
    pub fn new(controller: &'a mut ConversationController, out: W) -> Self {
        Self { controller, out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Reads commands until `/quit` or end of input, then saves the open chat.
    pub async fn run<R>(&mut self, mut input: R) -> Result<(), ChatError>
        where R: AsyncBufRead + Unpin
    {
        self.say("Document chat. Type /help for commands.").await?;

        loop {
            self.prompt().await?;
            let line = match read_line(&mut input).await? {
                Some(InputLine::Text(line)) => line,
                Some(InputLine::TooLong(len)) => {
                    warn!("Input line exceeds size limit ({} > {})", len, MAX_LINE_SIZE);
                    self.say("Input too large.").await?;
                    continue;
                }
                None => {
                    info!("End of input");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            let command = match Command::parse(&line) {
                Ok(command) => command,
                Err(e) => {
                    self.say(&e.to_string()).await?;
                    continue;
                }
            };

            match self.handle(command).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(ChatError::Io(e)) => return Err(ChatError::Io(e)),
                Err(e) => {
                    error!("Command failed: {}", e);
                    self.say(&format!("Error: {}", e)).await?;
                }
            }
        }

        if let Some(id) = self.controller.save_session().await? {
            info!("Saved open chat {} on exit", id);
        }
        Ok(())
    }

    async fn handle(&mut self, command: Command) -> Result<Flow, ChatError> {
        match command {
            Command::Help => self.say(HELP).await?,
            Command::Quit => {
                return Ok(Flow::Quit);
            }
            Command::Send { content } => self.send(&content).await?,
            Command::New => {
                self.controller.create_session().await?;
                self.say("Started a new chat.").await?;
            }
            Command::List => self.list().await?,
            Command::Load { id } => {
                self.controller.load_session(&id).await?;
                let title = self.controller.session().display_title();
                self.say(&format!("Loaded '{}'.", title)).await?;
                self.history().await?;
            }
            Command::Rename { id, title } => {
                self.controller.rename_session(&id, &title).await?;
                self.say(&format!("Renamed {} to '{}'.", id, title)).await?;
            }
            Command::Title { title } => {
                self.controller.set_title(&title);
                let title = self.controller.session().display_title();
                self.say(&format!("Title: {}", title)).await?;
            }
            Command::Delete { id } => {
                if self.controller.delete_session(&id).await? {
                    self.say(&format!("Deleted {}.", id)).await?;
                } else {
                    self.say(&format!("No saved chat with id {}.", id)).await?;
                }
            }
            Command::Attach { path } => {
                let item = self.controller.attach_file(Path::new(&path)).await?;
                let line = describe_document(item);
                self.say(&format!("Attached {}", line)).await?;
            }
            Command::Note { name, content } => {
                let item = self.controller.add_document(DocumentItem {
                    name,
                    doc_type: NOTE_TYPE.to_string(),
                    content,
                });
                let line = describe_document(item);
                self.say(&format!("Attached {}", line)).await?;
            }
            Command::Docs => self.docs().await?,
            Command::Remove { position } => {
                match self.controller.remove_document(position - 1) {
                    Some(item) => self.say(&format!("Removed {}.", item.name)).await?,
                    None => self.say(&format!("No document number {}.", position)).await?,
                }
            }
            Command::Key { value } => {
                self.controller.set_api_key(&value).await?;
                self.say("API key saved.").await?;
            }
            Command::Online => {
                self.controller.connectivity().set_online(true);
                self.say("Online.").await?;
            }
            Command::Offline => {
                self.controller.connectivity().set_online(false);
                self.say("Offline.").await?;
            }
            Command::History => self.history().await?,
            Command::Status => self.status().await?,
        }
        Ok(Flow::Continue)
    }

    async fn send(&mut self, content: &str) -> Result<(), ChatError> {
        self.controller.set_draft(content);

        let (tx, mut rx) = mpsc::unbounded_channel::<RetryNotice>();
        let send = self.controller.send_message(move |notice| {
            let _ = tx.send(notice.clone());
        });
        let out = &mut self.out;
        let print_notices = async {
            while let Some(notice) = rx.recv().await {
                write_line(out, &format!("  {}", notice)).await?;
            }
            Ok::<(), ChatError>(())
        };
        let (outcome, printed) = tokio::join!(send, print_notices);
        printed?;

        match outcome {
            SendOutcome::Ignored => self.say(&ValidationError::AlreadySent.to_string()).await,
            SendOutcome::Rejected(e) => self.say(&e.to_string()).await,
            SendOutcome::Answered(reply) => self.say(&format_message(&reply)).await,
            SendOutcome::Failed(e) => self.say(&format!("Error: {}", e)).await,
        }
    }

    async fn list(&mut self) -> Result<(), ChatError> {
        let conversations = self.controller.list_sessions().await?;
        if conversations.is_empty() {
            return self.say("No saved chats.").await;
        }
        let mut text = String::new();
        for c in &conversations {
            let marker = if self.controller.session().is_active(&c.id) { "*" } else { " " };
            text.push_str(
                &format!(
                    "{} {}  {}  ({}, {} messages)\n",
                    marker,
                    c.id,
                    c.title,
                    c.timestamp.format("%Y-%m-%d %H:%M"),
                    c.messages.len()
                )
            );
        }
        self.say(text.trim_end()).await
    }

    async fn docs(&mut self) -> Result<(), ChatError> {
        let documents = self.controller.session().documents.list();
        if documents.is_empty() {
            return self.say("No documents attached.").await;
        }
        let text = documents
            .iter()
            .enumerate()
            .map(|(i, item)| format!("{}. {}", i + 1, describe_document(item)))
            .collect::<Vec<_>>()
            .join("\n");
        self.say(&text).await
    }

    async fn history(&mut self) -> Result<(), ChatError> {
        let messages = &self.controller.session().messages;
        if messages.is_empty() {
            return self.say("No messages yet.").await;
        }
        let text = messages.iter().map(format_message).collect::<Vec<_>>().join("\n");
        self.say(&text).await
    }

    async fn status(&mut self) -> Result<(), ChatError> {
        let session = self.controller.session();
        let text = format!(
            "{} | {} | {} document(s) | {}",
            session.display_title(),
            if self.controller.connectivity().is_online() { "online" } else { "offline" },
            session.documents.len(),
            self.controller.ui().status().unwrap_or("Ready.")
        );
        self.say(&text).await
    }

    async fn prompt(&mut self) -> Result<(), ChatError> {
        self.out.write_all(b"> ").await?;
        self.out.flush().await?;
        Ok(())
    }

    async fn say(&mut self, text: &str) -> Result<(), ChatError> {
        write_line(&mut self.out, text).await
    }
}

async fn write_line<W>(out: &mut W, text: &str) -> Result<(), ChatError> where W: AsyncWrite + Unpin {
    out.write_all(text.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await?;
    Ok(())
}

fn format_message(message: &ChatMessage) -> String {
    format!("{}: {}", message.role, message.content)
}

fn describe_document(item: &DocumentItem) -> String {
    format!("{} ({}, {} chars)", item.name, item.doc_type, item.content.chars().count())
}

/// Logs connectivity transitions for as long as the signal lives.
pub fn spawn_connectivity_watcher(signal: &ConnectivitySignal) -> JoinHandle<()> {
    let mut changes = signal.changes();
    tokio::spawn(async move {
        while let Some(online) = changes.next().await {
            if online {
                info!("Connection restored");
            } else {
                warn!("Connection lost; sends are blocked until it returns");
            }
        }
    })
}
