//! Typed notifications and commands exchanged between the page stores and
//! whatever drives them.
//!
//! Notices replace toast calls: every user-visible outcome of a store action
//! is sent here. Commands carry delete requests to the single listener that
//! owns the stores.

use tokio::sync::mpsc;

/// A transient, user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Success(msg) | Notice::Error(msg) => msg,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Error(_))
    }
}

/// Sending half of the notice stream. Cloneable; a dropped receiver is ignored.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    tx: Option<mpsc::UnboundedSender<Notice>>,
}

impl Notifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A notifier that only logs.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn success(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{}", message);
        self.send(Notice::Success(message));
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.send(Notice::Error(message));
    }

    fn send(&self, notice: Notice) {
        if let Some(tx) = &self.tx {
            // The page may be gone; nothing to report to then.
            let _ = tx.send(notice);
        }
    }
}

/// A request from a view to delete something.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    DeleteCard { card_id: String },
    DeleteList { list_id: String },
    DeleteNode { node_id: String },
}

/// Producer side of the command channel.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: mpsc::Sender<Command>,
}

/// The single consumer of commands.
#[derive(Debug)]
pub struct CommandReceiver {
    rx: mpsc::Receiver<Command>,
}

/// Error returned when the command listener has gone away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerClosed(pub Command);

impl std::fmt::Display for ListenerClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "command listener closed, dropped {:?}", self.0)
    }
}

impl std::error::Error for ListenerClosed {}

/// Create a bounded command channel.
pub fn command_channel(capacity: usize) -> (CommandSender, CommandReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (CommandSender { tx }, CommandReceiver { rx })
}

impl CommandSender {
    pub async fn send(&self, command: Command) -> Result<(), ListenerClosed> {
        self.tx
            .send(command)
            .await
            .map_err(|e| ListenerClosed(e.0))
    }
}

impl CommandReceiver {
    /// Next command, or `None` once every sender is dropped.
    pub async fn recv(&mut self) -> Option<Command> {
        self.rx.recv().await
    }
}
