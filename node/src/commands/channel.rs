// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::marker::PhantomData;

use parking_lot::Mutex;
use tessera_kernel::config::COMMAND_CHANNEL_CAPACITY;
use tessera_kernel::types::{Command, CommandKind};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::errors::CommandError;

/// Type-erased view of one per-kind channel.
pub trait CommandQueue: Send + Sync {
    fn name(&self) -> &'static str;

    /// Name and payload must match the channel's kind.
    fn check(&self, command: &Command) -> Result<(), CommandError>;

    fn enqueue(&self, command: Command) -> Result<(), CommandError>;

    /// Move everything queued so far into `out`, oldest first.
    fn drain_into(&self, out: &mut Vec<Command>);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bounded FIFO for commands of kind `T`. Many producers, one consumer.
pub struct CommandChannel<T: CommandKind> {
    tx: mpsc::Sender<Command>,
    rx: Mutex<mpsc::Receiver<Command>>,
    _kind: PhantomData<fn() -> T>,
}

impl<T: CommandKind> CommandChannel<T> {
    pub fn new() -> Self {
        Self::with_capacity(COMMAND_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self { tx, rx: Mutex::new(rx), _kind: PhantomData }
    }
}

impl<T: CommandKind> Default for CommandChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: CommandKind> CommandQueue for CommandChannel<T> {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn check(&self, command: &Command) -> Result<(), CommandError> {
        command
            .payload::<T>()
            .map(|_| ())
            .map_err(|e| CommandError::Malformed(e.to_string()))
    }

    fn enqueue(&self, command: Command) -> Result<(), CommandError> {
        self.check(&command)?;
        self.tx.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => CommandError::ChannelFull(T::NAME.to_string()),
            TrySendError::Closed(_) => CommandError::Unavailable(format!("channel {} closed", T::NAME)),
        })
    }

    fn drain_into(&self, out: &mut Vec<Command>) {
        let mut rx = self.rx.lock();
        while let Ok(command) = rx.try_recv() {
            out.push(command);
        }
    }

    fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}
