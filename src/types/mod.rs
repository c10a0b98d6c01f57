// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod address;
pub mod bytes;
pub mod command;
pub mod epoch;
pub mod snapshot;
pub mod tick;

pub use address::ShardAddress;
pub use command::{AuthInfo, AuthMode, Command, CommandBody, CommandKind, CommandRaw, SignedCommand};
pub use epoch::Epoch;
pub use snapshot::Snapshot;
pub use tick::{Tick, TickData, TickHeader};
