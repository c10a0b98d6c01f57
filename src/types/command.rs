// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Client commands.
//!
//! A command travels as a [`SignedCommand`]: the signature, who signed it, and
//! the canonical bytes that were signed. Everything else is derived from those
//! bytes and is only meaningful once the verifier has accepted the envelope.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::config::SALT_LEN;
use crate::error::{KernelError, Result};
use crate::types::address::ShardAddress;

/// A concrete command payload type, registered under a stable name.
pub trait CommandKind: Serialize + DeserializeOwned + Send + Sync + 'static {
    const NAME: &'static str;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthMode {
    /// The signer key itself is the identity.
    Direct,
    /// The signer must be bound to the body's persona in the registry.
    Persona,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInfo {
    pub mode: AuthMode,
    #[serde(with = "crate::types::bytes")]
    pub signer_address: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandBody {
    pub name: String,
    pub address: ShardAddress,
    pub persona: String,
    /// Canonical encoding of the kind's concrete payload type.
    #[serde(with = "crate::types::bytes")]
    pub payload: Vec<u8>,
}

/// The structure `command_bytes` decodes to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRaw {
    /// Unix milliseconds, client clock.
    pub timestamp: u64,
    pub salt: [u8; SALT_LEN],
    pub body: CommandBody,
}

impl CommandRaw {
    /// Build a command body around a typed payload.
    pub fn new<T: CommandKind>(
        timestamp: u64,
        salt: [u8; SALT_LEN],
        address: ShardAddress,
        persona: impl Into<String>,
        payload: &T,
    ) -> Result<Self> {
        Ok(Self {
            timestamp,
            salt,
            body: CommandBody {
                name: T::NAME.to_string(),
                address,
                persona: persona.into(),
                payload: codec::encode(payload)?,
            },
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.timestamp == 0 {
            return Err(KernelError::Schema("command: missing timestamp".into()));
        }
        if self.body.name.is_empty() {
            return Err(KernelError::Schema("command: empty name".into()));
        }
        self.body.address.validate()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        codec::encode(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let raw: Self = codec::decode(bytes)?;
        raw.validate()?;
        Ok(raw)
    }
}

/// Wire envelope. This is what clients submit and what epochs carry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCommand {
    #[serde(with = "crate::types::bytes")]
    pub signature: Vec<u8>,
    pub auth_info: AuthInfo,
    #[serde(with = "crate::types::bytes")]
    pub command_bytes: Vec<u8>,
}

impl SignedCommand {
    pub fn decode(&self) -> Result<CommandRaw> {
        CommandRaw::from_bytes(&self.command_bytes)
    }
}

/// Normalized command: the envelope plus its decoded body.
///
/// Serializes as the bare envelope; the decoded body is rebuilt on the way
/// back in, so a serialized tick never carries derived data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "SignedCommand", try_from = "SignedCommand")]
pub struct Command {
    pub signature: Vec<u8>,
    pub auth_info: AuthInfo,
    pub command_bytes: Vec<u8>,
    pub decoded: CommandRaw,
}

impl Command {
    pub fn from_signed(signed: SignedCommand) -> Result<Self> {
        let decoded = signed.decode()?;
        Ok(Self {
            signature: signed.signature,
            auth_info: signed.auth_info,
            command_bytes: signed.command_bytes,
            decoded,
        })
    }

    pub fn to_signed(&self) -> SignedCommand {
        SignedCommand {
            signature: self.signature.clone(),
            auth_info: self.auth_info.clone(),
            command_bytes: self.command_bytes.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.decoded.body.name
    }

    pub fn persona(&self) -> &str {
        &self.decoded.body.persona
    }

    pub fn timestamp(&self) -> u64 {
        self.decoded.timestamp
    }

    /// Decode the payload into its concrete type.
    pub fn payload<T: CommandKind>(&self) -> Result<T> {
        if self.name() != T::NAME {
            return Err(KernelError::Schema(format!(
                "command name {:?} does not match kind {:?}",
                self.name(),
                T::NAME
            )));
        }
        codec::decode(&self.decoded.body.payload)
    }
}

impl From<Command> for SignedCommand {
    fn from(command: Command) -> Self {
        SignedCommand {
            signature: command.signature,
            auth_info: command.auth_info,
            command_bytes: command.command_bytes,
        }
    }
}

impl TryFrom<SignedCommand> for Command {
    type Error = KernelError;

    fn try_from(signed: SignedCommand) -> Result<Self> {
        Command::from_signed(signed)
    }
}
