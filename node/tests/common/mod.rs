// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tessera_kernel::types::{AuthMode, CommandKind, CommandRaw, Epoch, ShardAddress, SignedCommand};
use tessera_kernel::verify::CommandSigner;
use tessera_node::commands::CommandManager;
use tessera_node::config::{NodeConfig, ShardMode};
use tessera_node::network::RegistryClient;
use tessera_node::persistence::{NopSnapshotStorage, SnapshotStorage};
use tessera_node::sample::{self, SampleEngine};
use tessera_node::shard::Shard;
use tessera_node::store;
use tessera_node::stream::{LogMessage, LogService, ObjectLog};
use tessera_node::verifier::CommandVerifier;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter("debug").try_init();
}

pub fn address() -> ShardAddress {
    ShardAddress::new("eu-west", "acme", "arena", "shard-7")
}

pub fn signer(seed: u8) -> CommandSigner {
    CommandSigner::from_bytes(&[seed; 32])
}

pub fn config(mode: ShardMode) -> NodeConfig {
    NodeConfig {
        mode,
        address: address(),
        tick_rate: 1_000,
        fetch_wait: Duration::from_millis(20),
        retry_delay: Duration::from_millis(20),
        ..Default::default()
    }
}

pub fn memory_log() -> Arc<ObjectLog> {
    Arc::new(ObjectLog::new(store::memory().unwrap(), 0))
}

pub fn signed_as<T: CommandKind>(
    signer: &CommandSigner,
    persona: &str,
    mode: AuthMode,
    timestamp: u64,
    salt: u8,
    payload: &T,
) -> SignedCommand {
    let raw = CommandRaw::new(timestamp, [salt; 16], address(), persona, payload).unwrap();
    signer.sign(&raw, mode).unwrap()
}

/// Direct-mode command from persona "alice".
pub fn direct<T: CommandKind>(signer: &CommandSigner, timestamp: u64, salt: u8, payload: &T) -> SignedCommand {
    signed_as(signer, "alice", AuthMode::Direct, timestamp, salt, payload)
}

pub fn manager(registry: Option<Arc<dyn RegistryClient>>) -> Arc<CommandManager> {
    let verifier = Arc::new(CommandVerifier::new(address(), registry));
    let manager = Arc::new(CommandManager::new(verifier));
    sample::register_commands(&manager);
    manager
}

pub struct Node {
    pub shard: Shard<SampleEngine>,
    pub commands: Arc<CommandManager>,
}

pub fn node(cfg: NodeConfig, log: Arc<dyn LogService>, snapshots: Arc<dyn SnapshotStorage>) -> Node {
    node_with_registry(cfg, log, snapshots, None)
}

pub fn node_with_registry(
    cfg: NodeConfig,
    log: Arc<dyn LogService>,
    snapshots: Arc<dyn SnapshotStorage>,
    registry: Option<Arc<dyn RegistryClient>>,
) -> Node {
    let commands = manager(registry);
    let shard = Shard::new(cfg, SampleEngine::new(), commands.clone(), log, snapshots);
    Node { shard, commands }
}

pub fn leader(log: Arc<dyn LogService>) -> Node {
    node(config(ShardMode::Leader), log, Arc::new(NopSnapshotStorage))
}

pub fn follower(log: Arc<dyn LogService>) -> Node {
    node(config(ShardMode::Follower), log, Arc::new(NopSnapshotStorage))
}

pub async fn tick_n(shard: &mut Shard<SampleEngine>, n: u64) {
    for _ in 0..n {
        shard.leader_tick().await.unwrap();
    }
}

/// Everything on the shard's subject, in order.
pub async fn read_log(log: &dyn LogService) -> Vec<(LogMessage, Epoch)> {
    let mut consumer = log.subscribe(&address().subject(), 1).await.unwrap();
    consumer
        .fetch(1_000, Duration::ZERO)
        .await
        .unwrap()
        .into_iter()
        .map(|m| {
            let epoch = Epoch::from_bytes(&m.payload).unwrap();
            (m, epoch)
        })
        .collect()
}

/// In-process registry: a fixed persona table committed to one merkle root.
pub struct StaticRegistry {
    personas: Vec<(String, Vec<Vec<u8>>)>,
    pub expires_at: u64,
    pub calls: std::sync::atomic::AtomicUsize,
    pub down: std::sync::atomic::AtomicBool,
}

impl StaticRegistry {
    pub fn new(personas: Vec<(&str, Vec<Vec<u8>>)>) -> Self {
        Self {
            personas: personas.into_iter().map(|(p, s)| (p.to_string(), s)).collect(),
            expires_at: u64::MAX,
            calls: Default::default(),
            down: Default::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RegistryClient for StaticRegistry {
    async fn query_persona(
        &self,
        query: &tessera_node::api::PersonaQuery,
    ) -> Result<tessera_node::api::PersonaRecord, tessera_node::errors::RegistryError> {
        use std::sync::atomic::Ordering;
        use tessera_kernel::proof::{canonical_signers, MerkleTree};

        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(tessera_node::errors::RegistryError::Status(503));
        }

        let leaves: Vec<(Vec<u8>, Vec<u8>)> = self
            .personas
            .iter()
            .map(|(p, s)| (p.as_bytes().to_vec(), canonical_signers(s).unwrap()))
            .collect();
        let tree = MerkleTree::new(&leaves);
        let index = self
            .personas
            .iter()
            .position(|(p, _)| *p == query.persona)
            .ok_or(tessera_node::errors::RegistryError::Status(404))?;

        Ok(tessera_node::api::PersonaRecord {
            persona: query.persona.clone(),
            signers: self.personas[index].1.clone(),
            expires_at: self.expires_at,
            version: 1,
            proof: tree.proof(index).unwrap(),
            root: tree.root().unwrap().to_vec(),
        })
    }
}
