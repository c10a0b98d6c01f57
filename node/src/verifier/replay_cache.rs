// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Signatures of already accepted commands, kept until their freshness
//! window has passed.

use std::collections::{BTreeSet, HashMap};

use parking_lot::Mutex;

#[derive(Default)]
struct Inner {
    expiry: HashMap<Vec<u8>, u64>,
    by_deadline: BTreeSet<(u64, Vec<u8>)>,
}

impl Inner {
    fn purge(&mut self, now: u64) {
        while let Some((deadline, sig)) = self.by_deadline.first().cloned() {
            if deadline > now {
                break;
            }
            self.by_deadline.remove(&(deadline, sig.clone()));
            if self.expiry.get(&sig) == Some(&deadline) {
                self.expiry.remove(&sig);
            }
        }
    }

    fn set(&mut self, signature: &[u8], expires_at: u64) {
        if let Some(old) = self.expiry.insert(signature.to_vec(), expires_at) {
            self.by_deadline.remove(&(old, signature.to_vec()));
        }
        self.by_deadline.insert((expires_at, signature.to_vec()));
    }
}

#[derive(Default)]
pub struct ReplayCache {
    inner: Mutex<Inner>,
}

impl ReplayCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, signature: &[u8], now: u64) -> bool {
        let mut inner = self.inner.lock();
        inner.purge(now);
        inner.expiry.contains_key(signature)
    }

    /// Insert unless already present. Returns `false` on a duplicate.
    pub fn insert_if_absent(&self, signature: &[u8], expires_at: u64, now: u64) -> bool {
        let mut inner = self.inner.lock();
        inner.purge(now);
        if inner.expiry.contains_key(signature) {
            return false;
        }
        inner.set(signature, expires_at);
        true
    }

    /// Insert or extend an entry; never shortens an existing one.
    pub fn record(&self, signature: &[u8], expires_at: u64, now: u64) {
        let mut inner = self.inner.lock();
        inner.purge(now);
        match inner.expiry.get(signature) {
            Some(&current) if current >= expires_at => {}
            _ => inner.set(signature, expires_at),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expiry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
