// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use core::fmt;
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};

/// Globally unique address of one shard.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShardAddress {
    pub region: String,
    pub organization: String,
    pub project: String,
    pub service_id: String,
}

impl ShardAddress {
    pub fn new(
        region: impl Into<String>,
        organization: impl Into<String>,
        project: impl Into<String>,
        service_id: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            organization: organization.into(),
            project: project.into(),
            service_id: service_id.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("region", &self.region),
            ("organization", &self.organization),
            ("project", &self.project),
            ("service_id", &self.service_id),
        ];
        for (name, value) in fields {
            if value.is_empty() {
                return Err(KernelError::Schema(format!("shard address: empty {}", name)));
            }
        }
        Ok(())
    }

    /// Log subject carrying this shard's epochs.
    pub fn subject(&self) -> String {
        format!(
            "{}.{}.{}.{}.epoch",
            self.region, self.organization, self.project, self.service_id
        )
    }

    /// Snapshot bucket name, derived from organization/project/service only so
    /// a shard that moves region keeps its snapshots.
    pub fn bucket_name(&self) -> String {
        let raw = format!("{}-{}-{}-snapshot", self.organization, self.project, self.service_id);
        raw.chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c.to_ascii_lowercase() } else { '-' })
            .collect()
    }
}

impl fmt::Display for ShardAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.region, self.organization, self.project, self.service_id
        )
    }
}
