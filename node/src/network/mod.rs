// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod registry;

pub use registry::{HttpRegistryClient, RegistryClient};
