//! # Outbound Ports
//!
//! Contracts for every capability the pipeline drives. The controller only
//! sees these traits; concrete implementations live in `reconr-core::modules`
//! or in test fakes.
//!
//! ## Rules
//! 1. Collaborators return `anyhow::Result`; the controller decides whether a
//!    failure is recoverable from the phase registry, not from the error.
//! 2. Any concurrency or timeout handling is internal to the implementation.

use async_trait::async_trait;
use serde_json::Value;

use crate::document::{DiscoveryResult, HostDns, ReconDocument};
use crate::error::StoreError;

#[async_trait]
pub trait WhoisLookup: Send + Sync {
    /// Returns the parsed WHOIS record of a registrable domain.
    async fn lookup(&self, root_domain: &str) -> anyhow::Result<Value>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRequest {
    pub domain: String,
    pub anonymous: bool,
    pub bruteforce: bool,
    pub resolve: bool,
}

#[async_trait]
pub trait SubdomainDiscovery: Send + Sync {
    async fn discover(&self, request: &DiscoveryRequest) -> anyhow::Result<DiscoveryResult>;
}

#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve(&self, host: &str) -> anyhow::Result<HostDns>;
}

/// A phase that reads the whole document and produces one result section.
#[async_trait]
pub trait DocumentPhase: Send + Sync {
    async fn run(&self, document: &ReconDocument) -> anyhow::Result<Value>;
}

/// Secret hunting runs outside the recon document and yields a list of findings.
#[async_trait]
pub trait SecretHunter: Send + Sync {
    async fn hunt(&self, token: &str, org: &str) -> anyhow::Result<Vec<Value>>;
}

/// Persistence of recon documents, keyed by target.
pub trait DocumentStore: Send + Sync {
    /// Storage identity of a target.
    fn key(&self, target: &str) -> String;

    /// Replaces the stored document with a complete new snapshot.
    fn save(&self, document: &ReconDocument) -> Result<(), StoreError>;

    /// Returns `Ok(None)` when nothing is stored for the target.
    fn load(&self, target: &str) -> Result<Option<ReconDocument>, StoreError>;
}
