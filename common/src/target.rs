//! # Scan Target Model
//!
//! A target is a domain name. It runs in one of two modes:
//! * **Root domain** (`example.com`): subdomains are enumerated.
//! * **Subdomain** (`www.example.com`): only that host is scanned, WHOIS
//!   still runs against the registrable root.
//!
//! The split into subdomain / registrable domain / public suffix is delegated
//! to a [`SuffixDatabase`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A validated target string. The raw string is the document identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target(String);

impl Target {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Target {
    type Err = String;

    /// Accepts a bare host name. URLs, paths and whitespace are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("target cannot be empty".to_string());
        }
        if s.contains("://") || s.contains('/') {
            return Err(format!("invalid target: {s} (expected a host name, not a URL)"));
        }
        if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(format!("invalid target: {s:?}"));
        }
        Ok(Target(s.to_string()))
    }
}

/// Result of classifying a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetInfo {
    pub target: String,
    pub root_domain: String,
    pub is_subdomain: bool,
    pub subdomain_part: String,
}

/// A host name split along the public suffix boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuffixSplit {
    pub subdomain: String,
    pub domain: String,
    pub suffix: String,
}

/// Public suffix decomposition.
pub trait SuffixDatabase: Send + Sync {
    /// Returns `None` when the host has no recognised public suffix or is itself a suffix.
    fn split(&self, host: &str) -> Option<SuffixSplit>;
}

/// [`SuffixDatabase`] backed by the compiled-in Public Suffix List.
#[derive(Debug, Default, Clone, Copy)]
pub struct PublicSuffixList;

impl SuffixDatabase for PublicSuffixList {
    fn split(&self, host: &str) -> Option<SuffixSplit> {
        let registrable = psl::domain(host.as_bytes())?;
        let suffix = registrable.suffix();
        if !suffix.is_known() {
            return None;
        }

        let registrable = std::str::from_utf8(registrable.as_bytes()).ok()?;
        let suffix = std::str::from_utf8(suffix.as_bytes()).ok()?;

        let domain = registrable
            .strip_suffix(suffix)
            .and_then(|d| d.strip_suffix('.'))?;
        let subdomain = host
            .strip_suffix(registrable)
            .map(|s| s.trim_end_matches('.'))
            .unwrap_or_default();

        Some(SuffixSplit {
            subdomain: subdomain.to_string(),
            domain: domain.to_string(),
            suffix: suffix.to_string(),
        })
    }
}

pub struct TargetClassifier<D = PublicSuffixList> {
    db: D,
}

impl TargetClassifier<PublicSuffixList> {
    pub fn new() -> Self {
        Self {
            db: PublicSuffixList,
        }
    }
}

impl Default for TargetClassifier<PublicSuffixList> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: SuffixDatabase> TargetClassifier<D> {
    pub fn with_database(db: D) -> Self {
        Self { db }
    }

    /// Classifies `target` into root-domain or subdomain mode.
    ///
    /// A host without a recognised public suffix (`localhost`, `10.0.0.1`,
    /// `printer.lan`) is treated as a root domain in its own right.
    pub fn classify(&self, target: &str) -> TargetInfo {
        let host = normalize(target);

        match self.db.split(&host) {
            Some(split) => TargetInfo {
                target: target.to_string(),
                root_domain: format!("{}.{}", split.domain, split.suffix),
                is_subdomain: !split.subdomain.is_empty(),
                subdomain_part: split.subdomain,
            },
            None => TargetInfo {
                target: target.to_string(),
                root_domain: host,
                is_subdomain: false,
                subdomain_part: String::new(),
            },
        }
    }
}

fn normalize(target: &str) -> String {
    target.trim().trim_end_matches('.').to_ascii_lowercase()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
