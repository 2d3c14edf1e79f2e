//! Subdomain discovery by resolving candidate names from a wordlist.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use reconr_common::config::DiscoveryConfig;
use reconr_common::document::{DiscoveryResult, HostDns};
use reconr_common::ports::{DiscoveryRequest, HostResolver, SubdomainDiscovery};
use serde_json::json;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

const COMMON_WORDS: &[&str] = &[
    "www", "mail", "webmail", "smtp", "pop", "imap", "ftp", "ns1", "ns2", "vpn", "api", "dev",
    "staging", "test", "admin", "portal", "blog", "shop", "app", "m", "remote", "cdn", "static",
    "git", "docs", "support", "secure", "beta", "auth", "sso",
];

const EXTENDED_WORDS: &[&str] = &[
    "intranet", "internal", "corp", "uat", "qa", "preprod", "prod", "demo", "sandbox", "jenkins",
    "gitlab", "jira", "confluence", "grafana", "kibana", "monitor", "status", "dashboard", "db",
    "mysql", "redis", "backup", "files", "assets", "img", "images", "media", "upload", "download",
    "mx", "exchange", "owa", "autodiscover", "ns3", "dns", "proxy", "gateway", "router", "fw",
    "login", "accounts", "billing", "payments", "crm", "erp", "hr", "wiki", "forum", "community",
    "old", "new", "v1", "v2", "mobile", "web", "www2", "origin", "edge",
];

/// Resolves `<word>.<domain>` for every candidate and keeps names that answer.
pub struct WordlistDiscovery {
    resolver: Arc<dyn HostResolver>,
    wordlist: Option<PathBuf>,
    concurrency: usize,
}

impl WordlistDiscovery {
    pub fn new(resolver: Arc<dyn HostResolver>, cfg: &DiscoveryConfig) -> Self {
        Self {
            resolver,
            wordlist: cfg.wordlist.clone(),
            concurrency: cfg.concurrency.max(1),
        }
    }

    async fn words(&self, bruteforce: bool) -> anyhow::Result<Vec<String>> {
        let mut words: Vec<String> = COMMON_WORDS.iter().map(|w| w.to_string()).collect();
        if !bruteforce {
            return Ok(words);
        }

        words.extend(EXTENDED_WORDS.iter().map(|w| w.to_string()));
        if let Some(path) = &self.wordlist {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading wordlist {}", path.display()))?;
            words.extend(
                raw.lines()
                    .map(|line| line.trim().to_ascii_lowercase())
                    .filter(|line| !line.is_empty() && !line.starts_with('#')),
            );
        }

        words.sort();
        words.dedup();
        Ok(words)
    }
}

#[async_trait]
impl SubdomainDiscovery for WordlistDiscovery {
    async fn discover(&self, request: &DiscoveryRequest) -> anyhow::Result<DiscoveryResult> {
        if request.anonymous {
            warn!("anonymous routing is not available for wordlist discovery; using the system resolver");
        }

        let domain = request.domain.to_ascii_lowercase();
        let candidates: Vec<String> = self
            .words(request.bruteforce)
            .await?
            .into_iter()
            .map(|word| format!("{word}.{domain}"))
            .collect();
        info!("trying {} candidate names", candidates.len());

        let root = self.resolver.resolve(&domain).await?;
        let found = self.resolve_all(candidates).await?;

        let subdomains: Vec<String> = found.keys().cloned().collect();
        let dns = if request.resolve {
            json!({ "domain": root, "subdomains": found })
        } else {
            json!({})
        };

        Ok(DiscoveryResult {
            subdomain_count: subdomains.len(),
            subdomains,
            dns,
        })
    }
}

impl WordlistDiscovery {
    async fn resolve_all(&self, candidates: Vec<String>) -> anyhow::Result<BTreeMap<String, HostDns>> {
        let mut found = BTreeMap::new();
        let mut pending = candidates.into_iter();
        let mut set = JoinSet::new();

        loop {
            while set.len() < self.concurrency {
                let Some(name) = pending.next() else { break };
                let resolver = self.resolver.clone();
                set.spawn(async move {
                    let record = resolver.resolve(&name).await;
                    (name, record)
                });
            }

            let Some(joined) = set.join_next().await else { break };
            match joined? {
                (name, Ok(record)) if !record.ips.is_empty() => {
                    debug!("{name} resolved");
                    found.insert(name, record);
                }
                (_, Ok(_)) => {}
                (name, Err(e)) => debug!("{name}: {e:#}"),
            }
        }

        Ok(found)
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
