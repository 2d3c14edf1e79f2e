//! WHOIS over TCP port 43 (RFC 3912).
//!
//! The TLD's authoritative server is taken from the referral registry
//! (`whois.iana.org` by default). Thin registries point at the registrar's
//! own server, which is followed once.

use std::time::Duration;

use anyhow::{Context, ensure};
use async_trait::async_trait;
use reconr_common::config::WhoisConfig;
use reconr_common::ports::WhoisLookup;
use serde_json::{Map, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

const WHOIS_PORT: u16 = 43;
const MAX_RESPONSE_BYTES: u64 = 1 << 20;

pub struct WhoisClient {
    referral_server: String,
    query_timeout: Duration,
}

impl WhoisClient {
    pub fn new(cfg: &WhoisConfig) -> Self {
        Self {
            referral_server: cfg.referral_server.clone(),
            query_timeout: Duration::from_secs(cfg.timeout_secs),
        }
    }

    async fn query(&self, server: &str, query: &str) -> anyhow::Result<String> {
        let mut stream = timeout(self.query_timeout, TcpStream::connect((server, WHOIS_PORT)))
            .await
            .with_context(|| format!("connecting to {server} timed out"))?
            .with_context(|| format!("connecting to {server}"))?;

        stream.write_all(format!("{query}\r\n").as_bytes()).await?;

        let mut buf = Vec::new();
        timeout(
            self.query_timeout,
            (&mut stream).take(MAX_RESPONSE_BYTES).read_to_end(&mut buf),
        )
        .await
        .with_context(|| format!("reading from {server} timed out"))??;

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[async_trait]
impl WhoisLookup for WhoisClient {
    async fn lookup(&self, root_domain: &str) -> anyhow::Result<Value> {
        let tld = root_domain.rsplit('.').next().unwrap_or(root_domain);
        let referral = self.query(&self.referral_server, tld).await?;
        let server = referral_server(&parse_response(&referral), "refer")
            .unwrap_or_else(|| self.referral_server.clone());
        debug!("WHOIS server for .{tld}: {server}");

        let raw = self.query(&server, root_domain).await?;
        let mut record = parse_response(&raw);
        ensure!(!record.is_empty(), "empty WHOIS response from {server}");

        if let Some(registrar) = referral_server(&record, "registrar_whois_server")
            .filter(|registrar| !registrar.eq_ignore_ascii_case(&server))
        {
            match self.query(&registrar, root_domain).await {
                Ok(detail) => record.extend(parse_response(&detail)),
                Err(e) => debug!("registrar WHOIS {registrar} failed: {e:#}"),
            }
        }

        record.insert("whois_server".to_string(), Value::String(server));
        Ok(Value::Object(record))
    }
}

/// Turns `Key: Value` lines into an object. Repeated keys become arrays.
fn parse_response(raw: &str) -> Map<String, Value> {
    let mut record = Map::new();

    for line in raw.lines() {
        let line = line.trim();
        if line.starts_with(">>>") {
            break;
        }
        if line.is_empty() || line.starts_with('%') || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else { continue };
        let key = normalize_key(key);
        let value = value.trim();
        if key.is_empty() || value.is_empty() || key.len() > 48 {
            continue;
        }

        let value = Value::String(value.to_string());
        match record.get_mut(&key) {
            None => {
                record.insert(key, value);
            }
            Some(Value::Array(values)) => {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
            Some(existing) => {
                if *existing != value {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
            }
        }
    }

    record
}

fn normalize_key(key: &str) -> String {
    let mapped: String = key
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    mapped
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

fn referral_server(record: &Map<String, Value>, key: &str) -> Option<String> {
    let value = match record.get(key)? {
        Value::Array(values) => values.first()?,
        value => value,
    };
    value
        .as_str()
        .map(|s| s.trim_start_matches("whois://").trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
