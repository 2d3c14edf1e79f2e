//! TCP connect port scanning of every resolved host in the document.

use std::collections::{BTreeMap, BTreeSet};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use reconr_common::config::PortScanConfig;
use reconr_common::document::ReconDocument;
use reconr_common::ports::DocumentPhase;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info};

pub struct TcpConnectScanner {
    ports: Vec<u16>,
    probe_timeout: Duration,
    concurrency: usize,
}

impl TcpConnectScanner {
    pub fn new(cfg: &PortScanConfig) -> Self {
        let mut ports = cfg.ports.clone();
        ports.sort_unstable();
        ports.dedup();

        Self {
            ports,
            probe_timeout: Duration::from_millis(cfg.timeout_ms),
            concurrency: cfg.concurrency.max(1),
        }
    }

    async fn scan_ips(&self, ips: &BTreeSet<IpAddr>) -> anyhow::Result<BTreeMap<IpAddr, BTreeSet<u16>>> {
        let mut open: BTreeMap<IpAddr, BTreeSet<u16>> = BTreeMap::new();
        let addrs: Vec<SocketAddr> = ips
            .iter()
            .flat_map(|ip| self.ports.iter().map(move |port| SocketAddr::new(*ip, *port)))
            .collect();
        let mut pending = addrs.into_iter();
        let mut set = JoinSet::new();

        loop {
            while set.len() < self.concurrency {
                let Some(addr) = pending.next() else { break };
                let probe_timeout = self.probe_timeout;
                set.spawn(async move { (addr, connect_probe(addr, probe_timeout).await) });
            }

            let Some(joined) = set.join_next().await else { break };
            let (addr, is_open) = joined?;
            if is_open {
                debug!("{addr} open");
                open.entry(addr.ip()).or_default().insert(addr.port());
            }
        }

        Ok(open)
    }
}

/// A port is open when the three-way handshake completes within the timeout.
async fn connect_probe(addr: SocketAddr, probe_timeout: Duration) -> bool {
    matches!(timeout(probe_timeout, TcpStream::connect(addr)).await, Ok(Ok(_)))
}

#[async_trait]
impl DocumentPhase for TcpConnectScanner {
    async fn run(&self, document: &ReconDocument) -> anyhow::Result<Value> {
        let hosts = document.resolved_hosts();

        let mut ip_hosts: BTreeMap<IpAddr, BTreeSet<String>> = BTreeMap::new();
        for (host, ips) in &hosts {
            for raw in ips.all() {
                match raw.parse::<IpAddr>() {
                    Ok(ip) => {
                        ip_hosts.entry(ip).or_default().insert(host.clone());
                    }
                    Err(_) => debug!("{host}: skipping malformed address {raw}"),
                }
            }
        }

        let ips: BTreeSet<IpAddr> = ip_hosts.keys().copied().collect();
        info!(
            "scanning {} ports on {} addresses ({} hosts)",
            self.ports.len(),
            ips.len(),
            hosts.len()
        );
        let open = self.scan_ips(&ips).await?;

        let mut by_ip = serde_json::Map::new();
        for (ip, ports) in &open {
            let hostnames = ip_hosts.get(ip).cloned().unwrap_or_default();
            by_ip.insert(ip.to_string(), json!({ "hostnames": hostnames, "ports": ports }));
        }

        let mut by_host = serde_json::Map::new();
        for (host, resolved) in &hosts {
            let ports: BTreeSet<u16> = resolved
                .all()
                .filter_map(|raw| raw.parse::<IpAddr>().ok())
                .filter_map(|ip| open.get(&ip))
                .flatten()
                .copied()
                .collect();
            if !ports.is_empty() {
                let host_ips: Vec<&String> = resolved.all().collect();
                by_host.insert(host.clone(), json!({ "ips": host_ips, "ports": ports }));
            }
        }

        let total_open_ports: usize = open.values().map(BTreeSet::len).sum();

        Ok(json!({
            "scan_metadata": {
                "scan_timestamp": chrono::Local::now().to_rfc3339(),
                "scanner": "tcp_connect",
                "ports": self.ports,
                "timeout_ms": self.probe_timeout.as_millis() as u64,
            },
            "by_host": by_host,
            "by_ip": by_ip,
            "summary": {
                "hosts_scanned": hosts.len(),
                "ips_scanned": ips.len(),
                "hosts_with_open_ports": by_host.len(),
                "total_open_ports": total_open_ports,
            },
        }))
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
