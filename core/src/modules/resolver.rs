use std::collections::BTreeSet;
use std::net::IpAddr;

use async_trait::async_trait;
use reconr_common::document::{HostDns, ResolvedIps};
use reconr_common::ports::HostResolver;
use tokio::net::lookup_host;
use tracing::debug;

/// Resolves through the operating system resolver.
///
/// A name that does not resolve yields an empty record rather than an error:
/// "no records" is a valid answer for a recon run.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str) -> anyhow::Result<HostDns> {
        match lookup_host((host, 0)).await {
            Ok(addrs) => Ok(to_record(addrs.map(|addr| addr.ip()))),
            Err(e) => {
                debug!("{host} did not resolve: {e}");
                Ok(HostDns::default())
            }
        }
    }
}

pub(crate) fn to_record(ips: impl IntoIterator<Item = IpAddr>) -> HostDns {
    let unique: BTreeSet<IpAddr> = ips.into_iter().collect();
    let mut resolved = ResolvedIps::default();

    for ip in unique {
        match ip {
            IpAddr::V4(v4) => resolved.ipv4.push(v4.to_string()),
            IpAddr::V6(v6) => resolved.ipv6.push(v6.to_string()),
        }
    }

    HostDns {
        ips: resolved,
        ..HostDns::default()
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
