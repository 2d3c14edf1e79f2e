//! # Recon Document
//!
//! The canonical state of one target. Every phase reads it and augments it;
//! the serialized form is the durable artifact the pipeline resumes from.
//!
//! Sections the pipeline does not know about (added by other tools or newer
//! phases) are carried through load and save untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::phase::{Module, Slot};
use crate::target::TargetInfo;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub scan_type: String,
    pub scan_timestamp: String,
    pub target: String,
    pub root_domain: String,
    pub is_subdomain_mode: bool,
    pub anonymous_mode: bool,
    pub bruteforce_mode: bool,
    pub modules_executed: Vec<Module>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconDocument {
    pub metadata: Metadata,
    pub domain: String,
    pub whois: Value,
    pub subdomains: Vec<String>,
    pub subdomain_count: usize,
    pub dns: Value,
    #[serde(flatten)]
    pub sections: Map<String, Value>,
}

/// Output of the subdomain discovery collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub subdomains: Vec<String>,
    pub subdomain_count: usize,
    pub dns: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIps {
    pub ipv4: Vec<String>,
    pub ipv6: Vec<String>,
}

impl ResolvedIps {
    pub fn is_empty(&self) -> bool {
        self.ipv4.is_empty() && self.ipv6.is_empty()
    }

    pub fn all(&self) -> impl Iterator<Item = &String> {
        self.ipv4.iter().chain(self.ipv6.iter())
    }
}

/// DNS record of a single host. Resolvers may attach extra record types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostDns {
    pub ips: ResolvedIps,
    #[serde(flatten)]
    pub records: Map<String, Value>,
}

impl ReconDocument {
    pub fn new(info: &TargetInfo, scan_type: impl Into<String>, anonymous: bool, bruteforce: bool) -> Self {
        let timestamp = chrono::Local::now()
            .naive_local()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string();

        Self {
            metadata: Metadata {
                scan_type: scan_type.into(),
                scan_timestamp: timestamp,
                target: info.target.clone(),
                root_domain: info.root_domain.clone(),
                is_subdomain_mode: info.is_subdomain,
                anonymous_mode: anonymous,
                bruteforce_mode: bruteforce && !info.is_subdomain,
                modules_executed: Vec::new(),
                extra: Map::new(),
            },
            domain: info.target.clone(),
            whois: Value::Object(Map::new()),
            subdomains: Vec::new(),
            subdomain_count: 0,
            dns: Value::Object(Map::new()),
            sections: Map::new(),
        }
    }

    pub fn target(&self) -> &str {
        &self.metadata.target
    }

    pub fn is_subdomain_mode(&self) -> bool {
        self.metadata.is_subdomain_mode
    }

    /// Stores WHOIS data, or the `{"error": message}` marker on failure.
    pub fn merge_whois(&mut self, result: Result<Value, String>) {
        self.whois = match result {
            Ok(data) => data,
            Err(message) => json!({ "error": message }),
        };
    }

    pub fn merge_discovery_full(&mut self, subdomains: Vec<String>, count: usize, dns: Value) {
        self.subdomains = subdomains;
        self.subdomain_count = count;
        self.dns = dns;
    }

    /// Subdomain mode: the target is the only host and the root domain is not resolved.
    pub fn merge_discovery_single(&mut self, target: &str, dns: HostDns) {
        let mut hosts = Map::new();
        hosts.insert(target.to_string(), json!(dns));

        self.subdomains = vec![target.to_string()];
        self.subdomain_count = 1;
        self.dns = json!({
            "domain": {},
            "subdomains": hosts,
        });
    }

    /// Assigns a phase result to the slot declared in the phase registry.
    pub fn merge_phase(&mut self, slot: Slot, result: Value) {
        match slot {
            Slot::Section(name) => {
                self.sections.insert(name.to_string(), result);
            }
            Slot::Metadata(key) => {
                self.metadata.extra.insert(key.to_string(), result);
            }
            Slot::Builtin => {}
        }
    }

    /// Records a module as executed. Already recorded modules are left in place.
    pub fn append_executed(&mut self, module: Module) {
        if !self.has_executed(&module) {
            self.metadata.modules_executed.push(module);
        }
    }

    pub fn has_executed(&self, module: &Module) -> bool {
        self.metadata.modules_executed.contains(module)
    }

    pub fn modules_executed(&self) -> &[Module] {
        &self.metadata.modules_executed
    }

    pub fn section(&self, name: &str) -> Option<&Value> {
        self.sections
            .get(name)
            .or_else(|| self.metadata.extra.get(name))
    }

    /// Reads `<section>.summary.<key>` as a count, `0` when absent.
    pub fn summary_count(&self, section: &str, key: &str) -> u64 {
        self.section(section)
            .and_then(|s| s.get("summary"))
            .and_then(|s| s.get(key))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    /// Every host name with its resolved addresses, root domain first.
    pub fn resolved_hosts(&self) -> Vec<(String, ResolvedIps)> {
        let mut hosts = Vec::new();

        if let Some(record) = self.dns.get("domain").and_then(parse_host_dns) {
            hosts.push((self.metadata.root_domain.clone(), record.ips));
        }
        if let Some(subdomains) = self.dns.get("subdomains").and_then(Value::as_object) {
            for (name, value) in subdomains {
                if let Some(record) = parse_host_dns(value) {
                    hosts.push((name.clone(), record.ips));
                }
            }
        }

        hosts.retain(|(_, ips)| !ips.is_empty());
        hosts
    }

    pub fn serialize(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn deserialize(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

fn parse_host_dns(value: &Value) -> Option<HostDns> {
    serde_json::from_value(value.clone()).ok()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
