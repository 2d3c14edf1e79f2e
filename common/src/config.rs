//! Run configuration.
//!
//! Values come from an optional TOML file and are then overridden by the
//! command line. The result is passed explicitly to everything that needs it.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::phase::Phase;

/// A user-facing module name, as listed in `scan.modules`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScanModule {
    DomainDiscovery,
    PortScan,
    HttpProbe,
    VulnScan,
    AddMitre,
    Github,
}

impl ScanModule {
    pub const ALL: [ScanModule; 6] = [
        ScanModule::DomainDiscovery,
        ScanModule::PortScan,
        ScanModule::HttpProbe,
        ScanModule::VulnScan,
        ScanModule::AddMitre,
        ScanModule::Github,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScanModule::DomainDiscovery => "domain_discovery",
            ScanModule::PortScan => "port_scan",
            ScanModule::HttpProbe => "http_probe",
            ScanModule::VulnScan => "vuln_scan",
            ScanModule::AddMitre => "add_mitre",
            ScanModule::Github => "github",
        }
    }

    /// Pipeline phases switched on by this module. `github` runs outside the pipeline.
    pub fn phases(self) -> &'static [Phase] {
        match self {
            ScanModule::DomainDiscovery => &[Phase::Whois, Phase::Discovery],
            ScanModule::PortScan => &[Phase::PortScan],
            ScanModule::HttpProbe => &[Phase::HttpProbe],
            ScanModule::VulnScan => &[Phase::VulnScan],
            ScanModule::AddMitre => &[Phase::MitreEnrich],
            ScanModule::Github => &[],
        }
    }
}

impl fmt::Display for ScanModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanModule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "domain_discovery" | "discovery" | "whois" => Ok(ScanModule::DomainDiscovery),
            "port_scan" | "ports" => Ok(ScanModule::PortScan),
            "http_probe" | "http" => Ok(ScanModule::HttpProbe),
            "vuln_scan" | "vulns" => Ok(ScanModule::VulnScan),
            "add_mitre" | "mitre" | "mitre_enrich" => Ok(ScanModule::AddMitre),
            "github" => Ok(ScanModule::Github),
            _ => Err(ConfigError::UnknownModule(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for ScanModule {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub scan: ScanConfig,
    pub whois: WhoisConfig,
    pub discovery: DiscoveryConfig,
    pub port_scan: PortScanConfig,
    pub phases: PhaseCommands,
    pub github: GithubConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    pub modules: BTreeSet<ScanModule>,
    /// Route discovery traffic through an anonymising proxy, when the module supports it.
    pub anonymous: bool,
    /// Extended subdomain brute forcing. Ignored in subdomain mode.
    pub bruteforce: bool,
    pub output_dir: PathBuf,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            modules: BTreeSet::from([ScanModule::DomainDiscovery, ScanModule::PortScan]),
            anonymous: false,
            bruteforce: false,
            output_dir: PathBuf::from("output"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WhoisConfig {
    /// Registry used to find the authoritative WHOIS server of a TLD.
    pub referral_server: String,
    pub timeout_secs: u64,
}

impl Default for WhoisConfig {
    fn default() -> Self {
        Self {
            referral_server: "whois.iana.org".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// Extra words tried in bruteforce mode, one per line.
    pub wordlist: Option<PathBuf>,
    pub concurrency: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            wordlist: None,
            concurrency: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PortScanConfig {
    pub ports: Vec<u16>,
    pub timeout_ms: u64,
    pub concurrency: usize,
}

pub const DEFAULT_PORTS: &[u16] = &[
    21, 22, 23, 25, 53, 80, 110, 111, 135, 139, 143, 443, 445, 993, 995, 1723, 3306, 3389, 5432,
    5900, 6379, 8000, 8080, 8443, 8888, 9200, 27017,
];

impl Default for PortScanConfig {
    fn default() -> Self {
        Self {
            ports: DEFAULT_PORTS.to_vec(),
            timeout_ms: 1500,
            concurrency: 200,
        }
    }
}

/// An external program implementing a phase.
///
/// The recon document is written to its stdin as JSON; its stdout must be the
/// JSON result section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_command_timeout")]
    pub timeout_secs: u64,
}

fn default_command_timeout() -> u64 {
    3600
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhaseCommands {
    pub http_probe: Option<CommandConfig>,
    pub vuln_scan: Option<CommandConfig>,
    pub add_mitre: Option<CommandConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GithubConfig {
    pub token: Option<String>,
    pub org: Option<String>,
    pub command: Option<CommandConfig>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn is_enabled(&self, module: ScanModule) -> bool {
        self.scan.modules.contains(&module)
    }

    /// Pipeline phases enabled by the configured modules.
    pub fn enabled_phases(&self) -> BTreeSet<Phase> {
        self.scan
            .modules
            .iter()
            .flat_map(|module| module.phases().iter().copied())
            .collect()
    }

    /// Label stored in `metadata.scan_type`, e.g. `domain_discovery_port_scan`.
    pub fn scan_type(&self) -> String {
        let enabled: Vec<&str> = ScanModule::ALL
            .iter()
            .filter(|module| self.is_enabled(**module))
            .map(|module| module.as_str())
            .collect();

        if enabled.is_empty() {
            "custom".to_string()
        } else {
            enabled.join("_")
        }
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
