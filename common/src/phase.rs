//! # Phase Registry
//!
//! Every pipeline step is declared once in [`REGISTRY`]. The controller walks
//! the table in order and never special-cases a phase by name: position,
//! failure policy, recorded module ids and result slot all come from here.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A discrete pipeline step, ordered by its position in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Whois,
    Discovery,
    PortScan,
    HttpProbe,
    VulnScan,
    MitreEnrich,
}

impl Phase {
    pub fn spec(self) -> &'static PhaseSpec {
        REGISTRY
            .iter()
            .find(|spec| spec.phase == self)
            .unwrap_or_else(|| unreachable!("{self:?} missing from the phase registry"))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Whois => "whois",
            Phase::Discovery => "discovery",
            Phase::PortScan => "port_scan",
            Phase::HttpProbe => "http_probe",
            Phase::VulnScan => "vuln_scan",
            Phase::MitreEnrich => "mitre_enrich",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier written to `metadata.modules_executed`.
///
/// These strings are the on-disk resume record, so they must stay stable.
/// Ids recorded by other tools load as [`Module::Other`] and are written back
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Whois,
    SubdomainDiscovery,
    DnsResolution,
    PortScan,
    HttpProbe,
    VulnScan,
    AddMitre,
    #[serde(untagged)]
    Other(String),
}

impl Module {
    pub fn as_str(&self) -> &str {
        match self {
            Module::Whois => "whois",
            Module::SubdomainDiscovery => "subdomain_discovery",
            Module::DnsResolution => "dns_resolution",
            Module::PortScan => "port_scan",
            Module::HttpProbe => "http_probe",
            Module::VulnScan => "vuln_scan",
            Module::AddMitre => "add_mitre",
            Module::Other(id) => id,
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens to the run when a phase's collaborator fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// The error is stored inline in the document and the pipeline continues.
    Recoverable,
    /// The run aborts; the last persisted snapshot stays on storage.
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    /// Establishes the document's identity. Re-runs whenever discovery is enabled.
    Identity,
    /// Runs at most once per document, skipped when already recorded.
    MergeOnce,
}

/// Where a phase's result lands in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Written by a dedicated merge operation (whois, discovery).
    Builtin,
    /// Top-level section, e.g. `port_scan`.
    Section(&'static str),
    /// Key under `metadata`, e.g. `mitre_enrichment`.
    Metadata(&'static str),
}

#[derive(Debug)]
pub struct PhaseSpec {
    pub phase: Phase,
    pub policy: FailurePolicy,
    pub kind: PhaseKind,
    /// Recorded in root-domain mode.
    pub records: &'static [Module],
    /// Recorded in subdomain mode.
    pub subdomain_records: &'static [Module],
    pub slot: Slot,
}

impl PhaseSpec {
    pub fn position(&self) -> usize {
        REGISTRY
            .iter()
            .position(|spec| spec.phase == self.phase)
            .unwrap_or_default()
    }

    pub fn records_for(&self, subdomain_mode: bool) -> &'static [Module] {
        if subdomain_mode {
            self.subdomain_records
        } else {
            self.records
        }
    }

    pub fn is_identity(&self) -> bool {
        self.kind == PhaseKind::Identity
    }
}

/// The fixed pipeline order.
pub static REGISTRY: &[PhaseSpec] = &[
    PhaseSpec {
        phase: Phase::Whois,
        policy: FailurePolicy::Recoverable,
        kind: PhaseKind::Identity,
        records: &[Module::Whois],
        subdomain_records: &[Module::Whois],
        slot: Slot::Builtin,
    },
    PhaseSpec {
        phase: Phase::Discovery,
        policy: FailurePolicy::Fatal,
        kind: PhaseKind::Identity,
        records: &[Module::SubdomainDiscovery, Module::DnsResolution],
        subdomain_records: &[Module::DnsResolution],
        slot: Slot::Builtin,
    },
    PhaseSpec {
        phase: Phase::PortScan,
        policy: FailurePolicy::Fatal,
        kind: PhaseKind::MergeOnce,
        records: &[Module::PortScan],
        subdomain_records: &[Module::PortScan],
        slot: Slot::Section("port_scan"),
    },
    PhaseSpec {
        phase: Phase::HttpProbe,
        policy: FailurePolicy::Fatal,
        kind: PhaseKind::MergeOnce,
        records: &[Module::HttpProbe],
        subdomain_records: &[Module::HttpProbe],
        slot: Slot::Section("http_probe"),
    },
    PhaseSpec {
        phase: Phase::VulnScan,
        policy: FailurePolicy::Fatal,
        kind: PhaseKind::MergeOnce,
        records: &[Module::VulnScan],
        subdomain_records: &[Module::VulnScan],
        slot: Slot::Section("vuln_scan"),
    },
    PhaseSpec {
        phase: Phase::MitreEnrich,
        policy: FailurePolicy::Fatal,
        kind: PhaseKind::MergeOnce,
        records: &[Module::AddMitre],
        subdomain_records: &[Module::AddMitre],
        slot: Slot::Metadata("mitre_enrichment"),
    },
];

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
