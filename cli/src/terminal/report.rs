//! Human readable summaries of a recon document.

use std::path::Path;

use colored::*;
use reconr_common::document::ReconDocument;
use reconr_common::phase::Module;
use reconr_common::target::TargetInfo;
use serde_json::Value;

use crate::terminal::colors;
use crate::terminal::print;

const KEYS: &[&str] = &[
    "Target",
    "Root domain",
    "Mode",
    "Scan type",
    "Started",
    "Modules",
    "Options",
    "WHOIS",
    "Subdomains",
    "Open ports",
    "Hosts with open ports",
    "Live URLs",
    "Technologies",
    "Findings",
    "CVEs enriched",
    "GitHub findings",
    "Document",
];

/// Printed before the pipeline starts.
pub fn mode(info: &TargetInfo, modules: &str, anonymous: bool, bruteforce: bool) {
    print::set_key_width(KEYS.iter().copied());
    print::header("target");
    print::aligned_line("Target", info.target.as_str());
    if info.is_subdomain {
        print::aligned_line("Mode", "subdomain, only this host is scanned".yellow());
        print::aligned_line("Root domain", info.root_domain.as_str());
    } else {
        print::aligned_line("Mode", "root domain, subdomains are enumerated");
    }
    print::aligned_line("Modules", modules);

    let mut flags = Vec::new();
    if anonymous {
        flags.push("anonymous");
    }
    if bruteforce && !info.is_subdomain {
        flags.push("bruteforce");
    }
    if !flags.is_empty() {
        print::aligned_line("Options", flags.join(", "));
    }
}

/// What the document holds, one line per executed module.
pub fn document(doc: &ReconDocument, path: &Path, github_findings: Option<usize>) {
    print::set_key_width(KEYS.iter().copied());
    print::header("recon summary");

    let meta = &doc.metadata;
    print::aligned_line("Target", meta.target.as_str());
    print::aligned_line("Root domain", meta.root_domain.as_str());
    print::aligned_line(
        "Mode",
        if meta.is_subdomain_mode { "subdomain" } else { "root domain" },
    );
    print::aligned_line("Scan type", meta.scan_type.as_str());
    print::aligned_line("Started", meta.scan_timestamp.as_str());
    print::aligned_line(
        "Modules",
        doc.modules_executed()
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(" → "),
    );

    if doc.has_executed(&Module::Whois) {
        match doc.whois.get("error").and_then(Value::as_str) {
            Some(error) => print::aligned_line("WHOIS", format!("failed ({error})").color(colors::ERROR)),
            None => print::aligned_line("WHOIS", whois_line(&doc.whois)),
        }
    }

    if doc.has_executed(&Module::DnsResolution) {
        print::aligned_line("Subdomains", count(doc.subdomain_count as u64));
    }

    if doc.has_executed(&Module::PortScan) {
        print::aligned_line("Open ports", count(doc.summary_count("port_scan", "total_open_ports")));
        print::aligned_line(
            "Hosts with open ports",
            count(doc.summary_count("port_scan", "hosts_with_open_ports")),
        );
    }

    if doc.has_executed(&Module::HttpProbe) {
        print::aligned_line("Live URLs", count(doc.summary_count("http_probe", "live_urls")));
        print::aligned_line(
            "Technologies",
            count(doc.summary_count("http_probe", "technology_count")),
        );
    }

    if doc.has_executed(&Module::VulnScan) {
        let critical = doc.summary_count("vuln_scan", "critical");
        let high = doc.summary_count("vuln_scan", "high");
        let (findings, vulnerabilities) = vuln_counts(doc);
        let line = format!(
            "{} findings ({} vulnerabilities) ({} critical, {} high)",
            count(findings),
            count(vulnerabilities),
            critical.to_string().color(colors::SEVERITY_CRITICAL).bold(),
            high.to_string().color(colors::SEVERITY_HIGH),
        );
        print::aligned_line("Findings", line);
    }

    if doc.has_executed(&Module::AddMitre) {
        let mitre = doc.section("mitre_enrichment");
        let field = |key: &str| mitre.and_then(|m| m.get(key)).and_then(Value::as_u64).unwrap_or(0);
        print::aligned_line(
            "CVEs enriched",
            format!(
                "{} of {}",
                count(field("total_cves_enriched")),
                field("total_cves_processed")
            ),
        );
    }

    if let Some(findings) = github_findings {
        print::aligned_line("GitHub findings", count(findings as u64));
    }

    print::aligned_line("Document", path.display().to_string().color(colors::ACCENT));
}

fn whois_line(whois: &Value) -> String {
    let registrar = whois
        .get("registrar")
        .and_then(|r| r.as_str().or_else(|| r.get(0).and_then(Value::as_str)))
        .unwrap_or("unknown registrar");
    match whois.get("creation_date").and_then(Value::as_str) {
        Some(created) => format!("{registrar}, created {created}"),
        None => registrar.to_string(),
    }
}

/// `summary.total_findings` and `vulnerabilities.total`, reported side by side.
fn vuln_counts(doc: &ReconDocument) -> (u64, u64) {
    let vulnerabilities = doc
        .section("vuln_scan")
        .and_then(|s| s.pointer("/vulnerabilities/total"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    (doc.summary_count("vuln_scan", "total_findings"), vulnerabilities)
}

fn count(n: u64) -> ColoredString {
    if n == 0 {
        n.to_string().normal()
    } else {
        n.to_string().green().bold()
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
