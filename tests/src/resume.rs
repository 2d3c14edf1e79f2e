use reconr_common::error::PipelineError;
use reconr_common::phase::{Module, Phase};
use reconr_common::ports::DocumentStore;
use serde_json::json;

use crate::support::{FULL_DISCOVERY, Harness, PhaseBehavior, classify, persisted};

const AFTER_PORT_SCAN: &[Module] = &[
    Module::Whois,
    Module::SubdomainDiscovery,
    Module::DnsResolution,
    Module::PortScan,
];

#[tokio::test]
async fn resume_runs_only_pending_phases() {
    let h = Harness::new();
    h.seed(&persisted("example.com", AFTER_PORT_SCAN));

    let controller = h.controller(&[Phase::HttpProbe, Phase::VulnScan]);
    let report = controller.run(&classify("example.com")).await.unwrap();

    assert!(report.resumed);
    assert_eq!(report.executed, vec![Phase::HttpProbe, Phase::VulnScan]);
    assert_eq!(h.calls(), vec!["http_probe", "vuln_scan"]);
    assert_eq!(h.save_count(), 2);

    let doc = h.stored("example.com").unwrap();
    assert_eq!(
        doc.modules_executed(),
        &[
            Module::Whois,
            Module::SubdomainDiscovery,
            Module::DnsResolution,
            Module::PortScan,
            Module::HttpProbe,
            Module::VulnScan
        ]
    );
    assert_eq!(doc.summary_count("http_probe", "live_urls"), 3);
    assert_eq!(doc.summary_count("vuln_scan", "critical"), 1);
    // Discovery data from the earlier run is untouched.
    assert_eq!(doc.subdomains, vec!["www.example.com"]);
    assert_eq!(doc.whois["registrar"], json!("Example Registrar"));
}

#[tokio::test]
async fn recorded_phase_is_not_invoked_again() {
    let h = Harness::new();
    h.seed(&persisted("example.com", AFTER_PORT_SCAN));

    let controller = h.controller(&[Phase::PortScan, Phase::HttpProbe]);
    let report = controller.run(&classify("example.com")).await.unwrap();

    assert_eq!(report.executed, vec![Phase::HttpProbe]);
    assert!(report.skipped.contains(&Phase::PortScan));
    assert_eq!(h.calls(), vec!["http_probe"]);
}

#[tokio::test]
async fn resume_without_document_fails_and_writes_nothing() {
    let h = Harness::new();
    let controller = h.controller(&[Phase::PortScan, Phase::HttpProbe]);

    let err = controller.run(&classify("example.com")).await.unwrap_err();
    assert!(matches!(err, PipelineError::MissingDocument { ref target } if target == "example.com"), "{err}");
    assert!(h.calls().is_empty());
    assert_eq!(h.save_count(), 0);
    assert!(h.files().is_empty());
}

#[tokio::test]
async fn failed_phase_keeps_previous_snapshot_and_can_be_retried() {
    let h = Harness::new();
    h.seed(&persisted("example.com", AFTER_PORT_SCAN));

    let controller = h
        .controller(&[Phase::HttpProbe, Phase::VulnScan])
        .with_phase(
            Phase::VulnScan,
            h.phase(Phase::VulnScan, PhaseBehavior::Fail("nuclei exited with 2".to_string())),
        );
    let err = controller.run(&classify("example.com")).await.unwrap_err();
    assert!(matches!(err, PipelineError::Phase { phase: Phase::VulnScan, .. }), "{err}");
    assert!(err.to_string().contains("nuclei exited with 2"));

    let doc = h.stored("example.com").unwrap();
    assert!(doc.has_executed(&Module::HttpProbe));
    assert!(!doc.has_executed(&Module::VulnScan));
    assert!(doc.section("vuln_scan").is_none());

    h.clear_calls();
    let retry = h.controller(&[Phase::HttpProbe, Phase::VulnScan]);
    let report = retry.run(&classify("example.com")).await.unwrap();

    assert_eq!(report.executed, vec![Phase::VulnScan]);
    assert_eq!(h.calls(), vec!["vuln_scan"]);
    assert!(report.document.has_executed(&Module::VulnScan));
}

#[tokio::test]
async fn stored_document_of_another_target_is_rejected() {
    let h = Harness::new();
    let store = h.store();
    let foreign = persisted("example.com", AFTER_PORT_SCAN);
    std::fs::write(store.path_for("example.org"), foreign.serialize().unwrap()).unwrap();
    assert_eq!(store.key("example.org"), "example.org");

    let controller = h.controller(&[Phase::HttpProbe]);
    let err = controller.run(&classify("example.org")).await.unwrap_err();

    assert!(
        matches!(
            err,
            PipelineError::IdentityMismatch { ref expected, ref found }
                if expected == "example.org" && found == "example.com"
        ),
        "{err}"
    );
    assert!(h.calls().is_empty());
}

#[tokio::test]
async fn enabling_discovery_starts_a_fresh_document() {
    let h = Harness::new();
    let mut old = persisted("example.com", AFTER_PORT_SCAN);
    old.merge_phase(
        reconr_common::phase::Slot::Section("port_scan"),
        json!({ "summary": { "total_open_ports": 9 } }),
    );
    h.seed(&old);

    let controller = h.controller(FULL_DISCOVERY);
    let report = controller.run(&classify("example.com")).await.unwrap();

    assert!(!report.resumed);
    let doc = h.stored("example.com").unwrap();
    assert_eq!(
        doc.modules_executed(),
        &[Module::Whois, Module::SubdomainDiscovery, Module::DnsResolution]
    );
    assert!(doc.section("port_scan").is_none());
    assert_eq!(doc.subdomain_count, 2);
}

#[tokio::test]
async fn unknown_sections_survive_a_resume() {
    let h = Harness::new();
    let mut doc = persisted("example.com", AFTER_PORT_SCAN);
    doc.sections
        .insert("screenshots".to_string(), json!({ "taken": 12 }));
    doc.metadata
        .extra
        .insert("operator".to_string(), json!("blue-team"));
    h.seed(&doc);

    let controller = h.controller(&[Phase::MitreEnrich]);
    controller.run(&classify("example.com")).await.unwrap();

    let stored = h.stored("example.com").unwrap();
    assert_eq!(stored.sections["screenshots"], json!({ "taken": 12 }));
    assert_eq!(stored.metadata.extra["operator"], json!("blue-team"));
    assert_eq!(
        stored.metadata.extra["mitre_enrichment"]["total_cves_processed"],
        json!(2)
    );
    assert!(stored.has_executed(&Module::AddMitre));
}

#[tokio::test]
async fn subdomain_document_resumes_in_subdomain_mode() {
    let h = Harness::new();
    h.controller(FULL_DISCOVERY)
        .run(&classify("www.example.com"))
        .await
        .unwrap();
    h.clear_calls();

    let report = h
        .controller(&[Phase::PortScan])
        .run(&classify("www.example.com"))
        .await
        .unwrap();

    assert!(report.resumed);
    assert_eq!(h.calls(), vec!["port_scan"]);
    assert_eq!(
        report.document.modules_executed(),
        &[Module::Whois, Module::DnsResolution, Module::PortScan]
    );
}

#[tokio::test]
async fn foreign_module_ids_survive_a_resume() {
    let h = Harness::new();
    let screenshot = Module::Other("screenshot".to_string());
    h.seed(&persisted(
        "example.com",
        &[
            Module::Whois,
            Module::SubdomainDiscovery,
            Module::DnsResolution,
            screenshot.clone(),
        ],
    ));

    let report = h
        .controller(&[Phase::PortScan])
        .run(&classify("example.com"))
        .await
        .unwrap();

    assert!(report.resumed);
    assert_eq!(h.calls(), vec!["port_scan"]);
    let stored = h.stored("example.com").unwrap();
    assert_eq!(
        stored.modules_executed(),
        &[
            Module::Whois,
            Module::SubdomainDiscovery,
            Module::DnsResolution,
            screenshot,
            Module::PortScan
        ]
    );
    let raw = std::fs::read_to_string(h.store().path_for("example.com")).unwrap();
    assert!(raw.contains("\"screenshot\""));
}
