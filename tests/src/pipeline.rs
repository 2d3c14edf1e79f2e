use reconr_common::error::PipelineError;
use reconr_common::phase::{Module, Phase};
use reconr_core::pipeline::PhaseEvent;
use serde_json::json;

use crate::support::{FULL_DISCOVERY, Harness, PhaseBehavior, classify, config};

#[tokio::test]
async fn root_domain_runs_discovery_and_port_scan() {
    let h = Harness::new();
    let controller = h.controller(&[Phase::Whois, Phase::Discovery, Phase::PortScan]);

    let report = controller.run(&classify("example.com")).await.unwrap();
    let doc = &report.document;

    assert!(!report.resumed);
    assert!(!doc.is_subdomain_mode());
    assert!(!doc.metadata.bruteforce_mode);
    assert_eq!(doc.metadata.root_domain, "example.com");
    assert_eq!(
        doc.modules_executed(),
        &[
            Module::Whois,
            Module::SubdomainDiscovery,
            Module::DnsResolution,
            Module::PortScan
        ]
    );
    assert_eq!(doc.subdomains, vec!["api.example.com", "www.example.com"]);
    assert_eq!(doc.subdomain_count, 2);
    assert_eq!(doc.whois["registrar"], json!("Example Registrar"));
    assert_eq!(doc.summary_count("port_scan", "total_open_ports"), 4);

    assert_eq!(
        h.calls(),
        vec!["whois:example.com", "discover:example.com", "port_scan"]
    );
    assert_eq!(report.executed, vec![Phase::Whois, Phase::Discovery, Phase::PortScan]);
    assert_eq!(
        report.skipped,
        vec![Phase::HttpProbe, Phase::VulnScan, Phase::MitreEnrich]
    );
    assert_eq!(h.stored("example.com").as_ref(), Some(doc));
}

#[tokio::test]
async fn subdomain_target_scans_single_host() {
    let h = Harness::new();
    let mut cfg = config(FULL_DISCOVERY);
    cfg.bruteforce = true;
    let controller = h.controller_with(cfg);

    let report = controller.run(&classify("www.example.com")).await.unwrap();
    let doc = &report.document;

    assert!(doc.is_subdomain_mode());
    assert!(!doc.metadata.bruteforce_mode);
    assert_eq!(doc.metadata.root_domain, "example.com");
    assert_eq!(doc.subdomains, vec!["www.example.com"]);
    assert_eq!(doc.subdomain_count, 1);
    assert_eq!(doc.dns["domain"], json!({}));
    assert_eq!(
        doc.dns["subdomains"]["www.example.com"]["ips"]["ipv4"],
        json!(["192.0.2.40"])
    );
    assert_eq!(doc.modules_executed(), &[Module::Whois, Module::DnsResolution]);

    // WHOIS goes to the registrable domain, discovery is never asked.
    assert_eq!(h.calls(), vec!["whois:example.com", "resolve:www.example.com"]);
}

#[tokio::test]
async fn whois_failure_is_recorded_and_run_continues() {
    let h = Harness::new();
    let controller = h
        .controller(&[Phase::Whois, Phase::Discovery, Phase::PortScan])
        .with_whois(h.failing_whois("whois.verisign-grs.com: connection refused"));

    let report = controller.run(&classify("example.com")).await.unwrap();
    let doc = &report.document;

    assert_eq!(
        doc.whois,
        json!({ "error": "whois.verisign-grs.com: connection refused" })
    );
    assert!(doc.has_executed(&Module::Whois));
    assert!(doc.has_executed(&Module::PortScan));
    assert!(h.events().contains(&PhaseEvent::Degraded(
        Phase::Whois,
        "whois.verisign-grs.com: connection refused".to_string()
    )));
}

#[tokio::test]
async fn discovery_failure_aborts_the_run() {
    let h = Harness::new();
    let controller = h
        .controller(&[Phase::Whois, Phase::Discovery, Phase::PortScan])
        .with_discovery(h.failing_discovery());

    let err = controller.run(&classify("example.com")).await.unwrap_err();
    assert!(
        matches!(err, PipelineError::Phase { phase: Phase::Discovery, .. }),
        "{err}"
    );

    // Only the WHOIS snapshot was written; port_scan never ran.
    assert_eq!(h.save_count(), 1);
    assert_eq!(h.stored("example.com").unwrap().modules_executed(), &[Module::Whois]);
    assert!(!h.calls().contains(&"port_scan".to_string()));
}

#[tokio::test]
async fn saves_once_after_every_phase() {
    let h = Harness::new();
    let controller = h.controller(&[Phase::Whois, Phase::Discovery, Phase::PortScan, Phase::HttpProbe]);

    controller.run(&classify("example.com")).await.unwrap();

    assert_eq!(h.save_count(), 4);
    assert_eq!(
        *h.snapshots.lock().unwrap(),
        vec![
            vec![Module::Whois],
            vec![Module::Whois, Module::SubdomainDiscovery, Module::DnsResolution],
            vec![
                Module::Whois,
                Module::SubdomainDiscovery,
                Module::DnsResolution,
                Module::PortScan
            ],
            vec![
                Module::Whois,
                Module::SubdomainDiscovery,
                Module::DnsResolution,
                Module::PortScan,
                Module::HttpProbe
            ],
        ]
    );
}

#[tokio::test]
async fn missing_collaborator_fails_before_anything_runs() {
    let h = Harness::new();
    let controller = h.bare_controller(config(&[Phase::Whois, Phase::Discovery, Phase::PortScan]));

    let err = controller.run(&classify("example.com")).await.unwrap_err();
    assert!(matches!(err, PipelineError::MissingCollaborator(Phase::Whois)), "{err}");
    assert_eq!(h.save_count(), 0);
    assert!(h.files().is_empty());
}

#[tokio::test]
async fn missing_document_phase_collaborator_is_detected_up_front() {
    let h = Harness::new();
    let controller = h
        .bare_controller(config(&[Phase::Whois, Phase::Discovery, Phase::HttpProbe]))
        .with_whois(h.failing_whois("unused"))
        .with_discovery(h.failing_discovery());

    let err = controller.run(&classify("example.com")).await.unwrap_err();
    assert!(matches!(err, PipelineError::MissingCollaborator(Phase::HttpProbe)), "{err}");
    assert!(h.calls().is_empty());
    assert!(h.files().is_empty());
}

#[tokio::test]
async fn non_object_section_is_a_phase_failure() {
    let h = Harness::new();
    let controller = h
        .controller(&[Phase::Whois, Phase::Discovery, Phase::PortScan])
        .with_phase(Phase::PortScan, h.phase(Phase::PortScan, PhaseBehavior::Section(json!([80, 443]))));

    let err = controller.run(&classify("example.com")).await.unwrap_err();
    assert!(matches!(err, PipelineError::Phase { phase: Phase::PortScan, .. }), "{err}");

    let stored = h.stored("example.com").unwrap();
    assert!(!stored.has_executed(&Module::PortScan));
    assert!(stored.section("port_scan").is_none());
}

#[tokio::test]
async fn events_follow_registry_order() {
    let h = Harness::new();
    let controller = h.controller(&[Phase::Whois, Phase::Discovery, Phase::MitreEnrich]);

    let report = controller.run(&classify("example.com")).await.unwrap();

    assert_eq!(
        h.events(),
        vec![
            PhaseEvent::Started(Phase::Whois),
            PhaseEvent::Completed(Phase::Whois),
            PhaseEvent::Started(Phase::Discovery),
            PhaseEvent::Completed(Phase::Discovery),
            PhaseEvent::Skipped(Phase::PortScan),
            PhaseEvent::Skipped(Phase::HttpProbe),
            PhaseEvent::Skipped(Phase::VulnScan),
            PhaseEvent::Started(Phase::MitreEnrich),
            PhaseEvent::Completed(Phase::MitreEnrich),
        ]
    );
    assert_eq!(
        report.document.metadata.extra["mitre_enrichment"]["total_cves_enriched"],
        json!(1)
    );
    assert!(report.document.has_executed(&Module::AddMitre));
}
