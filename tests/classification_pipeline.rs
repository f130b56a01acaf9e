/// End-to-end tests for the classification pipeline: service prefilter
/// shortlisting, first-match-wins decoder order, distinct no-match
/// outcomes, and batch behavior (ordering, parallelism, cancellation).
use std::sync::atomic::AtomicBool;

use log_decoder::catalog::DecoderCatalog;
use log_decoder::classifier::{split_batch, Outcome};
use log_decoder::config::EngineConfig;
use log_decoder::decoder::{Decoder, Service};
use log_decoder::synth::{synthesize, FieldAnnotation};

fn ssh_service(id: u64) -> Service {
    let mut service = Service::new(id, "SSH", "sshd").unwrap();
    service.add_decoder(
        Decoder::from_pattern(
            id * 10 + 1,
            "ssh_failed_auth",
            "Aug 18 13:31:15 server sshd[12345]: Failed password for invalid user admin from 203.0.113.5 port 22 ssh2",
            r"^.+Failed password for.*from (?P<src_ip>\S+)",
        )
        .unwrap(),
    );
    service.add_decoder(
        Decoder::from_pattern(
            id * 10 + 2,
            "ssh_successful_login",
            "Aug 18 13:32:00 server sshd[12346]: Accepted password for user root from 198.51.100.2 port 5678 ssh2",
            r"^.+Accepted password for.*from (?P<src_ip>\S+)",
        )
        .unwrap(),
    );
    service
}

fn nginx_service(id: u64) -> Service {
    let mut service = Service::new(id, "Nginx", "nginx").unwrap();
    service.add_decoder(
        Decoder::from_pattern(
            id * 10 + 1,
            "nginx_error",
            "nginx: [error] upstream timed out",
            r"nginx: \[(?P<level>\w+)\]",
        )
        .unwrap(),
    );
    service
}

#[test]
fn test_matched_line_reports_service_decoder_and_fields() {
    let catalog = DecoderCatalog::from_services(vec![ssh_service(1), nginx_service(2)]);

    let result = catalog
        .classify_line("Aug 18 13:31:15 server sshd[9]: Failed password for root from 10.0.0.5 port 22 ssh2");
    assert_eq!(result.outcome, Outcome::Matched);
    assert_eq!(result.service.as_ref().unwrap().name, "SSH");
    assert_eq!(result.decoder.as_ref().unwrap().name, "ssh_failed_auth");
    assert_eq!(
        result.fields.as_ref().unwrap().get("src_ip").map(String::as_str),
        Some("10.0.0.5")
    );
}

#[test]
fn test_first_service_in_list_order_wins() {
    let catalog = DecoderCatalog::from_services(vec![ssh_service(1), nginx_service(2)]);

    // Contains only the nginx keyword: service 2 is the candidate even
    // though SSH appears earlier in the list
    let result = catalog.classify_line("nginx: [error] upstream timed out");
    assert_eq!(result.service.as_ref().unwrap().name, "Nginx");
    assert_eq!(result.outcome, Outcome::Matched);

    // Contains both keywords: the first qualifying service in list order
    // wins, even though the nginx decoder would also have matched
    let result = catalog.classify_line("nginx: [error] relayed by sshd");
    assert_eq!(result.service.as_ref().unwrap().name, "SSH");
    assert_eq!(result.outcome, Outcome::NoDecoderMatch);
}

#[test]
fn test_no_service_match_has_no_references() {
    let catalog = DecoderCatalog::from_services(vec![ssh_service(1)]);
    let result = catalog.classify_line("postfix/smtpd[1]: connect from unknown");
    assert_eq!(result.outcome, Outcome::NoServiceMatch);
    assert!(result.service.is_none());
    assert!(result.decoder.is_none());
    assert!(result.fields.is_none());
}

#[test]
fn test_no_decoder_match_still_reports_service() {
    let catalog = DecoderCatalog::from_services(vec![ssh_service(1)]);
    let result = catalog.classify_line("sshd[1]: Connection closed by 10.0.0.5");
    assert_eq!(result.outcome, Outcome::NoDecoderMatch);
    assert_eq!(result.service.as_ref().unwrap().name, "SSH");
    assert!(result.decoder.is_none());
    assert!(result.fields.is_none());
}

#[test]
fn test_first_decoder_in_stored_order_wins() {
    let mut service = Service::new(1, "SSH", "sshd").unwrap();
    // Both decoders match any sshd line; the earlier one must win
    service.add_decoder(
        Decoder::from_pattern(10, "broad_a", "", r"sshd\[(?P<pid>\d+)\]").unwrap(),
    );
    service.add_decoder(
        Decoder::from_pattern(11, "broad_b", "", r"sshd\[(?P<pid2>\d+)\]").unwrap(),
    );
    let catalog = DecoderCatalog::from_services(vec![service]);

    let result = catalog.classify_line("sshd[77]: hello");
    assert_eq!(result.decoder.as_ref().unwrap().id, 10);

    // Reordering flips the winner
    assert!(catalog.update_service(1, |s| s.reorder_decoders(&[11, 10])));
    let result = catalog.classify_line("sshd[77]: hello");
    assert_eq!(result.decoder.as_ref().unwrap().id, 11);
}

#[test]
fn test_decoder_without_named_groups_never_matches() {
    let mut service = Service::new(1, "SSH", "sshd").unwrap();
    // Hand-written pattern with no named groups: it would match the line
    // but extracts nothing, so it is not a classification
    service.add_decoder(Decoder::from_pattern(10, "bare", "", r"sshd").unwrap());
    service.add_decoder(
        Decoder::from_pattern(11, "with_pid", "", r"sshd\[(?P<pid>\d+)\]").unwrap(),
    );
    let catalog = DecoderCatalog::from_services(vec![service]);

    let result = catalog.classify_line("sshd[42]: hello");
    assert_eq!(result.outcome, Outcome::Matched);
    assert_eq!(
        result.decoder.as_ref().unwrap().id,
        11,
        "the group-less decoder must be passed over even though it is first"
    );

    // Alone, a group-less decoder leaves the line undecoded
    let mut service = Service::new(2, "Cron", "cron").unwrap();
    service.add_decoder(Decoder::from_pattern(20, "bare", "", r"cron").unwrap());
    let catalog = DecoderCatalog::from_services(vec![service]);
    let result = catalog.classify_line("cron[1]: job started");
    assert_eq!(result.outcome, Outcome::NoDecoderMatch);
}

#[test]
fn test_disabled_decoder_is_skipped() {
    let mut service = ssh_service(1);
    service.decoder_mut(11).unwrap().set_enabled(false);
    let catalog = DecoderCatalog::from_services(vec![service]);

    let result = catalog
        .classify_line("Aug 18 13:31:15 server sshd[9]: Failed password for root from 10.0.0.5 port 22 ssh2");
    assert_eq!(
        result.outcome,
        Outcome::NoDecoderMatch,
        "disabled decoders must not classify lines"
    );
}

#[test]
fn test_corrupted_pattern_does_not_abort_batch() {
    let mut service = ssh_service(1);
    // Simulate a corrupted persisted pattern that bypassed edit validation
    service.decoder_mut(12).unwrap().pattern = "([broken".to_string();
    let catalog = DecoderCatalog::from_services(vec![service]);

    let lines = vec![
        "Aug 18 13:31:15 server sshd[9]: Failed password for root from 10.0.0.5 port 22 ssh2"
            .to_string(),
        "Aug 18 13:32:00 server sshd[9]: Accepted password for user root from 10.0.0.6 port 22 ssh2"
            .to_string(),
    ];
    let results = catalog.classify_batch(&lines);
    assert_eq!(results.len(), 2);
    // The healthy decoder still matches its line
    assert_eq!(results[0].outcome, Outcome::Matched);
    // The corrupted decoder is a non-match, not an error
    assert_eq!(results[1].outcome, Outcome::NoDecoderMatch);
}

#[test]
fn test_batch_preserves_input_order() {
    let catalog = DecoderCatalog::from_services(vec![ssh_service(1), nginx_service(2)]);
    let lines = vec![
        "nginx: [error] upstream timed out".to_string(),
        "unrelated line".to_string(),
        "sshd[1]: noise".to_string(),
    ];
    let results = catalog.classify_batch(&lines);
    let echoed: Vec<&str> = results.iter().map(|r| r.line.as_str()).collect();
    assert_eq!(echoed, vec![
        "nginx: [error] upstream timed out",
        "unrelated line",
        "sshd[1]: noise",
    ]);
}

#[test]
fn test_parallel_batch_matches_sequential() {
    let sequential = DecoderCatalog::with_config(EngineConfig::interactive());
    let parallel = DecoderCatalog::with_config(
        EngineConfig::default().with_parallel_threshold(1),
    );
    for service in [ssh_service(1), nginx_service(2)] {
        sequential.add_service(service.clone());
        parallel.add_service(service);
    }

    let mut lines = Vec::new();
    for i in 0..500 {
        lines.push(format!(
            "Aug 18 13:31:15 server sshd[{i}]: Failed password for root from 10.0.0.{} port 22 ssh2",
            i % 250
        ));
        lines.push(format!("nginx: [error] worker {i} stalled"));
        lines.push(format!("unmatched line {i}"));
    }

    let a = sequential.classify_batch(&lines);
    let b = parallel.classify_batch(&lines);
    assert_eq!(a, b, "parallel results must equal sequential, in input order");
}

#[test]
fn test_classify_batch_is_idempotent() {
    let catalog = DecoderCatalog::from_services(vec![ssh_service(1), nginx_service(2)]);
    let lines = split_batch("nginx: [error] x\nsshd[1]: y\nzzz\n");
    let first = catalog.classify_batch(&lines);
    let second = catalog.classify_batch(&lines);
    assert_eq!(first, second);
}

#[test]
fn test_cancellation_stops_between_lines() {
    let catalog = DecoderCatalog::from_services(vec![ssh_service(1)]);
    let lines = vec!["sshd[1]: a".to_string(), "sshd[2]: b".to_string()];

    let cancel = AtomicBool::new(true);
    let results = catalog.classify_batch_cancellable(&lines, &cancel);
    assert!(results.is_empty(), "pre-cancelled batch classifies nothing");

    let cancel = AtomicBool::new(false);
    let results = catalog.classify_batch_cancellable(&lines, &cancel);
    assert_eq!(results.len(), 2);
}

#[test]
fn test_synthesized_decoder_classifies_through_pipeline() {
    // Author a decoder from highlighted fields, register it, classify
    let example =
        "Jan 1 05:33:01 myhost sshd[1234]: Failed password for root from 10.0.0.5 port 22";
    let annotations = vec![
        FieldAnnotation::new("myhost", "hostname"),
        FieldAnnotation::new("root", "user"),
        FieldAnnotation::new("10.0.0.5", "src_ip"),
    ];
    let synthesized = synthesize(example, &annotations).unwrap();

    let catalog = DecoderCatalog::new();
    let service_id = catalog.next_id();
    let mut service = Service::new(service_id, "SSH", "sshd").unwrap();
    service.add_decoder(
        Decoder::from_pattern(catalog.next_id(), "ssh_failed_auth", example, synthesized.source)
            .unwrap(),
    );
    catalog.add_service(service);

    // Unannotated text stays literal, so only the three fields may vary
    let line = "Jan 1 05:33:01 bastion sshd[1234]: Failed password for svc from 192.168.7.7 port 22";
    let result = catalog.classify_line(line);
    assert_eq!(result.outcome, Outcome::Matched);
    let fields = result.fields.unwrap();
    assert_eq!(fields.get("hostname").map(String::as_str), Some("bastion"));
    assert_eq!(fields.get("user").map(String::as_str), Some("svc"));
    assert_eq!(fields.get("src_ip").map(String::as_str), Some("192.168.7.7"));
}
