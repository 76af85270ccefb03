//! End-to-end normalization against scripted MX answers

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use mxnorm::{DnsConfig, DnsError, MxAnswer, MxRecord, MxResolver, Normalizer};
use pretty_assertions::assert_eq;

/// Answers configured domains, fails everything else with NXDOMAIN.
#[derive(Debug, Default)]
struct ScriptedResolver {
    domains: HashMap<String, Vec<MxAnswer>>,
    calls: AtomicUsize,
}

impl ScriptedResolver {
    fn with(mut self, domain: &str, priority: u16, host: &str) -> Self {
        self.domains
            .entry(domain.to_string())
            .or_default()
            .push(MxAnswer::new(priority, host, 3600));
        self
    }
}

#[async_trait]
impl MxResolver for ScriptedResolver {
    async fn resolve_mx(&self, domain: &str) -> Result<Vec<MxAnswer>, DnsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.domains
            .get(domain)
            .cloned()
            .ok_or_else(|| DnsError::DomainNotFound(domain.to_string()))
    }
}

fn normalizer(resolver: ScriptedResolver) -> Normalizer {
    Normalizer::with_resolver(Arc::new(resolver), &DnsConfig::default())
}

async fn check(address: &str, host: &str, expected: &str, provider: Option<&str>) {
    let domain = address.rsplit_once('@').unwrap().1.to_lowercase();
    let normalizer = normalizer(ScriptedResolver::default().with(&domain, 10, host));

    let result = normalizer.normalize(address).await;
    assert_eq!(result.address(), address);
    assert_eq!(result.normalized_address(), expected, "{address} via {host}");
    assert_eq!(result.mailbox_provider(), provider);
    assert_eq!(result.mx_records(), &[MxRecord::new(10, host)]);
}

#[tokio::test]
async fn display_name_and_google_rules() {
    let normalizer = normalizer(ScriptedResolver::default().with("gmail.com", 1, "aspmx.l.google.com"));

    let result = normalizer
        .normalize(r#""Me!" <gavin.m.roy+123@gmail.com>"#)
        .await;

    assert_eq!(result.address(), r#""Me!" <gavin.m.roy+123@gmail.com>"#);
    assert_eq!(result.normalized_address(), "gavinmroy@gmail.com");
    assert_eq!(result.mailbox_provider(), Some("Google"));
}

#[tokio::test]
async fn provider_table() {
    let cases = [
        ("someone+test@custom.io", "mx01.mail.icloud.com", "Apple"),
        ("someone+test@custom.io", "in1-smtp.messagingengine.com", "Fastmail"),
        ("some.one+test@custom.io", "aspmx.l.google.com", "Google"),
        ("some.one+test@custom.io", "alt1.gmail-smtp-in.l.googlemail.com", "Google"),
        ("someone+test@custom.io", "custom-io.mail.protection.outlook.com", "Microsoft"),
        ("someone+test@custom.io", "mail.protonmail.ch", "ProtonMail"),
        ("someone+test@custom.io", "mx1.emailsrvr.com", "Rackspace"),
        ("someone+test@custom.io", "mx.yandex.net", "Yandex"),
        ("someone+test@custom.io", "mx.zoho.com", "Zoho"),
    ];

    for (address, host, provider) in cases {
        check(address, host, "someone@custom.io", Some(provider)).await;
    }
}

#[tokio::test]
async fn fastmail_folds_subdomain_into_local_part() {
    let host = "in1-smtp.messagingengine.com";
    check("testing@local.example.com", host, "local@example.com", Some("Fastmail")).await;
    check("testing@example.com", host, "testing@example.com", Some("Fastmail")).await;
}

#[tokio::test]
async fn yahoo_addresses_are_not_rewritten() {
    let host = "mta5.am0.yahoodns.net";
    check("a.b-c@yahoo.com", host, "a.b-c@yahoo.com", Some("Yahoo")).await;
}

#[tokio::test]
async fn unresolvable_domain_passes_through() {
    let normalizer = normalizer(ScriptedResolver::default());
    let address = "Foo+Bar@Does-Not-Exist.invalid";

    let result = normalizer.normalize(address).await;

    assert_eq!(result.address(), address);
    assert_eq!(result.normalized_address(), "foo+bar@does-not-exist.invalid");
    assert!(result.mx_records().is_empty());
    assert_eq!(result.mailbox_provider(), None);
    assert!(normalizer.cache().contains("does-not-exist.invalid"));
}

#[tokio::test]
async fn normalized_address_is_stable() {
    let normalizer = normalizer(ScriptedResolver::default().with("gmail.com", 5, "gmail-smtp-in.l.google.com"));

    let once = normalizer.normalize("f.o.o+bar@gmail.com").await;
    let twice = normalizer.normalize(once.normalized_address()).await;

    assert_eq!(once.normalized_address(), "foo@gmail.com");
    assert_eq!(twice.normalized_address(), "foo@gmail.com");
}

#[tokio::test]
async fn unknown_exchange_ahead_of_google_still_matches_google() {
    let normalizer = normalizer(
        ScriptedResolver::default()
            .with("gmail.com", 10, "aspmx.l.google.com")
            .with("gmail.com", 1, "mx.unrelated.example"),
    );

    let result = normalizer.normalize("f.o.o+bar@gmail.com").await;

    assert_eq!(result.normalized_address(), "foo@gmail.com");
    assert_eq!(result.mailbox_provider(), Some("Google"));
    assert_eq!(
        result.mx_records(),
        &[
            MxRecord::new(1, "mx.unrelated.example"),
            MxRecord::new(10, "aspmx.l.google.com"),
        ]
    );
}

#[tokio::test]
async fn repeated_domains_resolve_once() {
    let resolver = Arc::new(ScriptedResolver::default().with("gmail.com", 5, "gmail-smtp-in.l.google.com"));
    let normalizer = Normalizer::with_resolver(resolver.clone(), &DnsConfig::default());

    for address in ["a@gmail.com", "b@gmail.com", "C@GMAIL.COM"] {
        normalizer.normalize(address).await;
    }

    assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    assert_eq!(normalizer.cache().entries()[0].hits, 3);
}

#[tokio::test(start_paused = true)]
async fn full_cache_evicts_exactly_the_least_used_domain() {
    let mut resolver = ScriptedResolver::default().with("gmail.com", 5, "gmail-smtp-in.l.google.com");
    for i in 0..4 {
        resolver = resolver.with(&format!("filler-{i}.test"), 10, "mx.filler.test");
    }
    let normalizer = Normalizer::with_resolver(
        Arc::new(resolver),
        &DnsConfig {
            cache_limit: 4,
            ..Default::default()
        },
    );

    for i in 0..4 {
        normalizer.normalize(&format!("user@filler-{i}.test")).await;
        tokio::time::advance(Duration::from_secs(1)).await;
    }
    // Everything but filler-2 is read a second time.
    for i in [0, 1, 3] {
        normalizer.normalize(&format!("user@filler-{i}.test")).await;
    }

    let result = normalizer.normalize("some.one@gmail.com").await;

    assert_eq!(result.mailbox_provider(), Some("Google"));
    let cache = normalizer.cache();
    assert_eq!(cache.len(), 4);
    assert_eq!(cache.stats().evictions, 1);
    assert!(!cache.contains("filler-2.test"));
    assert!(cache.contains("gmail.com"));
}

#[tokio::test(start_paused = true)]
async fn expired_entry_is_resolved_again() {
    let resolver = Arc::new(ScriptedResolver::default().with("gmail.com", 5, "gmail-smtp-in.l.google.com"));
    let normalizer = Normalizer::with_resolver(resolver.clone(), &DnsConfig::default());

    normalizer.normalize("a@gmail.com").await;
    tokio::time::advance(Duration::from_secs(3601)).await;
    normalizer.normalize("a@gmail.com").await;

    assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
}
