//! Matching benchmarks over a synthetic rule corpus.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use nw_core::{Request, RequestType};
use nw_engine::{DnsEngine, Engine};
use nw_filterlist::{RuleList, RuleStorage, StringConfig, StringRuleList};

const RULES: usize = 10_000;

fn corpus() -> String {
    let mut text = String::new();
    for i in 0..RULES {
        match i % 5 {
            0 => text.push_str(&format!("||ads{i}.example^\n")),
            1 => text.push_str(&format!("0.0.0.0 tracker{i}.example\n")),
            2 => text.push_str(&format!("||cdn{i}.example^$script,third-party\n")),
            3 => text.push_str(&format!("/banner{i}/*^$domain=site{i}.example\n")),
            _ => text.push_str(&format!("@@||ok{i}.example^\n")),
        }
    }
    text
}

fn storage() -> Arc<RuleStorage> {
    let list: Box<dyn RuleList> = Box::new(StringRuleList::new(StringConfig {
        id: 1,
        text: corpus(),
        ignore_cosmetic: true,
    }));
    Arc::new(RuleStorage::new(vec![list]).expect("storage"))
}

fn bench_network(c: &mut Criterion) {
    let engine = Engine::new(storage()).expect("engine");
    let source = "https://news.example/";
    let hit = Request::new("https://ads500.example/pixel.gif", source, RequestType::IMAGE);
    let miss = Request::new("https://clean.example/app.js", source, RequestType::SCRIPT);

    c.bench_function("network_match_hit", |b| b.iter(|| engine.match_request(black_box(&hit))));
    c.bench_function("network_match_miss", |b| b.iter(|| engine.match_request(black_box(&miss))));
}

fn bench_dns(c: &mut Criterion) {
    let engine = DnsEngine::new(storage()).expect("dns engine");

    c.bench_function("dns_match_network_rule", |b| {
        b.iter(|| engine.match_hostname(black_box("ads500.example")))
    });
    c.bench_function("dns_match_host_rule", |b| {
        b.iter(|| engine.match_hostname(black_box("tracker501.example")))
    });
    c.bench_function("dns_match_miss", |b| {
        b.iter(|| engine.match_hostname(black_box("clean.example")))
    });
}

criterion_group!(benches, bench_network, bench_dns);
criterion_main!(benches);
