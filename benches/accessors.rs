//! Benchmarks for parsing and metadata access.
//!
//! Run with: cargo bench

use criterion::{Criterion, criterion_group, criterion_main};

use newsitem::{EventLog, LocationFilter, NewsItem, NullSink, Tag, XmlDom};

const ARTICLE: &[u8] = include_bytes!("../tests/fixtures/article.xml");

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_article", |b| {
        b.iter(|| XmlDom::parse_bytes(ARTICLE).unwrap());
    });
}

fn bench_serialize(c: &mut Criterion) {
    let dom = XmlDom::parse_bytes(ARTICLE).unwrap();
    c.bench_function("serialize_article", |b| {
        b.iter(|| dom.to_xml().unwrap());
    });
}

fn bench_reads(c: &mut Criterion) {
    let mut dom = XmlDom::parse_bytes(ARTICLE).unwrap();
    let mut sink = NullSink;
    let item = NewsItem::new(&mut dom, &mut sink);

    c.bench_function("read_summary", |b| {
        b.iter(|| {
            (
                item.authors(),
                item.channels(),
                item.locations(LocationFilter::All),
                item.pub_window(),
                item.news_priority(),
            )
        });
    });
}

fn bench_tag_churn(c: &mut Criterion) {
    c.bench_function("add_remove_tags", |b| {
        b.iter(|| {
            let mut dom = XmlDom::parse_bytes(ARTICLE).unwrap();
            let mut log = EventLog::new();
            let mut item = NewsItem::new(&mut dom, &mut log);
            for i in 0..20 {
                let uuid = format!("tag-{i}");
                item.add_tag("bench", &Tag::new(&uuid, "Tag", "x-im/topic")).unwrap();
            }
            item.remove_all_links_by_type("bench", "x-im/topic").unwrap();
            dom.compact();
            dom
        });
    });
}

criterion_group!(benches, bench_parse, bench_serialize, bench_reads, bench_tag_churn);
criterion_main!(benches);
