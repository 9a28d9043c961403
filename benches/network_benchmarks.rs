use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use grantnet::aggregate::{MatchKind, NormalizedRecipient};
use grantnet::algo::PathQuery;
use grantnet::config::{CommunityConfig, InfluenceConfig, PathfindingConfig, SimilarityConfig};
use grantnet::{
    analyze_influence, compute_similarity, detect_peer_groups, find_paths, FunderPortfolio,
    GrantRecord, GraphBuilder, OrgId, SimilarityOptions,
};

const YEARS: [i32; 3] = [2021, 2022, 2023];

/// `funders` funders, each funding 20 of `funders * 4` recipients with
/// overlapping neighbourhoods
fn synthetic_portfolios(funders: usize) -> Vec<FunderPortfolio> {
    let recipients = funders * 4;
    (0..funders)
        .map(|f| {
            let funder_id = OrgId::new(format!("F{:05}", f));
            let mut portfolio =
                FunderPortfolio::new(funder_id.clone(), format!("Funder {}", f), &YEARS);
            for k in 0..20 {
                let r = (f * 3 + k * 7) % recipients;
                let recipient = NormalizedRecipient {
                    id: OrgId::new(format!("R{:05}", r)),
                    name: format!("Recipient {}", r),
                    confidence: 1.0,
                    match_kind: MatchKind::ExactId,
                };
                let record = GrantRecord::new(
                    funder_id.clone(),
                    Some(recipient.id.clone()),
                    recipient.name.clone(),
                    1000.0 + (k * 250) as f64,
                    YEARS[k % 3],
                );
                portfolio.add(&recipient, &record, false);
            }
            portfolio
        })
        .collect()
}

/// Benchmark pairwise similarity scoring
fn bench_similarity(c: &mut Criterion) {
    let mut group = c.benchmark_group("similarity");

    for size in [50, 200, 500].iter() {
        let portfolios = synthetic_portfolios(*size);
        let options = SimilarityOptions::default().with_threshold(0.1);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let pairs = compute_similarity(&portfolios, &options, &SimilarityConfig::default())
                    .unwrap();
                criterion::black_box(pairs.len());
            });
        });
    }
    group.finish();
}

/// Benchmark Louvain peer-group detection
fn bench_peer_groups(c: &mut Criterion) {
    let mut group = c.benchmark_group("peer_groups");

    for size in [50, 200].iter() {
        let portfolios = synthetic_portfolios(*size);
        let options = SimilarityOptions::default().with_threshold(0.05);
        let pairs =
            compute_similarity(&portfolios, &options, &SimilarityConfig::default()).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let groups =
                    detect_peer_groups(&portfolios, &pairs, &CommunityConfig::default(), false)
                        .unwrap();
                criterion::black_box(groups.len());
            });
        });
    }
    group.finish();
}

/// Benchmark bounded path enumeration
fn bench_pathfinding(c: &mut Criterion) {
    let mut group = c.benchmark_group("pathfinding");
    let graph = GraphBuilder::new().build(&synthetic_portfolios(200)).unwrap();

    for hops in [2, 3, 4].iter() {
        let query = PathQuery::default().with_max_hops(*hops);
        group.bench_with_input(BenchmarkId::from_parameter(hops), hops, |b, _| {
            b.iter(|| {
                let result = find_paths(
                    &graph,
                    "funder:F00000",
                    "funder:F00100",
                    &query,
                    &PathfindingConfig::default(),
                )
                .unwrap();
                criterion::black_box(result.pathways.len());
            });
        });
    }
    group.finish();
}

/// Benchmark influence ranking (PageRank, degree, closeness)
fn bench_influence(c: &mut Criterion) {
    let mut group = c.benchmark_group("influence");

    for size in [100, 500].iter() {
        let graph = GraphBuilder::new().build(&synthetic_portfolios(*size)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let report = analyze_influence(&graph, &InfluenceConfig::default());
                criterion::black_box(report.scores.len());
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_similarity,
    bench_peer_groups,
    bench_pathfinding,
    bench_influence
);
criterion_main!(benches);
