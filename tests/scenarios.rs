use approx::assert_relative_eq;
use grantnet::algo::PathQuery;
use grantnet::config::{PathfindingConfig, SimilarityConfig};
use grantnet::export::from_node_link_json;
use grantnet::peers::detect_peer_groups;
use grantnet::{
    compute_similarity, find_paths, to_node_link, AggregationReport, EngineConfig,
    GrantAggregator, GrantRecord, GraphBuilder, InMemoryGrantSource, NetworkError, NodeKey,
    OrgId, SimilarityOptions,
};
use std::sync::Arc;

fn grant(funder: &str, recipient: &str, amount: f64) -> GrantRecord {
    GrantRecord::new(funder, Some(OrgId::new(recipient)), recipient, amount, 2022)
}

fn ids(raw: &[&str]) -> Vec<OrgId> {
    raw.iter().map(|s| OrgId::new(*s)).collect()
}

async fn aggregate(records: Vec<GrantRecord>, funders: &[&str]) -> AggregationReport {
    let source = Arc::new(InMemoryGrantSource::new(records));
    GrantAggregator::new(source, &EngineConfig::default())
        .aggregate(&ids(funders), &[2022])
        .await
        .unwrap()
}

/// A funds {X, Y}, B funds {Y, Z}, C funds {X, Y, Z}; $100 each
fn triangle() -> Vec<GrantRecord> {
    vec![
        grant("A", "X", 100.0),
        grant("A", "Y", 100.0),
        grant("B", "Y", 100.0),
        grant("B", "Z", 100.0),
        grant("C", "X", 100.0),
        grant("C", "Y", 100.0),
        grant("C", "Z", 100.0),
    ]
}

#[tokio::test]
async fn test_jaccard_over_three_funders() {
    let report = aggregate(triangle(), &["A", "B", "C"]).await;
    let pairs = compute_similarity(
        &report.portfolios,
        &SimilarityOptions::default().with_threshold(0.0),
        &SimilarityConfig::default(),
    )
    .unwrap();

    let raw = |a: &str, b: &str| {
        pairs
            .iter()
            .find(|p| p.funder_a.as_str() == a && p.funder_b.as_str() == b)
            .map(|p| p.raw_score)
            .unwrap()
    };
    assert_eq!(pairs.len(), 3);
    assert_relative_eq!(raw("A", "B"), 1.0 / 3.0);
    assert_relative_eq!(raw("A", "C"), 2.0 / 3.0);
    assert_relative_eq!(raw("B", "C"), 2.0 / 3.0);
}

#[tokio::test]
async fn test_empty_funder_excluded_from_pairs_but_kept_in_graph() {
    let report = aggregate(triangle(), &["A", "B", "C", "D"]).await;

    let empty = report.get(&OrgId::new("D")).unwrap();
    assert!(empty.is_empty());
    assert_eq!(empty.record_count, 0);

    let pairs = compute_similarity(
        &report.portfolios,
        &SimilarityOptions::default(),
        &SimilarityConfig::default(),
    )
    .unwrap();
    assert!(!pairs.iter().any(|p| p.involves(&OrgId::new("D"))));

    let graph = GraphBuilder::new().build(&report.portfolios).unwrap();
    let d = graph.node_id(&NodeKey::funder("D")).unwrap();
    assert_eq!(graph.degree(d), 0);
    assert_eq!(graph.funders().count(), 4);
}

#[tokio::test]
async fn test_path_through_shared_recipient() {
    let report = aggregate(triangle(), &["A", "B", "C"]).await;
    let graph = GraphBuilder::new().build(&report.portfolios).unwrap();

    let result = find_paths(
        &graph,
        "A",
        "C",
        &PathQuery::default().with_max_hops(3),
        &PathfindingConfig::default(),
    )
    .unwrap();

    let via_y = result
        .pathways
        .iter()
        .find(|p| {
            let ids: Vec<&str> = p.steps.iter().map(|s| s.id.as_str()).collect();
            ids == ["A", "Y", "C"]
        })
        .expect("path A -> Y -> C");
    assert_eq!(via_y.hops(), 2);
    assert_relative_eq!(via_y.strength, 100.0);
    assert!(via_y.strategy.contains("Y"));
}

#[tokio::test]
async fn test_unrelated_funders_form_singletons() {
    let records = (0..5)
        .flat_map(|i| {
            let funder = format!("F{}", i);
            vec![
                grant(&funder, &format!("R{}a", i), 100.0),
                grant(&funder, &format!("R{}b", i), 100.0),
            ]
        })
        .collect();
    let report = aggregate(records, &["F0", "F1", "F2", "F3", "F4"]).await;

    let pairs = compute_similarity(
        &report.portfolios,
        &SimilarityOptions::default(),
        &SimilarityConfig::default(),
    )
    .unwrap();
    assert!(pairs.is_empty());

    let config = EngineConfig::default();
    let groups = detect_peer_groups(&report.portfolios, &pairs, &config.community, false).unwrap();
    assert_eq!(groups.len(), 5);
    for g in &groups {
        assert_eq!(g.size(), 1);
        assert_eq!(g.density, 0.0);
    }
}

#[tokio::test]
async fn test_node_link_round_trip_ten_nodes_fifteen_edges() {
    // 3 funders x 7 recipients, 15 funded pairs
    let mut records = Vec::new();
    for f in 0..3 {
        for r in 0..7 {
            if (f + r) % 4 != 3 && records.len() < 15 {
                records.push(grant(
                    &format!("F{}", f),
                    &format!("R{}", r),
                    100.0 * (f + r + 1) as f64,
                ));
            }
        }
    }
    let report = aggregate(records, &["F0", "F1", "F2"]).await;
    let graph = GraphBuilder::new().build(&report.portfolios).unwrap();
    assert_eq!(graph.node_count(), 10);
    assert_eq!(graph.edge_count(), 15);

    let json = to_node_link(&graph, None).to_json().unwrap();
    let back = from_node_link_json(&json).unwrap();
    assert_eq!(back.node_count(), 10);
    assert_eq!(back.edge_count(), 15);

    for edge in graph.edges() {
        let f = graph.node(edge.funder).unwrap();
        let r = graph.node(edge.recipient).unwrap();
        let bf = back.node_id(&f.key).unwrap();
        let br = back.node_id(&r.key).unwrap();
        assert_eq!(back.edge_between(bf, br).unwrap().weight, edge.weight);
    }
}

#[tokio::test]
async fn test_unknown_path_endpoint_is_an_error() {
    let report = aggregate(triangle(), &["A", "B", "C"]).await;
    let graph = GraphBuilder::new().build(&report.portfolios).unwrap();

    let err = find_paths(
        &graph,
        "A",
        "NOPE",
        &PathQuery::default(),
        &PathfindingConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, NetworkError::InvalidIdentifier { .. }));
}
