//! Grantnet CLI: run network analyses over a JSON grant dataset
//!
//! Logs go to stderr (`RUST_LOG`, default `warn`); results go to stdout.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use grantnet::algo::format_amount;
use grantnet::export::{to_graphml, to_node_link};
use grantnet::graph::{DirectoryEnrichment, EnrichmentSummary};
use grantnet::{
    bundle_recipients, EngineConfig, FiscalYear, GrantDataset, InMemoryGrantSource,
    NetworkAnalyzer, NetworkGraph, OrgId,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "grantnet", version, about = "Foundation network intelligence")]
struct Cli {
    /// Dataset file with `organizations` and `grants`
    #[arg(long, global = true, default_value = "grants.json")]
    data: PathBuf,

    /// YAML engine configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Fiscal years (default: every year in the dataset)
    #[arg(long, global = true, value_delimiter = ',')]
    years: Vec<FiscalYear>,

    /// Funders to analyse (default: every funder in the dataset)
    #[arg(long, global = true, value_delimiter = ',')]
    funders: Vec<String>,

    /// Keep recipients that could not be matched to a known organization
    #[arg(long, global = true)]
    include_unresolved: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ExportFormat {
    Graphml,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Recipients funded by several of the selected funders
    Bundle {
        #[arg(long, default_value_t = 2)]
        min_funders: usize,
    },
    /// Funder similarity, peer groups and recommendations
    Similarity {
        #[arg(long)]
        threshold: Option<f64>,

        /// Funders already in the relationship portfolio
        #[arg(long, value_delimiter = ',')]
        existing: Vec<String>,
    },
    /// Graph statistics
    Stats,
    /// Funders of one recipient
    CoFunders { recipient: String },
    /// Recipients funded by both funders
    Shared { funder_a: String, funder_b: String },
    /// Cultivation pathways between two organizations
    Paths {
        from: String,
        to: String,
        #[arg(long)]
        max_hops: Option<usize>,
    },
    /// Influence ranking
    Influence {
        #[arg(long, default_value_t = 20)]
        top: usize,
    },
    /// Serialize the graph
    Export {
        #[arg(long = "as", value_enum, default_value = "json")]
        export_format: ExportFormat,
        #[arg(long)]
        out: Option<PathBuf>,
        /// Add funder similarity links (JSON only)
        #[arg(long)]
        with_similarity: bool,
    },
}

struct Session {
    analyzer: NetworkAnalyzer,
    funders: Vec<OrgId>,
    years: Vec<FiscalYear>,
    include_unresolved: bool,
    format: OutputFormat,
}

impl Session {
    fn open(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => EngineConfig::from_file(path)
                .with_context(|| format!("loading config {:?}", path))?,
            None => EngineConfig::default(),
        };
        let dataset = GrantDataset::load(&cli.data)
            .with_context(|| format!("loading dataset {:?}", cli.data))?;

        let funders = if cli.funders.is_empty() {
            dataset.funder_ids()
        } else {
            cli.funders.iter().map(OrgId::new).collect()
        };
        let years = if cli.years.is_empty() {
            dataset.years()
        } else {
            cli.years.clone()
        };
        let include_unresolved = cli.include_unresolved || config.aggregation.include_unresolved;

        let source = Arc::new(InMemoryGrantSource::from_dataset(&dataset));
        let enrichment = Arc::new(DirectoryEnrichment::new(dataset.organizations.clone()));
        let analyzer = NetworkAnalyzer::new(source, config)?
            .with_directory(dataset.organizations)
            .with_enrichment(enrichment);

        Ok(Session {
            analyzer,
            funders,
            years,
            include_unresolved,
            format: cli.format,
        })
    }

    async fn graph(&self) -> Result<NetworkGraph> {
        let aggregation = self.analyzer.aggregate(&self.funders, &self.years).await?;
        let (graph, summary) = self
            .analyzer
            .build_graph(&aggregation.portfolios, self.include_unresolved)
            .await?;
        if let Some(EnrichmentSummary { missing, failed, .. }) = summary {
            if missing + failed > 0 {
                eprintln!("note: {} organization(s) without profile data", missing + failed);
            }
        }
        Ok(graph)
    }

    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let session = Session::open(&cli)?;

    match cli.command {
        Commands::Bundle { min_funders } => run_bundle(&session, min_funders).await,
        Commands::Similarity {
            threshold,
            existing,
        } => run_similarity(&session, threshold, &existing).await,
        Commands::Stats => run_stats(&session).await,
        Commands::CoFunders { recipient } => run_co_funders(&session, &recipient).await,
        Commands::Shared { funder_a, funder_b } => {
            run_shared(&session, &funder_a, &funder_b).await
        }
        Commands::Paths { from, to, max_hops } => run_paths(&session, &from, &to, max_hops).await,
        Commands::Influence { top } => run_influence(&session, top).await,
        Commands::Export {
            export_format,
            out,
            with_similarity,
        } => run_export(&session, export_format, out, with_similarity).await,
    }
}

async fn run_bundle(session: &Session, min_funders: usize) -> Result<()> {
    let aggregation = session
        .analyzer
        .aggregate(&session.funders, &session.years)
        .await?;
    let bundles = bundle_recipients(
        &aggregation.portfolios,
        min_funders,
        session.include_unresolved,
    );

    if session.json() {
        println!("{}", serde_json::to_string_pretty(&bundles)?);
        return Ok(());
    }

    let mut t = table(&["Recipient", "Funders", "Total", "Funded by"]);
    for b in &bundles {
        let names: Vec<&str> = b.funders.iter().map(|f| f.funder_name.as_str()).collect();
        t.add_row(vec![
            b.recipient_name.clone(),
            b.funder_count.to_string(),
            format_amount(b.total_funding),
            names.join(", "),
        ]);
    }
    println!("{}", t);
    println!("{} recipient(s)", bundles.len());
    Ok(())
}

async fn run_similarity(
    session: &Session,
    threshold: Option<f64>,
    existing: &[String],
) -> Result<()> {
    let analyzer = &session.analyzer;
    let aggregation = analyzer.aggregate(&session.funders, &session.years).await?;
    let portfolios = &aggregation.portfolios;

    let pairs = analyzer.similarity(portfolios, threshold, session.include_unresolved)?;
    let groups = analyzer.peer_groups(portfolios, &pairs, session.include_unresolved)?;
    let existing: Vec<OrgId> = existing.iter().map(OrgId::new).collect();
    let recommendations = if existing.is_empty() {
        Vec::new()
    } else {
        analyzer.recommend(&existing, &pairs, &groups)?
    };

    if session.json() {
        let doc = serde_json::json!({
            "pairs": pairs,
            "peer_groups": groups,
            "recommendations": recommendations,
            "partial": aggregation.partial,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    let mut t = table(&["Funder A", "Funder B", "Jaccard", "Weighted", "Shared", "Co-funding"]);
    for p in &pairs {
        t.add_row(vec![
            p.funder_a.to_string(),
            p.funder_b.to_string(),
            format!("{:.3}", p.raw_score),
            format!("{:.3}", p.weighted_score),
            p.shared_count.to_string(),
            format_amount(p.co_funding_total),
        ]);
    }
    println!("{}", t);

    let mut t = table(&["Group", "Members", "Density", "Funding", "Bridges"]);
    for g in &groups {
        let members: Vec<&str> = g.members.iter().map(|m| m.as_str()).collect();
        let bridges: Vec<&str> = g.bridges.iter().map(|m| m.as_str()).collect();
        t.add_row(vec![
            g.cluster_id.to_string(),
            members.join(", "),
            format!("{:.2}", g.density),
            format_amount(g.total_funding),
            bridges.join(", "),
        ]);
    }
    println!("{}", t);

    if !recommendations.is_empty() {
        let mut t = table(&["Funder", "Score", "Confidence", "Evidence"]);
        for r in &recommendations {
            t.add_row(vec![
                r.funder_id.to_string(),
                format!("{:.3}", r.score),
                r.tier.to_string(),
                r.evidence.join("\n"),
            ]);
        }
        println!("{}", t);
    }

    if let Some(partial) = &aggregation.partial {
        eprintln!("warning: {} funder(s) could not be loaded", partial.failures.len());
    }
    Ok(())
}

async fn run_stats(session: &Session) -> Result<()> {
    let stats = session.graph().await?.statistics();

    if session.json() {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let mut t = table(&["Metric", "Value"]);
    t.add_row(vec!["Nodes".to_string(), stats.node_count.to_string()]);
    t.add_row(vec!["Funders".to_string(), stats.funder_count.to_string()]);
    t.add_row(vec!["Recipients".to_string(), stats.recipient_count.to_string()]);
    t.add_row(vec!["Edges".to_string(), stats.edge_count.to_string()]);
    t.add_row(vec!["Density".to_string(), format!("{:.4}", stats.density)]);
    t.add_row(vec!["Average degree".to_string(), format!("{:.2}", stats.average_degree)]);
    t.add_row(vec!["Components".to_string(), stats.component_count.to_string()]);
    t.add_row(vec!["Total funding".to_string(), format_amount(stats.total_funding)]);
    println!("{}", t);
    Ok(())
}

async fn run_co_funders(session: &Session, recipient: &str) -> Result<()> {
    let graph = session.graph().await?;
    let funders = graph.co_funders_of(&OrgId::new(recipient))?;

    if session.json() {
        println!("{}", serde_json::to_string_pretty(&funders)?);
        return Ok(());
    }

    let mut t = table(&["Funder", "Name", "Amount", "Years", "Grants"]);
    for f in &funders {
        let years: Vec<String> = f.years.iter().map(|y| y.to_string()).collect();
        t.add_row(vec![
            f.funder_id.to_string(),
            f.funder_name.clone(),
            format_amount(f.amount),
            years.join(", "),
            f.grant_count.to_string(),
        ]);
    }
    println!("{}", t);
    Ok(())
}

async fn run_shared(session: &Session, funder_a: &str, funder_b: &str) -> Result<()> {
    let graph = session.graph().await?;
    let shared = graph.shared_grantees(&OrgId::new(funder_a), &OrgId::new(funder_b))?;

    if session.json() {
        println!("{}", serde_json::to_string_pretty(&shared)?);
        return Ok(());
    }

    let mut t = table(&["Recipient", "Name", funder_a, funder_b]);
    for s in &shared {
        t.add_row(vec![
            s.recipient_id.to_string(),
            s.recipient_name.clone(),
            format_amount(s.amount_a),
            format_amount(s.amount_b),
        ]);
    }
    println!("{}", t);
    println!("{} shared grantee(s)", shared.len());
    Ok(())
}

async fn run_paths(session: &Session, from: &str, to: &str, max_hops: Option<usize>) -> Result<()> {
    let graph = session.graph().await?;
    let result = session.analyzer.find_paths(&graph, from, to, max_hops)?;

    if session.json() {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if result.is_empty() {
        println!("No pathway from {} to {} within the hop limit", result.source, result.target);
        return Ok(());
    }

    let mut t = table(&["#", "Path", "Hops", "Strength", "Strategy"]);
    for (i, p) in result.pathways.iter().enumerate() {
        let names: Vec<&str> = p.steps.iter().map(|s| s.name.as_str()).collect();
        t.add_row(vec![
            (i + 1).to_string(),
            names.join(" -> "),
            p.hops().to_string(),
            format_amount(p.strength),
            p.strategy.clone(),
        ]);
    }
    println!("{}", t);
    if result.truncated {
        eprintln!("warning: path enumeration stopped at the configured limit");
    }
    Ok(())
}

async fn run_influence(session: &Session, top: usize) -> Result<()> {
    let graph = session.graph().await?;
    let report = session.analyzer.influence(&graph);
    let scores = report.top(top);

    if session.json() {
        let doc = serde_json::json!({
            "scores": scores,
            "iterations": report.iterations,
            "convergence": report.convergence,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    let mut t = table(&["Rank", "Node", "Name", "PageRank", "Degree", "Closeness", "Tier"]);
    for s in scores {
        t.add_row(vec![
            s.rank.to_string(),
            s.node.to_string(),
            s.name.clone(),
            format!("{:.5}", s.pagerank),
            format!("{:.3}", s.degree_centrality),
            s.closeness.map(|c| format!("{:.3}", c)).unwrap_or_else(|| "-".to_string()),
            s.tier.to_string(),
        ]);
    }
    println!("{}", t);
    if let Some(w) = report.convergence {
        eprintln!(
            "warning: PageRank did not converge after {} iterations",
            w.iterations
        );
    }
    Ok(())
}

async fn run_export(
    session: &Session,
    format: ExportFormat,
    out: Option<PathBuf>,
    with_similarity: bool,
) -> Result<()> {
    let graph = session.graph().await?;

    let text = match format {
        ExportFormat::Graphml => {
            if with_similarity {
                bail!("--with-similarity is only supported for JSON export");
            }
            to_graphml(&graph)
        }
        ExportFormat::Json => {
            let pairs = if with_similarity {
                let aggregation = session
                    .analyzer
                    .aggregate(&session.funders, &session.years)
                    .await?;
                Some(session.analyzer.similarity(
                    &aggregation.portfolios,
                    None,
                    session.include_unresolved,
                )?)
            } else {
                None
            };
            to_node_link(&graph, pairs.as_deref()).to_json()?
        }
    };

    match out {
        Some(path) => {
            std::fs::write(&path, text).with_context(|| format!("writing {:?}", path))?;
            eprintln!(
                "Wrote {} node(s), {} edge(s) to {:?}",
                graph.node_count(),
                graph.edge_count(),
                path
            );
        }
        None => println!("{}", text),
    }
    Ok(())
}
