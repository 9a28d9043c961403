//! Read-through cache of aggregation results
//!
//! Entries are keyed by the normalized funder set and year range. Staleness is
//! tolerated: nothing expires, callers invalidate explicitly. Graphs are built
//! lazily from the cached portfolios and kept alongside them in memory only.
//!
//! Snapshots persist portfolios and timestamps as gzip-compressed bincode.

use crate::aggregate::AggregationReport;
use crate::error::{NetworkError, NetworkResult};
use crate::graph::{FiscalYear, GraphBuilder, NetworkGraph, OrgId};
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

const SNAPSHOT_VERSION: u32 = 1;

/// Normalized cache key: sorted, de-duplicated funders and years
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub funders: Vec<OrgId>,
    pub years: Vec<FiscalYear>,
}

impl CacheKey {
    pub fn new(funders: &[OrgId], years: &[FiscalYear]) -> Self {
        let mut funders = funders.to_vec();
        funders.sort();
        funders.dedup();
        let mut years = years.to_vec();
        years.sort_unstable();
        years.dedup();
        CacheKey { funders, years }
    }
}

#[derive(Debug, Clone)]
struct CachedGraph {
    include_unresolved: bool,
    graph: Arc<NetworkGraph>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub computed_at: DateTime<Utc>,
    pub report: AggregationReport,
    #[serde(skip)]
    graph: Option<CachedGraph>,
}

impl CacheEntry {
    fn new(report: AggregationReport) -> Self {
        CacheEntry {
            computed_at: Utc::now(),
            report,
            graph: None,
        }
    }

    pub fn has_graph(&self) -> bool {
        self.graph.is_some()
    }
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    saved_at: DateTime<Utc>,
    entries: Vec<(CacheKey, CacheEntry)>,
}

/// In-memory analysis cache, shareable across tasks
#[derive(Debug, Default)]
pub struct AnalysisCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let entries = self.entries.read().await;
        let hit = entries.get(key).cloned();
        debug!(
            "Cache {} for {} funder(s)",
            if hit.is_some() { "hit" } else { "miss" },
            key.funders.len()
        );
        hit
    }

    /// Store an aggregation result, replacing any previous entry and its graph
    pub async fn put(&self, key: CacheKey, report: AggregationReport) -> DateTime<Utc> {
        let entry = CacheEntry::new(report);
        let computed_at = entry.computed_at;
        self.entries.write().await.insert(key, entry);
        computed_at
    }

    /// Graph for a cached entry, built on first request.
    ///
    /// Returns `None` when the key is not cached. A graph built with a
    /// different unresolved-recipient policy is rebuilt.
    pub async fn graph_for(
        &self,
        key: &CacheKey,
        builder: &GraphBuilder,
    ) -> NetworkResult<Option<Arc<NetworkGraph>>> {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(key) else {
            return Ok(None);
        };

        if let Some(cached) = &entry.graph {
            if cached.include_unresolved == builder.includes_unresolved() {
                return Ok(Some(Arc::clone(&cached.graph)));
            }
        }

        let graph = Arc::new(builder.build(&entry.report.portfolios)?);
        debug!(
            "Built cached graph: {} node(s), {} edge(s)",
            graph.node_count(),
            graph.edge_count()
        );
        entry.graph = Some(CachedGraph {
            include_unresolved: builder.includes_unresolved(),
            graph: Arc::clone(&graph),
        });
        Ok(Some(graph))
    }

    /// Drop one entry. Returns whether it existed.
    pub async fn invalidate(&self, key: &CacheKey) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Write every entry to `path`. Returns the number of entries written.
    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> NetworkResult<usize> {
        let path = path.as_ref();
        let entries: Vec<(CacheKey, CacheEntry)> = self
            .entries
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let count = entries.len();

        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            entries,
        };

        let file = File::create(path)?;
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        bincode::serialize_into(&mut encoder, &snapshot)?;
        encoder.finish()?.flush()?;

        info!("Saved {} cache entries to {:?}", count, path);
        Ok(count)
    }

    /// Read a snapshot written by [`save_snapshot`](Self::save_snapshot)
    pub fn load_snapshot(path: impl AsRef<Path>) -> NetworkResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let decoder = GzDecoder::new(BufReader::new(file));
        let snapshot: Snapshot = bincode::deserialize_from(decoder)?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(NetworkError::Config(format!(
                "unsupported cache snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }

        info!(
            "Loaded {} cache entries from {:?} (saved {})",
            snapshot.entries.len(),
            path,
            snapshot.saved_at
        );
        Ok(AnalysisCache {
            entries: RwLock::new(snapshot.entries.into_iter().collect()),
        })
    }
}
