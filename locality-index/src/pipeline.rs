//! Parallel covering pipeline.
//!
//! The calling thread decodes the feature stream and sends chunks through a
//! bounded channel. `N` scoped workers share the receiver; each owns its
//! normalizer and covering accumulator and hands both back through its join
//! handle. After join the per-worker coverings are concatenated and passed
//! to the index builder exactly once.

use crate::covering::{covering_cell_count, LocalitiesCovering};
use crate::error::{LocalityError, Result};
use crate::feature::{FeatureReader, RawFeature};
use crate::filter::FeatureFilter;
use crate::index_builder::{IndexSummary, LocalityIndexBuilder};
use crate::normalizer::LocalityObjectBuilder;
use parking_lot::Mutex;
use serde::Serialize;
use std::path::Path;
use std::sync::mpsc::{Receiver, SyncSender};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

type SharedReceiver = Arc<Mutex<Receiver<Vec<RawFeature>>>>;

/// Knobs for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Worker count; `0` is treated as `1`.
    pub threads: usize,
    /// Features per channel message; `0` is treated as `1`.
    pub chunk_features: usize,
    /// Per-area triangle cap handed to each normalizer.
    pub max_triangles: Option<usize>,
}

impl PipelineOptions {
    pub fn new(threads: usize, chunk_features: usize) -> Self {
        Self {
            threads,
            chunk_features,
            max_triangles: None,
        }
    }
}

/// Per-worker feature accounting.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkerStats {
    pub features: u64,
    pub rejected: u64,
    pub dropped: u64,
    pub covered: u64,
}

impl WorkerStats {
    pub fn merge(&mut self, other: &WorkerStats) {
        self.features += other.features;
        self.rejected += other.rejected;
        self.dropped += other.dropped;
        self.covered += other.covered;
    }
}

/// Result of a full pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineSummary {
    pub workers: usize,
    pub stats: WorkerStats,
    pub index: IndexSummary,
}

fn run_worker<F, B>(
    rx: SharedReceiver,
    filter: &F,
    builder: &B,
    max_triangles: Option<usize>,
) -> (LocalitiesCovering, WorkerStats)
where
    F: FeatureFilter + ?Sized,
    B: LocalityIndexBuilder + ?Sized,
{
    let mut normalizer = LocalityObjectBuilder::new(max_triangles);
    let mut covering = LocalitiesCovering::new();
    let mut stats = WorkerStats::default();

    loop {
        let next = rx.lock().recv();
        let Ok(chunk) = next else {
            break;
        };
        for feature in &chunk {
            stats.features += 1;
            if !filter.accept(feature) {
                stats.rejected += 1;
                continue;
            }
            match normalizer.build(feature) {
                Some(object) => {
                    builder.cover(&object, &mut covering);
                    stats.covered += 1;
                }
                None => stats.dropped += 1,
            }
        }
    }
    (covering, stats)
}

/// Decode `path` and send it in chunks. Stops early if every worker is gone.
fn dispatch(path: &Path, chunk_features: usize, tx: SyncSender<Vec<RawFeature>>) -> Result<u64> {
    let mut reader = FeatureReader::open(path)?;
    let mut chunk = Vec::with_capacity(chunk_features);
    let mut read = 0u64;

    while let Some(feature) = reader.next_feature()? {
        chunk.push(feature);
        read += 1;
        if chunk.len() >= chunk_features {
            let full = std::mem::replace(&mut chunk, Vec::with_capacity(chunk_features));
            if tx.send(full).is_err() {
                return Ok(read);
            }
        }
    }
    if !chunk.is_empty() {
        let _ = tx.send(chunk);
    }
    Ok(read)
}

/// Concatenate worker coverings, last worker first.
pub fn merge_coverings(mut parts: Vec<LocalitiesCovering>) -> LocalitiesCovering {
    let total = parts.iter().map(Vec::len).sum();
    let mut merged = LocalitiesCovering::with_capacity(total);
    while let Some(part) = parts.pop() {
        merged.extend(part);
    }
    merged
}

/// Run filter → normalizer → cover over a feature stream on a worker pool.
pub fn cover_features<F, B>(
    features_file: &Path,
    filter: &F,
    builder: &B,
    options: &PipelineOptions,
) -> Result<(LocalitiesCovering, WorkerStats)>
where
    F: FeatureFilter + ?Sized,
    B: LocalityIndexBuilder + ?Sized,
{
    let workers = options.threads.max(1);
    let chunk_features = options.chunk_features.max(1);
    let max_triangles = options.max_triangles;
    let start = Instant::now();

    info!(
        path = %features_file.display(),
        workers,
        chunk_features,
        "Covering features"
    );

    let (tx, rx) = std::sync::mpsc::sync_channel::<Vec<RawFeature>>(2 * workers);
    let rx: SharedReceiver = Arc::new(Mutex::new(rx));

    let (parts, stats, read) = std::thread::scope(|scope| -> Result<_> {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let rx = Arc::clone(&rx);
                scope.spawn(move || run_worker(rx, filter, builder, max_triangles))
            })
            .collect();
        drop(rx);

        let read = dispatch(features_file, chunk_features, tx);

        let mut parts = Vec::with_capacity(workers);
        let mut stats = WorkerStats::default();
        let mut panicked = None;
        for (worker, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok((covering, worker_stats)) => {
                    stats.merge(&worker_stats);
                    parts.push(covering);
                }
                Err(_) => {
                    error!(worker, "Covering worker panicked");
                    panicked.get_or_insert(worker);
                }
            }
        }
        if let Some(worker) = panicked {
            return Err(LocalityError::WorkerPanicked { worker });
        }
        Ok((parts, stats, read?))
    })?;

    info!(
        features = read,
        rejected = stats.rejected,
        dropped = stats.dropped,
        covered = stats.covered,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Covering finished"
    );

    info!(parts = parts.len(), "Merging coverings");
    let merged = merge_coverings(parts);
    info!(
        objects = merged.len(),
        cells = covering_cell_count(&merged),
        "Coverings merged"
    );
    Ok((merged, stats))
}

/// Cover every accepted feature of `features_file` and build the index at
/// `out_path`.
pub fn generate_locality_index<F, B>(
    out_path: &Path,
    features_file: &Path,
    filter: &F,
    builder: &B,
    options: &PipelineOptions,
) -> Result<PipelineSummary>
where
    F: FeatureFilter + ?Sized,
    B: LocalityIndexBuilder + ?Sized,
{
    let _span = tracing::info_span!("generate_locality_index", out = %out_path.display()).entered();
    let (covering, stats) = cover_features(features_file, filter, builder, options)?;
    let index = builder.build_covering_index(covering, out_path)?;
    Ok(PipelineSummary {
        workers: options.threads.max(1),
        stats,
        index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::covering::CoveringEntry;
    use crate::feature::{write_features, FeatureTags};
    use crate::filter::RegionsFilter;
    use crate::index_builder::RegionsLocalityIndexBuilder;
    use crate::locality_object::LocalityObject;
    use geo_types::coord;

    struct PanickingBuilder;

    impl LocalityIndexBuilder for PanickingBuilder {
        fn cover(&self, object: &LocalityObject, _covering: &mut LocalitiesCovering) {
            panic!("cannot cover {}", object.id());
        }

        fn build_covering_index(
            &self,
            _covering: LocalitiesCovering,
            _out_path: &Path,
        ) -> Result<IndexSummary> {
            unreachable!("build after panic")
        }
    }

    fn squares(n: u64) -> Vec<RawFeature> {
        (0..n)
            .map(|i| {
                let x = i as f64;
                RawFeature::area(
                    i + 1,
                    vec![vec![
                        coord! { x: x, y: 0.0 },
                        coord! { x: x + 0.5, y: 0.0 },
                        coord! { x: x + 0.5, y: 0.5 },
                        coord! { x: x, y: 0.5 },
                        coord! { x: x, y: 0.0 },
                    ]],
                    FeatureTags::default(),
                )
            })
            .collect()
    }

    #[test]
    fn test_merge_order_last_worker_first() {
        let entry = |id| CoveringEntry {
            object_id: id,
            cells: vec![id],
        };
        let merged = merge_coverings(vec![vec![entry(1), entry(2)], vec![entry(3)], vec![]]);
        let ids: Vec<u64> = merged.iter().map(|e| e.object_id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_cover_features_counts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.dat");
        let mut features = squares(5);
        features.push(RawFeature::point(
            100,
            coord! { x: 1.0, y: 1.0 },
            FeatureTags::default(),
        ));
        write_features(&path, &features).unwrap();

        let (covering, stats) = cover_features(
            &path,
            &RegionsFilter,
            &RegionsLocalityIndexBuilder::default(),
            &PipelineOptions::new(3, 2),
        )
        .unwrap();
        assert_eq!(stats.features, 6);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.covered, 5);
        assert_eq!(covering.len(), 5);
    }

    #[test]
    fn test_zero_workers_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let features = dir.path().join("features.dat");
        write_features(&features, &squares(2)).unwrap();
        let out = dir.path().join("out.idx");

        let summary = generate_locality_index(
            &out,
            &features,
            &RegionsFilter,
            &RegionsLocalityIndexBuilder::default(),
            &PipelineOptions::new(0, 0),
        )
        .unwrap();
        assert_eq!(summary.workers, 1);
        assert_eq!(summary.index.objects, 2);
    }

    #[test]
    fn test_worker_panic_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let features = dir.path().join("features.dat");
        write_features(&features, &squares(20)).unwrap();

        let err = generate_locality_index(
            &dir.path().join("out.idx"),
            &features,
            &RegionsFilter,
            &PanickingBuilder,
            &PipelineOptions::new(2, 1),
        )
        .unwrap_err();
        assert!(matches!(err, LocalityError::WorkerPanicked { .. }));
    }

    #[test]
    fn test_missing_features_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = cover_features(
            &dir.path().join("missing.dat"),
            &RegionsFilter,
            &RegionsLocalityIndexBuilder::default(),
            &PipelineOptions::new(2, 1),
        )
        .unwrap_err();
        assert!(matches!(err, LocalityError::Io(_)));
    }
}
