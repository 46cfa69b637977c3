use super::classify::{Classifier, SplitConfig};
use super::errors::Result;
use super::myio;
use super::record::RecordSink;
use super::router::SizeBucketRouter;
use super::stats::SplitStats;
use rust_htslib::bam::{self, Read, Record};
use std::path::Path;

/// Where a scan stands relative to reference sequence boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Reading alignments of this reference sequence.
    Scanning(i32),
    /// Discarding left mates that never met their right mate.
    FlushingOrphans,
    Done,
}

/// Drive every record through the classifier, flushing buffered left mates
/// whenever the reference sequence changes and once more at the end.
///
/// Records must already be position sorted within each reference sequence.
pub fn scan<I, S, F>(records: I, classifier: &mut Classifier<S, F>) -> Result<ScanState>
where
    I: IntoIterator<Item = std::result::Result<Record, rust_htslib::errors::Error>>,
    S: RecordSink,
    F: RecordSink,
{
    // nothing is buffered before the first read
    let mut state = ScanState::FlushingOrphans;
    for (idx, rec) in records.into_iter().enumerate() {
        let rec = rec?;
        if let ScanState::Scanning(tid) = state {
            if tid != rec.tid() {
                state = ScanState::FlushingOrphans;
                let orphans = classifier.end_reference();
                log::debug!("Finished tid {} with {} orphaned left mates", tid, orphans);
            }
        }
        if state == ScanState::FlushingOrphans {
            state = ScanState::Scanning(rec.tid());
        }
        classifier.process(rec)?;
        if (idx + 1) % 1_000_000 == 0 {
            log::debug!(
                "Processed {} reads, {} left mates buffered",
                idx + 1,
                classifier.buffered()
            );
        }
    }
    classifier.end_reference();
    Ok(ScanState::Done)
}

/// Default output basename: the input path without its alignment extension.
/// # Example
/// ```
/// use fragsplit::split::default_basename;
/// assert_eq!(default_basename("data/sample.bam"), "data/sample");
/// assert_eq!(default_basename("sample.sorted.cram"), "sample.sorted");
/// assert_eq!(default_basename("-"), "split");
/// ```
pub fn default_basename(input: &str) -> String {
    if input == "-" {
        return "split".to_string();
    }
    let path = Path::new(input);
    match path.extension().and_then(|e| e.to_str()) {
        Some("bam") | Some("sam") | Some("cram") => {
            path.with_extension("").to_string_lossy().to_string()
        }
        _ => input.to_string(),
    }
}

/// Everything needed for one split run.
#[derive(Debug, Clone)]
pub struct SplitOpts {
    pub input: String,
    pub basename: String,
    pub fail: Option<String>,
    pub threads: usize,
    pub config: SplitConfig,
}

/// Split one alignment file into one BAM per size range.
///
/// The outputs keep the input order and need re-sorting and indexing
/// before use with region queries.
pub fn run_split(opts: &SplitOpts) -> Result<SplitStats> {
    let mut reader = myio::bam_reader(&opts.input, opts.threads)?;
    let header = myio::header_with_pg(reader.header(), "fragsplit-split");

    let mut buckets = Vec::with_capacity(opts.config.ranges.len());
    for range in &opts.config.ranges {
        let path = range.output_path(&opts.basename, "bam");
        log::info!("Writing {} fragments to {}", range, path);
        buckets.push((*range, myio::bam_writer(&path, &header, opts.threads)?));
    }
    let fail = match &opts.fail {
        Some(path) => {
            log::info!("Writing rejected reads to {}", path);
            Some(myio::bam_writer(path, &header, opts.threads)?)
        }
        None => None,
    };
    if opts.config.quick {
        log::warn!("Quick mode judges each read alone; outputs may hold one mate of a pair.");
    }

    let mut classifier: Classifier<bam::Writer, bam::Writer> =
        Classifier::new(opts.config.clone(), SizeBucketRouter::new(buckets), fail);
    scan(reader.records(), &mut classifier)?;
    let (stats, _router, _fail) = classifier.finish();
    log::info!(
        "{} reads seen, {} pairs written across {} size ranges",
        stats.reads_seen,
        stats.pairs_written(),
        stats.buckets.len()
    );
    Ok(stats)
}
