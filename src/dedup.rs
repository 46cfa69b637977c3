use super::errors::{FragError, Result};
use super::myio;
use super::record::{FragmentExt, RecordSink};
use super::stats::percent;
use num_format::{Locale, ToFormattedString};
use rust_htslib::bam::ext::BamRecordExtensions;
use rust_htslib::bam::{self, Read, Record};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// 5' position, strand and fragment length of a read.
type DupKey = (i64, bool, i64);

/// Reference coordinate of the 5' end: the leftmost aligned base for
/// forward reads, the last aligned base for reversed ones.
pub fn five_prime_pos(rec: &Record) -> i64 {
    if rec.is_reverse() {
        rec.reference_end() - 1
    } else {
        rec.pos()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupConfig {
    /// Reads kept per 5' position, strand and fragment length.
    pub max_dups: usize,
    pub min_quality: u8,
}

impl DedupConfig {
    pub fn new(max_dups: usize, min_quality: u8) -> Result<DedupConfig> {
        if max_dups == 0 {
            return Err(FragError::InvalidParameter {
                parameter: "max".to_string(),
                reason: "must be >= 1".to_string(),
            });
        }
        Ok(DedupConfig {
            max_dups,
            min_quality,
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DedupStats {
    pub reads_seen: u64,
    pub kept: u64,
    pub low_quality: u64,
    pub excess_dropped: u64,
    pub mates_dropped: u64,
    pub orphans: u64,
}

impl fmt::Display for DedupStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let rows = [
            ("reads seen", self.reads_seen),
            ("kept", self.kept),
            ("passed through below quality", self.low_quality),
            ("excess duplicates dropped", self.excess_dropped),
            ("mates of dropped reads", self.mates_dropped),
            ("dropped reads without a mate", self.orphans),
        ];
        writeln!(f, "Duplicate summary")?;
        for (label, n) in rows {
            writeln!(
                f,
                "  {:<34}{:>14} ({:>6.2}%)",
                label,
                n.to_formatted_string(&Locale::en),
                percent(n, self.reads_seen)
            )?;
        }
        Ok(())
    }
}

/// Counts of every key whose 5' end can still be hit by upcoming reads.
///
/// Reads arrive sorted by leftmost position, so a key is dead once the
/// scan has moved past its 5' position.
#[derive(Debug, Default)]
pub struct PositionQueue {
    at: Option<(i32, i64)>,
    counts: HashMap<DupKey, usize>,
}

impl PositionQueue {
    /// Count a read starting at `(tid, pos)` and say whether its key is
    /// still within `max`.
    pub fn admit(&mut self, tid: i32, pos: i64, key: DupKey, max: usize) -> bool {
        match self.at {
            Some((at_tid, at_pos)) if at_tid == tid && at_pos == pos => {}
            Some((at_tid, _)) if at_tid == tid => {
                self.at = Some((tid, pos));
                self.counts.retain(|(five, _, _), _| *five >= pos);
            }
            _ => {
                self.at = Some((tid, pos));
                self.counts.clear();
            }
        }
        let seen = self.counts.entry(key).or_insert(0);
        *seen += 1;
        *seen <= max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupOutcome {
    Kept,
    LowQuality,
    Excess,
    MateDropped,
}

/// Caps the number of reads sharing a 5' position, strand and
/// fragment length; mates of dropped reads follow them out.
pub struct Deduper<K, F> {
    config: DedupConfig,
    queue: PositionQueue,
    dropped: HashSet<Vec<u8>>,
    keep: K,
    fail: Option<F>,
    stats: DedupStats,
}

impl<K: RecordSink, F: RecordSink> Deduper<K, F> {
    pub fn new(config: DedupConfig, keep: K, fail: Option<F>) -> Deduper<K, F> {
        Deduper {
            config,
            queue: PositionQueue::default(),
            dropped: HashSet::new(),
            keep,
            fail,
            stats: DedupStats::default(),
        }
    }

    pub fn stats(&self) -> &DedupStats {
        &self.stats
    }

    pub fn process(&mut self, rec: Record) -> Result<DedupOutcome> {
        self.stats.reads_seen += 1;
        if rec.is_unmapped() || rec.mapq() < self.config.min_quality {
            self.stats.low_quality += 1;
            self.keep.write_record(&rec)?;
            return Ok(DedupOutcome::LowQuality);
        }
        let follows_mate = rec.is_paired() && rec.is_proper_pair() && rec.is_reverse();
        if follows_mate {
            return if self.dropped.remove(rec.qname()) {
                self.stats.mates_dropped += 1;
                self.write_fail(&rec)?;
                Ok(DedupOutcome::MateDropped)
            } else {
                self.stats.kept += 1;
                self.keep.write_record(&rec)?;
                Ok(DedupOutcome::Kept)
            };
        }

        let frag_len = if rec.is_paired() && rec.is_proper_pair() {
            rec.fragment_len()
        } else {
            0
        };
        let key = (five_prime_pos(&rec), rec.is_reverse(), frag_len);
        if self
            .queue
            .admit(rec.tid(), rec.pos(), key, self.config.max_dups)
        {
            self.stats.kept += 1;
            self.keep.write_record(&rec)?;
            Ok(DedupOutcome::Kept)
        } else {
            self.stats.excess_dropped += 1;
            if frag_len > 0 {
                self.dropped.insert(rec.qname().to_vec());
            }
            self.write_fail(&rec)?;
            Ok(DedupOutcome::Excess)
        }
    }

    /// Forget dropped reads whose mate never showed up on this reference.
    pub fn end_reference(&mut self) -> u64 {
        let orphans = self.dropped.len() as u64;
        self.stats.orphans += orphans;
        self.dropped.clear();
        orphans
    }

    pub fn finish(mut self) -> (DedupStats, K, Option<F>) {
        self.end_reference();
        (self.stats, self.keep, self.fail)
    }

    fn write_fail(&mut self, rec: &Record) -> Result<()> {
        if let Some(sink) = self.fail.as_mut() {
            sink.write_record(rec)?;
        }
        Ok(())
    }
}

/// Stream position sorted records through the deduper.
pub fn dedup_records<I, K, F>(records: I, deduper: &mut Deduper<K, F>) -> Result<()>
where
    I: IntoIterator<Item = std::result::Result<Record, rust_htslib::errors::Error>>,
    K: RecordSink,
    F: RecordSink,
{
    let mut current: Option<i32> = None;
    for rec in records {
        let rec = rec?;
        if current.map_or(false, |tid| tid != rec.tid()) {
            deduper.end_reference();
        }
        current = Some(rec.tid());
        deduper.process(rec)?;
    }
    deduper.end_reference();
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DedupOpts {
    pub input: String,
    pub output: String,
    pub fail: Option<String>,
    pub threads: usize,
    pub config: DedupConfig,
}

pub fn run_dedup(opts: &DedupOpts) -> Result<DedupStats> {
    let mut reader = myio::bam_reader(&opts.input, opts.threads)?;
    let header = myio::header_with_pg(reader.header(), "fragsplit-dedup");
    let keep = myio::bam_writer(&opts.output, &header, opts.threads)?;
    let fail = match &opts.fail {
        Some(path) => Some(myio::bam_writer(path, &header, opts.threads)?),
        None => None,
    };
    let mut deduper: Deduper<bam::Writer, bam::Writer> = Deduper::new(opts.config, keep, fail);
    dedup_records(reader.records(), &mut deduper)?;
    let (stats, _keep, _fail) = deduper.finish();
    log::info!(
        "Kept {} of {} reads, dropped {} excess duplicates",
        stats.kept,
        stats.reads_seen,
        stats.excess_dropped
    );
    Ok(stats)
}
