use super::errors::{FragError, Result};
use super::pair_buffer::PairBuffer;
use super::record::{FragmentExt, RecordSink};
use super::router::SizeBucketRouter;
use super::size_range::{overall_bounds, SizeRange};
use super::stats::SplitStats;
use rust_htslib::bam::Record;

/// Settings for classifying reads into size buckets.
#[derive(Debug, Clone)]
pub struct SplitConfig {
    pub ranges: Vec<SizeRange>,
    pub min_quality: u8,
    pub at_end: bool,
    pub quick: bool,
    lowest: i64,
    highest: i64,
}

impl SplitConfig {
    pub fn new(
        ranges: Vec<SizeRange>,
        min_quality: u8,
        at_end: bool,
        quick: bool,
    ) -> Result<SplitConfig> {
        let (lowest, highest) =
            overall_bounds(&ranges).ok_or_else(|| FragError::InvalidParameter {
                parameter: "size".to_string(),
                reason: "at least one size range is required".to_string(),
            })?;
        Ok(SplitConfig {
            ranges,
            min_quality,
            at_end,
            quick,
            lowest,
            highest,
        })
    }

    /// Smallest `min` over all ranges.
    pub fn lowest(&self) -> i64 {
        self.lowest
    }

    /// Largest `max` over all ranges.
    pub fn highest(&self) -> i64 {
        self.highest
    }

    fn in_bounds(&self, len: i64) -> bool {
        self.lowest <= len && len <= self.highest
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImproperKind {
    MateUnmapped,
    DiffReference,
    SameStrand,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reject {
    Unmapped,
    /// secondary or supplementary alignment
    NotPrimary,
    Quality,
    NonPaired,
    Improper(ImproperKind),
    Malformed,
    TooSmall,
    TooBig,
    AtEnd,
    MissingLeftMate,
}

/// What happened to a single incoming read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Left mate held until its right mate arrives.
    Buffered,
    /// Written to this many size buckets.
    Accepted(usize),
    /// Written to the failed stream.
    Rejected(Reject),
    /// Dropped without a trace in any output.
    Ignored,
}

/// Checks that do not depend on the mate: mapping, primary alignment,
/// quality and pairing flags.
pub fn screen(rec: &Record, min_quality: u8) -> Option<Reject> {
    if rec.is_unmapped() {
        Some(Reject::Unmapped)
    } else if rec.is_secondary() || rec.is_supplementary() {
        Some(Reject::NotPrimary)
    } else if rec.mapq() < min_quality {
        Some(Reject::Quality)
    } else if !rec.is_paired() {
        Some(Reject::NonPaired)
    } else if !rec.is_proper_pair() {
        Some(Reject::Improper(improper_kind(rec)))
    } else if rec.has_inconsistent_mate() {
        Some(Reject::Malformed)
    } else {
        None
    }
}

/// Why a pair is improper.
pub fn improper_kind(rec: &Record) -> ImproperKind {
    if rec.is_mate_unmapped() {
        ImproperKind::MateUnmapped
    } else if rec.tid() != rec.mtid() {
        ImproperKind::DiffReference
    } else if rec.is_reverse() == rec.is_mate_reverse() {
        ImproperKind::SameStrand
    } else {
        ImproperKind::Other
    }
}

/// Both mates of an improper pair reach this branch; only one of them
/// may add to the pair tallies.
fn counts_improper_pair(rec: &Record, kind: ImproperKind) -> bool {
    match kind {
        ImproperKind::MateUnmapped => true,
        ImproperKind::DiffReference => rec.tid() < rec.mtid(),
        ImproperKind::SameStrand | ImproperKind::Other => rec.pos() < rec.mpos(),
    }
}

/// Streams reads through the size classification, owning the pair buffer,
/// the bucket router and all tallies for one input.
pub struct Classifier<S, F> {
    config: SplitConfig,
    buffer: PairBuffer,
    router: SizeBucketRouter<S>,
    fail: Option<F>,
    stats: SplitStats,
}

impl<S: RecordSink, F: RecordSink> Classifier<S, F> {
    pub fn new(
        config: SplitConfig,
        router: SizeBucketRouter<S>,
        fail: Option<F>,
    ) -> Classifier<S, F> {
        Classifier {
            config,
            buffer: PairBuffer::new(),
            router,
            fail,
            stats: SplitStats::default(),
        }
    }

    pub fn stats(&self) -> &SplitStats {
        &self.stats
    }

    /// Reference sequence currently being buffered, if any.
    pub fn buffered_tid(&self) -> Option<i32> {
        self.buffer.tid()
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Classify one read and act on the decision.
    pub fn process(&mut self, rec: Record) -> Result<Outcome> {
        self.stats.reads_seen += 1;
        if let Some(reject) = screen(&rec, self.config.min_quality) {
            self.tally_screen(&rec, reject);
            self.write_fail(&rec)?;
            return Ok(Outcome::Rejected(reject));
        }
        self.stats.proper_reads += 1;
        if self.config.quick {
            self.process_quick(rec)
        } else if rec.is_reverse() {
            self.process_right(rec)
        } else {
            self.process_left(rec)
        }
    }

    /// Discard left mates still waiting at the end of a reference sequence.
    pub fn end_reference(&mut self) -> u64 {
        let orphans = self.buffer.flush();
        self.stats.missing_right_mate += orphans;
        orphans
    }

    /// Flush the last reference sequence and hand back tallies, buckets and the failed sink.
    pub fn finish(mut self) -> (SplitStats, SizeBucketRouter<S>, Option<F>) {
        self.end_reference();
        self.stats.buckets = self.router.counts();
        (self.stats, self.router, self.fail)
    }

    fn write_fail(&mut self, rec: &Record) -> Result<()> {
        if let Some(sink) = self.fail.as_mut() {
            sink.write_record(rec)?;
        }
        Ok(())
    }

    fn tally_screen(&mut self, rec: &Record, reject: Reject) {
        let stats = &mut self.stats;
        match reject {
            Reject::Unmapped => stats.unmapped += 1,
            Reject::NotPrimary => stats.not_primary += 1,
            Reject::Quality => stats.quality_failed += 1,
            Reject::NonPaired => stats.non_paired += 1,
            Reject::Malformed => stats.malformed += 1,
            Reject::Improper(kind) => {
                stats.improper_reads += 1;
                if counts_improper_pair(rec, kind) {
                    stats.improper_pairs += 1;
                    match kind {
                        ImproperKind::MateUnmapped => stats.mate_unmapped += 1,
                        ImproperKind::DiffReference => stats.diff_reference += 1,
                        ImproperKind::SameStrand => stats.same_strand += 1,
                        ImproperKind::Other => stats.improper_other += 1,
                    }
                }
            }
            _ => {}
        }
    }

    /// Size check shared by left mates and quick mode reads.
    fn size_reject(&self, len: i64) -> Option<Reject> {
        if len < self.config.lowest {
            Some(Reject::TooSmall)
        } else if len > self.config.highest {
            Some(Reject::TooBig)
        } else {
            None
        }
    }

    fn process_left(&mut self, rec: Record) -> Result<Outcome> {
        self.stats.pairs_seen += 1;
        match self.size_reject(rec.fragment_len()) {
            Some(Reject::TooSmall) => {
                self.stats.too_small += 1;
                self.write_fail(&rec)?;
                Ok(Outcome::Rejected(Reject::TooSmall))
            }
            Some(reject) => {
                self.stats.too_big += 1;
                self.write_fail(&rec)?;
                Ok(Outcome::Rejected(reject))
            }
            None => {
                self.stats.acceptable += 1;
                if let Some(old) = self.buffer.insert(rec) {
                    log::debug!(
                        "Replacing buffered left mate {} at {}",
                        String::from_utf8_lossy(old.qname()),
                        old.pos()
                    );
                    self.stats.missing_right_mate += 1;
                }
                Ok(Outcome::Buffered)
            }
        }
    }

    fn process_right(&mut self, rec: Record) -> Result<Outcome> {
        match self.buffer.take(rec.qname()) {
            Some(left) => {
                if self.config.at_end && !(left.is_at_end() && rec.is_at_end()) {
                    self.stats.at_end_failed += 1;
                    self.write_fail(&left)?;
                    self.write_fail(&rec)?;
                    return Ok(Outcome::Rejected(Reject::AtEnd));
                }
                match self.router.route_pair(&left, &rec)? {
                    0 => Ok(Outcome::Ignored),
                    hits => Ok(Outcome::Accepted(hits)),
                }
            }
            None if self.config.in_bounds(rec.fragment_len()) => {
                log::trace!(
                    "Right mate {} at {} has no buffered left mate",
                    String::from_utf8_lossy(rec.qname()),
                    rec.pos()
                );
                self.stats.missing_left_mate += 1;
                self.write_fail(&rec)?;
                Ok(Outcome::Rejected(Reject::MissingLeftMate))
            }
            // its left mate was already rejected on size
            None => Ok(Outcome::Ignored),
        }
    }

    /// Each read is judged alone, so one mate can pass while the other fails.
    fn process_quick(&mut self, rec: Record) -> Result<Outcome> {
        let forward = !rec.is_reverse();
        if forward {
            self.stats.pairs_seen += 1;
        }
        if let Some(reject) = self.size_reject(rec.fragment_len()) {
            if forward {
                match reject {
                    Reject::TooSmall => self.stats.too_small += 1,
                    _ => self.stats.too_big += 1,
                }
            }
            self.write_fail(&rec)?;
            return Ok(Outcome::Rejected(reject));
        }
        if forward {
            self.stats.acceptable += 1;
        }
        if self.config.at_end && !rec.is_at_end() {
            self.stats.at_end_failed += 1;
            self.write_fail(&rec)?;
            return Ok(Outcome::Rejected(Reject::AtEnd));
        }
        match self.router.route_read(&rec)? {
            0 => Ok(Outcome::Ignored),
            hits => Ok(Outcome::Accepted(hits)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::test_utils::*;

    type TestClassifier = Classifier<Vec<Record>, Vec<Record>>;

    fn classifier(ranges: &[(i64, i64)], at_end: bool, quick: bool) -> TestClassifier {
        let ranges: Vec<SizeRange> = ranges
            .iter()
            .map(|(min, max)| SizeRange::new(*min, *max).unwrap())
            .collect();
        let router = SizeBucketRouter::new(ranges.iter().map(|r| (*r, Vec::new())).collect());
        let config = SplitConfig::new(ranges, 20, at_end, quick).unwrap();
        Classifier::new(config, router, Some(Vec::new()))
    }

    const SEQ: &[u8] = b"ACGTACGTAC";

    #[test]
    fn test_config_requires_ranges() {
        assert!(SplitConfig::new(vec![], 0, false, false).is_err());
        let cfg = SplitConfig::new(
            vec![SizeRange::new(150, 300).unwrap(), SizeRange::new(100, 200).unwrap()],
            0,
            false,
            false,
        )
        .unwrap();
        assert_eq!((cfg.lowest(), cfg.highest()), (100, 300));
    }

    #[test]
    fn test_pair_is_buffered_then_accepted() {
        let mut c = classifier(&[(100, 200)], false, false);
        let (left, right) = make_pair("frag", 1000, 150, SEQ, SEQ);
        assert_eq!(c.process(left).unwrap(), Outcome::Buffered);
        assert_eq!(c.buffered(), 1);
        assert_eq!(c.process(right).unwrap(), Outcome::Accepted(1));
        assert_eq!(c.buffered(), 0);
        let (stats, router, fail) = c.finish();
        assert_eq!(stats.pairs_seen, 1);
        assert_eq!(stats.acceptable, 1);
        assert_eq!(stats.buckets[0].1, 1);
        assert_eq!(router.into_buckets()[0].sink.len(), 2);
        assert!(fail.unwrap().is_empty());
    }

    #[test]
    fn test_low_quality_rejected_first() {
        let mut c = classifier(&[(100, 200)], false, false);
        let (mut left, _) = make_pair("frag", 1000, 150, SEQ, SEQ);
        left.set_mapq(5);
        assert_eq!(c.process(left).unwrap(), Outcome::Rejected(Reject::Quality));
        assert_eq!(c.stats().quality_failed, 1);
        assert_eq!(c.stats().pairs_seen, 0);
    }

    #[test]
    fn test_unpaired_and_unmapped() {
        let mut c = classifier(&[(100, 200)], false, false);
        let single = make_rec("single", 0, 10, -1, -1, 0, 0, SEQ);
        assert_eq!(c.process(single).unwrap(), Outcome::Rejected(Reject::NonPaired));
        let unmapped = make_rec("un", 0, 10, 0, 10, PAIRED | UNMAPPED, 0, SEQ);
        assert_eq!(c.process(unmapped).unwrap(), Outcome::Rejected(Reject::Unmapped));
        let (stats, _, fail) = c.finish();
        assert_eq!(stats.non_paired, 1);
        assert_eq!(stats.unmapped, 1);
        assert_eq!(fail.unwrap().len(), 2);
    }

    #[test]
    fn test_mate_unmapped_only_bumps_its_counter() {
        let mut c = classifier(&[(100, 200)], false, false);
        // mate unmapped and placed nowhere, so tid > mtid and pos > mpos
        let rec = make_rec("lonely", 0, 500, -1, -1, PAIRED | MATE_UNMAPPED, 0, SEQ);
        let outcome = c.process(rec).unwrap();
        assert_eq!(
            outcome,
            Outcome::Rejected(Reject::Improper(ImproperKind::MateUnmapped))
        );
        let stats = c.stats();
        assert_eq!(stats.mate_unmapped, 1);
        assert_eq!(stats.same_strand, 0);
        assert_eq!(stats.diff_reference, 0);
        assert_eq!(stats.improper_other, 0);
        assert_eq!(stats.improper_pairs, 1);
        assert_eq!(stats.improper_reads, 1);
    }

    #[test]
    fn test_improper_pairs_counted_once() {
        let mut c = classifier(&[(100, 200)], false, false);
        // different references
        let a = make_rec("diff", 0, 100, 1, 50, PAIRED, 0, SEQ);
        let b = make_rec("diff", 1, 50, 0, 100, PAIRED | REVERSE, 0, SEQ);
        // same strand
        let c1 = make_rec("same", 0, 200, 0, 400, PAIRED | REVERSE | MATE_REVERSE, 0, SEQ);
        let c2 = make_rec("same", 0, 400, 0, 200, PAIRED | REVERSE | MATE_REVERSE, 0, SEQ);
        // right orientation, too far apart for the aligner
        let d1 = make_rec("far", 0, 600, 0, 90_000, PAIRED | MATE_REVERSE, 89_410, SEQ);
        let d2 = make_rec("far", 0, 90_000, 0, 600, PAIRED | REVERSE, -89_410, SEQ);
        for rec in [a, c1, d1, c2, d2, b] {
            assert!(matches!(
                c.process(rec).unwrap(),
                Outcome::Rejected(Reject::Improper(_))
            ));
        }
        let (stats, _, fail) = c.finish();
        assert_eq!(stats.improper_reads, 6);
        assert_eq!(stats.improper_pairs, 3);
        assert_eq!(stats.diff_reference, 1);
        assert_eq!(stats.same_strand, 1);
        assert_eq!(stats.improper_other, 1);
        assert_eq!(stats.mate_unmapped, 0);
        assert_eq!(fail.unwrap().len(), 6);
    }

    #[test]
    fn test_secondary_hit_keeps_buffered_primary() {
        let mut c = classifier(&[(100, 200)], false, false);
        let (left, right) = make_pair("frag", 1000, 150, SEQ, SEQ);
        let mut secondary = left.clone();
        secondary.set_pos(1010);
        secondary.set_flags(left.flags() | SECONDARY);
        let mut supplementary = left.clone();
        supplementary.set_pos(1020);
        supplementary.set_flags(left.flags() | SUPPLEMENTARY);
        assert_eq!(c.process(left).unwrap(), Outcome::Buffered);
        assert_eq!(
            c.process(secondary).unwrap(),
            Outcome::Rejected(Reject::NotPrimary)
        );
        assert_eq!(
            c.process(supplementary).unwrap(),
            Outcome::Rejected(Reject::NotPrimary)
        );
        assert_eq!(c.process(right).unwrap(), Outcome::Accepted(1));
        let (stats, router, fail) = c.finish();
        assert_eq!(stats.not_primary, 2);
        assert_eq!(stats.missing_right_mate, 0);
        assert_eq!(stats.pairs_seen, 1);
        assert_eq!(router.into_buckets()[0].sink.len(), 2);
        assert_eq!(fail.unwrap().len(), 2);
    }

    #[test]
    fn test_malformed_proper_pair_is_rejected() {
        let mut c = classifier(&[(100, 200)], false, false);
        let rec = make_rec("broken", 0, 100, -1, -1, PAIRED | PROPER, 150, SEQ);
        assert_eq!(c.process(rec).unwrap(), Outcome::Rejected(Reject::Malformed));
        assert_eq!(c.stats().malformed, 1);
        assert_eq!(c.buffered(), 0);
    }

    #[test]
    fn test_size_rejections_and_silent_right_mates() {
        let mut c = classifier(&[(100, 200)], false, false);
        let (small_l, small_r) = make_pair("small", 100, 50, SEQ, SEQ);
        let (big_l, big_r) = make_pair("big", 200, 500, SEQ, SEQ);
        assert_eq!(c.process(small_l).unwrap(), Outcome::Rejected(Reject::TooSmall));
        assert_eq!(c.process(big_l).unwrap(), Outcome::Rejected(Reject::TooBig));
        assert_eq!(c.process(small_r).unwrap(), Outcome::Ignored);
        assert_eq!(c.process(big_r).unwrap(), Outcome::Ignored);
        let (stats, _, fail) = c.finish();
        assert_eq!(stats.too_small, 1);
        assert_eq!(stats.too_big, 1);
        assert_eq!(stats.missing_left_mate, 0);
        assert_eq!(fail.unwrap().len(), 2);
    }

    #[test]
    fn test_missing_left_mate_in_range() {
        let mut c = classifier(&[(100, 200)], false, false);
        let (_, right) = make_pair("nolft", 100, 150, SEQ, SEQ);
        assert_eq!(
            c.process(right).unwrap(),
            Outcome::Rejected(Reject::MissingLeftMate)
        );
        assert_eq!(c.stats().missing_left_mate, 1);
    }

    #[test]
    fn test_orphans_flushed_at_reference_end() {
        let mut c = classifier(&[(100, 200)], false, false);
        let (left, _) = make_pair("orphan", 100, 150, SEQ, SEQ);
        c.process(left).unwrap();
        assert_eq!(c.buffered_tid(), Some(0));
        assert_eq!(c.end_reference(), 1);
        assert_eq!(c.buffered_tid(), None);
        let (stats, router, _) = c.finish();
        assert_eq!(stats.missing_right_mate, 1);
        assert_eq!(stats.buckets[0].1, 0);
        assert!(router.into_buckets()[0].sink.is_empty());
    }

    #[test]
    fn test_at_end_requires_both_mates() {
        let mut c = classifier(&[(100, 200)], true, false);
        // left starts with A, right's 5' base (last stored) is G
        let (l1, r1) = make_pair("bad", 100, 150, b"ACGTACGTAC", b"ACGTACGTAG");
        // left starts with T, right's 5' base is A
        let (l2, r2) = make_pair("good", 200, 150, b"TCGTACGTAC", b"CCGTACGTAA");
        c.process(l1).unwrap();
        c.process(l2).unwrap();
        assert_eq!(c.process(r1).unwrap(), Outcome::Rejected(Reject::AtEnd));
        assert_eq!(c.process(r2).unwrap(), Outcome::Accepted(1));
        let (stats, router, fail) = c.finish();
        assert_eq!(stats.at_end_failed, 1);
        assert_eq!(stats.missing_right_mate, 0);
        assert_eq!(fail.unwrap().len(), 2);
        let buckets = router.into_buckets();
        let written = &buckets[0].sink;
        assert!(written.iter().all(|r| r.qname() == b"good"));
    }

    #[test]
    fn test_quick_mode_can_emit_one_mate() {
        let mut c = classifier(&[(100, 200)], true, true);
        // left passes the AT-end check, right does not
        let (left, right) = make_pair("half", 100, 150, b"ACGTACGTAC", b"ACGTACGTAG");
        assert_eq!(c.process(left).unwrap(), Outcome::Accepted(1));
        assert_eq!(c.process(right).unwrap(), Outcome::Rejected(Reject::AtEnd));
        let (stats, router, fail) = c.finish();
        assert_eq!(stats.pairs_seen, 1);
        assert_eq!(stats.buckets[0].1, 1);
        assert_eq!(stats.missing_right_mate, 0);
        let buckets = router.into_buckets();
        let written = &buckets[0].sink;
        assert_eq!(written.len(), 1);
        assert!(!written[0].is_reverse());
        assert_eq!(fail.unwrap().len(), 1);
    }

    #[test]
    fn test_quick_mode_sizes() {
        let mut c = classifier(&[(100, 200)], false, true);
        let (small_l, small_r) = make_pair("small", 100, 50, SEQ, SEQ);
        let (ok_l, ok_r) = make_pair("ok", 300, 120, SEQ, SEQ);
        for rec in [small_l, ok_l, small_r, ok_r] {
            c.process(rec).unwrap();
        }
        let (stats, router, _) = c.finish();
        assert_eq!(stats.pairs_seen, 2);
        assert_eq!(stats.too_small, 1);
        assert_eq!(stats.acceptable, 1);
        assert_eq!(stats.buckets[0].1, 1);
        assert_eq!(router.into_buckets()[0].sink.len(), 2);
    }
}
