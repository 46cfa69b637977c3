use super::size_range::SizeRange;
use num_format::{Locale, ToFormattedString};
use std::fmt;

/// Percentage of `n` in `total`, zero when `total` is zero.
/// # Example
/// ```
/// use fragsplit::stats::percent;
/// assert_eq!(percent(1, 4), 25.0);
/// assert_eq!(percent(3, 0), 0.0);
/// ```
pub fn percent(n: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    100.0 * n as f64 / total as f64
}

fn fmt_count(n: u64) -> String {
    n.to_formatted_string(&Locale::en)
}

/// Tallies for one run of the insert size splitter.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SplitStats {
    pub reads_seen: u64,
    pub unmapped: u64,
    /// secondary and supplementary alignments
    pub not_primary: u64,
    pub quality_failed: u64,
    pub non_paired: u64,
    /// every read rejected as part of an improper pair
    pub improper_reads: u64,
    /// improper pairs, each counted once
    pub improper_pairs: u64,
    pub diff_reference: u64,
    pub mate_unmapped: u64,
    pub same_strand: u64,
    pub improper_other: u64,
    /// proper pair flag set but mate fields disagree
    pub malformed: u64,
    /// reads that made it past the pairing checks
    pub proper_reads: u64,
    pub pairs_seen: u64,
    pub too_small: u64,
    pub too_big: u64,
    pub acceptable: u64,
    pub at_end_failed: u64,
    pub missing_left_mate: u64,
    pub missing_right_mate: u64,
    /// accepted pairs per configured range, in configuration order
    pub buckets: Vec<(SizeRange, u64)>,
}

impl SplitStats {
    /// Sum of bucket counts; may exceed `pairs_seen` when ranges overlap.
    pub fn pairs_written(&self) -> u64 {
        self.buckets.iter().map(|(_, n)| n).sum()
    }

    fn line(&self, f: &mut fmt::Formatter, indent: usize, label: &str, n: u64) -> fmt::Result {
        writeln!(
            f,
            "{:indent$}{:<width$}{:>14}",
            "",
            label,
            fmt_count(n),
            indent = indent,
            width = 36 - indent
        )
    }

    fn pct_line(&self, f: &mut fmt::Formatter, label: &str, n: u64) -> fmt::Result {
        writeln!(
            f,
            "    {:<32}{:>14} ({:>6.2}%)",
            label,
            fmt_count(n),
            percent(n, self.pairs_seen)
        )
    }
}

impl fmt::Display for SplitStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Read summary")?;
        self.line(f, 2, "reads seen", self.reads_seen)?;
        self.line(f, 4, "unmapped", self.unmapped)?;
        self.line(f, 4, "not primary", self.not_primary)?;
        self.line(f, 4, "below quality", self.quality_failed)?;
        self.line(f, 4, "not paired", self.non_paired)?;
        self.line(f, 4, "malformed mate info", self.malformed)?;
        self.line(f, 4, "in improper pairs", self.improper_reads)?;
        self.line(f, 4, "in proper pairs", self.proper_reads)?;
        writeln!(f, "Improper pairs")?;
        self.line(f, 2, "improper pairs", self.improper_pairs)?;
        self.line(f, 4, "different reference", self.diff_reference)?;
        self.line(f, 4, "mate unmapped", self.mate_unmapped)?;
        self.line(f, 4, "same strand", self.same_strand)?;
        self.line(f, 4, "other", self.improper_other)?;
        writeln!(f, "Proper pairs")?;
        self.line(f, 2, "pairs seen", self.pairs_seen)?;
        self.pct_line(f, "too small", self.too_small)?;
        self.pct_line(f, "too big", self.too_big)?;
        self.pct_line(f, "acceptable size", self.acceptable)?;
        self.pct_line(f, "failed AT-end", self.at_end_failed)?;
        self.pct_line(f, "missing left mate", self.missing_left_mate)?;
        self.pct_line(f, "missing right mate", self.missing_right_mate)?;
        writeln!(f, "Pairs written")?;
        for (rng, n) in &self.buckets {
            self.pct_line(f, &rng.to_string(), *n)?;
        }
        Ok(())
    }
}
