use super::errors::{FragError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

lazy_static! {
    static ref SIZE_RE: Regex = Regex::new(r"^\s*([0-9]+)-([0-9]+)\s*$").unwrap();
}

/// An inclusive `[min, max]` fragment length range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SizeRange {
    pub min: i64,
    pub max: i64,
}

impl SizeRange {
    /// Build a range, rejecting `min > max`.
    pub fn new(min: i64, max: i64) -> Result<SizeRange> {
        if min > max {
            return Err(FragError::InvertedRange { min, max });
        }
        Ok(SizeRange { min, max })
    }

    /// Both bounds are inclusive.
    /// # Example
    /// ```
    /// use fragsplit::size_range::SizeRange;
    /// let rng = SizeRange::new(100, 200).unwrap();
    /// assert!(rng.contains(100));
    /// assert!(rng.contains(200));
    /// assert!(!rng.contains(99));
    /// assert!(!rng.contains(201));
    /// ```
    pub fn contains(&self, len: i64) -> bool {
        self.min <= len && len <= self.max
    }

    /// Label used inside output file names, e.g. `100_200`.
    pub fn file_label(&self) -> String {
        format!("{}_{}", self.min, self.max)
    }

    /// Output path for this range: `<basename>.<min>_<max>.<ext>`.
    /// # Example
    /// ```
    /// use fragsplit::size_range::SizeRange;
    /// let rng: SizeRange = "140-160".parse().unwrap();
    /// assert_eq!(rng.output_path("sample", "bam"), "sample.140_160.bam");
    /// ```
    pub fn output_path(&self, basename: &str, ext: &str) -> String {
        format!("{}.{}.{}", basename, self.file_label(), ext)
    }
}

impl fmt::Display for SizeRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

impl FromStr for SizeRange {
    type Err = FragError;

    /// parse `<min>-<max>` strings
    /// # Example
    /// ```
    /// use fragsplit::size_range::SizeRange;
    /// let rng: SizeRange = "100-200".parse().unwrap();
    /// assert_eq!(rng.min, 100);
    /// assert_eq!(rng.max, 200);
    /// assert!("100".parse::<SizeRange>().is_err());
    /// assert!("200-100".parse::<SizeRange>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<SizeRange> {
        let caps = SIZE_RE
            .captures(s)
            .ok_or_else(|| FragError::MalformedRange(s.to_string()))?;
        let parse = |idx: usize| -> Result<i64> {
            caps[idx]
                .parse::<i64>()
                .map_err(|_| FragError::MalformedRange(s.to_string()))
        };
        SizeRange::new(parse(1)?, parse(2)?)
    }
}

/// Ranges from the command line: any `--size` value replaces the
/// `--min`/`--max` pair entirely.
/// # Example
/// ```
/// use fragsplit::size_range::{size_ranges, SizeRange};
/// let ranges = size_ranges(&[], 100, 200).unwrap();
/// assert_eq!(ranges, vec![SizeRange::new(100, 200).unwrap()]);
/// ```
pub fn size_ranges(size: &[String], min: i64, max: i64) -> Result<Vec<SizeRange>> {
    if size.is_empty() {
        return Ok(vec![SizeRange::new(min, max)?]);
    }
    size.iter().map(|s| s.parse::<SizeRange>()).collect()
}

/// The lowest and highest bound over a set of ranges; `None` when empty.
pub fn overall_bounds(ranges: &[SizeRange]) -> Option<(i64, i64)> {
    let lowest = ranges.iter().map(|r| r.min).min()?;
    let highest = ranges.iter().map(|r| r.max).max()?;
    Some((lowest, highest))
}
