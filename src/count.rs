use super::errors::Result;
use super::myio;
use super::record::FragmentExt;
use rayon::prelude::*;
use rust_htslib::bam::{Read, Record};
use std::fmt;
use std::io::Write;

/// Read category counts for one alignment file.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FileCounts {
    pub path: String,
    pub total: u64,
    pub unmapped: u64,
    pub paired: u64,
    pub proper_pairs: u64,
    pub pass_quality: u64,
    fragment_len_sum: u64,
}

impl FileCounts {
    pub fn new(path: &str) -> FileCounts {
        FileCounts {
            path: path.to_string(),
            ..Default::default()
        }
    }

    /// Tally one read; proper pairs are counted on their forward mate.
    pub fn add(&mut self, rec: &Record, min_quality: u8) {
        self.total += 1;
        if rec.is_unmapped() {
            self.unmapped += 1;
            return;
        }
        if rec.mapq() >= min_quality {
            self.pass_quality += 1;
        }
        if rec.is_paired() {
            self.paired += 1;
            if rec.is_proper_pair() && !rec.is_reverse() && !rec.has_inconsistent_mate() {
                self.proper_pairs += 1;
                self.fragment_len_sum += rec.fragment_len() as u64;
            }
        }
    }

    /// Mean fragment length over proper pairs, zero without any.
    pub fn mean_fragment_len(&self) -> f64 {
        if self.proper_pairs == 0 {
            return 0.0;
        }
        self.fragment_len_sum as f64 / self.proper_pairs as f64
    }

    pub fn header() -> &'static str {
        "#file\ttotal\tunmapped\tpaired\tproper_pairs\tpass_quality\tmean_fragment_len"
    }
}

impl fmt::Display for FileCounts {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{:.2}",
            self.path,
            self.total,
            self.unmapped,
            self.paired,
            self.proper_pairs,
            self.pass_quality,
            self.mean_fragment_len()
        )
    }
}

/// Count the reads of a record stream.
pub fn count_records<I>(path: &str, records: I, min_quality: u8) -> Result<FileCounts>
where
    I: IntoIterator<Item = std::result::Result<Record, rust_htslib::errors::Error>>,
{
    let mut counts = FileCounts::new(path);
    for rec in records {
        counts.add(&rec?, min_quality);
    }
    Ok(counts)
}

/// Count one file; each call owns its reader and tallies.
pub fn count_file(path: &str, min_quality: u8) -> Result<FileCounts> {
    let mut reader = myio::bam_reader(path, 1)?;
    let counts = count_records(path, reader.records(), min_quality)?;
    log::debug!("Counted {} reads in {}", counts.total, path);
    Ok(counts)
}

/// Count every file in parallel and write one row per file, in input order.
pub fn run_count(paths: &[String], min_quality: u8, out: &str) -> Result<Vec<FileCounts>> {
    let counts = paths
        .par_iter()
        .map(|path| count_file(path, min_quality))
        .collect::<Result<Vec<FileCounts>>>()?;

    let mut writer = myio::writer(out)?;
    writeln!(writer, "{}", FileCounts::header())?;
    for row in &counts {
        writeln!(writer, "{}", row)?;
    }
    writer.flush()?;
    Ok(counts)
}
