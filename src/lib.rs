//! # Command line interface for fragsplit
//! [fragsplit command line interface, subcommands, and options.](cli::Commands)
//! # README for fragsplit
#![doc = include_str!("../README.md")]
/// Classification of reads into size buckets.
pub mod classify;
/// Command line interface for fragsplit.
pub mod cli;
/// Per file read counts.
pub mod count;
/// Capping of duplicate fragments per start position.
pub mod dedup;
pub mod errors;
/// Module for opening bam files and writing compressed or uncompressed text.
pub mod myio;
/// Left mates waiting for their right mate.
pub mod pair_buffer;
/// Fragment helpers on alignment records and record sinks.
pub mod record;
/// Fan out of accepted pairs to size range outputs.
pub mod router;
/// Insert size ranges.
pub mod size_range;
/// Splitting a bam by insert size.
pub mod split;
/// Tallies and the summary report.
pub mod stats;
