use clap::IntoApp;
use clap::{AppSettings, Parser, Subcommand};

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about,
    propagate_version = true,
    subcommand_required = true,
    infer_subcommands = true,
    arg_required_else_help = true,
    help_expected = true
)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
pub struct Cli {
    /// Threads for bam compression and decompression.
    #[clap(short, long, default_value_t = 4)]
    pub threads: usize,

    /// Logging level [-v: Info, -vv: Debug, -vvv: Trace].
    #[clap(short, long, parse(from_occurrences), help_heading = "DEBUG")]
    pub verbose: usize,

    #[clap(subcommand)]
    pub command: Option<Commands>,
}

///
/// This structure contains all the subcommands for fragsplit and their help descriptions.
///
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split a paired-end bam into one bam per insert size range.
    ///
    /// Reads must be sorted by position. A pair is written to every range that
    /// holds its insert size, so overlapping ranges share pairs. Outputs are
    /// named `<out>.<min>_<max>.bam` and keep the input order; re-sort and index
    /// them before use. Quick mode judges every read by itself and can write one
    /// mate of a pair without the other. Secondary and supplementary alignments
    /// are rejected.
    #[clap(visible_aliases = &["sp"])]
    Split {
        /// Input sam/bam/cram file.
        bam: Option<String>,
        /// Input sam/bam/cram file (same as the positional argument).
        #[clap(short, long = "in")]
        input: Option<String>,
        /// Basename for the output files [default: input path without extension].
        #[clap(short, long)]
        out: Option<String>,
        /// Write every rejected read to this bam.
        #[clap(short, long)]
        fail: Option<String>,
        /// Smallest insert size kept when no --size is given.
        #[clap(long, default_value_t = 100)]
        min: i64,
        /// Largest insert size kept when no --size is given.
        #[clap(long, default_value_t = 200)]
        max: i64,
        /// Insert size range <min>-<max>, inclusive. May be repeated; overrides --min and --max.
        #[clap(short, long, multiple_occurrences = true)]
        size: Vec<String>,
        /// Only keep pairs whose reads both start with A or T.
        #[clap(short, long)]
        at: bool,
        /// Minimum mapping quality.
        #[clap(short, long, default_value_t = 0)]
        qual: u8,
        /// Judge each read on its own instead of waiting for its mate.
        #[clap(long)]
        quick: bool,
    },
    /// Cap the number of duplicate fragments that start at the same position.
    ///
    /// Reads sharing a 5' position, strand and insert size beyond --max are
    /// dropped, along with their mates. Reversed reads are placed by their last
    /// aligned base, so soft clipping does not hide duplicates. Input must be
    /// sorted by position.
    #[clap(visible_aliases = &["dd"])]
    Dedup {
        /// Input sam/bam/cram file.
        #[clap(default_value = "-")]
        bam: String,
        /// Output bam file.
        #[clap(short, long, default_value = "-")]
        out: String,
        /// Write dropped reads to this bam.
        #[clap(short, long)]
        fail: Option<String>,
        /// Reads kept per 5' position, strand and insert size.
        #[clap(short, long, default_value_t = 1)]
        max: usize,
        /// Reads below this mapping quality are passed through untouched.
        #[clap(short, long, default_value_t = 0)]
        qual: u8,
    },
    /// Count reads, pairs and mean insert size for each input file.
    ///
    /// Files are counted in parallel with --threads workers.
    Count {
        /// Input sam/bam/cram files.
        #[clap(required = true)]
        bams: Vec<String>,
        /// Output table, `.gz` compresses.
        #[clap(short, long, default_value = "-")]
        out: String,
        /// Minimum mapping quality for the pass_quality column.
        #[clap(short, long, default_value_t = 0)]
        qual: u8,
    },
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Split { .. } => "split",
            Commands::Dedup { .. } => "dedup",
            Commands::Count { .. } => "count",
        }
    }
}

pub fn make_cli_parse() -> Cli {
    Cli::parse()
}

pub fn make_cli_app() -> clap::Command<'static> {
    Cli::command()
}
