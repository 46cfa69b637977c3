use anyhow::{Context, Result};
use colored::Colorize;
use env_logger::{Builder, Target};
use fragsplit::cli::Commands;
use fragsplit::classify::SplitConfig;
use fragsplit::dedup::{DedupConfig, DedupOpts};
use fragsplit::size_range::size_ranges;
use fragsplit::split::{default_basename, SplitOpts};
use fragsplit::*;
use itertools::Itertools;
use log::LevelFilter;
use std::time::Instant;

fn main() {
    if let Err(e) = parse_cli() {
        eprintln!("{} {:#}", "error:".bold().red(), e);
        std::process::exit(1);
    }
}

pub fn parse_cli() -> Result<()> {
    let pg_start = Instant::now();
    let args = cli::make_cli_parse();

    // set the logging level
    let min_log_level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    Builder::new()
        .target(Target::Stderr)
        .filter(None, min_log_level)
        .init();

    log::debug!("DEBUG logging enabled");
    log::trace!("TRACE logging enabled");

    // set up number of threads to use globally
    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()
        .context("Failed to build the thread pool")?;

    let subcommand = args.command.as_ref().map_or("fragsplit", |c| c.name());
    match &args.command {
        //
        // Run Split
        //
        Some(Commands::Split {
            bam,
            input,
            out,
            fail,
            min,
            max,
            size,
            at,
            qual,
            quick,
        }) => {
            let input = match input.as_ref().or(bam.as_ref()) {
                Some(input) => input.clone(),
                None => {
                    cli::make_cli_app()
                        .find_subcommand_mut("split")
                        .context("missing split subcommand")?
                        .print_help()?;
                    anyhow::bail!("no input alignment file given");
                }
            };
            let ranges = size_ranges(size, *min, *max)?;
            log::info!("Size ranges: {}", ranges.iter().join(", "));
            let opts = SplitOpts {
                basename: out.clone().unwrap_or_else(|| default_basename(&input)),
                input,
                fail: fail.clone(),
                threads: args.threads,
                config: SplitConfig::new(ranges, *qual, *at, *quick)?,
            };
            let stats = split::run_split(&opts)
                .with_context(|| format!("Failed to split {}", opts.input))?;
            print!("{}", stats);
        }
        //
        // Run Dedup
        //
        Some(Commands::Dedup {
            bam,
            out,
            fail,
            max,
            qual,
        }) => {
            let opts = DedupOpts {
                input: bam.clone(),
                output: out.clone(),
                fail: fail.clone(),
                threads: args.threads,
                config: DedupConfig::new(*max, *qual)?,
            };
            let stats = dedup::run_dedup(&opts)
                .with_context(|| format!("Failed to dedup {}", opts.input))?;
            // the bam itself may be on stdout
            eprint!("{}", stats);
        }
        //
        // Run Count
        //
        Some(Commands::Count { bams, out, qual }) => {
            count::run_count(bams, *qual, out)?;
        }
        //
        // no command opt
        //
        None => {}
    };

    let duration = pg_start.elapsed();
    log::info!(
        "{} done! Time elapsed: {}",
        subcommand.bright_green().bold(),
        format!("{:.2?}", duration).bright_yellow().bold()
    );
    Ok(())
}
