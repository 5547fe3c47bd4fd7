// Clippy allows
#![allow(clippy::too_many_arguments)]

//! GIA: Genome Interval Arithmetic
//!
//! Usage: gia <COMMAND> [OPTIONS]

use clap::{ArgAction, Parser, Subcommand};
use log::{debug, LevelFilter};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use gia::aggregate::{Aggregator, ReducerRegistry, Summary};
use gia::bed::{self, BedError, BedReader, Result};
use gia::commands::{
    ClosestCommand, ComplementCommand, CoverageCommand, IntersectCommand, JaccardCommand,
    JaccardStats, MapCommand, MergeCommand, RandomCommand, ShuffleCommand, SubtractCommand,
    WindowCommand,
};
use gia::config::{
    BoundsPolicy, LengthPolicy, ShuffleScope, SortPolicy, TieHandling, UnmatchedPolicy,
};
use gia::genome::Genome;
use gia::interval::Value;
use gia::interval_set::{IntervalSet, SetOptions};

#[derive(Parser)]
#[command(name = "gia")]
#[command(version)]
#[command(about = "GIA: Genome Interval Arithmetic - grouped interval set operations", long_about = None)]
struct Cli {
    /// Number of threads to use (default: number of CPUs)
    #[arg(long, short = 't', global = true)]
    threads: Option<usize>,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG applies otherwise
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Input files start with a header line naming the columns; output
    /// gets one too
    #[arg(long, global = true)]
    header: bool,

    /// Genome file (chrom<TAB>size) for bounds checks
    #[arg(short = 'g', long, global = true)]
    genome: Option<PathBuf>,

    /// Clip intervals running past a chromosome end instead of failing
    #[arg(long, global = true)]
    clip: bool,

    /// Fail on unsorted input instead of sorting it
    #[arg(long, global = true)]
    reject_unsorted: bool,

    /// Comma-separated columns to group records by (e.g. strand,name)
    #[arg(long = "group-by", global = true, value_delimiter = ',')]
    group_by: Vec<String>,

    /// Run sweeps sequentially
    #[arg(long, global = true)]
    sequential: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report overlapping pairs between two files
    Intersect {
        /// Input file A (use - for stdin)
        #[arg(short = 'a', long)]
        file_a: PathBuf,

        /// Input file B
        #[arg(short = 'b', long)]
        file_b: PathBuf,

        /// Keep A records without overlap, with empty B columns
        #[arg(long)]
        emit_unmatched: bool,

        /// Minimum overlap in bases
        #[arg(long, default_value = "1")]
        min_overlap: u64,

        /// Only report A records with NO overlap
        #[arg(long)]
        invert: bool,
    },

    /// Remove the parts of A covered by B
    Subtract {
        /// Input file A (use - for stdin)
        #[arg(short = 'a', long)]
        file_a: PathBuf,

        /// Input file B
        #[arg(short = 'b', long)]
        file_b: PathBuf,

        /// Remove entire A feature if any overlap
        #[arg(short = 'A', long)]
        remove_entire: bool,
    },

    /// Find the nearest B record for each A record
    Closest {
        /// Input file A (use - for stdin)
        #[arg(short = 'a', long)]
        file_a: PathBuf,

        /// Input file B
        #[arg(short = 'b', long)]
        file_b: PathBuf,

        /// How to report equally close records
        #[arg(long, value_enum, default_value_t = TieHandling::First)]
        ties: TieHandling,

        /// Ignore overlapping intervals
        #[arg(long = "io")]
        ignore_overlaps: bool,

        /// Ignore upstream intervals
        #[arg(long = "iu")]
        ignore_upstream: bool,

        /// Ignore downstream intervals
        #[arg(long = "id")]
        ignore_downstream: bool,

        /// Drop A records without any candidate
        #[arg(long)]
        omit_unmatched: bool,
    },

    /// Summarise overlapping B values onto each A record
    Map {
        /// Input file A (use - for stdin)
        #[arg(short = 'a', long)]
        file_a: PathBuf,

        /// Input file B
        #[arg(short = 'b', long)]
        file_b: PathBuf,

        /// Summaries as NAME=COLUMN:REDUCER or COLUMN:REDUCER
        #[arg(short = 's', long = "summary", required = true)]
        summaries: Vec<String>,

        /// Drop A records without overlap
        #[arg(long)]
        omit_unmatched: bool,

        /// Value for summaries over no values
        #[arg(long)]
        empty_value: Option<String>,
    },

    /// Merge overlapping intervals
    Merge {
        /// Input file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Maximum distance between intervals to merge
        #[arg(short, long, default_value = "0")]
        distance: u64,

        /// Summaries of merged records as NAME=COLUMN:REDUCER
        #[arg(short = 's', long = "summary")]
        summaries: Vec<String>,
    },

    /// Split every interval into fixed-size windows
    Makewindows {
        /// Input file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Window size in bases
        #[arg(short = 'w', long, allow_negative_numbers = true)]
        size: i64,

        /// Distance between window starts (default: window size)
        #[arg(short = 's', long, allow_negative_numbers = true)]
        step: Option<i64>,
    },

    /// Draw random intervals from the genome
    Random {
        /// Number of intervals
        #[arg(short = 'n', long, default_value = "1000000")]
        count: usize,

        /// Interval length
        #[arg(short = 'l', long, default_value = "100")]
        length: u64,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Skip chromosomes shorter than the length instead of failing
        #[arg(long)]
        skip_short: bool,
    },

    /// Move every interval to a random position
    Shuffle {
        /// Input file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Where shuffled intervals may land
        #[arg(long, value_enum, default_value_t = ShuffleScope::WithinChrom)]
        scope: ShuffleScope,

        /// Regions shuffled intervals must not overlap
        #[arg(long)]
        exclude: Option<PathBuf>,

        /// Placement attempts per interval when excluding regions
        #[arg(long, default_value = "1000")]
        max_tries: usize,
    },

    /// Report regions of the genome not covered by the input
    Complement {
        /// Input file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Compute coverage of A by B
    Coverage {
        /// Input file A (use - for stdin)
        #[arg(short = 'a', long)]
        file_a: PathBuf,

        /// Input file B
        #[arg(short = 'b', long)]
        file_b: PathBuf,
    },

    /// Jaccard similarity of two files
    Jaccard {
        /// Input file A (use - for stdin)
        #[arg(short = 'a', long)]
        file_a: PathBuf,

        /// Input file B
        #[arg(short = 'b', long)]
        file_b: PathBuf,
    },

    /// Group rows by columns and summarise each group
    Summarise {
        /// Input file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Comma-separated join-key columns
        #[arg(long = "by", value_delimiter = ',')]
        by: Vec<String>,

        /// Summaries as NAME=COLUMN:REDUCER or COLUMN:REDUCER
        #[arg(short = 's', long = "summary", required = true)]
        summaries: Vec<String>,
    },
}

/// Options shared by every subcommand.
struct Context {
    header: bool,
    group_by: Vec<String>,
    genome: Option<Genome>,
    bounds: BoundsPolicy,
    sort: SortPolicy,
}

impl Context {
    fn from_cli(cli: &Cli) -> Result<Self> {
        let genome = cli.genome.as_ref().map(Genome::from_file).transpose()?;
        Ok(Self {
            header: cli.header,
            group_by: cli.group_by.clone(),
            genome,
            bounds: if cli.clip {
                BoundsPolicy::Clip
            } else {
                BoundsPolicy::Reject
            },
            sort: if cli.reject_unsorted {
                SortPolicy::Reject
            } else {
                SortPolicy::Sort
            },
        })
    }

    fn options(&self) -> SetOptions<'_> {
        let options = SetOptions::new().with_bounds(self.bounds).with_sort(self.sort);
        match &self.genome {
            Some(genome) => options.with_genome(genome),
            None => options,
        }
    }

    fn require_genome(&self, command: &str) -> Result<&Genome> {
        self.genome.as_ref().ok_or_else(|| {
            BedError::InvalidArgument(format!("{} requires a genome file (-g)", command))
        })
    }

    /// Read a set grouped by the global `--group-by` keys.
    fn load(&self, path: &Path) -> Result<IntervalSet> {
        self.load_grouped(path, &self.group_by)
    }

    fn load_grouped(&self, path: &Path, group_by: &[String]) -> Result<IntervalSet> {
        debug!("reading {}", path.display());
        let records = if path.as_os_str() == "-" {
            let reader = BedReader::new(io::stdin().lock());
            let reader = if self.header { reader.with_header() } else { reader };
            reader.records().collect::<Result<Vec<_>>>()?
        } else {
            let reader = BedReader::from_path(path)?;
            let reader = if self.header { reader.with_header() } else { reader };
            reader.records().collect::<Result<Vec<_>>>()?
        };
        IntervalSet::from_records(records, group_by, &self.options())
    }

    fn write(&self, set: &IntervalSet) -> Result<()> {
        let stdout = io::stdout();
        let mut handle = BufWriter::new(stdout.lock());
        bed::write_set(&mut handle, set, self.header)?;
        handle.flush()?;
        Ok(())
    }
}

fn init_logging(verbose: u8) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(LevelFilter::Info);
        }
        _ => {
            builder.filter_level(LevelFilter::Debug);
        }
    }
    builder.init();
}

fn parse_summaries(specs: &[String]) -> Result<Vec<Summary>> {
    let registry = ReducerRegistry::builtin();
    specs.iter().map(|s| Summary::parse(s, &registry)).collect()
}

fn unmatched(omit: bool) -> UnmatchedPolicy {
    if omit {
        UnmatchedPolicy::Omit
    } else {
        UnmatchedPolicy::EmitNull
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Configure thread pool if --threads specified
    if let Some(n) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .map_err(|e| BedError::InvalidArgument(format!("thread pool: {}", e)))?;
    }
    if cli.sequential {
        gia::config::set_parallel(false);
    }

    let ctx = Context::from_cli(&cli)?;

    match cli.command {
        Commands::Intersect {
            file_a,
            file_b,
            emit_unmatched,
            min_overlap,
            invert,
        } => run_intersect(&ctx, &file_a, &file_b, emit_unmatched, min_overlap, invert),

        Commands::Subtract {
            file_a,
            file_b,
            remove_entire,
        } => run_subtract(&ctx, &file_a, &file_b, remove_entire),

        Commands::Closest {
            file_a,
            file_b,
            ties,
            ignore_overlaps,
            ignore_upstream,
            ignore_downstream,
            omit_unmatched,
        } => {
            let cmd = ClosestCommand {
                tie_handling: ties,
                ignore_overlaps,
                ignore_upstream,
                ignore_downstream,
                unmatched: unmatched(omit_unmatched),
            };
            run_closest(&ctx, &file_a, &file_b, &cmd)
        }

        Commands::Map {
            file_a,
            file_b,
            summaries,
            omit_unmatched,
            empty_value,
        } => run_map(&ctx, &file_a, &file_b, &summaries, omit_unmatched, empty_value),

        Commands::Merge {
            input,
            distance,
            summaries,
        } => run_merge(&ctx, &input, distance, &summaries),

        Commands::Makewindows { input, size, step } => run_makewindows(&ctx, &input, size, step),

        Commands::Random {
            count,
            length,
            seed,
            skip_short,
        } => run_random(&ctx, count, length, seed, skip_short),

        Commands::Shuffle {
            input,
            seed,
            scope,
            exclude,
            max_tries,
        } => run_shuffle(&ctx, &input, seed, scope, exclude, max_tries),

        Commands::Complement { input } => run_complement(&ctx, &input),

        Commands::Coverage { file_a, file_b } => run_coverage(&ctx, &file_a, &file_b),

        Commands::Jaccard { file_a, file_b } => run_jaccard(&ctx, &file_a, &file_b),

        Commands::Summarise {
            input,
            by,
            summaries,
        } => run_summarise(&ctx, &input, &by, &summaries),
    }
}

fn run_intersect(
    ctx: &Context,
    file_a: &Path,
    file_b: &Path,
    emit_unmatched: bool,
    min_overlap: u64,
    invert: bool,
) -> Result<()> {
    let a = ctx.load(file_a)?;
    let b = ctx.load(file_b)?;
    let cmd = IntersectCommand::new()
        .with_unmatched(unmatched(!emit_unmatched))
        .with_min_overlap(min_overlap)
        .with_invert(invert);
    ctx.write(&cmd.intersect(&a, &b)?)
}

fn run_subtract(ctx: &Context, file_a: &Path, file_b: &Path, remove_entire: bool) -> Result<()> {
    let a = ctx.load(file_a)?;
    let b = ctx.load(file_b)?;
    let cmd = SubtractCommand::new().with_remove_entire(remove_entire);
    ctx.write(&cmd.subtract(&a, &b)?)
}

fn run_closest(ctx: &Context, file_a: &Path, file_b: &Path, cmd: &ClosestCommand) -> Result<()> {
    let a = ctx.load(file_a)?;
    let b = ctx.load(file_b)?;
    ctx.write(&cmd.closest(&a, &b)?)
}

fn run_map(
    ctx: &Context,
    file_a: &Path,
    file_b: &Path,
    summaries: &[String],
    omit_unmatched: bool,
    empty_value: Option<String>,
) -> Result<()> {
    let a = ctx.load(file_a)?;
    let b = ctx.load(file_b)?;
    let mut cmd = MapCommand::new(parse_summaries(summaries)?).with_unmatched(unmatched(omit_unmatched));
    if let Some(value) = empty_value {
        cmd = cmd.with_empty_value(Value::parse(&value));
    }
    ctx.write(&cmd.map(&a, &b)?)
}

fn run_merge(ctx: &Context, input: &Path, distance: u64, summaries: &[String]) -> Result<()> {
    let set = ctx.load(input)?;
    let cmd = MergeCommand::new()
        .with_distance(distance)
        .with_summaries(parse_summaries(summaries)?);
    ctx.write(&cmd.merge(&set)?)
}

fn run_makewindows(ctx: &Context, input: &Path, size: i64, step: Option<i64>) -> Result<()> {
    let set = ctx.load(input)?;
    let mut cmd = WindowCommand::new(size);
    cmd.step = step;

    // Parent order, then window id.
    let windows = cmd.windows(&set)?;
    let stdout = io::stdout();
    let mut handle = BufWriter::new(stdout.lock());
    bed::write_records(&mut handle, &windows, ctx.header)?;
    handle.flush()?;
    Ok(())
}

fn run_random(ctx: &Context, count: usize, length: u64, seed: u64, skip_short: bool) -> Result<()> {
    let genome = ctx.require_genome("random")?;
    let policy = if skip_short {
        LengthPolicy::SkipShort
    } else {
        LengthPolicy::Reject
    };
    let cmd = RandomCommand::new(count, length, seed).with_length_policy(policy);
    ctx.write(&cmd.random_intervals(genome)?)
}

fn run_shuffle(
    ctx: &Context,
    input: &Path,
    seed: u64,
    scope: ShuffleScope,
    exclude: Option<PathBuf>,
    max_tries: usize,
) -> Result<()> {
    let genome = ctx.require_genome("shuffle")?;
    let set = ctx.load(input)?;
    let mut cmd = ShuffleCommand::new(seed)
        .with_scope(scope)
        .with_max_tries(max_tries);
    if let Some(path) = exclude {
        cmd = cmd.with_excluded(ctx.load_grouped(&path, &[])?);
    }
    ctx.write(&cmd.shuffle(&set, genome)?)
}

fn run_complement(ctx: &Context, input: &Path) -> Result<()> {
    let genome = ctx.require_genome("complement")?;
    let set = ctx.load(input)?;

    // Genome order.
    let gaps = ComplementCommand::new().gaps(&set, genome)?;
    let stdout = io::stdout();
    let mut handle = BufWriter::new(stdout.lock());
    bed::write_records(&mut handle, &gaps, ctx.header)?;
    handle.flush()?;
    Ok(())
}

fn run_coverage(ctx: &Context, file_a: &Path, file_b: &Path) -> Result<()> {
    let a = ctx.load(file_a)?;
    let b = ctx.load(file_b)?;
    ctx.write(&CoverageCommand::new().coverage(&a, &b)?)
}

fn run_jaccard(ctx: &Context, file_a: &Path, file_b: &Path) -> Result<()> {
    let a = ctx.load(file_a)?;
    let b = ctx.load(file_b)?;
    let stats = JaccardCommand::new().jaccard(&a, &b)?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", JaccardStats::HEADER)?;
    writeln!(handle, "{}", stats)?;
    Ok(())
}

fn run_summarise(ctx: &Context, input: &Path, by: &[String], summaries: &[String]) -> Result<()> {
    let set = ctx.load(input)?;
    let mut aggregator = Aggregator::new(by);
    for summary in parse_summaries(summaries)? {
        aggregator = aggregator.with_summary(summary)?;
    }
    let table = aggregator.aggregate(&set)?;

    let stdout = io::stdout();
    let mut handle = BufWriter::new(stdout.lock());
    bed::write_table(&mut handle, &table, ctx.header)?;
    handle.flush()?;
    Ok(())
}
