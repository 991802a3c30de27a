// Tue Jan 13 2026 - Alex

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use memmap2::Mmap;
use shard_scheduler::{
    utils, Scheduler, SchedulerConfig, SchedulerMonitor, ShardContext, ShardLogic, TreeReducible,
    WriterSink,
};
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::ops::{AddAssign, Range};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author = "Alex")]
#[command(version = "1.0.0")]
#[command(about = "Counts lines, words and bytes of a text file in parallel shards", long_about = None)]
struct Args {
    /// Text file to process
    input: PathBuf,

    #[arg(short, long, default_value_t = 10_000)]
    lines_per_shard: usize,

    /// Worker threads (defaults to the config file, then the CPU count)
    #[arg(short, long)]
    threads: Option<usize>,

    #[arg(long)]
    max_outstanding_merges: Option<usize>,

    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Per-shard report destination (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(long)]
    no_progress: bool,

    #[arg(long)]
    stats_json: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Counts {
    lines: u64,
    words: u64,
    bytes: u64,
}

impl AddAssign for Counts {
    fn add_assign(&mut self, rhs: Self) {
        self.lines += rhs.lines;
        self.words += rhs.words;
        self.bytes += rhs.bytes;
    }
}

impl Counts {
    fn of(text: &[u8]) -> Self {
        let lines = text.iter().filter(|&&b| b == b'\n').count() as u64;
        let words = text
            .split(|b| b.is_ascii_whitespace())
            .filter(|w| !w.is_empty())
            .count() as u64;

        Self {
            lines,
            words,
            bytes: text.len() as u64,
        }
    }
}

struct MappedSlice {
    map: Arc<Mmap>,
    range: Range<usize>,
}

impl MappedSlice {
    fn as_bytes(&self) -> &[u8] {
        &self.map[self.range.clone()]
    }
}

struct WordCount;

impl ShardLogic for WordCount {
    type Shard = Range<usize>;
    type Data = MappedSlice;
    type Output = Counts;

    fn map(&self, ctx: &mut ShardContext<'_, Range<usize>, MappedSlice>) -> anyhow::Result<Counts> {
        let index = ctx.index();
        let range = ctx.shard().clone();
        let (slice, output, _) = ctx.parts();
        let counts = Counts::of(slice.as_bytes());

        output.push_str(&format!(
            "shard {:>5} [{:>10}..{:>10}] lines {:>8} words {:>9} bytes {:>10}\n",
            index, range.start, range.end, counts.lines, counts.words, counts.bytes
        ));

        Ok(counts)
    }

    fn tree_reducible(&self) -> Option<&dyn TreeReducible<Counts>> {
        Some(self)
    }
}

impl TreeReducible<Counts> for WordCount {
    fn tree_reduce(&self, mut lhs: Counts, rhs: Counts) -> anyhow::Result<Counts> {
        lhs += rhs;
        Ok(lhs)
    }
}

/// Splits `data` into ranges of at most `lines_per_shard` lines each, always
/// cutting just after a newline.
fn split_lines(data: &[u8], lines_per_shard: usize) -> Vec<Range<usize>> {
    let lines_per_shard = lines_per_shard.max(1);
    let mut shards = Vec::new();
    let mut start = 0;
    let mut lines = 0;

    for (pos, &b) in data.iter().enumerate() {
        if b == b'\n' {
            lines += 1;
            if lines == lines_per_shard {
                shards.push(start..pos + 1);
                start = pos + 1;
                lines = 0;
            }
        }
    }

    if start < data.len() {
        shards.push(start..data.len());
    }

    shards
}

fn build_config(args: &Args) -> anyhow::Result<SchedulerConfig> {
    let mut config = match &args.config {
        Some(path) => SchedulerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SchedulerConfig::default(),
    };

    if let Some(threads) = args.threads {
        config = config.with_pool_size(threads);
    }
    if let Some(cap) = args.max_outstanding_merges {
        config = config.with_max_outstanding_merges(cap);
    }

    config.validate()?;

    if let Some(path) = &args.save_config {
        config
            .save(path)
            .with_context(|| format!("saving config {}", path.display()))?;
        log::info!("Saved scheduler config to {}", path.display());
    }

    Ok(config)
}

fn progress_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} shards {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

fn watch(monitor: &SchedulerMonitor, pb: &ProgressBar, done: &AtomicBool) {
    while !done.load(Ordering::Acquire) {
        let snapshot = monitor.snapshot();
        pb.set_position(snapshot.completed_traversals + snapshot.failed_traversals);
        pb.set_message(format!(
            "({} reduces, {} merges pending)",
            snapshot.pending_reduces, snapshot.pending_merges
        ));
        thread::sleep(Duration::from_millis(100));
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = build_config(&args)?;

    let file = File::open(&args.input).with_context(|| format!("opening {}", args.input.display()))?;
    let len = file.metadata()?.len();

    // Zero-length files cannot be mapped on every platform.
    let map = if len == 0 {
        None
    } else {
        let mmap = unsafe { Mmap::map(&file) }.with_context(|| format!("mapping {}", args.input.display()))?;
        Some(Arc::new(mmap))
    };

    let shards = match &map {
        Some(map) => split_lines(map, args.lines_per_shard),
        None => Vec::new(),
    };
    let total = shards.len();

    println!("{} {}: {} bytes, {} shards", "[*]".blue(), args.input.display(), len, total);

    let provider = {
        let map = map.clone();
        Arc::new(move |range: &Range<usize>| -> anyhow::Result<MappedSlice> {
            let map = map.clone().context("no mapping for an empty file")?;
            Ok(MappedSlice {
                map,
                range: range.clone(),
            })
        })
    };

    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(File::create(path).with_context(|| format!("creating {}", path.display()))?),
        None => Box::new(io::stdout()),
    };
    let mut sink = WriterSink::new(BufWriter::new(writer));

    let scheduler = Scheduler::new(config);
    let monitor = scheduler.monitor();
    let start = Instant::now();

    let pb = (!args.no_progress && args.output.is_some()).then(|| progress_bar(total));
    let done = AtomicBool::new(false);

    let result = thread::scope(|scope| {
        if let Some(pb) = &pb {
            let (monitor, done) = (&monitor, &done);
            scope.spawn(move || watch(monitor, pb, done));
        }

        let result = scheduler.run(Arc::new(WordCount), shards, provider, &mut sink);
        done.store(true, Ordering::Release);
        result
    });

    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }

    let counts = result?.unwrap_or_default();
    let elapsed = start.elapsed();

    let mut summary = String::new();
    writeln!(summary, "{}", "=".repeat(50).cyan())?;
    writeln!(summary, "{} lines: {}", "[+]".green(), counts.lines.to_string().bold())?;
    writeln!(summary, "{} words: {}", "[+]".green(), counts.words.to_string().bold())?;
    writeln!(summary, "{} bytes: {}", "[+]".green(), counts.bytes.to_string().bold())?;
    writeln!(
        summary,
        "{} {} shards in {:.2}ms, {} report bytes written",
        "[+]".green(),
        total,
        elapsed.as_secs_f64() * 1000.0,
        sink.bytes_written()
    )?;
    eprint!("{}", summary);

    if args.stats_json {
        println!("{}", monitor.snapshot().to_json()?);
    }

    Ok(())
}

fn main() {
    let args = Args::parse();
    if std::env::var_os("RUST_LOG").is_some() {
        utils::init_from_env();
    } else {
        utils::init_logger(utils::level_from_verbosity(args.verbose));
    }

    if let Err(e) = run(args) {
        eprintln!("{} {:#}", "[!]".red(), e);
        std::process::exit(1);
    }
}
