use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::oneshot;

use job_detector::corpus::{self, CorpusReport};
use job_detector::detect;
use job_detector::messaging::{self, JobAvailability};
use job_detector::trigger::{
    FileSource, HttpSource, LogAffordance, ScanReason, SnapshotSource, Trigger,
};
use job_detector::{Detector, ExtractedJobData, Page, Policy};

#[derive(Parser)]
#[command(name = "job_detector", about = "Job-posting detection and extraction for page snapshots")]
struct Cli {
    /// Policy file (TOML, JSON or YAML); JOBSCAN_* env vars override it
    #[arg(long, global = true)]
    policy: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the detection signals for a saved page
    Scan {
        #[arg(long)]
        html: PathBuf,
        /// URL the page was saved from
        #[arg(long)]
        url: String,
    },
    /// Detect, then extract the job fields of a saved page
    Extract {
        #[arg(long)]
        html: PathBuf,
        #[arg(long)]
        url: String,
    },
    /// Fetch a live page once, then detect and extract
    Fetch { url: String },
    /// Run the scan schedule against a page, then ask for the result
    Watch {
        #[arg(long, requires = "url", conflicts_with = "fetch")]
        html: Option<PathBuf>,
        #[arg(long)]
        url: Option<String>,
        /// Live URL, re-fetched on every scheduled scan
        #[arg(long, required_unless_present = "html")]
        fetch: Option<String>,
        /// How long to keep the page open
        #[arg(short, long, default_value = "6")]
        seconds: u64,
    },
    /// Check the policy against a labelled corpus directory
    Corpus { dir: PathBuf },
    /// Print the effective policy
    Policy,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let policy = Arc::new(Policy::load(cli.policy.as_deref())?);

    let result = match cli.command {
        Commands::Scan { html, url } => {
            let page = read_page(&html, &url)?;
            let signal = detect::scan(&page, &policy.detection);
            println!("{}", serde_json::to_string_pretty(&signal)?);
            Ok(())
        }
        Commands::Extract { html, url } => {
            let page = read_page(&html, &url)?;
            let mut detector = Detector::new(policy);
            let detection = detector.rescan(&page, ScanReason::PageLoad);
            match &detection.data {
                Some(data) => print_job(data)?,
                None => println!(
                    "Not a job page ({} keywords, host listed: {})",
                    detection.signal.keyword_count(),
                    detection.signal.host_allowed
                ),
            }
            Ok(())
        }
        Commands::Fetch { url } => {
            let mut source = HttpSource::new(url)?;
            let snapshot = source.snapshot().await?;
            let page = Page::from_snapshot(&snapshot)?;
            let mut detector = Detector::new(policy);
            let detection = detector.rescan(&page, ScanReason::PageLoad);
            println!("{}", serde_json::to_string_pretty(&detection.signal)?);
            if let Some(data) = &detection.data {
                print_job(data)?;
            }
            Ok(())
        }
        Commands::Watch {
            html,
            url,
            fetch,
            seconds,
        } => {
            let open_for = Duration::from_secs(seconds);
            let availability = match (html, url, fetch) {
                (Some(html), Some(url), _) => {
                    watch(FileSource::new(html, url), policy, open_for).await
                }
                (_, _, Some(url)) => watch(HttpSource::new(url)?, policy, open_for).await,
                _ => bail!("watch needs --html with --url, or --fetch"),
            };
            match availability {
                JobAvailability::Ready(data) => print_job(&data)?,
                JobAvailability::NotJobPage => println!("Not a job page."),
                JobAvailability::NotYetAvailable => println!("Page never finished its first scan."),
                JobAvailability::Unavailable => println!("Page context went away."),
            }
            Ok(())
        }
        Commands::Corpus { dir } => {
            let report = run_corpus(&dir, &policy)?;
            print_report(&report);
            if !report.all_passed() {
                bail!(
                    "{} of {} corpus cases failed",
                    report.cases.iter().filter(|r| !r.passed()).count(),
                    report.cases.len()
                );
            }
            Ok(())
        }
        Commands::Policy => {
            println!("{}", serde_json::to_string_pretty(policy.as_ref())?);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn read_page(path: &Path, url: &str) -> anyhow::Result<Page> {
    let html = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(Page::parse(&html, url)?)
}

/// Keep the page open for `open_for`, then ask for the job data over the
/// message channel before closing it.
async fn watch<S: SnapshotSource>(
    source: S,
    policy: Arc<Policy>,
    open_for: Duration,
) -> JobAvailability {
    let (client, endpoint) = messaging::channel(8);
    let (stop, stopped) = oneshot::channel::<()>();
    let trigger = Trigger::new(source, LogAffordance::default(), Detector::new(policy));

    let run = trigger.run(endpoint, async {
        let _ = stopped.await;
    });
    let ask = async {
        tokio::time::sleep(open_for).await;
        let availability = messaging::fetch_job_data(&client).await;
        let _ = stop.send(());
        availability
    };

    let (_, availability) = tokio::join!(run, ask);
    availability
}

fn run_corpus(dir: &Path, policy: &Policy) -> anyhow::Result<CorpusReport> {
    let total = corpus::load_manifest(dir)?.len();
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let report = corpus::evaluate_with(dir, policy, |_| pb.inc(1))?;
    pb.finish_and_clear();
    Ok(report)
}

fn print_job(data: &ExtractedJobData) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

fn print_report(report: &CorpusReport) {
    println!(
        "{:>3} | {:<24} | {:<28} | {:<8} | {:<14} | {:>3} | {:<24}",
        "#", "File", "URL", "Expected", "Verdict", "Kw", "Title"
    );
    println!("{}", "-".repeat(122));

    for (i, r) in report.cases.iter().enumerate() {
        let expected = if r.case.job_page { "job" } else { "not job" };
        let mut title = r.title.as_deref().map(|t| truncate(t, 24)).unwrap_or_else(|| "-".into());
        if !r.title_ok {
            title.push_str(" (!)");
        }
        println!(
            "{:>3} | {:<24} | {:<28} | {:<8} | {:<14} | {:>3} | {:<24}",
            i + 1,
            truncate(&r.case.file, 24),
            truncate(&r.case.url, 28),
            expected,
            format!("{:?}", r.verdict),
            r.keywords,
            title
        );
    }

    let failures: Vec<_> = report.cases.iter().filter_map(|r| r.error.as_ref().map(|e| (r, e))).collect();
    if !failures.is_empty() {
        println!("\n--- Errors ---");
        for (r, e) in failures {
            println!("  {}: {}", r.case.file, e);
        }
    }

    println!(
        "\nTP {} | TN {} | FP {} | FN {} | failed {} | title mismatches {}",
        report.true_positives,
        report.true_negatives,
        report.false_positives,
        report.false_negatives,
        report.failed,
        report.title_mismatches
    );
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
