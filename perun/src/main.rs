//! Perun CLI - review extremist-speech analysis results from the terminal
mod fmt;

use anyhow::{anyhow, bail, Context as _};
use clap::{Args, Parser, Subcommand};
use indicatif::{HumanBytes, HumanDuration, ProgressBar, ProgressStyle};
use owo_colors::OwoColorize as _;
use perun_core::api::{FeedbackRecord, FeedbackType, UploadFile, UploadRequest};
use perun_core::style::BorderLine;
use perun_core::{
    align, load_job_view, AnalysisReport, BatchProgress, BatchStore, ClientConfig, ExportFormat,
    FileBatchStore, JobView, PcmProbe, PerunClient, Rect, RiskLevel, SegmentStyle,
    SelectionCapture, Verdict, Waveform,
};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::fmt::PrefixFormatter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "PERUN_LOG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::builder()
                    .with_default_directive(LevelFilter::INFO.into())
                    .with_env_var(LOG_ENV)
                    .from_env()?,
            )
            .compact()
            .without_time()
            .with_target(false)
            .event_format(PrefixFormatter)
            .with_writer(std::io::stderr)
            .init();
    }
    debug!("Command line arguments: {:?}", cli);

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        process::exit(1);
    }
    Ok(())
}

const ABOUT: &str = "Review extremist-speech analysis of audio and video batches";

#[derive(Parser, Debug)]
#[command(name = env!("CARGO_PKG_NAME"), author = env!("CARGO_PKG_AUTHORS"))]
#[command(about = ABOUT)]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend base URL (defaults to $PERUN_API_URL or http://localhost:8000)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value = "30")]
    timeout: u64,

    /// Batch list file (defaults to the platform data directory)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload files as a new analysis batch
    Upload(UploadArgs),
    /// Manage the local list of batches
    Batches {
        #[command(subcommand)]
        command: BatchesCommands,
    },
    /// Show a batch and the status of its jobs
    Batch {
        #[arg(value_name = "BATCH_ID")]
        batch_id: String,

        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },
    /// Show the annotated transcript of a job
    Job {
        #[arg(value_name = "BATCH_ID")]
        batch_id: String,

        #[arg(value_name = "JOB_ID")]
        job_id: String,

        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },
    /// Reviewer feedback
    Feedback {
        #[command(subcommand)]
        command: FeedbackCommands,
    },
    /// Print the volume envelope of a job's media
    Waveform {
        #[arg(value_name = "BATCH_ID")]
        batch_id: String,

        #[arg(value_name = "JOB_ID")]
        job_id: String,

        /// Media duration in seconds, for files that cannot be decoded
        #[arg(long)]
        duration: Option<f64>,

        /// RMS gain applied before scaling to 0-100
        #[arg(long, default_value = "4.0")]
        gain: f32,
    },
    /// Export a job report
    Export {
        #[arg(value_name = "BATCH_ID")]
        batch_id: String,

        #[arg(value_name = "JOB_ID")]
        job_id: String,

        /// Report format: json, csv
        #[arg(long, default_value = "json")]
        format: ReportFormat,

        /// Media duration in seconds, used for the flagged percentage
        #[arg(long)]
        duration: Option<f64>,

        /// Output file path (writes to file instead of stdout)
        #[arg(short = 'f', long = "output-file")]
        output_file: Option<PathBuf>,
    },
    /// Check that the backend and its database are reachable
    Health,
}

#[derive(Args, Debug)]
struct UploadArgs {
    /// Batch name
    #[arg(short, long)]
    name: String,

    /// Batch description
    #[arg(short, long, default_value = "")]
    description: String,

    /// Definition of what to flag (repeatable)
    #[arg(long = "definition", value_name = "TEXT")]
    definitions: Vec<String>,

    /// Example of text that should be flagged (repeatable)
    #[arg(long = "positive", value_name = "TEXT")]
    positive_examples: Vec<String>,

    /// Example of text that should not be flagged (repeatable)
    #[arg(long = "negative", value_name = "TEXT")]
    negative_examples: Vec<String>,

    /// Audio or video files to analyse
    #[arg(value_name = "FILES", required = true)]
    files: Vec<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum BatchesCommands {
    /// List known batches, newest first
    List,
    /// Remember a batch id
    Add {
        #[arg(value_name = "BATCH_ID")]
        batch_id: String,
    },
    /// Forget a batch id
    Remove {
        #[arg(value_name = "BATCH_ID")]
        batch_id: String,
    },
    /// Forget all batch ids
    Clear,
}

#[derive(Subcommand, Debug)]
enum FeedbackCommands {
    /// Confirm a piece of transcript text as a violation
    Add {
        batch_id: String,
        job_id: String,
        /// Transcript text to flag
        text: String,
    },
    /// Reject a machine flag as a false positive
    Reject {
        batch_id: String,
        job_id: String,
        /// Text of the flagged span
        text: String,
    },
    /// List feedback of a job or of a whole batch
    List {
        #[arg(long, conflicts_with = "batch", required_unless_present = "batch")]
        job: Option<String>,

        #[arg(long)]
        batch: Option<String>,

        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },
    /// Delete a feedback record
    Delete {
        #[arg(value_name = "FEEDBACK_ID")]
        feedback_id: String,
    },
    /// Show a batch's feedback grouped as training examples
    Summary {
        #[arg(value_name = "BATCH_ID")]
        batch_id: String,
    },
}

/// Output format options
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum OutputFormat {
    /// Human-readable, coloured output
    Text,
    /// JSON output
    Json,
}

/// Report format options
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum ReportFormat {
    Json,
    Csv,
}

impl From<ReportFormat> for ExportFormat {
    fn from(value: ReportFormat) -> Self {
        match value {
            ReportFormat::Json => ExportFormat::Json,
            ReportFormat::Csv => ExportFormat::Csv,
        }
    }
}

struct Context {
    config: ClientConfig,
    store_path: Option<PathBuf>,
}

impl Context {
    fn client(&self) -> anyhow::Result<PerunClient> {
        Ok(PerunClient::new(self.config.clone())?)
    }

    fn store(&self) -> anyhow::Result<FileBatchStore> {
        match &self.store_path {
            Some(path) => Ok(FileBatchStore::new(path)),
            None => Ok(FileBatchStore::default_location()?),
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = ClientConfig::from_env()
        .with_timeout(Some(Duration::from_secs(cli.timeout)))
        .with_verbose(cli.verbose);
    if let Some(url) = cli.api_url {
        config = config.with_api_base_url(url);
    }
    let ctx = Context {
        config,
        store_path: cli.store,
    };

    match cli.command {
        Commands::Upload(args) => handle_upload(&ctx, args).await,
        Commands::Batches { command } => handle_batches_command(&ctx, command),
        Commands::Batch { batch_id, output } => handle_batch(&ctx, &batch_id, output).await,
        Commands::Job {
            batch_id,
            job_id,
            output,
        } => handle_job(&ctx, &batch_id, &job_id, output).await,
        Commands::Feedback { command } => handle_feedback_command(&ctx, command).await,
        Commands::Waveform {
            batch_id,
            job_id,
            duration,
            gain,
        } => {
            let config = ctx.config.clone().with_waveform_gain(gain);
            handle_waveform(&ctx, &config, &batch_id, &job_id, duration).await
        }
        Commands::Export {
            batch_id,
            job_id,
            format,
            duration,
            output_file,
        } => {
            handle_export(
                &ctx,
                &batch_id,
                &job_id,
                format.into(),
                duration,
                output_file,
            )
            .await
        }
        Commands::Health => handle_health(&ctx).await,
    }
}

async fn handle_upload(ctx: &Context, args: UploadArgs) -> anyhow::Result<()> {
    let mut files = Vec::with_capacity(args.files.len());
    let mut total_bytes = 0u64;
    for path in &args.files {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        total_bytes += bytes.len() as u64;
        files.push(UploadFile {
            file_name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string()),
            content_type: guess_content_type(path).map(str::to_string),
            bytes,
        });
    }

    let request = UploadRequest {
        name: args.name,
        description: args.description,
        default_definitions: args.definitions,
        positive_examples: args.positive_examples,
        negative_examples: args.negative_examples,
        files,
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.set_message(format!("Uploading {}...", HumanBytes(total_bytes)));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = ctx.client()?.upload_batch(request).await;
    let elapsed = spinner.elapsed();
    spinner.finish_and_clear();
    let response = result?;

    ctx.store()?.add(&response.batch_id)?;
    println!(
        "{} Batch {} created in {:#}.",
        "Success:".green().bold(),
        response.batch_id.cyan(),
        HumanDuration(elapsed)
    );
    Ok(())
}

fn handle_batches_command(ctx: &Context, command: BatchesCommands) -> anyhow::Result<()> {
    let mut store = ctx.store()?;

    match command {
        BatchesCommands::List => {
            let ids = store.list()?;
            if ids.is_empty() {
                println!("{} No batches yet.", "Info:".blue().bold());
                println!(
                    "Use {}{} to create one.",
                    env!("CARGO_PKG_NAME").cyan(),
                    " upload --name <NAME> <FILES>...".cyan()
                );
            } else {
                for id in ids {
                    println!("{}", id);
                }
            }
        }
        BatchesCommands::Add { batch_id } => {
            store.add(&batch_id)?;
            println!("{} Added batch {}.", "Success:".green().bold(), batch_id.cyan());
        }
        BatchesCommands::Remove { batch_id } => {
            if store.remove(&batch_id)? {
                println!(
                    "{} Removed batch {}.",
                    "Success:".green().bold(),
                    batch_id.cyan()
                );
            } else {
                println!(
                    "{} Batch {} is not in the list.",
                    "Warning:".yellow().bold(),
                    batch_id
                );
            }
        }
        BatchesCommands::Clear => {
            store.clear()?;
            println!("{} Batch list cleared.", "Success:".green().bold());
        }
    }

    Ok(())
}

async fn handle_batch(ctx: &Context, batch_id: &str, output: OutputFormat) -> anyhow::Result<()> {
    let batch = ctx.client()?.batch(batch_id).await?;

    if let OutputFormat::Json = output {
        println!("{}", serde_json::to_string_pretty(&batch)?);
        return Ok(());
    }

    let progress = BatchProgress::new(&batch);
    println!("{}", batch.name.blue().bold());
    if let Some(description) = batch.description.as_deref().filter(|d| !d.is_empty()) {
        println!("{}", description.dimmed());
    }
    println!(
        "{}/{} jobs completed ({:.0}%)",
        progress.completed,
        progress.total,
        progress.completed_fraction() * 100.0
    );
    println!();

    for job in &batch.jobs {
        let status = job.status.to_string();
        let status = match job.status {
            perun_core::api::JobStatus::Completed => status.green().to_string(),
            perun_core::api::JobStatus::Failed => status.red().to_string(),
            perun_core::api::JobStatus::Unknown => status.dimmed().to_string(),
            _ => status.yellow().to_string(),
        };
        println!("  {}  {}  [{}]", job.job_id.cyan(), job.filename, status);
    }

    Ok(())
}

async fn handle_job(
    ctx: &Context,
    batch_id: &str,
    job_id: &str,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let view = load_job_view(&ctx.client()?, batch_id, job_id).await?;

    if let OutputFormat::Json = output {
        println!("{}", serde_json::to_string_pretty(view.segments())?);
        return Ok(());
    }

    println!("{}", render_transcript(&view));
    println!();

    if view.spans().is_empty() {
        println!("{} No flagged spans.", "Info:".blue().bold());
    } else {
        println!("{}", "Flagged spans:".blue().bold());
        for span in view.spans() {
            let timestamp = match (span.start, span.end) {
                (Some(start), Some(end)) => perun_core::timestamp::format_range(start, end),
                (Some(start), None) => perun_core::timestamp::format_padded(start),
                _ => "[--:--]".to_string(),
            };
            let confidence = span
                .confidence
                .map(|c| format!("{:.0}%", c * 100.0))
                .unwrap_or_default();
            println!(
                "  {} {} {} {}",
                timestamp.dimmed(),
                confidence.yellow(),
                span.flag(),
                span.text
            );
            if let Some(rationale) = &span.rationale {
                println!("      {}", rationale.dimmed());
            }
        }
    }

    let summary = view.summary();
    println!();
    let risk = format!("Risk level: {}", summary.risk_level.to_string().to_uppercase());
    let risk = match summary.risk_level {
        RiskLevel::High => risk.red().bold().to_string(),
        RiskLevel::Medium => risk.yellow().bold().to_string(),
        RiskLevel::Low => risk.green().bold().to_string(),
    };
    println!("{} {}", risk, summary.risk_level.message());
    if let Some(avg) = summary.average_confidence {
        println!("Average confidence: {:.0}%", avg * 100.0);
    }
    println!("Feedback: {} record(s)", view.feedback().len());

    Ok(())
}

/// Transcript with flagged spans coloured by confidence
fn render_transcript(view: &JobView) -> String {
    let mut out = String::new();
    for segment in view.segments() {
        let Some(annotation) = segment.annotation() else {
            out.push_str(&segment.text);
            continue;
        };

        let style = SegmentStyle::for_annotation(annotation);
        let rendered = if style.border_line == BorderLine::Dashed {
            segment.text.dimmed().strikethrough().to_string()
        } else {
            let c = style.border;
            let text = segment.text.truecolor(c.r, c.g, c.b).bold().underline().to_string();
            if annotation.verdict == Some(Verdict::Confirmed) {
                format!("{}{}", text, "✓".green())
            } else {
                text
            }
        };
        out.push_str(&rendered);
    }
    out
}

async fn handle_feedback_command(ctx: &Context, command: FeedbackCommands) -> anyhow::Result<()> {
    let client = ctx.client()?;

    match command {
        FeedbackCommands::Add {
            batch_id,
            job_id,
            text,
        } => {
            let view = load_job_view(&client, &batch_id, &job_id).await?;
            if align::find_ignore_case(&view.transcript().text, text.trim(), 0).is_none() {
                bail!("Text not found in the transcript: {:?}", text);
            }

            let mut capture = SelectionCapture::new();
            capture
                .on_pointer_up(&text, Rect::default(), view.segments(), view.feedback())
                .ok_or_else(|| {
                    anyhow!("Text overlaps a flagged span or already has feedback; use `feedback reject` for flagged spans")
                })?;
            let feedback = capture
                .confirm(&job_id, &batch_id)
                .ok_or_else(|| anyhow!("No pending selection"))?;

            let record = client.create_feedback(&feedback).await?;
            println!(
                "{} Recorded feedback {}.",
                "Success:".green().bold(),
                record.id.cyan()
            );
        }

        FeedbackCommands::Reject {
            batch_id,
            job_id,
            text,
        } => {
            let view = load_job_view(&client, &batch_id, &job_id).await?;
            let needle = text.trim().to_lowercase();
            let span = view
                .spans()
                .iter()
                .find(|s| s.text.trim().to_lowercase() == needle)
                .or_else(|| {
                    view.spans()
                        .iter()
                        .find(|s| s.text.to_lowercase().contains(&needle))
                })
                .ok_or_else(|| anyhow!("No flagged span matches {:?}", text))?;

            let feedback = SelectionCapture::reject_span(&job_id, &batch_id, span);
            let record = client.create_feedback(&feedback).await?;
            println!(
                "{} Rejected {:?} as a false positive ({}).",
                "Success:".green().bold(),
                span.text,
                record.id.cyan()
            );
        }

        FeedbackCommands::List { job, batch, output } => {
            let records = match (job, batch) {
                (Some(job), _) => client.job_feedback(&job).await?,
                (None, Some(batch)) => client.batch_feedback(&batch).await?,
                (None, None) => bail!("Provide --job or --batch"),
            };

            if let OutputFormat::Json = output {
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(());
            }

            if records.is_empty() {
                println!("{} No feedback yet.", "Info:".blue().bold());
            }
            for record in &records {
                print_feedback(record);
            }
        }

        FeedbackCommands::Delete { feedback_id } => {
            client.delete_feedback(&feedback_id).await?;
            println!(
                "{} Feedback {} deleted.",
                "Success:".green().bold(),
                feedback_id
            );
        }

        FeedbackCommands::Summary { batch_id } => {
            let summary = client.batch_feedback_summary(&batch_id).await?;
            println!("{}", "Confirmed examples:".green().bold());
            for text in &summary.positive_examples {
                println!("  {}", text);
            }
            println!("{}", "Rejected examples:".red().bold());
            for text in &summary.negative_examples {
                println!("  {}", text);
            }
        }
    }

    Ok(())
}

fn print_feedback(record: &FeedbackRecord) {
    let kind = match record.feedback_type {
        FeedbackType::Positive => "confirmed".green().to_string(),
        FeedbackType::Negative => "rejected".red().to_string(),
    };
    println!(
        "  {}  {}  {}  {}",
        record.id.cyan(),
        record.created_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
        kind,
        record.text
    );
}

async fn handle_waveform(
    ctx: &Context,
    config: &ClientConfig,
    batch_id: &str,
    job_id: &str,
    duration: Option<f64>,
) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let view = load_job_view(&client, batch_id, job_id).await?;

    // Create progress bar
    let progress_bar = ProgressBar::new(0);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
            .progress_chars("#>-"),
    );
    let blob = client
        .job_file_with_progress(batch_id, job_id, |downloaded, total| {
            if let Some(total) = total {
                if progress_bar.length().unwrap_or(0) != total {
                    progress_bar.set_length(total);
                }
            }
            progress_bar.set_position(downloaded);
        })
        .await?;
    progress_bar.finish_and_clear();
    info!("Downloaded {} of media", HumanBytes(blob.bytes.len() as u64));

    let extension = blob.extension_hint();
    debug!("Decoding {:?} media (hint {:?})", blob.content_type, extension);
    let mut probe = match PcmProbe::from_media_bytes(blob.bytes, extension) {
        Ok(probe) => Some(probe),
        Err(e) => {
            warn!("Could not decode media: {}", e);
            None
        }
    };

    let duration = duration
        .or_else(|| probe.as_ref().map(PcmProbe::duration))
        .or_else(|| view.spans().iter().filter_map(|s| s.end).reduce(f64::max))
        .ok_or_else(|| anyhow!("Cannot determine the media duration; pass --duration"))?;

    let waveform = Waveform::build(probe.as_mut(), duration, config.waveform_gain, view.spans());
    if waveform.synthetic {
        println!(
            "{} Showing a synthetic envelope; the media could not be sampled.",
            "Notice:".yellow().bold()
        );
    }

    for point in &waveform.points {
        let bar = "█".repeat((point.amplitude / 100.0 * 40.0).round() as usize);
        let bar = if point.is_flagged() {
            bar.red().to_string()
        } else {
            bar.cyan().to_string()
        };
        println!("{:>6} {:>5.1} {}", point.time_label(), point.amplitude, bar);
    }
    println!(
        "{} of {} points fall within flagged spans.",
        waveform.flagged_count(),
        waveform.points.len()
    );

    Ok(())
}

async fn handle_export(
    ctx: &Context,
    batch_id: &str,
    job_id: &str,
    format: ExportFormat,
    duration: Option<f64>,
    output_file: Option<PathBuf>,
) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let batch = client.batch(batch_id).await?;
    let result = client.job(batch_id, job_id).await?;
    let file = batch
        .jobs
        .iter()
        .find(|job| job.job_id == job_id)
        .map(|job| job.filename.clone())
        .unwrap_or_else(|| result.audio_file_id.clone());

    let spans: Vec<_> = result
        .spans
        .iter()
        .map(perun_core::AnnotationSpan::from)
        .collect();
    let report = AnalysisReport::new(file, &spans, duration, chrono::Utc::now());
    let content = report.render(format)?;

    if let Some(output_file) = output_file {
        std::fs::write(&output_file, &content)?;
        println!(
            "{} Report written to: {}",
            "Success:".green().bold(),
            output_file.display()
        );
    } else {
        println!("{}", content);
    }
    Ok(())
}

async fn handle_health(ctx: &Context) -> anyhow::Result<()> {
    let health = ctx.client()?.health().await?;
    println!(
        "{} {} (database: {})",
        "Backend:".blue().bold(),
        health.status.green(),
        health.database
    );
    Ok(())
}

/// Content type for common media extensions
fn guess_content_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_lowercase();
    let content_type = match extension.as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        _ => return None,
    };
    Some(content_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use perun_core::{AnnotationSpan, Transcript};

    #[test]
    fn test_content_type_guess() {
        assert_eq!(guess_content_type(Path::new("a/B.WAV")), Some("audio/wav"));
        assert_eq!(guess_content_type(Path::new("clip.mp4")), Some("video/mp4"));
        assert_eq!(guess_content_type(Path::new("notes.txt")), None);
        assert_eq!(guess_content_type(Path::new("noext")), None);
    }

    #[test]
    fn test_render_transcript_keeps_text() {
        let view = JobView::new(
            Transcript::new("calm words, angry words"),
            vec![AnnotationSpan::machine("angry words", 0.9)],
        );
        let rendered = render_transcript(&view);
        assert!(rendered.starts_with("calm words, "));
        assert!(rendered.contains("angry words"));
    }
}
