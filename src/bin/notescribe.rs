//! CLI binary for notescribe.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `TranscriptionConfig` / `SourceOptions`, renders progress and writes the
//! transcription to stdout or a file.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use notescribe::provider::spec::{SHORTCUTS, DEFAULT_MODEL_SPEC};
use notescribe::{
    create_provider, list_models, InputFormat, ModelListSource, ModelSpec, PageRange,
    ProgressCallback, ProviderKind, ProviderSettings, SourceOptions, SourceResolver,
    TranscribeError, Transcriber, TranscriptionConfig, TranscriptionProgress,
    TranscriptionSummary,
};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Renders a page-count progress bar plus one log line per finished group.
struct CliProgress {
    bar: ProgressBar,
    group_started: Mutex<Option<Instant>>,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Decoding pages…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            group_started: Mutex::new(None),
        })
    }

    fn activate_bar(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Transcribing");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self) -> f64 {
        self.group_started
            .lock()
            .ok()
            .and_then(|mut started| started.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn abandon(&self) {
        self.bar.finish_and_clear();
    }
}

impl TranscriptionProgress for CliProgress {
    fn on_transcription_start(&self, total_pages: usize, total_groups: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "Transcribing {total_pages} page(s) in {total_groups} call group(s)…"
            ))
        ));
    }

    fn on_group_start(&self, range: PageRange) {
        if let Ok(mut started) = self.group_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(range.to_string());
    }

    fn on_batch_fallback(&self, range: PageRange, error: &TranscribeError) {
        let msg = error.to_string();
        let msg = match msg.char_indices().nth(80) {
            Some((cut, _)) => format!("{}\u{2026}", &msg[..cut]),
            None => msg,
        };
        self.bar.println(format!(
            "  {} {:<12} {}  {}",
            yellow("⚠"),
            range.to_string(),
            dim("batch failed, retrying page by page:"),
            red(&msg),
        ));
    }

    fn on_group_complete(&self, range: PageRange, chars: usize) {
        self.bar.println(format!(
            "  {} {:<12} {:<8}  {}",
            green("✓"),
            range.to_string(),
            dim(&format!("{chars:>5} chars")),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(range.len() as u64);
    }

    fn on_transcription_complete(&self, summary: &TranscriptionSummary) {
        self.bar.finish_and_clear();
        let mark = if summary.fallback_groups == 0 {
            green("✔")
        } else {
            yellow("⚠")
        };
        eprintln!(
            "{} {} page(s) transcribed  {}",
            mark,
            bold(&summary.total_pages.to_string()),
            dim(&format!(
                "{} call(s), {} fallback group(s), {:.1}s",
                summary.provider_calls,
                summary.fallback_groups,
                summary.duration_ms as f64 / 1000.0
            )),
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Transcribe a notebook to stdout with the default model (gemini-flash)
  notescribe transcribe journal.note

  # Write to a file, two pages per call, with page markers
  notescribe transcribe journal.pdf -o journal.md --batch-size 2 --page-separator

  # Use Claude, plain text without emphasis markers
  notescribe transcribe page.png -m claude --plain-text

  # Local model through Ollama
  notescribe transcribe journal.note -m ollama:qwen2.5-vl:7b

  # Show available models
  notescribe list-models

MODEL SPECIFIERS:
  claude, claude-sonnet   Anthropic Claude Sonnet
  claude-haiku            Anthropic Claude Haiku
  gemini, gemini-pro      Google Gemini 3 Pro
  gemini-flash            Google Gemini 3 Flash (default)
  ollama                  First vision model installed in Ollama
  provider:model          Exact model, e.g. google:gemini-2.5-pro

ENVIRONMENT VARIABLES:
  ANTHROPIC_API_KEY            Anthropic API key
  GOOGLE_API_KEY               Google AI Studio API key
  OLLAMA_BASE_URL              Ollama server (default http://localhost:11434)
  NOTESCRIBE_REQUEST_TIMEOUT   Per-call timeout in seconds (default 120)
  PDFIUM_LIB_PATH              Path to an existing libpdfium
  RUST_LOG                     Override log filtering

Note files are decoded with supernote-tool (pip install supernotelib).
"#;

/// Transcribe handwritten notes to Markdown using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "notescribe",
    version,
    about = "Transcribe handwritten notes, PDFs and page images to Markdown using Vision LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "NOTESCRIBE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "NOTESCRIBE_QUIET")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Transcribe a .note, .pdf or image file.
    Transcribe(TranscribeArgs),
    /// List the models each backend offers.
    ListModels,
}

#[derive(Args, Debug)]
struct TranscribeArgs {
    /// Input file (.note, .pdf, .png, .jpg, .jpeg, .webp).
    input: PathBuf,

    /// Write the transcription to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Model shortcut or provider:model.
    #[arg(short, long, env = "NOTESCRIBE_MODEL", default_value = DEFAULT_MODEL_SPEC)]
    model: String,

    /// Sampling temperature (0.0–2.0). Default: 1.0 for Gemini 3, else 0.2.
    #[arg(long)]
    temperature: Option<f32>,

    /// Consecutive pages per model call.
    #[arg(short, long, default_value_t = notescribe::config::DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Insert "---- Page N ----" markers before each group.
    #[arg(long)]
    page_separator: bool,

    /// Strip bold, italic and highlight markers from the output.
    #[arg(long)]
    plain_text: bool,

    /// Extra instructions appended to the prompt (names, terminology, …).
    #[arg(long)]
    prompt: Option<String>,

    /// Override format detection.
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// PDF only: render every page even when embedded images exist.
    #[arg(long)]
    force_render: bool,

    /// PDF only: rendering resolution.
    #[arg(long, default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(1..=1200))]
    dpi: u32,

    /// Path to libpdfium; the system library is used when unset.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Program used to decode .note files.
    #[arg(long, default_value = "supernote-tool")]
    note_decoder: String,

    /// Disable the progress bar.
    #[arg(long, env = "NOTESCRIBE_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Note,
    Pdf,
    Image,
}

impl From<FormatArg> for InputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Note => InputFormat::Note,
            FormatArg::Pdf => InputFormat::Pdf,
            FormatArg::Image => InputFormat::Image,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs would tear the progress bar, so the bar lowers the
    // default to WARN; fallbacks still show up.
    let show_progress = match &cli.command {
        Command::Transcribe(args) => !cli.quiet && !args.no_progress,
        Command::ListModels => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if show_progress {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let result = match cli.command {
        Command::Transcribe(args) => transcribe(args, cli.quiet, show_progress).await,
        Command::ListModels => print_models().await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", red("Error:"));
            ExitCode::FAILURE
        }
    }
}

async fn transcribe(args: TranscribeArgs, quiet: bool, show_progress: bool) -> Result<()> {
    // ── Validate everything before any network call ──────────────────────
    let settings = ProviderSettings::from_env().context("Invalid environment")?;
    let spec = ModelSpec::parse(&args.model)?;
    let temperature = args
        .temperature
        .unwrap_or_else(|| spec.default_temperature());

    let config = TranscriptionConfig::builder()
        .temperature(temperature)
        .batch_size(args.batch_size)
        .page_separator(args.page_separator)
        .plain_text(args.plain_text)
        .additional_prompt(args.prompt.clone().unwrap_or_default())
        .build()?;

    let format = match args.format {
        Some(f) => f.into(),
        None => InputFormat::from_path(&args.input)?,
    };
    let defaults = SourceOptions::default();
    if format != InputFormat::Pdf && (args.force_render || args.dpi != defaults.dpi) {
        warn!("--force-render and --dpi only apply to PDF input; ignoring them for {format} input");
    }
    if !format.is_multipage() && (args.batch_size != notescribe::config::DEFAULT_BATCH_SIZE || args.page_separator) {
        warn!("{format} input has one page; --batch-size and --page-separator have no effect");
    }

    let resolver = SourceResolver::new(SourceOptions {
        dpi: args.dpi,
        force_render: args.force_render,
        note_decoder: args.note_decoder.clone(),
        pdfium_library: args.pdfium_lib.clone(),
        ..defaults
    })?;

    let progress = show_progress.then(CliProgress::new);

    let document = resolver
        .resolve_as(&args.input, format)
        .await
        .inspect_err(|_| abandon(&progress))
        .with_context(|| format!("Failed to read '{}'", args.input.display()))?;

    let provider = create_provider(&spec, &settings, &config)
        .await
        .inspect_err(|_| abandon(&progress))?;
    if !provider.is_available().await {
        abandon(&progress);
        bail!("{} is not reachable", provider.display_name());
    }
    if !quiet {
        let line = format!(
            "{} {}  {}",
            cyan("◆"),
            bold(&provider.display_name()),
            dim(&format!("temperature={:.1}", config.temperature())),
        );
        match &progress {
            Some(p) => p.bar.println(line),
            None => eprintln!("{line}"),
        }
    }

    let mut transcriber = Transcriber::new(provider, config);
    if let Some(p) = &progress {
        transcriber = transcriber.with_progress(p.clone() as ProgressCallback);
    }

    // ── Ctrl-C stops before the next group ───────────────────────────────
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    // A second Ctrl-C exits without waiting for the in-flight call.
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if on_signal.is_cancelled() {
                eprintln!("{}", red("Interrupted twice, exiting."));
                std::process::exit(130);
            }
            warn!("Stopping after the current group; press Ctrl-C again to exit now");
            on_signal.cancel();
        }
    });

    let summary = match &args.output {
        Some(path) => transcriber.transcribe_to_file(&document, path, &cancel).await,
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            transcriber
                .transcribe_to_writer(&document, &mut handle, &cancel)
                .await
        }
    }
    .inspect_err(|_| abandon(&progress))
    .context("Transcription failed")?;

    if !quiet && progress.is_none() {
        eprintln!(
            "Transcribed {} page(s) in {}ms ({} call(s), {} fallback group(s))",
            summary.total_pages, summary.duration_ms, summary.provider_calls, summary.fallback_groups
        );
    }
    if let (Some(path), false) = (&args.output, quiet) {
        eprintln!("   {}  {}", dim("→"), bold(&path.display().to_string()));
    }
    Ok(())
}

fn abandon(progress: &Option<Arc<CliProgress>>) {
    if let Some(p) = progress {
        p.abandon();
    }
}

async fn print_models() -> Result<()> {
    let settings = ProviderSettings::from_env().context("Invalid environment")?;

    for kind in ProviderKind::ALL {
        let (models, source) = list_models(kind, &settings).await;
        let origin = match source {
            ModelListSource::Live => green("live"),
            ModelListSource::Static => dim("built-in list"),
        };
        println!("{} ({origin})", bold(kind.as_str()));
        if models.is_empty() {
            println!("  {}", dim("no models available"));
        }
        for model in models {
            println!("  {kind}:{model}");
        }
        println!();
    }

    println!("{}", bold("shortcuts"));
    for (name, kind, model, tier) in SHORTCUTS {
        let target = match model {
            Some(m) => format!("{kind}:{m}"),
            None => format!("{kind} ({tier:?} tier default)"),
        };
        let marker = if *name == DEFAULT_MODEL_SPEC { " (default)" } else { "" };
        println!("  {name:<14} {target}{}", dim(marker));
    }
    Ok(())
}
