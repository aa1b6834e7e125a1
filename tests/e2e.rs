//! End-to-end tests against live vision backends.
//!
//! These use real handwritten samples in `./test_cases/` and make paid API
//! calls. They are gated behind `E2E_ENABLED` plus the credential of the
//! backend under test, so a plain `cargo test` skips them.
//!
//! Run with:
//!   E2E_ENABLED=1 GOOGLE_API_KEY=... cargo test --test e2e -- --nocapture
//!
//! Expected fixtures (any that are missing are skipped):
//!   test_cases/handwriting.png   one handwritten page
//!   test_cases/journal.pdf       a scanned notebook with 3+ pages

use notescribe::{
    create_provider, list_models, ModelListSource, ModelSpec, ProviderKind, ProviderSettings,
    SourceOptions, SourceResolver, Transcriber, TranscriptionConfig,
};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

fn output_dir() -> PathBuf {
    let d = test_cases_dir().join("output");
    std::fs::create_dir_all(&d).ok();
    d
}

/// Skip unless E2E_ENABLED is set and the settings carry what `$spec` needs.
macro_rules! e2e_settings_or_skip {
    ($spec:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let settings = ProviderSettings::from_env().expect("environment should parse");
        let spec = ModelSpec::parse($spec).expect("model spec should parse");
        let has_key = match spec.provider {
            ProviderKind::Anthropic => settings.anthropic_api_key.is_some(),
            ProviderKind::Google => settings.google_api_key.is_some(),
            ProviderKind::Ollama => true,
        };
        if !has_key {
            println!("SKIP: no API key for {}", spec.provider);
            return;
        }
        (settings, spec)
    }};
}

/// Skip if the fixture file is missing.
macro_rules! fixture_or_skip {
    ($name:expr) => {{
        let p = test_cases_dir().join($name);
        if !p.exists() {
            println!("SKIP: fixture not found: {}", p.display());
            return;
        }
        p
    }};
}

/// Basic sanity checks on a transcription.
fn assert_transcription_quality(text: &str, context: &str) {
    assert!(!text.trim().is_empty(), "[{context}] transcription is empty");
    assert!(text.ends_with('\n'), "[{context}] must end with a newline");
    assert!(
        !text.ends_with("\n\n"),
        "[{context}] must end with exactly one newline"
    );
    let first_line = text.lines().next().unwrap_or("");
    assert!(
        !first_line.starts_with("```"),
        "[{context}] output must not start with a code fence, got: {first_line:?}"
    );
    println!("[{context}] ✓  {} bytes", text.len());
}

async fn transcribe_fixture(spec: &str, fixture: PathBuf, config: TranscriptionConfig) -> Option<String> {
    let settings = ProviderSettings::from_env().ok()?;
    let spec = ModelSpec::parse(spec).ok()?;
    let provider = match create_provider(&spec, &settings, &config).await {
        Ok(p) => p,
        Err(e) => {
            println!("SKIP: provider unavailable: {e}");
            return None;
        }
    };
    let doc = SourceResolver::new(SourceOptions::default())
        .expect("default options are valid")
        .resolve(&fixture)
        .await
        .expect("fixture should decode");

    let text = Transcriber::new(provider, config)
        .transcribe_to_string(&doc, &CancellationToken::new())
        .await
        .expect("transcription should succeed");
    Some(text)
}

// ── Single image ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_gemini_flash_single_image() {
    let _ = e2e_settings_or_skip!("gemini-flash");
    let png = fixture_or_skip!("handwriting.png");

    let config = TranscriptionConfig::builder()
        .temperature(1.0)
        .page_separator(true)
        .build()
        .unwrap();
    let Some(text) = transcribe_fixture("gemini-flash", png, config).await else {
        return;
    };
    assert_transcription_quality(&text, "gemini-flash/png");
    assert!(!text.contains("---- Page"), "single image must not get markers");
}

#[tokio::test]
async fn test_claude_single_image_plain_text() {
    let _ = e2e_settings_or_skip!("claude-haiku");
    let png = fixture_or_skip!("handwriting.png");

    let config = TranscriptionConfig::builder().plain_text(true).build().unwrap();
    let Some(text) = transcribe_fixture("claude-haiku", png, config).await else {
        return;
    };
    assert_transcription_quality(&text, "claude-haiku/png");
    assert!(!text.contains("**"), "plain text must not contain bold markers");
    assert!(!text.contains("=="), "plain text must not contain highlight markers");
}

// ── Multi-page ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_gemini_pdf_batched_with_markers() {
    let _ = e2e_settings_or_skip!("gemini-flash");
    let pdf = fixture_or_skip!("journal.pdf");

    let config = TranscriptionConfig::builder()
        .temperature(1.0)
        .batch_size(2)
        .page_separator(true)
        .build()
        .unwrap();
    let Some(text) = transcribe_fixture("gemini-flash", pdf, config).await else {
        return;
    };
    assert_transcription_quality(&text, "gemini-flash/pdf");
    assert!(
        text.starts_with("---- Pages 1-2 ----\n") || text.starts_with("---- Page 1 ----\n"),
        "first block must carry a marker"
    );
    std::fs::write(output_dir().join("journal.gemini.md"), &text).ok();
}

#[tokio::test]
async fn test_ollama_pdf_per_page() {
    let _ = e2e_settings_or_skip!("ollama");
    let pdf = fixture_or_skip!("journal.pdf");

    let config = TranscriptionConfig::builder().batch_size(1).build().unwrap();
    let Some(text) = transcribe_fixture("ollama", pdf, config).await else {
        return;
    };
    assert_transcription_quality(&text, "ollama/pdf");
}

// ── Model catalogue ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_live_model_lists() {
    let (settings, _) = e2e_settings_or_skip!("gemini-flash");

    let (models, source) = list_models(ProviderKind::Google, &settings).await;
    assert_eq!(source, ModelListSource::Live);
    assert!(
        models.iter().any(|m| m.starts_with("gemini")),
        "expected at least one gemini model, got {models:?}"
    );
}
