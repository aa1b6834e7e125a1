//! Orchestration tests against a scripted in-memory vision backend.
//!
//! Page N of every test document is an N-pixel-wide image, so the scripted
//! backend can tell pages apart and answer `pN` for page N.

use async_trait::async_trait;
use image::{DynamicImage, RgbImage};
use notescribe::pipeline::note::NoteDecoder;
use notescribe::{
    Document, ErrorKind, InputFormat, PageImage, PageRange, SourceOptions, SourceResolver,
    TranscribeError, Transcriber, TranscriptionConfig, TranscriptionProgress,
    TranscriptionSummary, VisionProvider,
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

// ── Scripted backend ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Scripted {
    /// Fail any batch call that includes this page.
    fail_batch_with: Option<u32>,
    /// Fail the single-page call for this page.
    fail_page: Option<u32>,
    /// Wrap every response in a ```markdown fence.
    fence: bool,
    /// Add bold and highlight markup to every page's text.
    markup: bool,
    /// Report the backend as unreachable.
    offline: bool,
    /// Cancel this token once the given page has been transcribed.
    cancel_after: Option<(u32, CancellationToken)>,
    calls: Mutex<Vec<String>>,
}

impl Scripted {
    fn page_text(&self, page: u32) -> String {
        if self.markup {
            format!("**p{page}** said ==hi==")
        } else {
            format!("p{page}")
        }
    }

    fn respond(&self, text: String, last_page: u32) -> String {
        if let Some((page, token)) = &self.cancel_after {
            if *page == last_page {
                token.cancel();
            }
        }
        if self.fence {
            format!("```markdown\n{text}\n```\n")
        } else {
            text
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VisionProvider for Scripted {
    fn display_name(&self) -> String {
        "Scripted".to_string()
    }

    fn model(&self) -> &str {
        "scripted-1"
    }

    async fn is_available(&self) -> bool {
        !self.offline
    }

    async fn transcribe_one(&self, page: &PageImage, _prompt: &str) -> Result<String, TranscribeError> {
        let n = page.width();
        self.calls.lock().unwrap().push(format!("one:{n}"));
        if self.fail_page == Some(n) {
            return Err(TranscribeError::api("Scripted", format!("HTTP 500 on page {n}")));
        }
        Ok(self.respond(self.page_text(n), n))
    }

    async fn transcribe_batch(
        &self,
        pages: &[PageImage],
        prompt: &str,
    ) -> Result<String, TranscribeError> {
        let ids: Vec<u32> = pages.iter().map(|p| p.width()).collect();
        self.calls.lock().unwrap().push(format!(
            "batch:{}",
            ids.iter().map(u32::to_string).collect::<Vec<_>>().join(",")
        ));
        assert!(prompt.contains(&format!("{} consecutive pages", pages.len())));
        if self.fail_batch_with.is_some_and(|bad| ids.contains(&bad)) {
            return Err(TranscribeError::api("Scripted", "HTTP 529 overloaded"));
        }
        let text: Vec<String> = ids.iter().map(|&n| self.page_text(n)).collect();
        Ok(self.respond(text.join("\n\n"), *ids.last().unwrap()))
    }
}

// ── Progress recorder ────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl TranscriptionProgress for Recorder {
    fn on_transcription_start(&self, total_pages: usize, total_groups: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("start {total_pages}/{total_groups}"));
    }

    fn on_group_start(&self, range: PageRange) {
        self.events.lock().unwrap().push(format!("begin {range}"));
    }

    fn on_batch_fallback(&self, range: PageRange, _error: &TranscribeError) {
        self.events.lock().unwrap().push(format!("fallback {range}"));
    }

    fn on_group_complete(&self, range: PageRange, chars: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("done {range} {chars}"));
    }

    fn on_transcription_complete(&self, summary: &TranscriptionSummary) {
        self.events
            .lock()
            .unwrap()
            .push(format!("complete {}", summary.groups));
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn document(format: InputFormat, pages: u32) -> Document {
    let images = (1..=pages)
        .map(|w| DynamicImage::ImageRgb8(RgbImage::new(w, 2)))
        .collect();
    Document::from_images("scripted.note", format, images).unwrap()
}

fn config(batch_size: usize, page_separator: bool) -> TranscriptionConfig {
    TranscriptionConfig::builder()
        .batch_size(batch_size)
        .page_separator(page_separator)
        .build()
        .unwrap()
}

async fn run(provider: Arc<Scripted>, cfg: TranscriptionConfig, doc: &Document) -> String {
    Transcriber::new(provider, cfg)
        .transcribe_to_string(doc, &CancellationToken::new())
        .await
        .unwrap()
}

fn without_markers(text: &str) -> String {
    text.lines()
        .filter(|line| !line.starts_with("---- Page"))
        .collect::<Vec<_>>()
        .join("\n")
}

struct WidthNotes(u32);

impl NoteDecoder for WidthNotes {
    fn decode(&self, _path: &Path) -> Result<Vec<DynamicImage>, TranscribeError> {
        Ok((1..=self.0)
            .map(|w| DynamicImage::ImageRgb8(RgbImage::new(w, 2)))
            .collect())
    }
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn five_pages_in_pairs_with_markers() {
    let provider = Arc::new(Scripted::default());
    let out = run(provider.clone(), config(2, true), &document(InputFormat::Pdf, 5)).await;

    assert_eq!(
        out,
        "---- Pages 1-2 ----\np1\n\np2\n\n\
         ---- Pages 3-4 ----\np3\n\np4\n\n\
         ---- Page 5 ----\np5\n"
    );
    assert_eq!(provider.calls(), vec!["batch:1,2", "batch:3,4", "one:5"]);
}

#[tokio::test]
async fn note_file_through_resolver() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("journal.note");
    std::fs::write(&path, b"noteSN_FILE_VER_20230015").unwrap();

    let doc = SourceResolver::new(SourceOptions::default())
        .unwrap()
        .with_note_decoder(Arc::new(WidthNotes(4)))
        .resolve(&path)
        .await
        .unwrap();
    assert!(doc.is_multipage());

    let provider = Arc::new(Scripted::default());
    let out = run(provider.clone(), config(3, false), &doc).await;
    assert_eq!(out, "p1\n\np2\n\np3\n\np4\n");
    assert_eq!(provider.calls(), vec!["batch:1,2,3", "one:4"]);
}

#[tokio::test]
async fn single_png_ignores_batch_size_and_separator() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("page.png");
    RgbImage::new(7, 5).save(&path).unwrap();

    let doc = SourceResolver::new(SourceOptions::default())
        .unwrap()
        .resolve(&path)
        .await
        .unwrap();
    assert!(!doc.is_multipage());

    let provider = Arc::new(Scripted::default());
    let out = run(provider.clone(), config(5, true), &doc).await;
    assert_eq!(out, "p7\n");
    assert_eq!(provider.calls(), vec!["one:7"]);
}

#[tokio::test]
async fn fenced_responses_are_unwrapped() {
    let provider = Arc::new(Scripted {
        fence: true,
        ..Scripted::default()
    });
    let out = run(provider, config(2, false), &document(InputFormat::Pdf, 3)).await;
    assert_eq!(out, "p1\n\np2\n\np3\n");
    assert!(!out.contains("```"));
}

#[tokio::test]
async fn page_order_does_not_depend_on_batch_size() {
    let doc = document(InputFormat::Note, 7);
    let per_page = run(Arc::new(Scripted::default()), config(1, true), &doc).await;
    let whole = run(Arc::new(Scripted::default()), config(7, true), &doc).await;
    let threes = run(Arc::new(Scripted::default()), config(3, true), &doc).await;

    assert_eq!(without_markers(&per_page), without_markers(&whole));
    assert_eq!(without_markers(&per_page), without_markers(&threes));
    assert_eq!(per_page.matches("---- Page ").count(), 7);
}

#[tokio::test]
async fn batch_failure_only_affects_its_group() {
    let doc = document(InputFormat::Pdf, 6);
    let clean = run(Arc::new(Scripted::default()), config(2, true), &doc).await;

    let provider = Arc::new(Scripted {
        fail_batch_with: Some(3),
        ..Scripted::default()
    });
    let recorder = Arc::new(Recorder::default());
    let summary;
    let mut out = Vec::new();
    {
        let transcriber =
            Transcriber::new(provider.clone(), config(2, true)).with_progress(recorder.clone());
        summary = transcriber
            .transcribe_to_writer(&doc, &mut out, &CancellationToken::new())
            .await
            .unwrap();
    }

    assert_eq!(String::from_utf8(out).unwrap(), clean);
    assert_eq!(
        provider.calls(),
        vec!["batch:1,2", "batch:3,4", "one:3", "one:4", "batch:5,6"]
    );
    assert_eq!(summary.groups, 3);
    assert_eq!(summary.fallback_groups, 1);
    assert_eq!(summary.provider_calls, 5);
    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec![
            "start 6/3",
            "begin pages 1-2",
            "done pages 1-2 6",
            "begin pages 3-4",
            "fallback pages 3-4",
            "done pages 3-4 6",
            "begin pages 5-6",
            "done pages 5-6 6",
            "complete 3",
        ]
    );
}

#[tokio::test]
async fn failure_during_fallback_escalates_and_keeps_written_groups() {
    let provider = Arc::new(Scripted {
        fail_batch_with: Some(3),
        fail_page: Some(4),
        ..Scripted::default()
    });
    let transcriber = Transcriber::new(provider.clone(), config(2, false));
    let mut out = Vec::new();
    let err = transcriber
        .transcribe_to_writer(&document(InputFormat::Pdf, 6), &mut out, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TranscribeError::Page { page: 4, .. }), "got: {err}");
    assert_eq!(err.kind(), ErrorKind::ProviderApi);
    // Group 1 stays on the sink; nothing after the failure is attempted.
    assert_eq!(String::from_utf8(out).unwrap(), "p1\n\np2");
    assert_eq!(provider.calls(), vec!["batch:1,2", "batch:3,4", "one:3", "one:4"]);
}

#[tokio::test]
async fn cancellation_stops_before_next_group() {
    let cancel = CancellationToken::new();
    let provider = Arc::new(Scripted {
        cancel_after: Some((2, cancel.clone())),
        ..Scripted::default()
    });
    let transcriber = Transcriber::new(provider.clone(), config(2, true));
    let mut out = Vec::new();
    let err = transcriber
        .transcribe_to_writer(&document(InputFormat::Pdf, 5), &mut out, &cancel)
        .await
        .unwrap_err();

    assert!(
        matches!(
            err,
            TranscribeError::Interrupted {
                completed_groups: 1,
                total_groups: 3
            }
        ),
        "got: {err}"
    );
    assert_eq!(err.kind(), ErrorKind::Interrupted);
    assert_eq!(String::from_utf8(out).unwrap(), "---- Pages 1-2 ----\np1\n\np2");
    assert_eq!(provider.calls(), vec!["batch:1,2"]);
}

#[tokio::test]
async fn string_and_writer_sinks_are_byte_identical() {
    let doc = document(InputFormat::Note, 5);
    let cfg = TranscriptionConfig::builder()
        .batch_size(2)
        .page_separator(true)
        .plain_text(true)
        .build()
        .unwrap();
    let provider = Arc::new(Scripted {
        markup: true,
        fail_batch_with: Some(4),
        ..Scripted::default()
    });
    let transcriber = Transcriber::new(provider, cfg);
    let cancel = CancellationToken::new();

    let as_string = transcriber.transcribe_to_string(&doc, &cancel).await.unwrap();
    let mut as_bytes = Vec::new();
    transcriber
        .transcribe_to_writer(&doc, &mut as_bytes, &cancel)
        .await
        .unwrap();
    assert_eq!(as_string.as_bytes(), as_bytes.as_slice());
    assert!(as_string.ends_with("p5 said hi\n"));
    assert!(!as_string.ends_with("\n\n"));
}

#[tokio::test]
async fn plain_text_strips_markup_but_not_markers() {
    let provider = Arc::new(Scripted {
        markup: true,
        ..Scripted::default()
    });
    let cfg = TranscriptionConfig::builder()
        .batch_size(2)
        .page_separator(true)
        .plain_text(true)
        .build()
        .unwrap();
    let out = run(provider, cfg, &document(InputFormat::Pdf, 2)).await;
    assert_eq!(out, "---- Pages 1-2 ----\np1 said hi\n\np2 said hi\n");
}

#[tokio::test]
async fn invalid_configuration_is_rejected_at_build() {
    let err = TranscriptionConfig::builder()
        .temperature(2.5)
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let err = TranscriptionConfig::builder().batch_size(0).build().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[tokio::test]
async fn availability_is_visible_through_the_trait_object() {
    let online: Arc<dyn VisionProvider> = Arc::new(Scripted::default());
    let offline: Arc<dyn VisionProvider> = Arc::new(Scripted {
        offline: true,
        ..Scripted::default()
    });
    assert!(online.is_available().await);
    assert!(!offline.is_available().await);
    assert_eq!(online.display_name(), "Scripted");
}
