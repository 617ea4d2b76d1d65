//! Pipeline orchestrator: extraction → analysis, as an explicit state machine.
//!
//! One [`DocumentPipeline`] drives one run at a time. Every run gets a
//! fresh run id; each transition is applied only while that id is still the
//! current one, so a completion arriving after a reset or after a newer run
//! started is dropped instead of overwriting fresh state.
//!
//! State is published on a `tokio::sync::watch` channel. Callers read
//! snapshots (`state()`) or `subscribe()` for change notifications; nothing
//! ever needs to catch an error from this layer.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::pipeline::analysis::{
    AnalysisContext, AnalysisError, AnalysisOptions, AnalysisResult, MedicalAnalyzer,
};
use crate::pipeline::extraction::{
    Document, DocumentExtractor, ExtractedText, ExtractionError, MediaKind, ValidationError,
};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Any stage failure. Displays exactly as the failing stage's error.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

/// Building a pipeline from configuration failed.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("OCR engine initialization failed: {0}")]
    Ocr(#[from] crate::pipeline::extraction::OcrError),

    #[error("Analysis client initialization failed: {0}")]
    Analysis(#[from] crate::pipeline::analysis::RemoteServiceError),
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    #[default]
    Idle,
    Extracting,
    Analyzing,
    Complete,
    Error,
}

/// Snapshot of one pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineState {
    pub stage: PipelineStage,
    pub original_file: Option<Document>,
    pub extracted_text: Option<ExtractedText>,
    pub analysis: Option<AnalysisResult>,
    /// 0-100.
    pub extraction_progress: u8,
    /// 0-100.
    pub analysis_progress: u8,
    pub error: Option<String>,
    /// Declared media type of the uploaded file.
    pub file_type: Option<String>,
    pub word_count: usize,
    /// Current run. `None` when idle after a reset.
    pub run_id: Option<Uuid>,
}

/// Extraction's share of the overall progress bar, in percent.
const EXTRACTION_WEIGHT: f32 = 70.0;
const ANALYSIS_WEIGHT: f32 = 30.0;

impl PipelineState {
    /// Weighted progress in `[0, 100]`.
    pub fn overall_progress(&self) -> f32 {
        match self.stage {
            PipelineStage::Extracting => {
                self.extraction_progress as f32 * EXTRACTION_WEIGHT / 100.0
            }
            PipelineStage::Analyzing => {
                EXTRACTION_WEIGHT + self.analysis_progress as f32 * ANALYSIS_WEIGHT / 100.0
            }
            PipelineStage::Complete => 100.0,
            PipelineStage::Idle | PipelineStage::Error => 0.0,
        }
    }

    pub fn is_processing(&self) -> bool {
        matches!(self.stage, PipelineStage::Extracting | PipelineStage::Analyzing)
    }

    pub fn is_complete(&self) -> bool {
        self.stage == PipelineStage::Complete
    }

    pub fn has_error(&self) -> bool {
        self.stage == PipelineStage::Error
    }
}

/// In-flight progress tops out at 99; 100 is set only by a successful stage.
fn in_flight_percent(fraction: f32) -> u8 {
    (fraction.clamp(0.0, 1.0) * 100.0).round().min(99.0) as u8
}

/// How a run ended, from the caller's point of view.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(AnalysisResult),
    Failed(String),
    /// A reset or a newer run replaced this one; its results were dropped.
    Superseded,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct DocumentPipeline {
    extractor: Arc<DocumentExtractor>,
    analyzer: Arc<MedicalAnalyzer>,
    state: watch::Sender<PipelineState>,
}

impl DocumentPipeline {
    pub fn new(extractor: Arc<DocumentExtractor>, analyzer: Arc<MedicalAnalyzer>) -> Self {
        let (state, _) = watch::channel(PipelineState::default());
        Self {
            extractor,
            analyzer,
            state,
        }
    }

    /// Pipeline wired to the configured OCR and Gemini back ends.
    pub fn from_config(config: &AppConfig) -> Result<Self, SetupError> {
        let extractor = DocumentExtractor::from_config(config)?;
        let analyzer = MedicalAnalyzer::from_config(config)?;
        Ok(Self::new(Arc::new(extractor), Arc::new(analyzer)))
    }

    pub fn state(&self) -> PipelineState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    pub fn get_overall_progress(&self) -> f32 {
        self.state.borrow().overall_progress()
    }

    pub fn is_processing(&self) -> bool {
        self.state.borrow().is_processing()
    }

    pub fn is_complete(&self) -> bool {
        self.state.borrow().is_complete()
    }

    pub fn has_error(&self) -> bool {
        self.state.borrow().has_error()
    }

    /// Back to idle. Any run still in flight becomes stale.
    pub fn reset_pipeline(&self) {
        self.state.send_modify(|s| *s = PipelineState::default());
        tracing::info!("Pipeline reset");
    }

    /// Apply `update` only if `run` is still the current run.
    fn transition(&self, run: Uuid, update: impl FnOnce(&mut PipelineState)) -> bool {
        self.state.send_if_modified(|s| {
            if s.run_id != Some(run) {
                return false;
            }
            update(s);
            true
        })
    }

    fn fail(&self, run: Uuid, error: ProcessingError) -> RunOutcome {
        let message = error.to_string();
        let applied = self.transition(run, |s| {
            s.stage = PipelineStage::Error;
            s.error = Some(message.clone());
        });
        if applied {
            tracing::warn!(run_id = %run, error = %message, "Pipeline run failed");
            RunOutcome::Failed(message)
        } else {
            tracing::debug!(run_id = %run, "Dropped failure from superseded run");
            RunOutcome::Superseded
        }
    }

    /// Full run: validate, extract, analyze. Always restarts from the top,
    /// whatever state the previous run left behind.
    pub async fn process_medical_document(
        &self,
        document: Document,
        options: AnalysisOptions,
    ) -> RunOutcome {
        let run = Uuid::new_v4();
        let span = tracing::info_span!("process_medical_document", run_id = %run);
        self.run_document(run, document, options).instrument(span).await
    }

    async fn run_document(
        &self,
        run: Uuid,
        document: Document,
        options: AnalysisOptions,
    ) -> RunOutcome {
        let file_type = document.media_type.clone();
        let context = options
            .context
            .unwrap_or_else(|| AnalysisContext::from_filename(&document.name));
        let validation = self.extractor.validate_file(&document);

        self.state.send_modify(|s| {
            *s = PipelineState {
                stage: PipelineStage::Extracting,
                original_file: Some(document.clone()),
                file_type: Some(file_type),
                run_id: Some(run),
                ..PipelineState::default()
            };
        });
        tracing::info!(size = document.size, context = context.as_str(), "Extraction started");

        if let Err(e) = validation {
            return self.fail(run, e.into());
        }

        let on_progress = |fraction: f32| {
            self.transition(run, |s| {
                s.extraction_progress = in_flight_percent(fraction).max(s.extraction_progress);
            });
        };
        let extracted = match self
            .extractor
            .extract_with_progress(&document, &on_progress)
            .await
        {
            Ok(extracted) => extracted,
            Err(e) => return self.fail(run, e.into()),
        };

        let text = extracted.text.clone();
        let word_count = extracted.word_count;
        let advanced = self.transition(run, |s| {
            s.extracted_text = Some(extracted);
            s.extraction_progress = 100;
            s.word_count = word_count;
            s.stage = PipelineStage::Analyzing;
            s.analysis_progress = 0;
        });
        if !advanced {
            tracing::debug!("Extraction finished for superseded run, skipping analysis");
            return RunOutcome::Superseded;
        }
        tracing::info!(word_count, "Extraction complete, analysis started");

        self.analyze_stage(run, &text, AnalysisOptions::with_context(context))
            .await
    }

    /// Analysis only, for callers that already hold plain text.
    /// Extraction progress stays at 0.
    pub async fn process_raw_text(&self, text: &str, options: AnalysisOptions) -> RunOutcome {
        let run = Uuid::new_v4();
        let span = tracing::info_span!("process_raw_text", run_id = %run);
        async {
            let extracted = ExtractedText::new(text.to_string(), MediaKind::PlainText);
            let word_count = extracted.word_count;
            self.state.send_modify(|s| {
                *s = PipelineState {
                    stage: PipelineStage::Analyzing,
                    extracted_text: Some(extracted),
                    word_count,
                    run_id: Some(run),
                    ..PipelineState::default()
                };
            });
            tracing::info!(word_count, "Analysis started from raw text");

            let options = AnalysisOptions {
                context: Some(options.context.unwrap_or_default()),
            };
            self.analyze_stage(run, text, options).await
        }
        .instrument(span)
        .await
    }

    async fn analyze_stage(&self, run: Uuid, text: &str, options: AnalysisOptions) -> RunOutcome {
        let on_progress = |fraction: f32| {
            self.transition(run, |s| {
                s.analysis_progress = in_flight_percent(fraction).max(s.analysis_progress);
            });
        };
        let result = match self
            .analyzer
            .analyze_with_progress(text, &options, &on_progress)
            .await
        {
            Ok(result) => result,
            Err(e) => return self.fail(run, e.into()),
        };

        let stored = result.clone();
        let applied = self.transition(run, move |s| {
            s.analysis = Some(stored);
            s.analysis_progress = 100;
            s.stage = PipelineStage::Complete;
        });
        if applied {
            tracing::info!(run_id = %run, "Pipeline run complete");
            RunOutcome::Completed(result)
        } else {
            tracing::debug!(run_id = %run, "Dropped analysis from superseded run");
            RunOutcome::Superseded
        }
    }
}
