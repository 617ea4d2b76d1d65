pub mod config;
pub mod pipeline;

mod audit; // PHI-in-logs static audit (tests only)

pub use pipeline::analysis::{AnalysisContext, AnalysisOptions, AnalysisResult, MedicalAnalyzer};
pub use pipeline::extraction::{Document, DocumentExtractor, ExtractedText};
pub use pipeline::processor::{DocumentPipeline, PipelineStage, PipelineState, RunOutcome};

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// Honors `RUST_LOG`, falling back to [`config::default_log_filter`].
/// Calling it twice is harmless: the second install is ignored. Returns
/// whether this call installed the subscriber.
pub fn init_tracing() -> bool {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("{} v{} tracing initialised", config::APP_NAME, config::APP_VERSION);
    }
    installed
}
