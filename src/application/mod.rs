pub mod use_cases;

pub use use_cases::image_normalizer::ImageNormalizer;
pub use use_cases::meter_analysis::{MeterAnalysisUseCase, MeterAnalyzer};
pub use use_cases::results_presenter::ResultsPresenter;
pub use use_cases::session_store::SessionStore;
pub use use_cases::shell::AppShell;
