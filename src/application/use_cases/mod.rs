pub mod image_normalizer;
pub mod meter_analysis;
pub mod results_presenter;
pub mod session_store;
pub mod shell;
