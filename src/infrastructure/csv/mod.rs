// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// Export of verdict tables

mod csv_exporter;

pub use csv_exporter::{CsvExporter, UTF8_BOM};
