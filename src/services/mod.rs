pub mod catalog;
pub mod classification;
pub mod enrichment;
pub mod genres;
pub mod progress;
pub mod show_search;
pub mod status_writer;

pub use catalog::{ShowCatalog, TmdbCatalog};
pub use enrichment::EnrichmentEngine;
pub use genres::GenreTable;
pub use status_writer::{StatusCommandQueue, StatusUpdate, StatusWriter, StatusWriterHandle};
