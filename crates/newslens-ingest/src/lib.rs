//! Periodic crawl of a news front page into the vector store.

pub mod fetcher;
pub mod html;
pub mod ingestor;

pub use fetcher::{HttpFetcher, MockFetcher, PageFetcher};
pub use html::{extract_story_links, extract_visible_text};
pub use ingestor::{CycleReport, IngestionLoop};
