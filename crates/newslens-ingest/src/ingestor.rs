//! Background ingestion loop.
//!
//! Each cycle fetches the front page, follows the top story links, and
//! writes every non-blank chunk of each article's visible text to the
//! store. Cycles repeat forever: `interval` after a success, `backoff`
//! after a failure.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use newslens_core::config::IngestConfig;
use newslens_core::error::NewslensError;
use newslens_core::types::NewDocument;
use newslens_vector::{article_id, TextChunker, VectorStore};

use crate::fetcher::PageFetcher;
use crate::html::{extract_story_links, extract_visible_text};

/// What a single successful cycle wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Articles fetched and chunked.
    pub articles: usize,
    /// Chunks written to the store.
    pub chunks: usize,
    /// Links dropped by the fetcher's host policy.
    pub skipped: usize,
}

/// Periodic crawler feeding a shared [`VectorStore`].
pub struct IngestionLoop<F: PageFetcher> {
    fetcher: F,
    store: Arc<VectorStore>,
    chunker: TextChunker,
    source_url: String,
    top_n: usize,
    link_classes: Vec<String>,
    interval: Duration,
    backoff: Duration,
    shutdown: Arc<Notify>,
}

impl<F: PageFetcher> IngestionLoop<F> {
    pub fn new(
        fetcher: F,
        store: Arc<VectorStore>,
        config: &IngestConfig,
    ) -> Result<Self, NewslensError> {
        let chunker = TextChunker::new(config.chunk_size, config.chunk_overlap)?;
        Ok(Self {
            fetcher,
            store,
            chunker,
            source_url: config.source_url.clone(),
            top_n: config.top_n,
            link_classes: config.link_classes.clone(),
            interval: Duration::from_secs(config.interval_secs),
            backoff: Duration::from_secs(config.backoff_secs),
            shutdown: Arc::new(Notify::new()),
        })
    }

    /// Run one crawl.
    ///
    /// The first failing fetch or write aborts the rest of the cycle.
    /// Chunks written before the failure stay in the store.
    pub async fn run_cycle(&self) -> Result<CycleReport, NewslensError> {
        let front_page = self.fetcher.fetch(&self.source_url).await?;
        let links =
            extract_story_links(&front_page, &self.source_url, &self.link_classes, self.top_n)?;
        debug!(count = links.len(), "Story links extracted");

        let mut report = CycleReport::default();
        for link in links {
            if !self.fetcher.allows(&link) {
                debug!(url = %link, "Skipping link outside fetch policy");
                report.skipped += 1;
                continue;
            }

            let page = self.fetcher.fetch(&link).await?;
            let text = extract_visible_text(&page);

            let docs: Vec<NewDocument> = self
                .chunker
                .split(&text)
                .into_iter()
                .filter(|chunk| !chunk.trim().is_empty())
                .map(|chunk| {
                    let id = article_id(&link, &chunk);
                    NewDocument::article(&link, chunk, id)
                })
                .collect();

            let written = docs.len();
            self.store.add(docs).await?;

            debug!(url = %link, chunks = written, "Article ingested");
            report.articles += 1;
            report.chunks += written;
        }

        Ok(report)
    }

    /// Run cycles until [`shutdown`](Self::shutdown) is called.
    ///
    /// Shutdown is observed between cycles and during the sleep; a cycle in
    /// progress runs to completion first.
    pub async fn run(&self) {
        info!(source = %self.source_url, "Ingestion loop started");
        loop {
            let started = Instant::now();
            let delay = match self.run_cycle().await {
                Ok(report) => {
                    info!(
                        articles = report.articles,
                        chunks = report.chunks,
                        skipped = report.skipped,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Ingestion cycle complete"
                    );
                    self.interval
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        transient = e.is_transient(),
                        retry_in_secs = self.backoff.as_secs(),
                        "Ingestion cycle failed"
                    );
                    self.backoff
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.shutdown.notified() => {
                    info!("Ingestion loop stopped");
                    return;
                }
            }
        }
    }

    /// Signal the loop to stop at its next sleep.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

impl<F: PageFetcher + 'static> IngestionLoop<F> {
    /// Run the loop on a background task.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }
}
