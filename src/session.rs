//! Helper lifecycle over one page.
//!
//! A `Session` is the started helper: constructing it evicts a stale cache,
//! runs the initial enrichment pass, and installs one change detector per
//! watched document. Construction consumes its collaborators, which replaces
//! the original's global "already initialized" flag — there is no way to
//! start the same wiring twice.
//!
//! Without a usable credential the session still starts, but every pass
//! short-circuits to an empty summary instead of erroring.

use crate::cache::PathCache;
use crate::config::HelperConfig;
use crate::detect::ChangeDetector;
use crate::enrich::{EnrichSummary, Enricher};
use crate::page::Page;
use crate::remote::RemoteTransport;
use crate::store::KeyValueStore;
use std::time::{Duration, Instant};

pub struct Session<S: KeyValueStore, T: RemoteTransport> {
    config: HelperConfig,
    cache: PathCache<S>,
    transport: Option<T>,
    top: ChangeDetector,
    frame: Option<ChangeDetector>,
}

impl<S: KeyValueStore, T: RemoteTransport> Session<S, T> {
    /// Start the helper: eager cache eviction, initial pass over the top
    /// document (and the frame document when the workbox has rendered
    /// there), detectors wired for each watched document. `transport` is
    /// `None` when no credential resolved for this page.
    pub fn start(
        config: HelperConfig,
        cache: PathCache<S>,
        transport: Option<T>,
        page: &mut Page,
    ) -> (Self, EnrichSummary) {
        cache.evict_if_stale();
        let quiet = Duration::from_millis(config.debounce_ms);

        let watch_frame = page
            .frame
            .as_ref()
            .is_some_and(|frame| !frame.query_class(&config.wrapper_class).is_empty());

        let mut session = Self {
            top: ChangeDetector::new(quiet, page.document.revision()),
            frame: None,
            config,
            cache,
            transport,
        };

        let mut summary = session.run_pass_top(page);
        if watch_frame {
            let frame_summary = session.run_pass_frame(page);
            absorb(&mut summary, frame_summary);
            let revision = page.frame.as_ref().map(|f| f.revision()).unwrap_or(0);
            session.frame = Some(ChangeDetector::new(
                Duration::from_millis(session.config.debounce_ms),
                revision,
            ));
        }
        session.top.settle(page.document.revision());
        (session, summary)
    }

    /// Feed current document revisions to the per-document detectors. Each
    /// mutation burst collapses into one pending pass per document.
    pub fn observe(&mut self, page: &Page, now: Instant) {
        self.top.observe(page.document.revision(), now);
        if let (Some(detector), Some(frame)) = (self.frame.as_mut(), page.frame.as_ref()) {
            detector.observe(frame.revision(), now);
        }
    }

    /// Run any enrichment pass that has come due. Returns the combined
    /// summary of the passes that ran.
    pub fn poll(&mut self, page: &mut Page, now: Instant) -> EnrichSummary {
        let mut summary = EnrichSummary::default();
        if self.top.poll(now) {
            absorb(&mut summary, self.run_pass_top(page));
            self.top.settle(page.document.revision());
        }
        let frame_due = self.frame.as_mut().is_some_and(|d| d.poll(now));
        if frame_due {
            absorb(&mut summary, self.run_pass_frame(page));
            if let (Some(detector), Some(frame)) = (self.frame.as_mut(), page.frame.as_ref()) {
                detector.settle(frame.revision());
            }
        }
        summary
    }

    fn run_pass_top(&self, page: &mut Page) -> EnrichSummary {
        let Some(transport) = self.transport.as_ref() else {
            return EnrichSummary::default();
        };
        Enricher::new(&self.cache, transport, &self.config).process_items(&mut page.document)
    }

    fn run_pass_frame(&self, page: &mut Page) -> EnrichSummary {
        let (Some(transport), Some(frame)) = (self.transport.as_ref(), page.frame.as_mut()) else {
            return EnrichSummary::default();
        };
        Enricher::new(&self.cache, transport, &self.config).process_items(frame)
    }
}

fn absorb(into: &mut EnrichSummary, other: EnrichSummary) {
    into.annotated += other.annotated;
    into.from_cache += other.from_cache;
    into.fetched += other.fetched;
    into.unresolved += other.unresolved;
}
