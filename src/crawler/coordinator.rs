//! Crawl engine - owns one crawl's lifecycle and worker pool
//!
//! This module ties the crawl together:
//! - The `Idle → Running ⇄ Paused → Completed | Cancelled | Failed` state machine
//! - A pool of workers looping dequeue → robots → delay → fetch → analyze → commit
//! - Live settings changes (concurrency, crawl delay)
//! - Point-in-time snapshots for incremental polling
//! - Checkpoint and restore
//!
//! All crawl data lives in one `CrawlState` behind a single lock. Workers only
//! hold it for short synchronous sections and never across an `.await`.

use crate::config::{validate, validate_update, CrawlConfig, SettingsUpdate};
use crate::crawler::duplicates::DuplicateIndex;
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::frontier::QueuedUrl;
use crate::crawler::parser::{analyze, PageAnalysis};
use crate::crawler::renderer::RenderServiceFetcher;
use crate::crawler::retry::{fetch_with_retry, RetryPolicy};
use crate::issues::{detect_issues, filter_issues, ExclusionRules};
use crate::robots::RobotsCache;
use crate::state::{
    CrawlCheckpoint, CrawlPhase, CrawlState, CrawlStats, IssueRecord, LinkRecord, PageRecord,
    SnapshotCursors, StatusSnapshot,
};
use crate::url::{normalize, LinkKind};
use crate::{ConfigError, FetchError, LensError, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Whether a control call changed the phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    Changed,
    /// Already in the requested phase
    Unchanged,
}

/// Per-run settings fixed at start, shared by that run's workers
struct RunContext {
    run_id: u64,
    root: Url,
    fetcher: Arc<dyn Fetcher>,
    retry: RetryPolicy,
    exclusions: ExclusionRules,
    robots: Option<RobotsCache>,
    crawl_external: bool,
    duplication_check: bool,
    /// Content fingerprints of this run's pages, locked apart from the state
    duplicates: Mutex<DuplicateIndex>,
    cancel: CancellationToken,
}

struct Shared {
    state: Mutex<CrawlState>,
    /// Wakes workers waiting for frontier entries or a phase change
    wakeup: Notify,
    phase_tx: watch::Sender<CrawlPhase>,
    current_run: Mutex<Option<Arc<RunContext>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Shared {
    fn publish(&self, phase: CrawlPhase) {
        self.phase_tx.send_replace(phase);
    }
}

/// What a worker produced for one dispatched URL
enum TaskOutcome {
    /// Refused by robots.txt, nothing is recorded
    Disallowed,
    Fetched(PageAnalysis),
    Failed { record: PageRecord, error: FetchError },
}

/// A single crawl session
///
/// Control methods are synchronous and spawn workers onto the current Tokio
/// runtime, so they must be called from within one.
pub struct CrawlEngine {
    shared: Arc<Shared>,
    fetcher_override: Option<Arc<dyn Fetcher>>,
}

impl CrawlEngine {
    /// Creates an idle engine that picks its fetch strategy from each
    /// crawl's configuration
    pub fn new() -> Self {
        let (phase_tx, _) = watch::channel(CrawlPhase::Idle);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(CrawlState::new()),
                wakeup: Notify::new(),
                phase_tx,
                current_run: Mutex::new(None),
                handles: Mutex::new(Vec::new()),
            }),
            fetcher_override: None,
        }
    }

    /// Creates an idle engine that always fetches through `fetcher`
    pub fn with_fetcher(fetcher: Arc<dyn Fetcher>) -> Self {
        let mut engine = Self::new();
        engine.fetcher_override = Some(fetcher);
        engine
    }

    /// Starts a crawl from `seed`
    ///
    /// # Arguments
    ///
    /// * `seed` - The seed URL, normalized before it is queued at depth 0
    /// * `config` - Crawl configuration
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The crawl is running
    /// * `Err(LensError::AlreadyRunning)` - Another crawl is running or paused
    /// * `Err(_)` - Invalid configuration or seed; the engine is now `Failed`
    pub fn start(&self, seed: &str, config: CrawlConfig) -> Result<()> {
        self.start_with_hash(seed, config, None)
    }

    /// Like [`CrawlEngine::start`], recording the configuration file's hash
    pub fn start_with_hash(
        &self,
        seed: &str,
        config: CrawlConfig,
        config_hash: Option<String>,
    ) -> Result<()> {
        let mut state = self.shared.state.lock();
        if !state.phase.can_start() {
            return Err(LensError::AlreadyRunning(state.phase));
        }

        state.reset(seed, config.clone(), config_hash);

        let prepared = validate(&config)
            .map_err(LensError::from)
            .and_then(|()| normalize(seed, None).map_err(LensError::from))
            .and_then(|root| Ok((self.build_fetcher(&config)?, root)));
        let (fetcher, root) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => return Err(self.fail_start(&mut state, e)),
        };

        let outcome = state.frontier.enqueue(root.clone(), 0, None, false);
        if !outcome.is_accepted() {
            let error = ConfigError::SeedFiltered(root.to_string());
            return Err(self.fail_start(&mut state, error.into()));
        }
        state.seed = Some(root.to_string());
        state.sync_frontier_counters();
        state.started_at = Some(chrono::Utc::now());

        tracing::info!(
            "Starting crawl of {} (max depth {}, max URLs {}, {} workers)",
            root,
            config.crawler.max_depth,
            config.crawler.max_urls,
            config.crawler.concurrency
        );
        let duplicates = DuplicateIndex::new(config.issues.duplication_threshold);
        self.begin_run(&mut state, &config, root, fetcher, duplicates);
        Ok(())
    }

    /// Resumes a checkpointed crawl as a new run
    ///
    /// The checkpoint's pages, links, issues and counters are loaded back and
    /// workers continue from its frontier.
    pub fn restore(&self, checkpoint: CrawlCheckpoint) -> Result<()> {
        let mut state = self.shared.state.lock();
        if !state.phase.can_start() {
            return Err(LensError::AlreadyRunning(state.phase));
        }

        validate(&checkpoint.config)?;
        let root = normalize(&checkpoint.seed, None)?;
        let config = checkpoint.config.clone();
        let fetcher = self.build_fetcher(&config)?;

        state.load_checkpoint(checkpoint);
        let mut duplicates = DuplicateIndex::new(config.issues.duplication_threshold);
        for page in state.pages.iter().filter(|p| !p.is_failure()) {
            if let Some(hash) = &page.content_hash {
                duplicates.insert_hash_only(&page.url, hash);
            }
        }
        if state.started_at.is_none() {
            state.started_at = Some(chrono::Utc::now());
        }

        tracing::info!(
            "Restoring crawl of {}: {} pages recorded, {} URLs queued",
            root,
            state.pages.len(),
            state.counters.queued
        );
        self.begin_run(&mut state, &config, root, fetcher, duplicates);
        Ok(())
    }

    fn build_fetcher(&self, config: &CrawlConfig) -> Result<Arc<dyn Fetcher>> {
        if let Some(fetcher) = &self.fetcher_override {
            return Ok(Arc::clone(fetcher));
        }
        if config.javascript.enabled {
            Ok(Arc::new(RenderServiceFetcher::new(config)?))
        } else {
            Ok(Arc::new(HttpFetcher::new(config)?))
        }
    }

    fn fail_start(&self, state: &mut CrawlState, error: LensError) -> LensError {
        tracing::error!("Crawl failed to start: {}", error);
        state.finish(CrawlPhase::Failed, Some(error.to_string()));
        self.shared.publish(CrawlPhase::Failed);
        error
    }

    /// Switches to `Running` and launches the worker pool
    fn begin_run(
        &self,
        state: &mut CrawlState,
        config: &CrawlConfig,
        root: Url,
        fetcher: Arc<dyn Fetcher>,
        duplicates: DuplicateIndex,
    ) {
        let run = Arc::new(RunContext {
            run_id: state.run_id,
            root,
            fetcher,
            retry: RetryPolicy::from_config(&config.http),
            exclusions: ExclusionRules::new(&config.issues.exclusion_patterns),
            robots: config
                .crawler
                .respect_robots
                .then(|| RobotsCache::new(&config.http.user_agent)),
            crawl_external: config.crawler.crawl_external,
            duplication_check: config.issues.duplication_check,
            duplicates: Mutex::new(duplicates),
            cancel: CancellationToken::new(),
        });

        if let Some(previous) = self.shared.current_run.lock().replace(Arc::clone(&run)) {
            previous.cancel.cancel();
        }
        self.shared.handles.lock().retain(|handle| !handle.is_finished());

        state.phase = CrawlPhase::Running;
        state.workers_alive = state.concurrency;
        self.shared.publish(CrawlPhase::Running);
        self.spawn_workers(&run, 0, state.concurrency);
    }

    fn spawn_workers(&self, run: &Arc<RunContext>, first_id: usize, count: usize) {
        let mut handles = self.shared.handles.lock();
        for worker_id in first_id..first_id + count {
            let shared = Arc::clone(&self.shared);
            let run = Arc::clone(run);
            handles.push(tokio::spawn(run_worker(shared, run, worker_id)));
        }
    }

    /// Running → Paused
    ///
    /// In-flight fetches finish and are recorded; nothing new is dequeued.
    pub fn pause(&self) -> Result<ControlOutcome> {
        let mut state = self.shared.state.lock();
        match state.phase {
            CrawlPhase::Paused => Ok(ControlOutcome::Unchanged),
            CrawlPhase::Running => {
                state.phase = CrawlPhase::Paused;
                self.shared.publish(CrawlPhase::Paused);
                tracing::info!("Crawl paused");
                Ok(ControlOutcome::Changed)
            }
            from => Err(LensError::InvalidTransition {
                from,
                to: CrawlPhase::Paused,
            }),
        }
    }

    /// Paused → Running
    pub fn resume(&self) -> Result<ControlOutcome> {
        {
            let mut state = self.shared.state.lock();
            match state.phase {
                CrawlPhase::Running => return Ok(ControlOutcome::Unchanged),
                CrawlPhase::Paused => {
                    state.phase = CrawlPhase::Running;
                    self.shared.publish(CrawlPhase::Running);
                }
                from => {
                    return Err(LensError::InvalidTransition {
                        from,
                        to: CrawlPhase::Running,
                    })
                }
            }
        }
        tracing::info!("Crawl resumed");
        self.shared.wakeup.notify_waiters();
        Ok(ControlOutcome::Changed)
    }

    /// Cancels a running or paused crawl
    ///
    /// The frontier is dropped and results of fetches still in flight are
    /// discarded. Stopping an idle or finished engine changes nothing.
    pub fn stop(&self) -> ControlOutcome {
        let run = {
            let mut state = self.shared.state.lock();
            if !state.phase.is_active() {
                return ControlOutcome::Unchanged;
            }
            state.finish(CrawlPhase::Cancelled, None);
            self.shared.publish(CrawlPhase::Cancelled);
            self.shared.current_run.lock().clone()
        };

        if let Some(run) = run {
            run.cancel.cancel();
        }
        self.shared.wakeup.notify_waiters();
        tracing::info!("Crawl stopped");
        ControlOutcome::Changed
    }

    /// Applies new concurrency and crawl delay values to the live crawl
    ///
    /// Extra workers start immediately; surplus workers retire at their next
    /// dequeue. Work already dispatched is unaffected.
    pub fn update_settings(&self, update: SettingsUpdate) -> Result<()> {
        validate_update(&update)?;

        let spawn = {
            let mut state = self.shared.state.lock();
            if let Some(concurrency) = update.concurrency {
                state.concurrency = concurrency;
                state.config.crawler.concurrency = concurrency;
            }
            if let Some(delay) = update.crawl_delay {
                state.crawl_delay_ms = delay;
                state.config.crawler.crawl_delay = delay;
            }

            let run = self.shared.current_run.lock().clone();
            match run {
                Some(run) if run.run_id == state.run_id && state.phase.is_active() => {
                    let missing = state.concurrency.saturating_sub(state.workers_alive);
                    let first_id = state.workers_alive;
                    state.workers_alive += missing;
                    Some((run, first_id, missing))
                }
                _ => None,
            }
        };

        if let Some((run, first_id, count)) = spawn {
            if count > 0 {
                tracing::debug!("Spawning {} additional workers", count);
                self.spawn_workers(&run, first_id, count);
            }
        }
        tracing::info!(
            "Settings updated: concurrency={:?}, crawl_delay={:?}",
            update.concurrency,
            update.crawl_delay
        );
        self.shared.wakeup.notify_waiters();
        Ok(())
    }

    /// Copies the status, stats and every record past `since`
    pub fn status_snapshot(&self, since: SnapshotCursors) -> StatusSnapshot {
        self.shared.state.lock().snapshot(since)
    }

    pub fn stats(&self) -> CrawlStats {
        self.shared.state.lock().stats()
    }

    pub fn phase(&self) -> CrawlPhase {
        self.shared.state.lock().phase
    }

    pub fn pages(&self) -> Vec<PageRecord> {
        self.shared.state.lock().pages.clone()
    }

    pub fn links(&self) -> Vec<LinkRecord> {
        self.shared.state.lock().links.clone()
    }

    pub fn issues(&self) -> Vec<IssueRecord> {
        self.shared.state.lock().issues.clone()
    }

    /// Serializable copy of the whole crawl, usable with [`CrawlEngine::restore`]
    pub fn checkpoint(&self) -> CrawlCheckpoint {
        self.shared.state.lock().checkpoint()
    }

    /// Waits until the crawl reaches a terminal phase and its workers exit
    ///
    /// Returns immediately for an engine that was never started.
    pub async fn wait(&self) -> CrawlPhase {
        let mut phase_rx = self.shared.phase_tx.subscribe();
        let phase = match phase_rx
            .wait_for(|phase| phase.is_terminal() || *phase == CrawlPhase::Idle)
            .await
        {
            Ok(phase) => *phase,
            Err(_) => self.phase(),
        };

        let handles = std::mem::take(&mut *self.shared.handles.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    tracing::error!("Crawl worker panicked: {}", e);
                }
            }
        }
        phase
    }

    /// Stops the crawl and aborts every worker task
    pub fn dispose(&self) {
        self.stop();
        for handle in self.shared.handles.lock().drain(..) {
            handle.abort();
        }
    }
}

impl Default for CrawlEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CrawlEngine {
    fn drop(&mut self) {
        if let Some(run) = self.shared.current_run.lock().take() {
            run.cancel.cancel();
        }
    }
}

/// Worker loop: dequeue, process, commit until the run ends
async fn run_worker(shared: Arc<Shared>, run: Arc<RunContext>, worker_id: usize) {
    tracing::debug!("Worker {} started", worker_id);
    let mut last_request: Option<Instant> = None;

    while let Some(task) = next_task(&shared, &run).await {
        tracing::debug!("Worker {} processing {} (depth {})", worker_id, task.url, task.depth);
        let outcome = tokio::select! {
            biased;
            _ = run.cancel.cancelled() => {
                release_worker(&shared, &run);
                break;
            }
            outcome = process(&shared, &run, &task, &mut last_request) => outcome,
        };
        commit(&shared, &run, task, outcome);
    }

    tracing::debug!("Worker {} exiting", worker_id);
}

fn release_worker(shared: &Shared, run: &RunContext) {
    let mut state = shared.state.lock();
    if state.run_id == run.run_id {
        state.workers_alive = state.workers_alive.saturating_sub(1);
    }
}

/// Waits for the next URL to process
///
/// Returns `None` when the worker should exit: the run is over, was replaced,
/// or the pool shrank. Completion is declared here, when the frontier is
/// empty while nothing is in flight.
async fn next_task(shared: &Shared, run: &RunContext) -> Option<QueuedUrl> {
    loop {
        let notified = shared.wakeup.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        {
            let mut state = shared.state.lock();
            if state.run_id != run.run_id {
                return None;
            }
            if state.phase.is_terminal() || run.cancel.is_cancelled() {
                state.workers_alive = state.workers_alive.saturating_sub(1);
                return None;
            }
            if state.workers_alive > state.concurrency {
                state.workers_alive -= 1;
                return None;
            }

            if state.phase == CrawlPhase::Running {
                if let Some(task) = state.dispatch() {
                    return Some(task);
                }
                if state.counters.in_flight == 0 {
                    state.finish(CrawlPhase::Completed, None);
                    state.workers_alive = state.workers_alive.saturating_sub(1);
                    shared.publish(CrawlPhase::Completed);
                    tracing::info!(
                        "Crawl completed: {} pages crawled, {} failed, {} skipped",
                        state.counters.crawled,
                        state.counters.failed,
                        state.counters.skipped
                    );
                    drop(state);
                    run.cancel.cancel();
                    shared.wakeup.notify_waiters();
                    return None;
                }
            }
        }

        tokio::select! {
            _ = &mut notified => {}
            _ = run.cancel.cancelled() => {}
        }
    }
}

/// Robots check, politeness delay, fetch with retries and analysis
async fn process(
    shared: &Shared,
    run: &RunContext,
    task: &QueuedUrl,
    last_request: &mut Option<Instant>,
) -> TaskOutcome {
    let mut robots_delay = None;
    if let Some(robots) = &run.robots {
        let verdict = robots.check(&task.url, run.fetcher.as_ref()).await;
        if !verdict.allowed {
            return TaskOutcome::Disallowed;
        }
        robots_delay = verdict.crawl_delay;
    }

    let delay_ms = shared.state.lock().crawl_delay_ms;
    let delay = Duration::from_millis(delay_ms).max(robots_delay.unwrap_or_default());
    if let Some(last) = last_request {
        let elapsed = last.elapsed();
        if elapsed < delay {
            tokio::time::sleep(delay - elapsed).await;
        }
    }
    *last_request = Some(Instant::now());

    let attempt = fetch_with_retry(run.fetcher.as_ref(), &task.url, &run.retry).await;
    let mut record = PageRecord::new(
        task.url.as_str(),
        task.depth,
        task.parent.as_deref(),
        run.fetcher.render_mode(),
    );
    record.is_external = task.is_external;

    match attempt.result {
        Ok(response) => {
            let mut analysis = analyze(&response, record, &run.root);
            if response.status >= 400 {
                let error = FetchError::Http {
                    status: response.status,
                };
                analysis.record.error = Some(error.to_string());
            }
            tracing::debug!(
                "Fetched {} -> {} in {}ms ({} attempts)",
                task.url,
                response.status,
                response.response_time_ms,
                attempt.attempts
            );
            TaskOutcome::Fetched(analysis)
        }
        Err(error) => {
            tracing::warn!(
                "Failed to fetch {} after {} attempts: {}",
                task.url,
                attempt.attempts,
                error
            );
            record.error = Some(error.to_string());
            TaskOutcome::Failed { record, error }
        }
    }
}

/// Appends a task's results to the crawl state and queues its children
///
/// Results of a run that was stopped or replaced meanwhile are dropped.
fn commit(shared: &Shared, run: &RunContext, task: QueuedUrl, outcome: TaskOutcome) {
    // Detection and the duplicate scan run before the state lock is taken
    let issues = match &outcome {
        TaskOutcome::Disallowed => Vec::new(),
        TaskOutcome::Fetched(analysis) => page_issues(run, &task, analysis),
        TaskOutcome::Failed { record, .. } => {
            filter_issues(detect_issues(record), &run.exclusions, &task.url)
        }
    };

    let mut state = shared.state.lock();
    if state.run_id != run.run_id || !state.phase.is_active() {
        return;
    }
    state.settle(task.url.as_str());

    match outcome {
        TaskOutcome::Disallowed => {
            tracing::info!("URL {} disallowed by robots.txt", task.url);
            state.counters.skipped += 1;
            state.frontier.refund();
        }
        TaskOutcome::Fetched(analysis) => {
            let PageAnalysis {
                record,
                links,
                children,
                ..
            } = analysis;

            // External pages are analyzed but never expanded
            let expand = !record.is_failure() && !task.is_external;
            let parent = record.url.clone();
            state.links.extend(links);
            state.issues.extend(issues);
            state.record_page(record);

            if expand {
                for (child, kind) in children {
                    let is_external = kind == LinkKind::External;
                    if is_external && !run.crawl_external {
                        continue;
                    }
                    state
                        .frontier
                        .enqueue(child, task.depth + 1, Some(parent.as_str()), is_external);
                }
            }
        }
        TaskOutcome::Failed { record, error } => {
            state.issues.extend(issues);
            state.record_page(record);

            let seed_unreachable =
                task.depth == 0 && !matches!(error, FetchError::TooLarge { .. });
            if seed_unreachable {
                tracing::error!("Seed URL {} is unreachable: {}", task.url, error);
                state.finish(
                    CrawlPhase::Failed,
                    Some(format!("Seed URL unreachable: {}", error)),
                );
                shared.publish(CrawlPhase::Failed);
                drop(state);
                run.cancel.cancel();
                shared.wakeup.notify_waiters();
                return;
            }
        }
    }

    state.sync_frontier_counters();
    let recorded = state.counters.crawled + state.counters.failed;
    if recorded > 0 && recorded % 10 == 0 {
        tracing::info!(
            "Progress: {} pages crawled, {} failed, {} queued, {} discovered",
            state.counters.crawled,
            state.counters.failed,
            state.counters.queued,
            state.counters.discovered
        );
    }
    drop(state);
    shared.wakeup.notify_waiters();
}

/// Issues for a fetched page, duplicate content included, after exclusions
fn page_issues(run: &RunContext, task: &QueuedUrl, analysis: &PageAnalysis) -> Vec<IssueRecord> {
    let record = &analysis.record;
    let mut issues = detect_issues(record);
    if run.duplication_check && !record.is_failure() {
        if let Some(hash) = &record.content_hash {
            let mut duplicates = run.duplicates.lock();
            issues.extend(duplicates.check_and_insert(&record.url, hash, &analysis.text));
        }
    }
    filter_issues(issues, &run.exclusions, &task.url)
}
