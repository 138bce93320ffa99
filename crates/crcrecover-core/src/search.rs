//! Parallel exhaustive search over a candidate space.
//!
//! ## Algorithm Overview
//!
//! 1. Validate the space size `|charset|^length` against the `u64` index width
//! 2. Split `[0, size)` into at most `workers` disjoint contiguous ranges
//! 3. Run one scoped thread per range; each seeks to its start and walks the
//!    range in index order, checksumming every candidate
//! 4. Matches take a discovery index from an atomic counter and travel over a
//!    bounded channel to the calling thread, which hands them to the sink
//!
//! Workers poll the halt flag and the caller's [`CancellationToken`] every
//! `check_interval` candidates, so stopping costs at most one interval of
//! extra work per worker.

use crate::archive::ArchiveEntry;
use crate::charset::Charset;
use crate::checksum::{Checksum, Crc32};
use crate::error::{Error, Result};
use crate::generator::SearchSpace;
use crate::report::{Match, MatchSink, NullSink};
use crossbeam_channel::{RecvTimeoutError, Sender};
use std::num::NonZeroUsize;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// What to do once a match is found
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchPolicy {
    /// Report one match and stop every worker
    #[default]
    StopOnFirstMatch,
    /// Walk the whole space and report every match
    CollectAll,
}

/// How a search ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    /// Every candidate was evaluated
    Exhausted,
    /// Stopped after the first match
    TerminatedEarly,
    /// Stopped by a cancellation request or timeout
    Cancelled,
}

impl SearchStatus {
    /// Returns the status name
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchStatus::Exhausted => "exhausted",
            SearchStatus::TerminatedEarly => "terminated early",
            SearchStatus::Cancelled => "cancelled",
        }
    }
}

/// What to search for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSpec {
    /// Candidate length in characters
    pub length: u64,
    /// Checksum a candidate must produce
    pub target_checksum: u32,
    /// Characters candidates are drawn from
    pub charset: Charset,
}

impl SearchSpec {
    /// Creates a new search spec
    pub fn new(length: u64, target_checksum: u32, charset: Charset) -> Self {
        Self {
            length,
            target_checksum,
            charset,
        }
    }

    /// Builds a spec from an archive entry's size and checksum
    ///
    /// The entry size is a byte count, so this only lines up with the
    /// character length for single-byte charsets such as the built-in ones.
    pub fn from_entry(entry: &ArchiveEntry, charset: Charset) -> Self {
        Self::new(entry.uncompressed_size, entry.checksum, charset)
    }
}

/// Outcome of a search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// Matches ordered by discovery index
    pub matches: Vec<Match>,
    /// How the search ended
    pub status: SearchStatus,
    /// Number of candidates whose checksum was computed
    pub evaluated: u64,
}

impl SearchResult {
    /// The match with the lowest discovery index
    pub fn first(&self) -> Option<&Match> {
        self.matches.first()
    }

    /// Returns true if at least one match was found
    pub fn is_found(&self) -> bool {
        !self.matches.is_empty()
    }
}

/// Shared flag for stopping a running search from another thread
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of every search observing this token
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns true once [`cancel`](Self::cancel) has been called
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Number of workers used when none is configured
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Configuration for the searcher
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Number of worker threads
    pub workers: usize,
    /// Match policy
    pub policy: SearchPolicy,
    /// Candidates evaluated between cancellation checks
    pub check_interval: u64,
    /// Matches buffered between workers and the sink
    pub channel_capacity: usize,
    /// Cancel the search after this long
    pub timeout: Option<Duration>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            policy: SearchPolicy::default(),
            check_interval: 4096,
            channel_capacity: 1024,
            timeout: None,
        }
    }
}

impl SearchConfig {
    /// Creates a new search config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of worker threads
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets the match policy
    pub fn policy(mut self, policy: SearchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets how many candidates are evaluated between cancellation checks
    pub fn check_interval(mut self, interval: u64) -> Self {
        self.check_interval = interval;
        self
    }

    /// Sets the match channel capacity
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Sets a timeout after which the search is cancelled
    ///
    /// Expiry halts the workers through the search's own halt flag and ends
    /// with [`SearchStatus::Cancelled`]; the caller's token is left untouched.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::invalid_configuration("worker count must be at least 1"));
        }
        if self.check_interval == 0 {
            return Err(Error::invalid_configuration("check interval must be at least 1"));
        }
        if self.channel_capacity == 0 {
            return Err(Error::invalid_configuration("channel capacity must be at least 1"));
        }
        Ok(())
    }
}

/// Searches for the candidates of `spec` matching its CRC32 target
///
/// Convenience wrapper over [`Searcher`] with default settings otherwise.
pub fn search(spec: &SearchSpec, worker_count: usize, policy: SearchPolicy) -> Result<SearchResult> {
    let config = SearchConfig::new().workers(worker_count).policy(policy);
    Searcher::with_config(config).search(spec)
}

/// Splits `[0, size)` into at most `workers` contiguous ranges
///
/// Lengths differ by at most one and no range is empty.
pub fn partition(size: u64, workers: usize) -> Vec<Range<u64>> {
    let parts = (workers as u64).min(size);
    if parts == 0 {
        return Vec::new();
    }

    let base = size / parts;
    let extra = size % parts;
    let mut ranges = Vec::with_capacity(parts as usize);
    let mut start = 0;
    for i in 0..parts {
        let len = base + u64::from(i < extra);
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

/// Exhaustive searcher over candidate spaces
#[derive(Debug, Clone)]
pub struct Searcher<C = Crc32> {
    config: SearchConfig,
    checksum: C,
}

impl Default for Searcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Searcher {
    /// Creates a CRC32 searcher with default configuration
    pub fn new() -> Self {
        Self::with_config(SearchConfig::default())
    }

    /// Creates a CRC32 searcher with custom configuration
    pub fn with_config(config: SearchConfig) -> Self {
        Self::with_checksum(config, Crc32)
    }
}

impl<C: Checksum> Searcher<C> {
    /// Creates a searcher using a custom checksum
    pub fn with_checksum(config: SearchConfig, checksum: C) -> Self {
        Self { config, checksum }
    }

    /// The active configuration
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Runs a search to completion, keeping matches only in the result
    pub fn search(&self, spec: &SearchSpec) -> Result<SearchResult> {
        self.search_with(spec, &CancellationToken::new(), &mut NullSink)
    }

    /// Runs a search, streaming matches to `sink` as they arrive
    ///
    /// Cancelling `cancel` from another thread ends the search with
    /// [`SearchStatus::Cancelled`]. A sink error halts the workers and is
    /// returned as [`Error::Report`].
    pub fn search_with(
        &self,
        spec: &SearchSpec,
        cancel: &CancellationToken,
        sink: &mut dyn MatchSink,
    ) -> Result<SearchResult> {
        self.config.validate()?;
        let space = SearchSpace::new(spec.charset.clone(), spec.length)?;
        let ranges = partition(space.size(), self.config.workers);

        debug!(
            "Searching {} candidates (length {}, {} chars) for {:08x} with {} worker(s)",
            space.size(),
            spec.length,
            spec.charset.len(),
            spec.target_checksum,
            ranges.len()
        );

        let shared = Shared::default();
        let (tx, rx) = crossbeam_channel::bounded::<Match>(self.config.channel_capacity);
        let mut deadline = self.config.timeout.map(|t| Instant::now() + t);
        let mut matches = Vec::new();
        let mut report_error = None;

        let all_finished = thread::scope(|scope| {
            let handles: Vec<_> = ranges
                .into_iter()
                .enumerate()
                .map(|(id, range)| {
                    let worker = Worker {
                        id,
                        space: &space,
                        target: spec.target_checksum,
                        checksum: &self.checksum,
                        policy: self.config.policy,
                        check_interval: self.config.check_interval,
                        shared: &shared,
                        cancel,
                    };
                    let tx = tx.clone();
                    scope.spawn(move || worker.run(range, tx))
                })
                .collect();
            drop(tx);

            loop {
                let received = match deadline {
                    Some(at) => match rx.recv_deadline(at) {
                        Ok(found) => found,
                        Err(RecvTimeoutError::Timeout) => {
                            debug!("Search timed out, stopping workers");
                            shared.halt.store(true, Ordering::Release);
                            deadline = None;
                            continue;
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    },
                    None => match rx.recv() {
                        Ok(found) => found,
                        Err(_) => break,
                    },
                };

                // Keep draining after a sink failure so no worker blocks on a full channel
                if report_error.is_none() {
                    if let Err(e) = sink.report(&received) {
                        shared.halt.store(true, Ordering::Release);
                        report_error = Some(e);
                    }
                }
                matches.push(received);
            }

            handles.into_iter().fold(true, |all, handle| match handle.join() {
                Ok(finished) => all && finished,
                Err(panic) => std::panic::resume_unwind(panic),
            })
        });

        if let Some(e) = report_error {
            return Err(Error::Report(e));
        }

        matches.sort_by_key(|m| m.discovery_index);
        let evaluated = shared.evaluated.load(Ordering::Acquire);
        let status = if self.config.policy == SearchPolicy::StopOnFirstMatch
            && shared.found.load(Ordering::Acquire)
        {
            SearchStatus::TerminatedEarly
        } else if all_finished {
            SearchStatus::Exhausted
        } else {
            SearchStatus::Cancelled
        };

        debug!(
            "Search {}: {} match(es) after {} evaluations",
            status.as_str(),
            matches.len(),
            evaluated
        );

        Ok(SearchResult {
            matches,
            status,
            evaluated,
        })
    }
}

#[derive(Default)]
struct Shared {
    /// Set on first match, timeout, or sink failure
    halt: AtomicBool,
    /// Claimed by the one worker allowed to report under `StopOnFirstMatch`
    found: AtomicBool,
    next_index: AtomicU64,
    evaluated: AtomicU64,
}

struct Worker<'a, C> {
    id: usize,
    space: &'a SearchSpace,
    target: u32,
    checksum: &'a C,
    policy: SearchPolicy,
    check_interval: u64,
    shared: &'a Shared,
    cancel: &'a CancellationToken,
}

impl<C: Checksum> Worker<'_, C> {
    fn should_stop(&self) -> bool {
        self.shared.halt.load(Ordering::Acquire) || self.cancel.is_cancelled()
    }

    /// Walks `range`, returning true if every candidate in it was evaluated
    fn run(self, range: Range<u64>, tx: Sender<Match>) -> bool {
        trace!("Worker {} starting at {}..{}", self.id, range.start, range.end);

        let mut candidates = self.space.range(range);
        let mut evaluated = 0u64;
        let mut until_check = self.check_interval;
        let mut finished = true;

        while let Some(candidate) = candidates.next_str() {
            if until_check == 0 {
                if self.should_stop() {
                    finished = false;
                    break;
                }
                until_check = self.check_interval;
            }
            until_check -= 1;
            evaluated += 1;

            if self.checksum.checksum(candidate.as_bytes()) != self.target {
                continue;
            }
            if !self.confirm(candidate, &tx) {
                finished = candidates.remaining() == 0;
                break;
            }
        }

        trace!("Worker {} done after {} evaluations", self.id, evaluated);
        self.shared.evaluated.fetch_add(evaluated, Ordering::AcqRel);
        finished
    }

    /// Reports a confirmed match, returning false if the worker should stop
    fn confirm(&self, candidate: &str, tx: &Sender<Match>) -> bool {
        if self.policy == SearchPolicy::StopOnFirstMatch {
            let claimed = self
                .shared
                .found
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok();
            if !claimed {
                return false;
            }
            self.shared.halt.store(true, Ordering::Release);
        }

        let index = self.shared.next_index.fetch_add(1, Ordering::AcqRel);
        trace!("Worker {} matched '{}' (index {})", self.id, candidate, index);
        if tx.send(Match::new(candidate, index)).is_err() {
            return false;
        }
        self.policy == SearchPolicy::CollectAll
    }
}
