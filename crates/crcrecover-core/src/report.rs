//! Match reporting.
//!
//! Matches are handed to a [`MatchSink`] on the thread that called
//! [`Searcher::search_with`](crate::Searcher::search_with), in the order they
//! arrive from the workers. Sinks only receive; they never influence the
//! search except by failing.

use std::fmt;
use std::io::{self, Write};

/// A candidate whose checksum equals the target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Match {
    /// The matching string
    pub candidate: String,
    /// Position in confirmation order, starting at 0
    ///
    /// With several workers this order depends on thread timing and is not
    /// reproducible between runs when more than one match exists.
    pub discovery_index: u64,
}

impl Match {
    /// Creates a new match
    pub fn new(candidate: impl Into<String>, discovery_index: u64) -> Self {
        Self {
            candidate: candidate.into(),
            discovery_index,
        }
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.discovery_index, self.candidate)
    }
}

/// Receiver for matches as they are confirmed.
///
/// The channel feeding a sink is bounded, so a sink that is slow to return
/// eventually blocks the workers producing matches.
pub trait MatchSink {
    /// Accept one match
    fn report(&mut self, found: &Match) -> io::Result<()>;
}

/// A sink that discards every match
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl MatchSink for NullSink {
    fn report(&mut self, _found: &Match) -> io::Result<()> {
        Ok(())
    }
}

/// A sink that keeps every match in arrival order
#[derive(Debug, Default)]
pub struct CollectingSink {
    /// Matches received so far
    pub matches: Vec<Match>,
}

impl CollectingSink {
    /// Creates an empty collecting sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the sink, returning its matches
    pub fn into_inner(self) -> Vec<Match> {
        self.matches
    }
}

impl MatchSink for CollectingSink {
    fn report(&mut self, found: &Match) -> io::Result<()> {
        self.matches.push(found.clone());
        Ok(())
    }
}

/// A sink writing one `"{index}. {candidate}"` line per match
#[derive(Debug)]
pub struct LineSink<W: Write> {
    out: W,
}

impl<W: Write> LineSink<W> {
    /// Wraps a writer
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Returns the wrapped writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> MatchSink for LineSink<W> {
    fn report(&mut self, found: &Match) -> io::Result<()> {
        writeln!(self.out, "{}", found)?;
        self.out.flush()
    }
}

impl<S: MatchSink + ?Sized> MatchSink for &mut S {
    fn report(&mut self, found: &Match) -> io::Result<()> {
        (**self).report(found)
    }
}
