//! Index-addressable candidate generation.
//!
//! Candidates of length `L` over a charset of `n` characters are numbered
//! `0..n^L` in lexicographic order of charset position. Candidate `k` is the
//! base-`n` representation of `k`, most significant digit first, with each
//! digit mapped to its character. This lets any worker seek straight to the
//! start of its range instead of walking from the beginning.
//!
//! ```
//! use crcrecover_core::{generate, Charset};
//!
//! let all: Vec<String> = generate(&Charset::new("ab"), 2)?.collect();
//! assert_eq!(all, ["aa", "ab", "ba", "bb"]);
//! # Ok::<(), crcrecover_core::Error>(())
//! ```

use crate::charset::Charset;
use crate::error::{Error, Result};
use std::iter::FusedIterator;
use std::ops::Range;

/// Number of candidates of `length` characters over `charset_len` characters
///
/// Fails when the count does not fit in a `u64` index.
pub fn space_size(charset_len: usize, length: u64) -> Result<u64> {
    let too_large = || Error::search_space_too_large(charset_len, length);
    let exp = u32::try_from(length).map_err(|_| too_large())?;
    (charset_len as u64).checked_pow(exp).ok_or_else(too_large)
}

/// Candidate length as a buffer size, failing where `usize` is narrower
fn candidate_width(charset_len: usize, length: u64) -> Result<usize> {
    usize::try_from(length).map_err(|_| Error::search_space_too_large(charset_len, length))
}

/// Returns every candidate of `length` characters over `charset`, in order
///
/// `length == 0` yields exactly the empty string. An empty charset with a
/// positive length yields nothing.
pub fn generate(charset: &Charset, length: u64) -> Result<Candidates<'_>> {
    let size = space_size(charset.len(), length)?;
    let width = candidate_width(charset.len(), length)?;
    Ok(Candidates::new(charset.as_slice(), width, 0..size))
}

/// The full candidate space for one charset and length
#[derive(Debug, Clone)]
pub struct SearchSpace {
    charset: Charset,
    length: u64,
    width: usize,
    size: u64,
}

impl SearchSpace {
    /// Creates a search space, validating that every index is addressable
    pub fn new(charset: Charset, length: u64) -> Result<Self> {
        let size = space_size(charset.len(), length)?;
        let width = candidate_width(charset.len(), length)?;
        Ok(Self {
            charset,
            length,
            width,
            size,
        })
    }

    /// Number of candidates
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Candidate length in characters
    pub fn length(&self) -> u64 {
        self.length
    }

    /// The charset candidates are drawn from
    pub fn charset(&self) -> &Charset {
        &self.charset
    }

    /// The candidate at `index`, or `None` past the end of the space
    pub fn candidate_at(&self, index: u64) -> Option<String> {
        if index >= self.size {
            return None;
        }
        self.range(index..index + 1).next()
    }

    /// Iterator over the candidates with indices in `range`
    ///
    /// The range is clamped to the space, so an out-of-bounds range is empty.
    pub fn range(&self, range: Range<u64>) -> Candidates<'_> {
        let end = range.end.min(self.size);
        let start = range.start.min(end);
        Candidates::new(self.charset.as_slice(), self.width, start..end)
    }

    /// Iterator over the whole space
    pub fn iter(&self) -> Candidates<'_> {
        self.range(0..self.size)
    }
}

impl<'a> IntoIterator for &'a SearchSpace {
    type Item = String;
    type IntoIter = Candidates<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy iterator over a contiguous range of candidate indices
#[derive(Debug, Clone)]
pub struct Candidates<'a> {
    chars: &'a [char],
    digits: Vec<usize>,
    buf: String,
    next: u64,
    end: u64,
}

impl<'a> Candidates<'a> {
    /// Buffers are only sized when the range has work in it, so an empty
    /// range costs nothing whatever `length` is.
    fn new(chars: &'a [char], length: usize, range: Range<u64>) -> Self {
        let (digits, buf) = if range.start < range.end {
            (vec![0; length], String::with_capacity(length))
        } else {
            (Vec::new(), String::new())
        };
        let mut candidates = Self {
            chars,
            digits,
            buf,
            next: range.start,
            end: range.end,
        };
        candidates.seek(range.start);
        candidates
    }

    /// Index of the candidate the next call will produce
    pub fn position(&self) -> u64 {
        self.next
    }

    /// Number of candidates left in the range
    pub fn remaining(&self) -> u64 {
        self.end - self.next
    }

    /// Repositions the odometer on `index` by mixed-radix decomposition
    fn seek(&mut self, index: u64) {
        self.next = index;
        let radix = self.chars.len() as u64;
        if radix == 0 || index >= self.end {
            return;
        }
        let mut rest = index;
        for digit in self.digits.iter_mut().rev() {
            *digit = (rest % radix) as usize;
            rest /= radix;
        }
    }

    /// Produces the next candidate without allocating
    ///
    /// The returned slice is overwritten by the following call.
    pub fn next_str(&mut self) -> Option<&str> {
        if self.next >= self.end {
            return None;
        }

        self.buf.clear();
        for &d in &self.digits {
            self.buf.push(self.chars[d]);
        }

        let radix = self.chars.len();
        for digit in self.digits.iter_mut().rev() {
            *digit += 1;
            if *digit < radix {
                break;
            }
            *digit = 0;
        }
        self.next += 1;

        Some(&self.buf)
    }
}

impl Iterator for Candidates<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.next_str().map(str::to_owned)
    }

    fn nth(&mut self, n: usize) -> Option<String> {
        let target = self.next.saturating_add(n as u64);
        if target >= self.end {
            self.next = self.end;
            return None;
        }
        self.seek(target);
        self.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining()) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

impl FusedIterator for Candidates<'_> {}
