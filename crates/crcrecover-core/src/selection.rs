//! Parsing of entry selections such as `"0-3,5,7-9"`.
//!
//! Parsing is strict: one malformed token rejects the whole selection, so a
//! typo never silently narrows or widens what gets searched.

use crate::error::{Error, Result};

/// Upper bound on the number of indices a single range may expand to
pub const MAX_RANGE_SPAN: usize = 1 << 20;

/// Parses comma-separated indices and inclusive `start-end` ranges
///
/// Whitespace around tokens is ignored. Indices are returned in the order
/// written, duplicates included. An input that is empty after trimming yields
/// an empty selection.
///
/// ```
/// use crcrecover_core::parse_selection;
///
/// assert_eq!(parse_selection("0-3,5,7-9")?, vec![0, 1, 2, 3, 5, 7, 8, 9]);
/// assert!(parse_selection("1,,2").is_err());
/// # Ok::<(), crcrecover_core::Error>(())
/// ```
pub fn parse_selection(text: &str) -> Result<Vec<usize>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    for token in text.split(',') {
        let token = token.trim();
        match token.split_once('-') {
            Some((start, end)) => {
                let start = parse_index(start, token)?;
                let end = parse_index(end, token)?;
                if start > end {
                    return Err(Error::input_parse(token, "range start is greater than its end"));
                }
                if end - start >= MAX_RANGE_SPAN {
                    return Err(Error::input_parse(token, "range is too large"));
                }
                out.extend(start..=end);
            }
            None => out.push(parse_index(token, token)?),
        }
    }
    Ok(out)
}

fn parse_index(part: &str, token: &str) -> Result<usize> {
    let part = part.trim();
    if part.is_empty() {
        return Err(Error::input_parse(token, "missing number"));
    }
    part.parse::<usize>()
        .map_err(|e| Error::input_parse(token, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ranges_and_singles() {
        assert_eq!(
            parse_selection("0-3,5,7-9").unwrap(),
            vec![0, 1, 2, 3, 5, 7, 8, 9]
        );
    }

    #[test]
    fn test_whitespace_and_newline() {
        assert_eq!(parse_selection(" 4 , 1 - 2 \n").unwrap(), vec![4, 1, 2]);
        assert_eq!(parse_selection("3-3").unwrap(), vec![3]);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_selection("").unwrap().is_empty());
        assert!(parse_selection("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_duplicates_preserved() {
        assert_eq!(parse_selection("1,0-1").unwrap(), vec![1, 0, 1]);
    }

    #[test]
    fn test_malformed_tokens_fail() {
        for bad in ["1,,2", "a", "1-", "-1", "2-1", "1-2-3", "1;2", "0-99999999"] {
            let err = parse_selection(bad).unwrap_err();
            assert!(
                matches!(err, Error::InputParse { .. }),
                "expected parse error for {:?}",
                bad
            );
        }
    }
}
