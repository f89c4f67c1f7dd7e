use bytes::Bytes;

use super::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Keys,
    Strings,
}

/// Arguments for `STRALGO LCS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrAlgoArgs {
    source: Source,
    inputs: [Bytes; 2],
    just_len: bool,
    with_idx: bool,
    min_match_len: u64,
    with_match_len: bool,
}

impl StrAlgoArgs {
    /// Compare the values stored at two keys.
    pub fn keys(a: impl Into<Bytes>, b: impl Into<Bytes>) -> Self {
        Self::with_source(Source::Keys, a.into(), b.into())
    }

    /// Compare two literal strings.
    pub fn strings(a: impl Into<Bytes>, b: impl Into<Bytes>) -> Self {
        Self::with_source(Source::Strings, a.into(), b.into())
    }

    fn with_source(source: Source, a: Bytes, b: Bytes) -> Self {
        Self {
            source,
            inputs: [a, b],
            just_len: false,
            with_idx: false,
            min_match_len: 0,
            with_match_len: false,
        }
    }

    /// Return only the length of the match.
    pub fn just_len(mut self) -> Self {
        self.just_len = true;
        self
    }

    /// Return the match positions.
    pub fn with_idx(mut self) -> Self {
        self.with_idx = true;
        self
    }

    /// Ignore matches shorter than `len`. Zero means no restriction.
    pub fn min_match_len(mut self, len: u64) -> Self {
        self.min_match_len = len;
        self
    }

    /// Include the length of each match alongside its positions.
    pub fn with_match_len(mut self) -> Self {
        self.with_match_len = true;
        self
    }

    pub(crate) fn build(&self, command: &mut Command) {
        command.arg("LCS").arg(match self.source {
            Source::Keys => "KEYS",
            Source::Strings => "STRINGS",
        });
        for input in &self.inputs {
            command.arg(input.clone());
        }
        if self.just_len {
            command.arg("LEN");
        }
        if self.with_idx {
            command.arg("IDX");
        }
        if self.min_match_len > 0 {
            command.arg("MINMATCHLEN").arg_u64(self.min_match_len);
        }
        if self.with_match_len {
            command.arg("WITHMATCHLEN");
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    pub start: i64,
    pub end: i64,
}

/// One common substring: its range in each input and, with `WITHMATCHLEN`,
/// its length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchedPosition {
    pub a: Position,
    pub b: Position,
    pub match_len: i64,
}

/// Outcome of `STRALGO LCS`. Which fields are filled depends on the options
/// sent: the plain form sets `match_string`, `LEN` sets `len`, `IDX` sets
/// `matches` and `len`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringMatchResult {
    pub match_string: Option<String>,
    pub matches: Vec<MatchedPosition>,
    pub len: i64,
}
