//! Function pattern rendering.
//!
//! A pattern is literal SQL with 1-based placeholders: `?1`, `?2`, and at
//! most one vararg placeholder `?N...` which consumes argument N and every
//! argument after it. The literal preceding a placeholder is its prefix;
//! for the vararg slot the prefix doubles as the separator repeated before
//! each extra argument, so `COALESCE(?1,?2...)` renders `COALESCE(a,b,c)`.
//!
//! A `?` inside a single-quoted string literal, or not followed by a digit,
//! is copied verbatim.

use tracing::warn;

use crate::error::{TranslationError, TranslationResult};

/// Receives the output of a [`PatternRenderer`].
pub trait PatternSink<A> {
    fn append_sql(&mut self, sql: &str);

    fn render_argument(&mut self, argument: &A) -> TranslationResult<()>;
}

/// A pattern parsed once into literal chunks and argument slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternRenderer {
    pattern: String,
    /// `slots.len() + 1` literal chunks; chunk `i` precedes slot `i`.
    chunks: Vec<String>,
    /// 0-based argument index per slot.
    slots: Vec<usize>,
    vararg_slot: Option<usize>,
    max_param_index: usize,
}

impl PatternRenderer {
    pub fn new(pattern: &str) -> TranslationResult<Self> {
        let invalid = |reason: &str| TranslationError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        let chars: Vec<char> = pattern.chars().collect();
        let mut chunks = Vec::new();
        let mut slots = Vec::new();
        let mut vararg_slot = None;
        let mut max_param_index = 0;
        let mut chunk = String::new();
        let mut in_quote = false;
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            if c == '\'' {
                in_quote = !in_quote;
                chunk.push(c);
                i += 1;
                continue;
            }
            let starts_slot = !in_quote
                && c == '?'
                && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());
            if !starts_slot {
                chunk.push(c);
                i += 1;
                continue;
            }

            let mut end = i + 1;
            while end < chars.len() && chars[end].is_ascii_digit() {
                end += 1;
            }
            let digits: String = chars[i + 1..end].iter().collect();
            let index: usize = digits
                .parse()
                .map_err(|_| invalid("placeholder index out of range"))?;
            if index == 0 {
                return Err(invalid("placeholders are 1-based"));
            }
            if vararg_slot.is_some() {
                return Err(invalid("the vararg placeholder must be the last one"));
            }
            let is_vararg = chars.get(end..end + 3).is_some_and(|s| s == ['.', '.', '.']);
            if is_vararg {
                vararg_slot = Some(slots.len());
                end += 3;
            }

            chunks.push(std::mem::take(&mut chunk));
            slots.push(index - 1);
            max_param_index = max_param_index.max(index);
            i = end;
        }
        chunks.push(chunk);

        Ok(Self {
            pattern: pattern.to_string(),
            chunks,
            slots,
            vararg_slot,
            max_param_index,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Highest 1-based placeholder index in the pattern.
    pub fn max_param_index(&self) -> usize {
        self.max_param_index
    }

    pub fn has_vararg(&self) -> bool {
        self.vararg_slot.is_some()
    }

    /// Render the pattern against `args`. A `None` argument is absent: its
    /// prefix is skipped along with it.
    ///
    /// With fewer arguments than placeholders the pattern renders
    /// best-effort after a warning, or fails when `strict`.
    pub fn render<A, S>(&self, args: &[Option<A>], sink: &mut S, strict: bool) -> TranslationResult<()>
    where
        S: PatternSink<A> + ?Sized,
    {
        if args.len() < self.max_param_index {
            if strict {
                return Err(TranslationError::FunctionArgumentCount {
                    pattern: self.pattern.clone(),
                    expected: self.max_param_index,
                    supplied: args.len(),
                });
            }
            warn!(
                pattern = %self.pattern,
                expected = self.max_param_index,
                supplied = args.len(),
                "function pattern received fewer arguments than it references"
            );
        }

        for (i, &index) in self.slots.iter().enumerate() {
            let arg = args.get(index).and_then(Option::as_ref);
            if arg.is_some() || i == 0 {
                sink.append_sql(&self.chunks[i]);
            }
            if let Some(arg) = arg {
                sink.render_argument(arg)?;
            }
            if self.vararg_slot == Some(i) {
                for extra in args.iter().skip(index + 1).flatten() {
                    sink.append_sql(&self.chunks[i]);
                    sink.render_argument(extra)?;
                }
            }
        }

        if let Some(trailing) = self.chunks.last() {
            if !self.slots.is_empty() || !trailing.is_empty() {
                sink.append_sql(trailing);
            }
        }
        Ok(())
    }
}

/// Split SQL on bare `?` markers, leaving any `?` inside a single-quoted
/// literal in its chunk. Returns one more chunk than there are markers.
pub fn split_parameter_markers(sql: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut in_quote = false;
    let mut start = 0;
    for (i, c) in sql.char_indices() {
        match c {
            '\'' => in_quote = !in_quote,
            '?' if !in_quote => {
                chunks.push(&sql[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    chunks.push(&sql[start..]);
    chunks
}
