// ==============================================================================
// XRI identifiers — hierarchical names
// ==============================================================================
//
// An `Xri` is an ordered list of `SubSegment`s. The empty list is the
// reserved root segment `()`. Parsing walks the text character-by-character,
// building typed sub-segments rather than rewriting delimiters, and returns
// a `Result` instead of panicking since malformed XRI text is caller input,
// not a programming error.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::error::ParseError;

/// The class symbol prefixing a literal sub-segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClassSymbol {
    Equals,
    At,
    Plus,
    Dollar,
    Bang,
    Star,
}

impl ClassSymbol {
    fn from_char(ch: char) -> Option<Self> {
        match ch {
            '=' => Some(Self::Equals),
            '@' => Some(Self::At),
            '+' => Some(Self::Plus),
            '$' => Some(Self::Dollar),
            '!' => Some(Self::Bang),
            '*' => Some(Self::Star),
            _ => None,
        }
    }

    const fn as_char(self) -> char {
        match self {
            Self::Equals => '=',
            Self::At => '@',
            Self::Plus => '+',
            Self::Dollar => '$',
            Self::Bang => '!',
            Self::Star => '*',
        }
    }
}

/// One component of an `Xri`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubSegment {
    /// A class-symbol sub-segment, e.g. `=markus`, `+email`, `*42`.
    Class { symbol: ClassSymbol, body: Arc<str> },
    /// A parenthesized literal data sub-segment, e.g. `(data:,hello)`.
    Data(Arc<str>),
    /// A wildcard sub-segment used in `startsWith`/`endsWith` variable mode.
    /// `multiple = true` greedily matches one-or-more sub-segments on the
    /// other side; `false` matches exactly one.
    Variable { multiple: bool },
}

impl SubSegment {
    #[must_use]
    pub fn class(symbol: ClassSymbol, body: impl Into<Arc<str>>) -> Self {
        Self::Class {
            symbol,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn data(body: impl Into<Arc<str>>) -> Self {
        Self::Data(body.into())
    }

    #[must_use]
    pub const fn is_variable(&self) -> bool {
        matches!(self, Self::Variable { .. })
    }
}

impl fmt::Display for SubSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class { symbol, body } => write!(f, "{}{body}", symbol.as_char()),
            Self::Data(body) => write!(f, "({body})"),
            Self::Variable { multiple: false } => write!(f, "{{}}"),
            Self::Variable { multiple: true } => write!(f, "{{}}*"),
        }
    }
}

/// A hierarchical identifier: an ordered list of sub-segments. The empty
/// list is the reserved root segment `()`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Xri {
    sub_segments: Vec<SubSegment>,
}

impl Xri {
    /// The reserved root segment `()`.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_sub_segments(sub_segments: Vec<SubSegment>) -> Self {
        Self { sub_segments }
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.sub_segments.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sub_segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.is_root()
    }

    #[must_use]
    pub fn sub_segment(&self, index: usize) -> Option<&SubSegment> {
        self.sub_segments.get(index)
    }

    #[must_use]
    pub fn sub_segments(&self) -> &[SubSegment] {
        &self.sub_segments
    }

    #[must_use]
    pub fn only_sub_segment(&self) -> Option<&SubSegment> {
        match self.sub_segments.as_slice() {
            [single] => Some(single),
            _ => None,
        }
    }

    /// Concatenates `self` and `other`; concatenation with the root is identity.
    #[must_use]
    pub fn concat(&self, other: &Self) -> Self {
        let mut sub_segments = self.sub_segments.clone();
        sub_segments.extend(other.sub_segments.iter().cloned());
        Self { sub_segments }
    }

    fn resolved_count(n: isize, len: usize) -> usize {
        if n == 0 {
            len
        } else if n > 0 {
            (n as usize).min(len)
        } else {
            len.saturating_sub(n.unsigned_abs())
        }
    }

    /// Prefix of length `n`. `n == 0` returns the segment unchanged; negative
    /// `n` counts sub-segments from the tail; a result that would be empty
    /// returns the root.
    #[must_use]
    pub fn parent_xri(&self, n: isize) -> Self {
        let k = Self::resolved_count(n, self.len());
        if k == 0 {
            return Self::root();
        }
        Self {
            sub_segments: self.sub_segments[..k].to_vec(),
        }
    }

    /// Suffix of length `n`, with the same `n` convention as [`Self::parent_xri`].
    #[must_use]
    pub fn local_xri(&self, n: isize) -> Self {
        let k = Self::resolved_count(n, self.len());
        if k == 0 {
            return Self::root();
        }
        let start = self.len() - k;
        Self {
            sub_segments: self.sub_segments[start..].to_vec(),
        }
    }

    /// If `prefix` matches the start of `self`, returns the matched prefix
    /// (which may be longer than `prefix` itself if a greedy variable
    /// sub-segment consumed more than one sub-segment of `self`).
    ///
    /// `vars_in_self`/`vars_in_prefix` enable wildcard matching on the
    /// respective side: a [`SubSegment::Variable`] sub-segment on that side
    /// matches one sub-segment of the other side (or, if `multiple`, as many
    /// as are left over after satisfying the remaining fixed sub-segments).
    #[must_use]
    pub fn starts_with(&self, prefix: &Self, vars_in_self: bool, vars_in_prefix: bool) -> Option<Self> {
        let mut i = 0usize;
        let mut j = 0usize;
        while j < prefix.len() {
            if i >= self.len() {
                return None;
            }
            let a = &self.sub_segments[i];
            let b = &prefix.sub_segments[j];

            if vars_in_prefix && b.is_variable() {
                let multiple = matches!(b, SubSegment::Variable { multiple: true });
                if multiple {
                    let remaining_prefix = prefix.len() - j - 1;
                    let available = self.len() - i;
                    if available < remaining_prefix + 1 {
                        return None;
                    }
                    i += available - remaining_prefix;
                } else {
                    i += 1;
                }
                j += 1;
                continue;
            }

            if vars_in_self && a.is_variable() {
                i += 1;
                j += 1;
                continue;
            }

            if a == b {
                i += 1;
                j += 1;
            } else {
                return None;
            }
        }
        Some(self.parent_xri(i as isize))
    }

    /// Symmetric to [`Self::starts_with`], matching against the tail of `self`.
    #[must_use]
    pub fn ends_with(&self, suffix: &Self, vars_in_self: bool, vars_in_suffix: bool) -> Option<Self> {
        let reversed_self = self.reversed();
        let reversed_suffix = suffix.reversed();
        let matched = reversed_self.starts_with(&reversed_suffix, vars_in_self, vars_in_suffix)?;
        Some(matched.reversed())
    }

    fn reversed(&self) -> Self {
        let mut sub_segments = self.sub_segments.clone();
        sub_segments.reverse();
        Self { sub_segments }
    }

    /// Removes a matching `prefix` from the start of `self`, returning the
    /// remainder (the root if `prefix` consumed all of `self`, `None` if
    /// `prefix` does not match).
    #[must_use]
    pub fn remove_start_xri(&self, prefix: &Self) -> Option<Self> {
        let matched = self.starts_with(prefix, false, false)?;
        Some(self.local_xri(self.len() as isize - matched.len() as isize))
    }

    /// Removes a matching `suffix` from the end of `self`, returning the
    /// remainder (the root if `suffix` consumed all of `self`, `None` if
    /// `suffix` does not match).
    #[must_use]
    pub fn remove_end_xri(&self, suffix: &Self) -> Option<Self> {
        let matched = self.ends_with(suffix, false, false)?;
        Some(self.parent_xri(self.len() as isize - matched.len() as isize))
    }
}

impl fmt::Display for Xri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, "()");
        }
        for sub_segment in &self.sub_segments {
            write!(f, "{sub_segment}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Xri {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Parses XRI text into a segment. `""` and `"()"` both parse to the root.
///
/// # Errors
///
/// Returns [`ParseError`] if the text contains an unrecognized leading
/// character, or an unclosed `(...)` / `{...}` sub-segment.
pub fn parse(text: &str) -> Result<Xri, ParseError> {
    if text.is_empty() || text == "()" {
        return Ok(Xri::root());
    }

    let mut sub_segments = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&ch) = chars.peek() {
        if let Some(symbol) = ClassSymbol::from_char(ch) {
            chars.next();
            let body = take_body(&mut chars);
            sub_segments.push(SubSegment::class(symbol, body));
            continue;
        }

        match ch {
            '(' => {
                chars.next();
                let mut depth = 1;
                let mut data = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    match c {
                        '(' => {
                            depth += 1;
                            data.push(c);
                        }
                        ')' => {
                            depth -= 1;
                            if depth == 0 {
                                closed = true;
                                break;
                            }
                            data.push(c);
                        }
                        _ => data.push(c),
                    }
                }
                if !closed {
                    return Err(ParseError::UnclosedParen {
                        text: text.to_owned(),
                    });
                }
                sub_segments.push(SubSegment::data(data));
            }
            '{' => {
                chars.next();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(ParseError::UnclosedVariable {
                        text: text.to_owned(),
                    });
                }
                let multiple = chars.peek() == Some(&'*');
                if multiple {
                    chars.next();
                }
                sub_segments.push(SubSegment::Variable { multiple });
            }
            _ => {
                return Err(ParseError::UnexpectedChar {
                    text: text.to_owned(),
                    ch,
                });
            }
        }
    }

    Ok(Xri { sub_segments })
}

/// Reads sub-segment body text up to the next class symbol, `(`, or `{`.
fn take_body(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut body = String::new();
    while let Some(&c) = chars.peek() {
        if "=@+$!*({".contains(c) {
            break;
        }
        body.push(c);
        chars.next();
    }
    body
}

/// Ascending-by-length ordering, ties broken lexicographically. Used as the
/// ordering key for ascending contributor/identifier comparisons.
#[must_use]
pub fn cmp_ascending_by_length(a: &Xri, b: &Xri) -> Ordering {
    a.len()
        .cmp(&b.len())
        .then_with(|| a.to_string().cmp(&b.to_string()))
}

/// Descending-by-length ordering, ties broken lexicographically (not
/// reversed) — the ordering key the contributor map sorts on so that
/// iteration visits longer, more specific prefixes first.
#[must_use]
pub fn cmp_descending_by_length(a: &Xri, b: &Xri) -> Ordering {
    b.len()
        .cmp(&a.len())
        .then_with(|| a.to_string().cmp(&b.to_string()))
}
