//! Span overlap resolution
//!
//! Decides whether two independently computed detections refer to the same
//! mention. Both checks must pass:
//! - the texts match approximately (bounded edit distance, case-insensitive)
//! - the offset intervals intersect

use clinex_core::config::DEFAULT_MAX_ERROR_RATIO;

/// A text span with half-open character offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'a> {
    pub text: &'a str,
    pub begin: usize,
    pub end: usize,
}

impl<'a> Span<'a> {
    pub fn new(text: &'a str, begin: usize, end: usize) -> Self {
        Self { text, begin, end }
    }

    /// Half-open interval intersection
    pub fn intersects(&self, other: &Span<'_>) -> bool {
        self.begin < other.end && other.begin < self.end
    }
}

/// Approximate span matcher
#[derive(Debug, Clone, Copy)]
pub struct SpanMatcher {
    /// Allowed edits per character of the shorter text
    max_error_ratio: f32,
}

impl SpanMatcher {
    /// Create a matcher with the default edit budget
    pub fn new() -> Self {
        Self {
            max_error_ratio: DEFAULT_MAX_ERROR_RATIO,
        }
    }

    /// Set the edit budget
    pub fn with_max_error_ratio(mut self, ratio: f32) -> Self {
        self.max_error_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    /// True when both spans name the same mention
    pub fn overlaps(&self, a: &Span<'_>, b: &Span<'_>) -> bool {
        a.intersects(b) && self.texts_match(a.text, b.text)
    }

    /// Approximate, case-insensitive text comparison. Symmetric.
    pub fn texts_match(&self, a: &str, b: &str) -> bool {
        let a: Vec<char> = a.trim().to_lowercase().chars().collect();
        let b: Vec<char> = b.trim().to_lowercase().chars().collect();

        if a.is_empty() || b.is_empty() {
            return false;
        }

        let shorter = a.len().min(b.len());
        let max_errors = (shorter as f32 * self.max_error_ratio).floor() as usize;

        let distance = search_distance(&a, &b).min(search_distance(&b, &a));
        distance <= max_errors
    }
}

impl Default for SpanMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Best edit distance of `pattern` against any substring of `text`
/// (Sellers' semi-global alignment: free leading and trailing text).
pub fn search_distance(pattern: &[char], text: &[char]) -> usize {
    if pattern.is_empty() {
        return 0;
    }

    // Row 0 is all zeros: a match may start anywhere in the text
    let mut prev = vec![0usize; text.len() + 1];
    let mut curr = vec![0usize; text.len() + 1];

    for (i, &p) in pattern.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &t) in text.iter().enumerate() {
            let cost = usize::from(p != t);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    // A match may end anywhere in the text
    prev.into_iter().min().unwrap_or(pattern.len())
}
