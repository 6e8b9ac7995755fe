//! Highlighting and find-next over a detail log.
//!
//! Offsets are byte offsets into the UTF-8 text and always fall on char
//! boundaries. Spans are half-open `[start, end)`.

/// Lines containing any of these (case-insensitive) get an error highlight.
pub const ERROR_KEYWORDS: [&str; 3] = ["error", "fatal", "exception"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HighlightKind {
    /// Whole line containing an error keyword.
    Error,
    /// One occurrence of the search term.
    Match,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightSpan {
    pub start: usize,
    pub end: usize,
    pub kind: HighlightKind,
}

impl HighlightSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// One ERROR span per line whose lowercase text contains an error keyword.
/// The span covers the line without its terminator.
pub fn error_spans(text: &str) -> Vec<HighlightSpan> {
    let mut spans = Vec::new();
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let content = line.trim_end_matches('\n').trim_end_matches('\r');
        let lower = content.to_lowercase();
        if ERROR_KEYWORDS.iter().any(|k| lower.contains(k)) {
            spans.push(HighlightSpan {
                start: offset,
                end: offset + content.len(),
                kind: HighlightKind::Error,
            });
        }
        offset += line.len();
    }
    spans
}

/// Non-overlapping, case-sensitive occurrences of `term`, left to right.
pub fn match_spans(text: &str, term: &str) -> Vec<HighlightSpan> {
    if term.is_empty() {
        return Vec::new();
    }
    text.match_indices(term)
        .map(|(start, m)| HighlightSpan {
            start,
            end: start + m.len(),
            kind: HighlightKind::Match,
        })
        .collect()
}

/// All highlights for `text`. Error spans come first, then match spans, so
/// painting in list order lets a match win where the two overlap.
pub fn compute_highlights(text: &str, search_term: &str) -> Vec<HighlightSpan> {
    let mut spans = error_spans(text);
    spans.extend(match_spans(text, search_term));
    spans
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOffset {
    pub start: usize,
    pub end: usize,
    /// The search ran off the end (or start) and restarted from the other side.
    pub wrapped: bool,
}

/// Start positions of the painted matches, so find always lands on a
/// highlighted span.
fn occurrence_starts(text: &str, term: &str) -> Vec<usize> {
    text.match_indices(term).map(|(start, _)| start).collect()
}

fn locate(text: &str, term: &str, cursor: Option<usize>, forward: bool) -> Option<MatchOffset> {
    if term.is_empty() {
        return None;
    }
    let starts = occurrence_starts(text, term);
    let direct = match cursor {
        None if forward => starts.first().copied(),
        None => starts.last().copied(),
        Some(c) if forward => starts.iter().copied().find(|&s| s > c),
        Some(c) => starts.iter().rev().copied().find(|&s| s < c),
    };
    let (start, wrapped) = match direct {
        Some(s) => (s, false),
        None => {
            let retry = if forward { starts.first() } else { starts.last() };
            (*retry?, cursor.is_some())
        }
    };
    Some(MatchOffset {
        start,
        end: start + term.len(),
        wrapped,
    })
}

/// Next occurrence strictly after `current_offset` (strictly before it when
/// `forward` is false). Wraps to the opposite end once; `None` means the
/// term does not occur at all.
pub fn find_next(text: &str, search_term: &str, current_offset: usize, forward: bool) -> Option<MatchOffset> {
    locate(text, search_term, Some(current_offset), forward)
}

/// What a find step produced, for the UI to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(MatchOffset),
    /// Informational, not an error.
    NotFound { term: String },
    /// Nothing to look for.
    EmptyTerm,
}

impl SearchOutcome {
    pub fn notice(&self) -> Option<String> {
        match self {
            SearchOutcome::NotFound { term } => Some(format!("'{}' not found.", term)),
            _ => None,
        }
    }
}

/// Search state for the record currently shown in the detail view.
///
/// Loading new text or changing the term puts the cursor back at the
/// document start and recomputes highlights from scratch.
#[derive(Debug, Clone, Default)]
pub struct LogSearch {
    text: String,
    term: String,
    current: Option<MatchOffset>,
    highlights: Vec<HighlightSpan>,
}

impl LogSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.reset();
    }

    pub fn set_term(&mut self, term: impl Into<String>) {
        let term = term.into();
        if term != self.term {
            self.term = term;
            self.reset();
        }
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.reset();
    }

    fn reset(&mut self) {
        self.current = None;
        self.highlights = compute_highlights(&self.text, &self.term);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn highlights(&self) -> &[HighlightSpan] {
        &self.highlights
    }

    /// Last match landed on, if any.
    pub fn current(&self) -> Option<MatchOffset> {
        self.current
    }

    pub fn find_next(&mut self) -> SearchOutcome {
        self.step(true)
    }

    pub fn find_previous(&mut self) -> SearchOutcome {
        self.step(false)
    }

    fn step(&mut self, forward: bool) -> SearchOutcome {
        if self.term.is_empty() {
            return SearchOutcome::EmptyTerm;
        }
        let cursor = self.current.map(|m| m.start);
        match locate(&self.text, &self.term, cursor, forward) {
            Some(found) => {
                self.current = Some(found);
                SearchOutcome::Found(found)
            }
            None => SearchOutcome::NotFound {
                term: self.term.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(spans: &[HighlightSpan], kind: HighlightKind) -> Vec<(usize, usize)> {
        spans
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| (s.start, s.end))
            .collect()
    }

    #[test]
    fn error_line_without_term() {
        let text = "line one\nERROR: boom\nline three";
        let spans = compute_highlights(text, "");
        assert_eq!(kinds(&spans, HighlightKind::Error), vec![(9, 20)]);
        assert!(kinds(&spans, HighlightKind::Match).is_empty());
        assert_eq!(&text[9..20], "ERROR: boom");
    }

    #[test]
    fn three_non_overlapping_matches() {
        let spans = compute_highlights("abc abc abc", "abc");
        assert_eq!(kinds(&spans, HighlightKind::Match), vec![(0, 3), (4, 7), (8, 11)]);
        assert!(spans.iter().all(|s| s.len() == 3));
    }

    #[test]
    fn matches_do_not_overlap() {
        assert_eq!(kinds(&match_spans("aaaa", "aa"), HighlightKind::Match), vec![(0, 2), (2, 4)]);
    }

    #[test]
    fn find_lands_only_on_highlighted_matches() {
        let mut search = LogSearch::new();
        search.load("aaaa");
        search.set_term("aa");
        let painted = kinds(search.highlights(), HighlightKind::Match);

        let mut visited = Vec::new();
        for _ in 0..3 {
            if let SearchOutcome::Found(m) = search.find_next() {
                visited.push((m.start, m.end));
            }
        }
        assert_eq!(visited, vec![(0, 2), (2, 4), (0, 2)]);
        assert!(visited.iter().all(|span| painted.contains(span)));
        assert_eq!(find_next("aaaa", "aa", 0, true).map(|m| m.start), Some(2));
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert!(match_spans("Error error", "ERROR").is_empty());
        assert_eq!(match_spans("Error error", "error").len(), 1);
    }

    #[test]
    fn every_keyword_and_crlf() {
        let text = "a Fatal thing\r\nok\r\nNullPointerException\n\nwarn";
        let spans = error_spans(text);
        let lines: Vec<_> = spans.iter().map(|s| &text[s.start..s.end]).collect();
        assert_eq!(lines, ["a Fatal thing", "NullPointerException"]);
    }

    #[test]
    fn errors_come_before_matches() {
        let spans = compute_highlights("[ERROR] Transaction Failed", "Failed");
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].kind, HighlightKind::Error);
        assert_eq!(spans[1].kind, HighlightKind::Match);
    }

    #[test]
    fn highlights_are_pure() {
        let text = "[INFO] ok\n[ERROR] Transaction Failed\nexception here";
        assert_eq!(compute_highlights(text, "ion"), compute_highlights(text, "ion"));
    }

    #[test]
    fn multibyte_offsets_stay_on_char_boundaries() {
        let text = "로그 error 로그";
        let spans = compute_highlights(text, "로그");
        for s in &spans {
            assert!(text.is_char_boundary(s.start) && text.is_char_boundary(s.end));
        }
        assert_eq!(kinds(&spans, HighlightKind::Match), vec![(0, 6), (13, 19)]);
        assert_eq!(find_next(text, "로그", 0, true).unwrap().start, 13);
    }

    #[test]
    fn forward_wraps_to_start() {
        let found = find_next("x y x", "x", 4, true).unwrap();
        assert_eq!(found.start, 0);
        assert!(found.wrapped);
    }

    #[test]
    fn forward_is_strictly_after() {
        let found = find_next("x y x", "x", 0, true).unwrap();
        assert_eq!(found.start, 4);
        assert!(!found.wrapped);
    }

    #[test]
    fn backward_wraps_to_end() {
        assert_eq!(find_next("x y x", "x", 4, false).unwrap().start, 0);
        let wrapped = find_next("x y x", "x", 0, false).unwrap();
        assert_eq!(wrapped.start, 4);
        assert!(wrapped.wrapped);
    }

    #[test]
    fn single_occurrence_wraps_onto_itself() {
        let found = find_next("only x here", "x", 5, true).unwrap();
        assert_eq!((found.start, found.end), (5, 6));
    }

    #[test]
    fn absent_or_empty_term_is_not_found() {
        assert_eq!(find_next("x y x", "z", 0, true), None);
        assert_eq!(find_next("x y x", "", 0, true), None);
        assert_eq!(find_next("", "x", 0, false), None);
    }

    #[test]
    fn stateful_cycle_with_wraparound() {
        let mut search = LogSearch::new();
        search.load("x y x");
        search.set_term("x");

        let starts: Vec<_> = (0..3)
            .map(|_| match search.find_next() {
                SearchOutcome::Found(m) => m.start,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(starts, [0, 4, 0]);

        match search.find_previous() {
            SearchOutcome::Found(m) => assert_eq!(m.start, 4),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn term_change_and_reload_reset_cursor() {
        let mut search = LogSearch::new();
        search.load("ab ab ab");
        search.set_term("ab");
        search.find_next();
        search.find_next();
        assert_eq!(search.current().unwrap().start, 3);

        search.set_term("b");
        assert_eq!(search.current(), None);
        assert_eq!(search.find_next(), SearchOutcome::Found(MatchOffset { start: 1, end: 2, wrapped: false }));

        search.load("b first");
        assert_eq!(search.current(), None);
        assert_eq!(search.highlights().len(), 1);
        assert_eq!(search.find_next(), SearchOutcome::Found(MatchOffset { start: 0, end: 1, wrapped: false }));
    }

    #[test]
    fn same_term_keeps_cursor() {
        let mut search = LogSearch::new();
        search.load("ab ab");
        search.set_term("ab");
        search.find_next();
        search.set_term("ab");
        assert_eq!(search.current().map(|m| m.start), Some(0));
    }

    #[test]
    fn empty_term_clears_matches_keeps_errors() {
        let mut search = LogSearch::new();
        search.load("[ERROR] Transaction Failed\nok");
        search.set_term("ok");
        assert_eq!(search.highlights().len(), 2);

        search.set_term("");
        assert_eq!(search.highlights().len(), 1);
        assert_eq!(search.highlights()[0].kind, HighlightKind::Error);
        assert_eq!(search.find_next(), SearchOutcome::EmptyTerm);
    }

    #[test]
    fn not_found_is_a_notice() {
        let mut search = LogSearch::new();
        search.load("nothing here");
        search.set_term("GUID-1");
        let outcome = search.find_next();
        assert_eq!(outcome.notice().as_deref(), Some("'GUID-1' not found."));
        assert_eq!(search.current(), None);
    }
}
