use crate::BytesMutUtils;
use bytes::BytesMut;

/// One side of a score range as given on the wire: `1.5` (inclusive), `(1.5`
/// (exclusive) or an empty token (no constraint)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreBound {
    Unbounded,
    Inclusive(f64),
    Exclusive(f64),
}

impl ScoreBound {
    /// Parse a score range token. Return `None` if the token is not a valid float
    pub fn parse(token: &[u8]) -> Option<Self> {
        match token.first() {
            None => Some(ScoreBound::Unbounded),
            Some(b'(') => Some(ScoreBound::Exclusive(BytesMutUtils::parse_score(
                &token[1..],
            )?)),
            Some(_) => Some(ScoreBound::Inclusive(BytesMutUtils::parse_score(token)?)),
        }
    }

    /// Does `score` satisfy this bound when used as the lower bound?
    fn admits_from_below(&self, score: f64) -> bool {
        match self {
            ScoreBound::Unbounded => true,
            ScoreBound::Inclusive(min) => score >= *min,
            ScoreBound::Exclusive(min) => score > *min,
        }
    }

    /// Does `score` satisfy this bound when used as the upper bound?
    fn admits_from_above(&self, score: f64) -> bool {
        match self {
            ScoreBound::Unbounded => true,
            ScoreBound::Inclusive(max) => score <= *max,
            ScoreBound::Exclusive(max) => score < *max,
        }
    }
}

/// A score range. `min` and `max` are always relative to ascending score order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRange {
    pub min: ScoreBound,
    pub max: ScoreBound,
}

impl ScoreRange {
    pub fn new(min: ScoreBound, max: ScoreBound) -> Self {
        ScoreRange { min, max }
    }

    /// Build the range from the two bound tokens of a command. Reverse commands
    /// (`ZREVRANGEBYSCORE key max min`) pass `reverse = true`
    pub fn from_tokens(first: &[u8], second: &[u8], reverse: bool) -> Option<Self> {
        let first = ScoreBound::parse(first)?;
        let second = ScoreBound::parse(second)?;
        if reverse {
            Some(ScoreRange::new(second, first))
        } else {
            Some(ScoreRange::new(first, second))
        }
    }

    /// Keep the elements of `elements` (sorted by score) that fall in the range
    pub fn filter(&self, elements: Vec<(BytesMut, f64)>) -> Vec<(BytesMut, f64)> {
        elements
            .into_iter()
            .skip_while(|(_, score)| !self.min.admits_from_below(*score))
            .take_while(|(_, score)| self.max.admits_from_above(*score))
            .collect()
    }
}

/// One side of a lexicographic range. `-` and `+` are kept apart from real members
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexBound {
    NegInf,
    PosInf,
    Inclusive(BytesMut),
    Exclusive(BytesMut),
}

impl LexBound {
    /// Parse `-`, `+`, `[value` or `(value`. Anything else is `None`
    pub fn parse(token: &[u8]) -> Option<Self> {
        match token {
            b"-" => Some(LexBound::NegInf),
            b"+" => Some(LexBound::PosInf),
            [b'[', rest @ ..] => Some(LexBound::Inclusive(BytesMut::from(rest))),
            [b'(', rest @ ..] => Some(LexBound::Exclusive(BytesMut::from(rest))),
            _ => None,
        }
    }

    fn admits_from_below(&self, member: &[u8]) -> bool {
        match self {
            LexBound::NegInf => true,
            LexBound::PosInf => false,
            LexBound::Inclusive(min) => member >= &min[..],
            LexBound::Exclusive(min) => member > &min[..],
        }
    }

    fn admits_from_above(&self, member: &[u8]) -> bool {
        match self {
            LexBound::NegInf => false,
            LexBound::PosInf => true,
            LexBound::Inclusive(max) => member <= &max[..],
            LexBound::Exclusive(max) => member < &max[..],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexRange {
    pub min: LexBound,
    pub max: LexBound,
}

impl LexRange {
    pub fn new(min: LexBound, max: LexBound) -> Self {
        LexRange { min, max }
    }

    /// See `ScoreRange::from_tokens`
    pub fn from_tokens(first: &[u8], second: &[u8], reverse: bool) -> Option<Self> {
        let first = LexBound::parse(first)?;
        let second = LexBound::parse(second)?;
        if reverse {
            Some(LexRange::new(second, first))
        } else {
            Some(LexRange::new(first, second))
        }
    }

    /// A range with `-` as its upper bound or `+` as its lower bound holds nothing
    pub fn is_empty(&self) -> bool {
        matches!(self.max, LexBound::NegInf) || matches!(self.min, LexBound::PosInf)
    }

    /// Keep the members of `members` that fall in the range. `members` must be sorted
    /// bytewise (not by score)
    pub fn filter(&self, members: Vec<BytesMut>) -> Vec<BytesMut> {
        if self.is_empty() {
            return Vec::new();
        }
        members
            .into_iter()
            .skip_while(|member| !self.min.admits_from_below(member))
            .take_while(|member| self.max.admits_from_above(member))
            .collect()
    }
}

/// `LIMIT offset count`: applied after a score or lex filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub offset: i64,
    pub count: i64,
}

impl Limit {
    /// A negative offset, or an offset past the end, yields nothing. A negative count
    /// keeps everything after the offset
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        if self.offset < 0 {
            return Vec::new();
        }
        let offset = usize::try_from(self.offset).unwrap_or(usize::MAX);
        if offset >= items.len() {
            return Vec::new();
        }
        let items = items.into_iter().skip(offset);
        match usize::try_from(self.count) {
            Ok(count) => items.take(count).collect(),
            Err(_) => items.collect(),
        }
    }
}

/// Resolve a `start`/`stop` rank pair (inclusive, negative counts from the end)
/// against a sequence of `len` items. Return the half open range `[start, end)`;
/// an empty range is returned as `(0, 0)`
pub fn rank_range(len: usize, start: i64, stop: i64) -> (usize, usize) {
    let len = i64::try_from(len).unwrap_or(i64::MAX);
    let mut start = start;
    let mut end = stop;

    if start < 0 {
        start = len.saturating_add(start).max(0);
    }
    start = start.min(len);

    if end < 0 {
        end = len.saturating_add(end).max(-1);
    }
    end = end.saturating_add(1).min(len);

    if end <= start {
        return (0, 0);
    }
    // both values are in [0, len] here
    (start as usize, end as usize)
}

//  _    _ _   _ _____ _______      _______ ______  _____ _______ _____ _   _  _____
// | |  | | \ | |_   _|__   __|    |__   __|  ____|/ ____|__   __|_   _| \ | |/ ____|
// | |  | |  \| | | |    | |    _     | |  | |__  | (___    | |    | | |  \| | |  __|
// | |  | | . ` | | |    | |   / \    | |  |  __|  \___ \   | |    | | | . ` | | |_ |
// | |__| | |\  |_| |_   | |   \_/    | |  | |____ ____) |  | |   _| |_| |\  | |__| |
//  \____/|_| \_|_____|  |_|          |_|  |______|_____/   |_|  |_____|_| \_|\_____|
//
#[cfg(test)]
mod test {
    use super::*;
    use test_case::test_case;

    fn elements() -> Vec<(BytesMut, f64)> {
        vec![
            (BytesMut::from("a"), 1.0),
            (BytesMut::from("b"), 2.0),
            (BytesMut::from("c"), 2.0),
            (BytesMut::from("d"), 3.0),
        ]
    }

    fn members_of(elements: Vec<(BytesMut, f64)>) -> Vec<String> {
        elements
            .iter()
            .map(|(m, _)| String::from_utf8_lossy(m).to_string())
            .collect()
    }

    fn lex_members(members: &[&str]) -> Vec<BytesMut> {
        members.iter().map(|m| BytesMut::from(*m)).collect()
    }

    fn strings(members: Vec<BytesMut>) -> Vec<String> {
        members
            .iter()
            .map(|m| String::from_utf8_lossy(m).to_string())
            .collect()
    }

    #[test_case("1", Some(ScoreBound::Inclusive(1.0)); "inclusive")]
    #[test_case("(1", Some(ScoreBound::Exclusive(1.0)); "exclusive")]
    #[test_case("-inf", Some(ScoreBound::Inclusive(f64::NEG_INFINITY)); "minus inf")]
    #[test_case("(+inf", Some(ScoreBound::Exclusive(f64::INFINITY)); "exclusive inf")]
    #[test_case("", Some(ScoreBound::Unbounded); "empty token")]
    #[test_case("(", None; "paren only")]
    #[test_case("[1", None; "lex style")]
    #[test_case("nan", None; "nan")]
    fn test_parse_score_bound(token: &str, expected: Option<ScoreBound>) {
        assert_eq!(ScoreBound::parse(token.as_bytes()), expected);
    }

    #[test_case("-inf", "+inf", vec!["a", "b", "c", "d"]; "everything")]
    #[test_case("(1", "3", vec!["b", "c", "d"]; "exclusive min")]
    #[test_case("1", "(3", vec!["a", "b", "c"]; "exclusive max")]
    #[test_case("(1", "(3", vec!["b", "c"]; "both exclusive")]
    #[test_case("2", "2", vec!["b", "c"]; "single score")]
    #[test_case("(2", "(2", vec![]; "empty exclusive point")]
    #[test_case("5", "10", vec![]; "min above every score")]
    #[test_case("3", "1", vec![]; "inverted")]
    #[test_case("", "2", vec!["a", "b", "c"]; "unbounded min")]
    #[test_case("2", "", vec!["b", "c", "d"]; "unbounded max")]
    fn test_score_range(min: &str, max: &str, expected: Vec<&str>) {
        let range = ScoreRange::from_tokens(min.as_bytes(), max.as_bytes(), false).unwrap();
        assert_eq!(members_of(range.filter(elements())), expected);
    }

    #[test]
    fn test_score_range_reverse_tokens() {
        let range = ScoreRange::from_tokens(b"3", b"(1", true).unwrap();
        assert_eq!(
            range,
            ScoreRange::new(ScoreBound::Exclusive(1.0), ScoreBound::Inclusive(3.0))
        );
    }

    #[test_case("-", Some(LexBound::NegInf); "minus")]
    #[test_case("+", Some(LexBound::PosInf); "plus")]
    #[test_case("[a", Some(LexBound::Inclusive(BytesMut::from("a"))); "inclusive")]
    #[test_case("(a", Some(LexBound::Exclusive(BytesMut::from("a"))); "exclusive")]
    #[test_case("[", Some(LexBound::Inclusive(BytesMut::new())); "inclusive empty")]
    #[test_case("[-", Some(LexBound::Inclusive(BytesMut::from("-"))); "literal minus")]
    #[test_case("a", None; "no prefix")]
    #[test_case("", None; "empty")]
    #[test_case("++", None; "double plus")]
    fn test_parse_lex_bound(token: &str, expected: Option<LexBound>) {
        assert_eq!(LexBound::parse(token.as_bytes()), expected);
    }

    #[test_case("-", "+", vec!["a", "b", "c", "d"]; "everything")]
    #[test_case("[b", "[d", vec!["b", "c", "d"]; "inclusive")]
    #[test_case("(b", "(d", vec!["c"]; "exclusive")]
    #[test_case("-", "(c", vec!["a", "b"]; "open min")]
    #[test_case("[c", "+", vec!["c", "d"]; "open max")]
    #[test_case("[a", "-", vec![]; "max is minus")]
    #[test_case("+", "[z", vec![]; "min is plus")]
    #[test_case("+", "-", vec![]; "plus minus")]
    #[test_case("[e", "+", vec![]; "min past the end")]
    #[test_case("[+", "[-", vec![]; "literal plus and minus")]
    fn test_lex_range(min: &str, max: &str, expected: Vec<&str>) {
        let range = LexRange::from_tokens(min.as_bytes(), max.as_bytes(), false).unwrap();
        let filtered = range.filter(lex_members(&["a", "b", "c", "d"]));
        assert_eq!(strings(filtered), expected);
    }

    #[test]
    fn test_lex_range_sentinels_win_over_members() {
        let range = LexRange::from_tokens(b"[", b"-", false).unwrap();
        assert!(range.is_empty());
        assert!(range.filter(lex_members(&["", "-", "a"])).is_empty());
    }

    #[test_case(0, -1, vec!["a", "b", "c", "d"]; "no limit")]
    #[test_case(1, 1, vec!["b"]; "one after one")]
    #[test_case(1, -1, vec!["b", "c", "d"]; "negative count is unlimited")]
    #[test_case(2, 10, vec!["c", "d"]; "count past the end")]
    #[test_case(0, 0, vec![]; "zero count")]
    #[test_case(4, 1, vec![]; "offset at length")]
    #[test_case(10, 1, vec![]; "offset past length")]
    #[test_case(-1, 2, vec![]; "negative offset")]
    fn test_limit(offset: i64, count: i64, expected: Vec<&str>) {
        let limit = Limit { offset, count };
        let result = limit.apply(lex_members(&["a", "b", "c", "d"]));
        assert_eq!(strings(result), expected);
    }

    #[test_case(3, 0, -1, (0, 3); "everything")]
    #[test_case(3, 0, 0, (0, 1); "first")]
    #[test_case(3, -1, -1, (2, 3); "last")]
    #[test_case(3, -2, 10, (1, 3); "stop past the end")]
    #[test_case(3, -100, 1, (0, 2); "start before the beginning")]
    #[test_case(3, 2, 1, (0, 0); "inverted")]
    #[test_case(3, 3, 10, (0, 0); "start at length")]
    #[test_case(3, 5, 10, (0, 0); "start past length")]
    #[test_case(3, 0, -4, (0, 0); "stop before the beginning")]
    #[test_case(3, -100, -100, (0, 0); "both before the beginning")]
    #[test_case(0, 0, -1, (0, 0); "empty set")]
    fn test_rank_range(len: usize, start: i64, stop: i64, expected: (usize, usize)) {
        assert_eq!(rank_range(len, start, stop), expected);
    }
}
