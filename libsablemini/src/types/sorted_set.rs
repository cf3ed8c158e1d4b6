use bytes::BytesMut;
use ordered_float::OrderedFloat;
use std::collections::{BTreeSet, HashMap};

bitflags::bitflags! {
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZAddFlags: u32  {
    const None = 0;
    /// Only update elements that already exist. Don't add new elements.
    const Xx = 1 << 0;
    /// Only add new elements. Don't update already existing elements.
    const Nx = 1 << 1;
    /// Only update existing elements if the new score is less than the current score.
    /// This flag doesn't prevent adding new elements.
    const Lt = 1 << 2;
    /// Only update existing elements if the new score is greater than the current score.
    /// This flag doesn't prevent adding new elements.
    const Gt = 1 << 3;
    /// Modify the return value from the number of new elements added, to the total number of elements changed
    const Ch = 1 << 4;
    /// The score is an increment added to the current score (0 for new members)
    const Incr = 1 << 5;
}
}

/// Outcome of adding a single member
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZAddOutcome {
    /// A new member was inserted with this score
    Added(f64),
    /// An existing member was moved to this score
    Updated(f64),
    /// The member exists and already holds this score
    Unchanged(f64),
    /// One of the NX/XX/GT/LT conditions prevented the write
    Skipped,
    /// The increment produced NaN (e.g. `+inf` + `-inf`). Nothing was written
    NotANumber,
}

/// Sort order used by rank queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// An in-memory sorted set.
///
/// Members are unique. The canonical order is score ascending, ties broken by the
/// member bytes ascending. Two indexes are kept in sync on every write: a member to
/// score map for point lookups and an ordered set of `(score, member)` for ordered
/// access. All ordered accessors return owned snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortedSet {
    scores: HashMap<BytesMut, f64>,
    ordered: BTreeSet<(OrderedFloat<f64>, BytesMut)>,
}

impl SortedSet {
    pub fn new() -> Self {
        SortedSet::default()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Insert or update `member`. Return `true` if `member` was not in the set before
    pub fn add(&mut self, member: &[u8], score: f64) -> bool {
        matches!(
            self.add_with_flags(member, score, ZAddFlags::None),
            ZAddOutcome::Added(_)
        )
    }

    /// Insert or update `member` honouring the `ZADD` flags
    pub fn add_with_flags(&mut self, member: &[u8], score: f64, flags: ZAddFlags) -> ZAddOutcome {
        match self.scores.get(member).copied() {
            Some(old_score) => {
                if flags.contains(ZAddFlags::Nx) {
                    return ZAddOutcome::Skipped;
                }
                let new_score = if flags.contains(ZAddFlags::Incr) {
                    old_score + score
                } else {
                    score
                };
                if new_score.is_nan() {
                    return ZAddOutcome::NotANumber;
                }
                if (flags.contains(ZAddFlags::Gt) && new_score <= old_score)
                    || (flags.contains(ZAddFlags::Lt) && new_score >= old_score)
                {
                    return ZAddOutcome::Skipped;
                }
                if new_score == old_score {
                    return ZAddOutcome::Unchanged(old_score);
                }
                let member = BytesMut::from(member);
                self.ordered
                    .remove(&(OrderedFloat(old_score), member.clone()));
                self.ordered.insert((OrderedFloat(new_score), member.clone()));
                self.scores.insert(member, new_score);
                ZAddOutcome::Updated(new_score)
            }
            None => {
                if flags.contains(ZAddFlags::Xx) {
                    return ZAddOutcome::Skipped;
                }
                if score.is_nan() {
                    return ZAddOutcome::NotANumber;
                }
                let member = BytesMut::from(member);
                self.ordered.insert((OrderedFloat(score), member.clone()));
                self.scores.insert(member, score);
                ZAddOutcome::Added(score)
            }
        }
    }

    /// Remove `member`. Return `true` if it was in the set
    pub fn remove(&mut self, member: &[u8]) -> bool {
        let Some((member, score)) = self.scores.remove_entry(member) else {
            return false;
        };
        self.ordered.remove(&(OrderedFloat(score), member));
        true
    }

    pub fn score(&self, member: &[u8]) -> Option<f64> {
        self.scores.get(member).copied()
    }

    /// 0-based position of `member` in the canonical order (or its reverse)
    pub fn rank(&self, member: &[u8], direction: Direction) -> Option<usize> {
        let score = self.score(member)?;
        let key = (OrderedFloat(score), BytesMut::from(member));
        let ascending = self.ordered.range(..&key).count();
        match direction {
            Direction::Ascending => Some(ascending),
            Direction::Descending => Some(self.len() - 1 - ascending),
        }
    }

    /// Snapshot of the members in canonical order
    pub fn members(&self) -> Vec<BytesMut> {
        self.ordered
            .iter()
            .map(|(_, member)| member.clone())
            .collect()
    }

    /// Snapshot of the `(member, score)` pairs in canonical order
    pub fn elements(&self) -> Vec<(BytesMut, f64)> {
        self.ordered
            .iter()
            .map(|(score, member)| (member.clone(), score.into_inner()))
            .collect()
    }
}
