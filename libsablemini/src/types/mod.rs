mod range;
mod sorted_set;

pub use range::{rank_range, LexBound, LexRange, Limit, ScoreBound, ScoreRange};
pub use sorted_set::{Direction, SortedSet, ZAddFlags, ZAddOutcome};

