use crate::{
    storage::{Database, Value},
    types::{Direction, SortedSet, ZAddFlags, ZAddOutcome},
    SableError,
};
use bytes::BytesMut;

#[derive(Debug, PartialEq)]
pub enum FindZSetResult<'a> {
    /// An entry exists in the db for the given key, but for a different type
    WrongType,
    /// A match was found
    Some(&'a SortedSet),
    /// No entry exist
    NotFound,
}

#[derive(PartialEq, Eq, Debug)]
pub enum ZSetLenResult {
    /// An entry exists in the db for the given key, but for a different type
    WrongType,
    /// Number of members (0 when the key does not exist)
    Some(usize),
}

#[derive(PartialEq, Debug)]
pub enum ZSetAddMemberResult {
    /// An entry exists in the db for the given key, but for a different type
    WrongType,
    Some(ZAddOutcome),
}

#[derive(PartialEq, Eq, Debug)]
pub enum ZSetDeleteMemberResult {
    /// An entry exists in the db for the given key, but for a different type
    WrongType,
    /// Delete was successful
    Ok,
    /// Member was not found
    MemberNotFound,
    /// The set does not exist
    SetNotFound,
}

#[derive(PartialEq, Debug)]
pub enum ZSetGetScoreResult {
    /// An entry exists in the db for the given key, but for a different type
    WrongType,
    /// Found the score
    Score(f64),
    /// Not found
    NotFound,
}

/// Sorted set accessor for a single database.
///
/// Lookups check that the key exists before checking its type, so a missing key is
/// never reported as `WrongType`. Locking is the caller's job: a `ZSetDb` is built
/// from a database borrowed out of the locked keyspace
pub struct ZSetDb<'a> {
    db: &'a mut Database,
}

impl<'a> ZSetDb<'a> {
    pub fn with_database(db: &'a mut Database) -> Self {
        ZSetDb { db }
    }

    /// Locate the sorted set stored at `user_key`
    pub fn find_set(&self, user_key: &[u8]) -> FindZSetResult<'_> {
        if !self.db.exists(user_key) {
            return FindZSetResult::NotFound;
        }
        match self.db.get(user_key) {
            Some(Value::ZSet(set)) => FindZSetResult::Some(set),
            Some(_) => FindZSetResult::WrongType,
            None => FindZSetResult::NotFound,
        }
    }

    /// Return the size of the set
    pub fn len(&self, user_key: &[u8]) -> ZSetLenResult {
        match self.find_set(user_key) {
            FindZSetResult::WrongType => ZSetLenResult::WrongType,
            FindZSetResult::NotFound => ZSetLenResult::Some(0),
            FindZSetResult::Some(set) => ZSetLenResult::Some(set.len()),
        }
    }

    /// Add (or update) a single member. The set is created if needed, but a set is
    /// never left behind empty (e.g. `XX` on a missing key)
    pub fn add(
        &mut self,
        user_key: &[u8],
        member: &[u8],
        score: f64,
        flags: ZAddFlags,
    ) -> ZSetAddMemberResult {
        let outcome = match self.db.get_mut(user_key) {
            Some(Value::ZSet(set)) => set.add_with_flags(member, score, flags),
            Some(_) => return ZSetAddMemberResult::WrongType,
            None => {
                let mut set = SortedSet::new();
                let outcome = set.add_with_flags(member, score, flags);
                if !set.is_empty() {
                    self.db.put(user_key, Value::ZSet(set));
                }
                return ZSetAddMemberResult::Some(outcome);
            }
        };

        if matches!(outcome, ZAddOutcome::Added(_) | ZAddOutcome::Updated(_)) {
            self.db.touch(user_key);
        }
        ZSetAddMemberResult::Some(outcome)
    }

    pub fn get_score(&self, user_key: &[u8], member: &[u8]) -> ZSetGetScoreResult {
        match self.find_set(user_key) {
            FindZSetResult::WrongType => ZSetGetScoreResult::WrongType,
            FindZSetResult::NotFound => ZSetGetScoreResult::NotFound,
            FindZSetResult::Some(set) => match set.score(member) {
                Some(score) => ZSetGetScoreResult::Score(score),
                None => ZSetGetScoreResult::NotFound,
            },
        }
    }

    /// Remove `member`. When the last member is removed, the key is deleted
    pub fn delete_member(&mut self, user_key: &[u8], member: &[u8]) -> ZSetDeleteMemberResult {
        let now_empty = match self.db.get_mut(user_key) {
            None => return ZSetDeleteMemberResult::SetNotFound,
            Some(Value::ZSet(set)) => {
                if !set.remove(member) {
                    return ZSetDeleteMemberResult::MemberNotFound;
                }
                set.is_empty()
            }
            Some(_) => return ZSetDeleteMemberResult::WrongType,
        };

        if now_empty {
            self.db.delete(user_key);
        } else {
            self.db.touch(user_key);
        }
        ZSetDeleteMemberResult::Ok
    }

    /// Remove a batch of members, return the number of members removed
    pub fn delete_members(
        &mut self,
        user_key: &[u8],
        members: &[BytesMut],
    ) -> Result<usize, SableError> {
        let mut removed = 0usize;
        for member in members {
            match self.delete_member(user_key, member) {
                ZSetDeleteMemberResult::Ok => removed = removed.saturating_add(1),
                ZSetDeleteMemberResult::MemberNotFound => {}
                ZSetDeleteMemberResult::SetNotFound => break,
                ZSetDeleteMemberResult::WrongType => return Err(SableError::WrongType),
            }
        }
        Ok(removed)
    }

    pub fn rank(
        &self,
        user_key: &[u8],
        member: &[u8],
        direction: Direction,
    ) -> Result<Option<usize>, SableError> {
        match self.find_set(user_key) {
            FindZSetResult::WrongType => Err(SableError::WrongType),
            FindZSetResult::NotFound => Ok(None),
            FindZSetResult::Some(set) => Ok(set.rank(member, direction)),
        }
    }

    /// Snapshot of the members in canonical order. Empty if the key does not exist
    pub fn members(&self, user_key: &[u8]) -> Result<Vec<BytesMut>, SableError> {
        match self.find_set(user_key) {
            FindZSetResult::WrongType => Err(SableError::WrongType),
            FindZSetResult::NotFound => Ok(Vec::new()),
            FindZSetResult::Some(set) => Ok(set.members()),
        }
    }

    /// Snapshot of the `(member, score)` pairs in canonical order
    pub fn elements(&self, user_key: &[u8]) -> Result<Vec<(BytesMut, f64)>, SableError> {
        match self.find_set(user_key) {
            FindZSetResult::WrongType => Err(SableError::WrongType),
            FindZSetResult::NotFound => Ok(Vec::new()),
            FindZSetResult::Some(set) => Ok(set.elements()),
        }
    }
}
