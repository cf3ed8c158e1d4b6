mod keyspace;
mod string_db;
mod zset_db;

pub use keyspace::{Database, Keyspace, Value, ValueType};
pub use string_db::{StringGetResult, StringsDb};
pub use zset_db::{
    FindZSetResult, ZSetAddMemberResult, ZSetDb, ZSetDeleteMemberResult, ZSetGetScoreResult,
    ZSetLenResult,
};
