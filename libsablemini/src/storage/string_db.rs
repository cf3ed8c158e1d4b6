use crate::storage::{Database, Value};
use bytes::BytesMut;

#[derive(Debug, PartialEq, Eq)]
pub enum StringGetResult {
    /// An entry exists in the db for the given key, but for a different type
    WrongType,
    Some(BytesMut),
    NotFound,
}

/// String accessor for a single database
pub struct StringsDb<'a> {
    db: &'a mut Database,
}

impl<'a> StringsDb<'a> {
    pub fn with_database(db: &'a mut Database) -> Self {
        StringsDb { db }
    }

    /// Set `user_key` to `value`. Any previous value, of any type, is replaced
    pub fn put(&mut self, user_key: &[u8], value: &[u8]) {
        self.db.put(user_key, Value::Str(BytesMut::from(value)));
    }

    pub fn get(&self, user_key: &[u8]) -> StringGetResult {
        match self.db.get(user_key) {
            None => StringGetResult::NotFound,
            Some(Value::Str(value)) => StringGetResult::Some(value.clone()),
            Some(_) => StringGetResult::WrongType,
        }
    }
}
