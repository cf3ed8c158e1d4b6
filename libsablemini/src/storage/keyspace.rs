use crate::{commands::Strings, types::SortedSet, SableError};
use bytes::BytesMut;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// A value stored in the keyspace
#[derive(Debug, Clone)]
pub enum Value {
    Str(BytesMut),
    ZSet(SortedSet),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Str(_) => ValueType::Str,
            Value::ZSet(_) => ValueType::ZSet,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Str,
    ZSet,
}

impl ValueType {
    /// The name reported by the `TYPE` command
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Str => "string",
            ValueType::ZSet => "zset",
        }
    }
}

/// A single logical database: key -> value.
///
/// Every write goes through this type so that each key carries a version number.
/// Versions only grow. A deleted key keeps its version only while some client
/// watches it, `WATCH` relies on it
#[derive(Debug, Default)]
pub struct Database {
    entries: HashMap<BytesMut, Value>,
    versions: HashMap<BytesMut, u64>,
    /// Number of clients watching each key
    watchers: HashMap<BytesMut, usize>,
    last_version: u64,
}

impl Database {
    pub fn exists(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    /// The type of the value stored at `key`. `None` if there is no such key
    pub fn value_type(&self, key: &[u8]) -> Option<ValueType> {
        self.entries.get(key).map(|value| value.value_type())
    }

    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Mutable access to the value. Callers must `touch` the key after changing it
    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    /// Store `value` at `key`, replacing whatever was there
    pub fn put(&mut self, key: &[u8], value: Value) {
        self.entries.insert(BytesMut::from(key), value);
        self.touch(key);
    }

    /// Remove `key`. Return `true` if it existed
    pub fn delete(&mut self, key: &[u8]) -> bool {
        if self.entries.remove(key).is_none() {
            return false;
        }
        self.forget(key);
        true
    }

    /// Remove all keys
    pub fn flush(&mut self) {
        let keys: Vec<BytesMut> = self.entries.drain().map(|(key, _)| key).collect();
        for key in keys {
            self.forget(&key);
        }
    }

    /// Mark `key` as modified
    pub fn touch(&mut self, key: &[u8]) {
        self.last_version = self.last_version.saturating_add(1);
        self.versions.insert(BytesMut::from(key), self.last_version);
    }

    /// Current version of `key`, 0 if the key does not exist and nobody watched it
    /// while it was deleted
    pub fn version(&self, key: &[u8]) -> u64 {
        self.versions.get(key).copied().unwrap_or(0)
    }

    /// Register one more watcher of `key` and return the key's current version
    pub fn watch(&mut self, key: &[u8]) -> u64 {
        *self.watchers.entry(BytesMut::from(key)).or_insert(0) += 1;
        self.version(key)
    }

    /// Drop one watcher of `key`. Once the last watcher is gone, the version of a
    /// deleted key is dropped as well
    pub fn unwatch(&mut self, key: &[u8]) {
        let Some(count) = self.watchers.get_mut(key) else {
            return;
        };
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.watchers.remove(key);
            if !self.entries.contains_key(key) {
                self.versions.remove(key);
            }
        }
    }

    /// Number of keys that have a version entry
    pub fn versions_len(&self) -> usize {
        self.versions.len()
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `key` was just removed: bump its version if someone watches it, otherwise
    /// drop it
    fn forget(&mut self, key: &[u8]) {
        if self.watchers.contains_key(key) {
            self.touch(key);
        } else {
            self.versions.remove(key);
        }
    }
}

/// All the databases of a server instance, behind one mutex
#[derive(Debug)]
pub struct Keyspace {
    databases: Mutex<Vec<Database>>,
    count: usize,
}

impl Default for Keyspace {
    fn default() -> Self {
        Keyspace::with_databases(16)
    }
}

impl Keyspace {
    /// Create a keyspace with `count` databases (at least one)
    pub fn with_databases(count: usize) -> Self {
        let count = count.max(1);
        let databases = (0..count).map(|_| Database::default()).collect();
        Keyspace {
            databases: Mutex::new(databases),
            count,
        }
    }

    /// Number of logical databases
    pub fn databases_count(&self) -> usize {
        self.count
    }

    /// Lock the entire keyspace. The guard must never be held across an `.await`
    pub fn lock(&self) -> Result<MutexGuard<'_, Vec<Database>>, SableError> {
        self.databases
            .lock()
            .map_err(|_| SableError::PoisonedLock(Strings::POISONED_MUTEX.to_string()))
    }
}
