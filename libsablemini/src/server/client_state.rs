use crate::{
    commands::{Strings, TxBody, TxContext},
    server::{new_client_id, ServerState},
    storage::Database,
    RespBuilder, SableError,
};
use bytes::BytesMut;
use crossbeam::queue::SegQueue;
use dashmap::DashMap;
use std::sync::{
    atomic::{AtomicU16, AtomicU32, Ordering},
    Arc,
};

pub struct ClientStateFlags {}

impl ClientStateFlags {
    /// Inside a `MULTI` block: commands are queued instead of executed
    pub const TXN_MULTI: u32 = 1 << 0;
    /// A malformed command was seen. A pending `EXEC` must be refused
    pub const TXN_DIRTY: u32 = 1 << 1;
}

pub struct ClientState {
    server_state: Arc<ServerState>,
    client_id: u128,
    db_id: AtomicU16,
    flags: AtomicU32,
    /// Holds the command bodies to be executed by `EXEC`
    txn_bodies: SegQueue<TxBody>,
    /// Keys passed to `WATCH`: (database, key) -> the key version at `WATCH` time
    watched_keys: DashMap<(u16, BytesMut), u64>,
}

impl ClientState {
    pub fn new(server_state: Arc<ServerState>) -> Self {
        ClientState {
            server_state,
            client_id: new_client_id(),
            db_id: AtomicU16::new(0),
            flags: AtomicU32::new(0),
            txn_bodies: SegQueue::<TxBody>::new(),
            watched_keys: DashMap::<(u16, BytesMut), u64>::default(),
        }
    }

    pub fn id(&self) -> u128 {
        self.client_id
    }

    pub fn server_inner_state(&self) -> Arc<ServerState> {
        self.server_state.clone()
    }

    /// Return the client's database ID
    pub fn database_id(&self) -> u16 {
        self.db_id.load(Ordering::Relaxed)
    }

    /// Set the active database ID for this client
    pub fn set_database_id(&self, id: u16) {
        self.db_id.store(id, Ordering::Relaxed);
    }

    pub fn is_txn_state_multi(&self) -> bool {
        self.is_flag_enabled(ClientStateFlags::TXN_MULTI)
    }

    pub fn set_txn_state_multi(&self, enabled: bool) {
        self.enable_client_flag(ClientStateFlags::TXN_MULTI, enabled)
    }

    pub fn is_txn_dirty(&self) -> bool {
        self.is_flag_enabled(ClientStateFlags::TXN_DIRTY)
    }

    pub fn set_txn_dirty(&self, enabled: bool) {
        self.enable_client_flag(ClientStateFlags::TXN_DIRTY, enabled)
    }

    /// Leave the `MULTI` state, dropping the queued bodies and the watched keys.
    /// Locks the keyspace when keys are watched, so the caller must not hold the lock
    pub fn discard_transaction(&self) -> Result<(), SableError> {
        self.set_txn_state_multi(false);
        self.set_txn_dirty(false);
        self.txn_clear_bodies();
        if self.watched_keys.is_empty() {
            return Ok(());
        }
        let keyspace = self.server_state.keyspace();
        let mut databases = keyspace.lock()?;
        self.unwatch_all(databases.as_mut_slice());
        Ok(())
    }

    /// Queue a command body for `EXEC`
    pub fn txn_queue_body(&self, body: TxBody) {
        self.txn_bodies.push(body);
    }

    /// Number of queued bodies
    pub fn txn_queue_len(&self) -> usize {
        self.txn_bodies.len()
    }

    /// Return the queued bodies in queue order. The queue is left empty
    pub fn txn_take_bodies(&self) -> Vec<TxBody> {
        let mut bodies = Vec::<TxBody>::with_capacity(self.txn_bodies.len());
        while let Some(body) = self.txn_bodies.pop() {
            bodies.push(body);
        }
        bodies
    }

    /// Drop the queued bodies without running them
    pub fn txn_clear_bodies(&self) {
        while self.txn_bodies.pop().is_some() {}
    }

    /// Remember the current version of `key`. `db` must be the selected database.
    /// Watching a key twice keeps the first version
    pub fn watch_key(&self, db: &mut Database, key: &[u8]) {
        let watched_key = (self.database_id(), BytesMut::from(key));
        if self.watched_keys.contains_key(&watched_key) {
            return;
        }
        let version = db.watch(key);
        self.watched_keys.insert(watched_key, version);
    }

    /// Forget every watched key, releasing them in `databases`
    pub fn unwatch_all(&self, databases: &mut [Database]) {
        let watched: Vec<(u16, BytesMut)> = self
            .watched_keys
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        self.watched_keys.clear();
        for (db_id, key) in watched {
            if let Some(db) = databases.get_mut(db_id as usize) {
                db.unwatch(&key);
            }
        }
    }

    pub fn watched_keys_count(&self) -> usize {
        self.watched_keys.len()
    }

    /// Was any of the watched keys modified since it was watched?
    pub fn watched_keys_modified(&self, databases: &[Database]) -> bool {
        self.watched_keys.iter().any(|entry| {
            let (db_id, key) = entry.key();
            match databases.get(*db_id as usize) {
                Some(db) => db.version(key) != *entry.value(),
                None => true,
            }
        })
    }

    /// Run `body` atomically against the keyspace, writing its reply into
    /// `response_buffer`. Inside a `MULTI` block the body is queued instead and the
    /// reply is `+QUEUED`
    pub fn with_tx<F>(&self, response_buffer: &mut BytesMut, body: F) -> Result<(), SableError>
    where
        F: FnOnce(&mut TxContext<'_>, &mut BytesMut) -> Result<(), SableError> + 'static,
    {
        if self.is_txn_state_multi() {
            self.txn_queue_body(Box::new(body));
            RespBuilder::default().status_string(response_buffer, Strings::QUEUED);
            return Ok(());
        }

        let keyspace = self.server_state.keyspace();
        let mut databases = keyspace.lock()?;
        self.run_body(databases.as_mut_slice(), Box::new(body), response_buffer)
    }

    /// Run a body against an already locked keyspace
    pub fn run_body(
        &self,
        databases: &mut [Database],
        body: TxBody,
        response_buffer: &mut BytesMut,
    ) -> Result<(), SableError> {
        let mut ctx = TxContext::new(databases, self);
        response_buffer.clear();
        match body(&mut ctx, response_buffer) {
            Err(SableError::WrongType) => {
                RespBuilder::default().error_string(response_buffer, Strings::WRONGTYPE);
                Ok(())
            }
            other => other,
        }
    }

    pub fn error(&self, msg: &str) {
        tracing::error!("CLNT {}: {}", self.client_id, msg);
    }

    pub fn debug(&self, msg: &str) {
        tracing::debug!("CLNT {}: {}", self.client_id, msg);
    }

    pub fn trace(&self, msg: &str) {
        tracing::trace!("CLNT {}: {}", self.client_id, msg);
    }

    pub fn warn(&self, msg: &str) {
        tracing::warn!("CLNT {}: {}", self.client_id, msg);
    }

    fn enable_client_flag(&self, flag: u32, enabled: bool) {
        if enabled {
            self.flags.fetch_or(flag, Ordering::Relaxed);
        } else {
            self.flags.fetch_and(!flag, Ordering::Relaxed);
        }
    }

    fn is_flag_enabled(&self, flag: u32) -> bool {
        self.flags.load(Ordering::Relaxed) & flag == flag
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::storage::Value;

    fn new_client_state() -> ClientState {
        ClientState::new(Arc::<ServerState>::default())
    }

    #[test]
    fn test_flags() {
        let client_state = new_client_state();
        assert!(!client_state.is_txn_state_multi());
        client_state.set_txn_state_multi(true);
        client_state.set_txn_dirty(true);
        assert!(client_state.is_txn_state_multi());
        assert!(client_state.is_txn_dirty());
        client_state.set_txn_dirty(false);
        assert!(client_state.is_txn_state_multi());
        assert!(!client_state.is_txn_dirty());
    }

    #[test]
    fn test_with_tx_runs_or_queues() {
        let client_state = new_client_state();
        let mut buffer = BytesMut::new();

        client_state
            .with_tx(&mut buffer, |ctx, response_buffer| {
                ctx.database()?.put(b"k", Value::Str(BytesMut::from("v")));
                RespBuilder::default().ok(response_buffer);
                Ok(())
            })
            .unwrap();
        assert_eq!(buffer, "+OK\r\n");

        client_state.set_txn_state_multi(true);
        client_state
            .with_tx(&mut buffer, |_ctx, response_buffer| {
                RespBuilder::default().ok(response_buffer);
                Ok(())
            })
            .unwrap();
        assert_eq!(buffer, "+QUEUED\r\n");
        assert_eq!(client_state.txn_queue_len(), 1);

        client_state.discard_transaction().unwrap();
        assert_eq!(client_state.txn_queue_len(), 0);
        assert!(!client_state.is_txn_state_multi());
    }

    #[test]
    fn test_clear_bodies() {
        let client_state = new_client_state();
        for _ in 0..3 {
            client_state.txn_queue_body(Box::new(|_, _| Ok(())));
        }
        assert_eq!(client_state.txn_queue_len(), 3);
        client_state.txn_clear_bodies();
        assert_eq!(client_state.txn_queue_len(), 0);
        assert!(client_state.txn_take_bodies().is_empty());

        // clearing an empty queue is fine
        client_state.txn_clear_bodies();
        assert_eq!(client_state.txn_queue_len(), 0);
    }

    #[test]
    fn test_wrong_type_error_becomes_a_reply() {
        let client_state = new_client_state();
        let mut buffer = BytesMut::new();
        client_state
            .with_tx(&mut buffer, |_, _| Err(SableError::WrongType))
            .unwrap();
        assert_eq!(
            buffer,
            "-WRONGTYPE Operation against a key holding the wrong kind of value\r\n"
        );
    }

    #[test]
    fn test_watched_keys() {
        let client_state = new_client_state();
        let server_state = client_state.server_inner_state();
        let mut databases = server_state.keyspace().lock().unwrap();

        client_state.watch_key(&mut databases[0], b"k");
        assert!(!client_state.watched_keys_modified(&databases));

        databases[1].put(b"k", Value::Str(BytesMut::from("v")));
        assert!(!client_state.watched_keys_modified(&databases));

        databases[0].put(b"k", Value::Str(BytesMut::from("v")));
        assert!(client_state.watched_keys_modified(&databases));

        client_state.unwatch_all(databases.as_mut_slice());
        assert!(!client_state.watched_keys_modified(&databases));
    }

    #[test]
    fn test_watched_key_deleted_and_released() {
        let client_state = new_client_state();
        let server_state = client_state.server_inner_state();
        {
            let mut databases = server_state.keyspace().lock().unwrap();
            databases[0].put(b"k", Value::Str(BytesMut::from("v")));
            client_state.watch_key(&mut databases[0], b"k");
            client_state.watch_key(&mut databases[0], b"k");
            assert_eq!(client_state.watched_keys_count(), 1);

            databases[0].delete(b"k");
            assert!(client_state.watched_keys_modified(&databases));
            assert_eq!(databases[0].versions_len(), 1);
        }

        // discarding releases the watched keys, the deleted key's version goes away
        client_state.discard_transaction().unwrap();
        assert_eq!(client_state.watched_keys_count(), 0);
        let databases = server_state.keyspace().lock().unwrap();
        assert_eq!(databases[0].versions_len(), 0);
    }
}
