use crate::{server::ClientState, storage::Database, SableError};
use bytes::BytesMut;

/// The part of a command that runs with the keyspace locked. It writes its reply
/// into the buffer it is given
pub type TxBody = Box<dyn FnOnce(&mut TxContext<'_>, &mut BytesMut) -> Result<(), SableError>>;

/// What a command body can see while the keyspace is locked
pub struct TxContext<'a> {
    databases: &'a mut [Database],
    client_state: &'a ClientState,
}

impl<'a> TxContext<'a> {
    pub fn new(databases: &'a mut [Database], client_state: &'a ClientState) -> Self {
        TxContext {
            databases,
            client_state,
        }
    }

    /// The database currently selected by the client. The selection is resolved when
    /// the body runs, so a `SELECT` queued earlier in the same transaction applies
    pub fn database(&mut self) -> Result<&mut Database, SableError> {
        let db_id = self.client_state.database_id() as usize;
        self.databases
            .get_mut(db_id)
            .ok_or(SableError::ClientInvalidState)
    }

    /// All databases (`FLUSHALL`, `INFO`)
    pub fn databases(&mut self) -> &mut [Database] {
        &mut *self.databases
    }

    pub fn client_state(&self) -> &'a ClientState {
        self.client_state
    }
}
