use crate::{
    commands::{HandleCommandResult, Strings},
    reject_command,
    server::{ClientState, Telemetry},
    RedisCommand, RedisCommandName, RespBuilder, SableError,
};

use bytes::BytesMut;
use std::rc::Rc;

/// `MULTI`, `EXEC`, `DISCARD`, `WATCH` and `UNWATCH`
pub struct TransactionCommands {}

impl TransactionCommands {
    pub fn handle_command(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
    ) -> Result<HandleCommandResult, SableError> {
        let mut response_buffer = BytesMut::with_capacity(64);
        match command.metadata().name() {
            RedisCommandName::Multi => {
                Self::multi(client_state, &mut response_buffer)?;
            }
            RedisCommandName::Exec => {
                Self::exec(client_state, &mut response_buffer)?;
            }
            RedisCommandName::Discard => {
                Self::discard(client_state, &mut response_buffer)?;
            }
            RedisCommandName::Watch => {
                Self::watch(client_state, command, &mut response_buffer)?;
            }
            RedisCommandName::Unwatch => {
                Self::unwatch(client_state, &mut response_buffer)?;
            }
            _ => {
                return Err(SableError::InvalidArgument(format!(
                    "Non transaction command {}",
                    command.main_command()
                )));
            }
        }
        Ok(HandleCommandResult::ResponseBufferUpdated(response_buffer))
    }

    /// Enter the `MULTI` state. Errors seen before this point do not count against the
    /// transaction
    fn multi(client_state: Rc<ClientState>, response_buffer: &mut BytesMut) -> Result<(), SableError> {
        if client_state.is_txn_state_multi() {
            reject_command!(client_state, response_buffer, Strings::MULTI_NESTED);
        }
        client_state.set_txn_dirty(false);
        client_state.txn_clear_bodies();
        client_state.set_txn_state_multi(true);
        RespBuilder::default().ok(response_buffer);
        Ok(())
    }

    /// Run every queued body, in queue order, with the keyspace locked once for the whole
    /// batch. The reply is an array holding the reply of each body
    fn exec(client_state: Rc<ClientState>, response_buffer: &mut BytesMut) -> Result<(), SableError> {
        let builder = RespBuilder::default();
        if !client_state.is_txn_state_multi() {
            builder.error_string(response_buffer, Strings::EXEC_WITHOUT_MULTI);
            return Ok(());
        }

        if client_state.is_txn_dirty() {
            client_state.discard_transaction()?;
            Telemetry::inc_transactions_aborted();
            builder.error_string(response_buffer, Strings::EXEC_ABORT);
            return Ok(());
        }

        let bodies = client_state.txn_take_bodies();
        let server_state = client_state.server_inner_state();
        let mut databases = server_state.keyspace().lock()?;

        if client_state.watched_keys_modified(&databases) {
            client_state.debug("watched key modified, transaction aborted");
            client_state.unwatch_all(databases.as_mut_slice());
            drop(databases);
            client_state.discard_transaction()?;
            Telemetry::inc_transactions_aborted();
            builder.null_array(response_buffer);
            return Ok(());
        }

        // Bodies must run, not be queued again
        client_state.set_txn_state_multi(false);

        response_buffer.clear();
        builder.add_array_len(response_buffer, bodies.len());
        let mut reply = BytesMut::with_capacity(64);
        for body in bodies {
            client_state.run_body(databases.as_mut_slice(), body, &mut reply)?;
            response_buffer.extend_from_slice(&reply);
        }
        client_state.unwatch_all(databases.as_mut_slice());
        drop(databases);

        client_state.discard_transaction()?;
        Telemetry::inc_transactions_executed();
        Ok(())
    }

    fn discard(client_state: Rc<ClientState>, response_buffer: &mut BytesMut) -> Result<(), SableError> {
        let builder = RespBuilder::default();
        if !client_state.is_txn_state_multi() {
            builder.error_string(response_buffer, Strings::DISCARD_WITHOUT_MULTI);
            return Ok(());
        }
        client_state.discard_transaction()?;
        builder.ok(response_buffer);
        Ok(())
    }

    /// Remember the current version of each key. `EXEC` fails if any of them changes
    fn watch(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
        response_buffer: &mut BytesMut,
    ) -> Result<(), SableError> {
        if client_state.is_txn_state_multi() {
            reject_command!(client_state, response_buffer, Strings::WATCH_INSIDE_MULTI);
        }

        let server_state = client_state.server_inner_state();
        let mut databases = server_state.keyspace().lock()?;
        let Some(db) = databases.get_mut(client_state.database_id() as usize) else {
            return Err(SableError::ClientInvalidState);
        };
        for key in command.args_vec().iter().skip(1) {
            client_state.watch_key(db, key);
        }
        RespBuilder::default().ok(response_buffer);
        Ok(())
    }

    fn unwatch(client_state: Rc<ClientState>, response_buffer: &mut BytesMut) -> Result<(), SableError> {
        client_state.with_tx(response_buffer, move |ctx, response_buffer| {
            let client_state = ctx.client_state();
            client_state.unwatch_all(ctx.databases());
            RespBuilder::default().ok(response_buffer);
            Ok(())
        })
    }
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
    use crate::tests::{another_client, execute_line, new_client_state};
    use test_case::test_case;

    #[test_case(vec![
        ("multi", "+OK\r\n"),
        ("zadd z 1 a 2 b", "+QUEUED\r\n"),
        ("zcard z", "+QUEUED\r\n"),
        ("zscore z b", "+QUEUED\r\n"),
        ("exec", "*3\r\n:2\r\n:2\r\n$1\r\n2\r\n"),
        ("zcard z", ":2\r\n"),
    ]; "replies in queue order")]
    #[test_case(vec![
        ("set s v", "+OK\r\n"),
        ("multi", "+OK\r\n"),
        ("zadd z 1 a", "+QUEUED\r\n"),
        ("zcard s", "+QUEUED\r\n"),
        ("zcard z", "+QUEUED\r\n"),
        ("exec", "*3\r\n:1\r\n-WRONGTYPE Operation against a key holding the wrong kind of value\r\n:1\r\n"),
    ]; "type errors do not abort the transaction")]
    #[test_case(vec![
        ("multi", "+OK\r\n"),
        ("zadd z 1 a", "+QUEUED\r\n"),
        ("zadd z 1", "-ERR wrong number of arguments for 'zadd' command\r\n"),
        ("zadd z nan a", "-ERR value is not a valid float\r\n"),
        ("exec", "-EXECABORT Transaction discarded because of previous errors.\r\n"),
        ("zcard z", ":0\r\n"),
    ]; "malformed command aborts exec")]
    #[test_case(vec![
        ("multi", "+OK\r\n"),
        ("select 2", "+QUEUED\r\n"),
        ("zadd z 1 a", "+QUEUED\r\n"),
        ("exec", "*2\r\n+OK\r\n:1\r\n"),
        ("zcard z", ":1\r\n"),
        ("select 0", "+OK\r\n"),
        ("zcard z", ":0\r\n"),
    ]; "queued select applies to later commands")]
    #[test_case(vec![
        ("exec", "-ERR EXEC without MULTI\r\n"),
        ("discard", "-ERR DISCARD without MULTI\r\n"),
        ("multi", "+OK\r\n"),
        ("multi", "-ERR MULTI calls can not be nested\r\n"),
        ("watch k", "-ERR WATCH inside MULTI is not allowed\r\n"),
        ("discard", "+OK\r\n"),
        ("multi", "+OK\r\n"),
        ("exec", "*0\r\n"),
    ]; "state errors")]
    #[test_case(vec![
        ("zadd z 1 a", ":1\r\n"),
        ("multi", "+OK\r\n"),
        ("zrem z a", "+QUEUED\r\n"),
        ("discard", "+OK\r\n"),
        ("zcard z", ":1\r\n"),
    ]; "discard drops the queue")]
    fn test_transaction_commands(args: Vec<(&'static str, &'static str)>) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let client = new_client_state();
            for (cmd, expected) in args {
                assert_eq!(execute_line(client.clone(), cmd).await, expected, "{}", cmd);
            }
        });
    }

    #[test]
    fn test_multi_resets_errors_seen_before_it() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let client = new_client_state();
            execute_line(client.clone(), "zadd z").await;
            assert!(client.is_txn_dirty());
            assert_eq!(execute_line(client.clone(), "multi").await, "+OK\r\n");
            assert!(!client.is_txn_dirty());
            execute_line(client.clone(), "zadd z 1 a").await;
            assert_eq!(execute_line(client.clone(), "exec").await, "*1\r\n:1\r\n");
            assert!(!client.is_txn_state_multi());
        });
    }

    #[test]
    fn test_watched_key_modified_by_another_client() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let client = new_client_state();
            let other = another_client(&client);

            assert_eq!(execute_line(client.clone(), "watch z").await, "+OK\r\n");
            assert_eq!(execute_line(client.clone(), "multi").await, "+OK\r\n");
            assert_eq!(execute_line(client.clone(), "zadd z 1 a").await, "+QUEUED\r\n");

            assert_eq!(execute_line(other.clone(), "zadd z 5 b").await, ":1\r\n");

            assert_eq!(execute_line(client.clone(), "exec").await, "*-1\r\n");
            assert_eq!(client.watched_keys_count(), 0);
            assert_eq!(execute_line(client.clone(), "zcard z").await, ":1\r\n");
        });
    }

    #[test]
    fn test_watch_untouched_key_and_unwatch() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let client = new_client_state();
            let other = another_client(&client);

            execute_line(client.clone(), "watch z other").await;
            assert_eq!(client.watched_keys_count(), 2);
            execute_line(other.clone(), "zadd unrelated 1 a").await;
            execute_line(client.clone(), "multi").await;
            execute_line(client.clone(), "zadd z 1 a").await;
            assert_eq!(execute_line(client.clone(), "exec").await, "*1\r\n:1\r\n");

            execute_line(client.clone(), "watch z").await;
            assert_eq!(execute_line(client.clone(), "unwatch").await, "+OK\r\n");
            assert_eq!(client.watched_keys_count(), 0);
            execute_line(other.clone(), "zadd z 2 b").await;
            execute_line(client.clone(), "multi").await;
            execute_line(client.clone(), "zcard z").await;
            assert_eq!(execute_line(client.clone(), "exec").await, "*1\r\n:2\r\n");
        });
    }

    #[test]
    fn test_watched_key_created_and_deleted_by_another_client() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let client = new_client_state();
            let other = another_client(&client);

            execute_line(client.clone(), "watch z").await;
            execute_line(other.clone(), "zadd z 1 a").await;
            assert_eq!(execute_line(other.clone(), "del z").await, ":1\r\n");

            execute_line(client.clone(), "multi").await;
            execute_line(client.clone(), "zadd z 1 a").await;
            assert_eq!(execute_line(client.clone(), "exec").await, "*-1\r\n");

            // nothing watches "z" anymore and it is gone, so its version is dropped
            let server_state = client.server_inner_state();
            let databases = server_state.keyspace().lock().unwrap();
            assert_eq!(databases[0].versions_len(), 0);
        });
    }
}
