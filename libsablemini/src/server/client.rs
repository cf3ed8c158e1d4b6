use crate::{
    commands::{ClientNextAction, HandleCommandResult},
    server::{ClientState, Telemetry},
    utils::RequestParser,
    ClientCommands, ClusterCommands, GenericCommands, ParserError, RedisCommand,
    RedisCommandName, RespBuilder, SableError, ServerCommands, ServerState, StringCommands,
    TransactionCommands, ZSetCommands,
};

use bytes::BytesMut;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    sync::mpsc::Receiver as TokioReceiver,
};

use tracing::log::{log_enabled, Level};

lazy_static::lazy_static! {
    static ref CLIENT_ID_GENERATOR: AtomicU64 = AtomicU64::new(0);
}

/// Generate a new client ID
pub fn new_client_id() -> u128 {
    u128::from(CLIENT_ID_GENERATOR.fetch_add(1, Ordering::Relaxed)).saturating_add(1)
}

pub struct Client {
    state: Rc<ClientState>,
}

impl Client {
    pub fn inner(&self) -> Rc<ClientState> {
        self.state.clone()
    }

    pub fn new(server_state: Arc<ServerState>) -> Self {
        Telemetry::inc_connections_opened();
        Client {
            state: Rc::new(ClientState::new(server_state)),
        }
    }

    /// Execute the client's main loop
    pub async fn run(&mut self, stream: std::net::TcpStream) -> Result<(), SableError> {
        self.main_loop(stream).await
    }

    /// The client's main loop
    async fn main_loop(&mut self, stream: std::net::TcpStream) -> Result<(), SableError> {
        let tokio_stream = tokio::net::TcpStream::from_std(stream)?;
        let (channel_tx, channel_rx) = tokio::sync::mpsc::channel(100);

        let (rx, tx) = tokio::io::split(tokio_stream);
        let shared_state = self.state.clone();
        let r = tokio::task::spawn_local(async move {
            if let Err(e) = Self::reader_loop(rx, channel_tx, shared_state.clone()).await {
                shared_state.debug(&format!("reader task ended. {:?}", e));
            }
        });

        let shared_state = self.state.clone();
        let w = tokio::task::spawn_local(async move {
            if let Err(e) = Self::writer_loop(tx, channel_rx, shared_state.clone()).await {
                shared_state.debug(&format!("writer task ended. {:?}", e));
            }
        });

        // If any of the tasks (reader - writer) ends,
        // abort the connection
        let reader_abort_handle = r.abort_handle();
        let writer_abort_handle = w.abort_handle();
        tokio::select! {
            _ = r => {
                writer_abort_handle.abort();
                Err(SableError::ConnectionClosed)
            },
            _ = w => {
                reader_abort_handle.abort();
                Err(SableError::ConnectionClosed)
            }
        }
    }

    /// Read data from the network, parse it and send it to the "writer" task for processing
    async fn reader_loop(
        mut rx: impl AsyncReadExt + std::marker::Unpin,
        channel_tx: tokio::sync::mpsc::Sender<Rc<RedisCommand>>,
        client_state: Rc<ClientState>,
    ) -> Result<(), SableError> {
        let mut buffer = BytesMut::new();
        let request_parser = RequestParser::default();
        loop {
            match request_parser.parse(&buffer) {
                Err(SableError::Parser(ParserError::NeedMoreData)) => {
                    if log_enabled!(Level::Trace) {
                        client_state.trace("(NeedMoreData)) Reading data from network");
                    }
                    let mut read_buffer = BytesMut::with_capacity(1024);
                    rx.read_buf(&mut read_buffer).await?;
                    if read_buffer.is_empty() {
                        if log_enabled!(Level::Debug) {
                            client_state.debug("Connection closed (by peer)");
                        }
                        return Ok(());
                    }

                    if log_enabled!(Level::Debug) {
                        client_state.debug(&format!(
                            "===> Len: {}, Buff: {:?}",
                            read_buffer.len(),
                            read_buffer
                        ));
                    }

                    Telemetry::inc_net_bytes_read(read_buffer.len() as u64);
                    buffer.extend_from_slice(&read_buffer);
                }
                Err(e) => {
                    client_state.warn(&format!("Error while parsing input message. {:?}", e));
                    client_state.warn("Closing connection");
                    return Ok(());
                }
                Ok(result) => {
                    if log_enabled!(Level::Debug) {
                        client_state.debug(&format!("Parsing result: {:?}", result));
                    }
                    let _ = buffer.split_to(result.bytes_consumed);
                    if buffer.len() < 1024 {
                        // make sure we have enough room for 1K of message
                        buffer.reserve(1024 - buffer.len());
                    }
                    channel_tx.send(result.command).await?;
                }
            }
        }
    }

    /// Accepts the parsed requests, execute the command and send back the response
    async fn writer_loop(
        mut tx: impl AsyncWriteExt + std::marker::Unpin,
        mut channel_rx: TokioReceiver<Rc<RedisCommand>>,
        client_state: Rc<ClientState>,
    ) -> Result<(), SableError> {
        while let Some(command) = channel_rx.recv().await {
            Telemetry::inc_total_commands_processed();
            match Self::handle_command(client_state.clone(), command.clone()) {
                Ok(ClientNextAction::SendResponse(response)) => {
                    Self::send_response(&mut tx, &response, client_state.id()).await?;
                }
                Ok(ClientNextAction::TerminateConnection(response)) => {
                    Self::send_response(&mut tx, &response, client_state.id()).await?;
                    tx.flush().await?;
                    return Ok(());
                }
                Err(e) => {
                    client_state.warn(&format!(
                        "failed to process command: {:?} error: {:?}",
                        command, e
                    ));
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Run a single command and return what to do with its reply.
    ///
    /// Arity and unknown commands are rejected here, before any handler runs. Both mark
    /// the client's transaction dirty
    pub fn handle_command(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
    ) -> Result<ClientNextAction, SableError> {
        let builder = RespBuilder::default();
        let kind = command.metadata().name();

        if let RedisCommandName::NotSupported(cmdname) = kind {
            if log_enabled!(Level::Debug) {
                client_state.debug(&format!("unknown command `{}`", cmdname));
            }
            client_state.set_txn_dirty(true);
            let mut buffer = BytesMut::with_capacity(64);
            builder.error_string(&mut buffer, &format!("ERR unknown command '{}'", cmdname));
            return Ok(ClientNextAction::SendResponse(buffer));
        }

        if !command.arity_ok() {
            client_state.set_txn_dirty(true);
            let mut buffer = BytesMut::with_capacity(64);
            builder.error_string(
                &mut buffer,
                &format!(
                    "ERR wrong number of arguments for '{}' command",
                    command.main_command()
                ),
            );
            return Ok(ClientNextAction::SendResponse(buffer));
        }

        let result = match kind {
            RedisCommandName::Ping
            | RedisCommandName::Echo
            | RedisCommandName::Select
            | RedisCommandName::Quit => ClientCommands::handle_command(client_state, command)?,
            RedisCommandName::Command | RedisCommandName::Info => {
                ServerCommands::handle_command(client_state, command)?
            }
            RedisCommandName::Cluster => ClusterCommands::handle_command(client_state, command)?,
            RedisCommandName::Del
            | RedisCommandName::Exists
            | RedisCommandName::Type
            | RedisCommandName::FlushDb
            | RedisCommandName::FlushAll => {
                GenericCommands::handle_command(client_state, command)?
            }
            RedisCommandName::Set | RedisCommandName::Get => {
                StringCommands::handle_command(client_state, command)?
            }
            RedisCommandName::Multi
            | RedisCommandName::Exec
            | RedisCommandName::Discard
            | RedisCommandName::Watch
            | RedisCommandName::Unwatch => {
                TransactionCommands::handle_command(client_state, command)?
            }
            RedisCommandName::Zadd
            | RedisCommandName::Zcard
            | RedisCommandName::Zcount
            | RedisCommandName::Zincrby
            | RedisCommandName::Zlexcount
            | RedisCommandName::Zrange
            | RedisCommandName::Zrangebylex
            | RedisCommandName::Zrangebyscore
            | RedisCommandName::Zrank
            | RedisCommandName::Zrem
            | RedisCommandName::Zremrangebylex
            | RedisCommandName::Zremrangebyrank
            | RedisCommandName::Zremrangebyscore
            | RedisCommandName::Zrevrange
            | RedisCommandName::Zrevrangebylex
            | RedisCommandName::Zrevrangebyscore
            | RedisCommandName::Zrevrank
            | RedisCommandName::Zscore => ZSetCommands::handle_command(client_state, command)?,
            RedisCommandName::NotSupported(_) => {
                // handled above
                return Err(SableError::ClientInvalidState);
            }
        };

        Ok(match result {
            HandleCommandResult::ResponseBufferUpdated(buffer) => {
                ClientNextAction::SendResponse(buffer)
            }
            HandleCommandResult::Quit(buffer) => ClientNextAction::TerminateConnection(buffer),
        })
    }

    /// Write buffer to `tx`, upon success, update the telemetry
    pub(crate) async fn send_response(
        tx: &mut (impl AsyncWriteExt + std::marker::Unpin),
        buffer: &BytesMut,
        client_id: u128,
    ) -> Result<(), SableError> {
        tx.write_all(buffer).await?;
        if log_enabled!(Level::Debug) {
            tracing::debug!(
                "CLNT {}: <=== Len: {}, Buff: {:?}",
                client_id,
                buffer.len(),
                buffer
            );
        }
        Telemetry::inc_net_bytes_written(buffer.len() as u64);
        Ok(())
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        Telemetry::inc_connections_closed();
        // release the keys this client was watching
        if let Err(e) = self.state.discard_transaction() {
            self.state.warn(&format!("failed to discard transaction. {:?}", e));
        }
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
    use super::*;
    use crate::tests::{execute_line, new_client_state};
    use test_case::test_case;

    #[test_case(vec![
        ("hset h f v", "-ERR unknown command 'hset'\r\n"),
        ("zcard", "-ERR wrong number of arguments for 'zcard' command\r\n"),
        ("ZCARD a b", "-ERR wrong number of arguments for 'zcard' command\r\n"),
        ("zadd z 1", "-ERR wrong number of arguments for 'zadd' command\r\n"),
        ("PiNg", "+PONG\r\n"),
    ]; "dispatch errors")]
    fn test_dispatch(args: Vec<(&'static str, &'static str)>) -> Result<(), SableError> {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let client = new_client_state();
            for (cmd, expected) in args {
                assert_eq!(execute_line(client.clone(), cmd).await, expected, "{}", cmd);
            }
        });
        Ok(())
    }

    #[test]
    fn test_dispatch_errors_mark_dirty() {
        let client = new_client_state();
        let command = Rc::new(RedisCommand::for_test(vec!["nosuchcommand"]));
        Client::handle_command(client.clone(), command).unwrap();
        assert!(client.is_txn_dirty());

        client.set_txn_dirty(false);
        let command = Rc::new(RedisCommand::for_test(vec!["zscore", "z"]));
        Client::handle_command(client.clone(), command).unwrap();
        assert!(client.is_txn_dirty());
    }

    #[test]
    fn test_quit_terminates() {
        let client = new_client_state();
        let command = Rc::new(RedisCommand::for_test(vec!["quit"]));
        match Client::handle_command(client, command).unwrap() {
            ClientNextAction::TerminateConnection(buffer) => assert_eq!(buffer, "+OK\r\n"),
            other => panic!("expected TerminateConnection, got {:?}", other),
        }
    }

    #[test]
    fn test_client_ids_are_unique() {
        let first = new_client_id();
        let second = new_client_id();
        assert_ne!(first, second);
    }
}
