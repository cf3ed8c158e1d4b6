use crate::{
    command_arg_at,
    commands::{HandleCommandResult, Strings},
    reject_command,
    server::ClientState,
    BytesMutUtils, RedisCommand, RedisCommandName, RespBuilder, SableError,
};

use bytes::BytesMut;
use std::rc::Rc;

/// Connection commands: `PING`, `ECHO`, `SELECT` and `QUIT`
pub struct ClientCommands {}

impl ClientCommands {
    pub fn handle_command(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
    ) -> Result<HandleCommandResult, SableError> {
        let mut response_buffer = BytesMut::with_capacity(64);
        match command.metadata().name() {
            RedisCommandName::Ping => {
                Self::ping(client_state, command, &mut response_buffer)?;
            }
            RedisCommandName::Echo => {
                Self::echo(client_state, command, &mut response_buffer)?;
            }
            RedisCommandName::Select => {
                Self::select(client_state, command, &mut response_buffer)?;
            }
            RedisCommandName::Quit => {
                // Not queued, even inside a MULTI block
                RespBuilder::default().ok(&mut response_buffer);
                return Ok(HandleCommandResult::Quit(response_buffer));
            }
            _ => {
                return Err(SableError::InvalidArgument(format!(
                    "Non client command {}",
                    command.main_command()
                )));
            }
        }
        Ok(HandleCommandResult::ResponseBufferUpdated(response_buffer))
    }

    /// `PING [message]`
    fn ping(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
        response_buffer: &mut BytesMut,
    ) -> Result<(), SableError> {
        if command.arg_count() > 2 {
            reject_command!(
                client_state,
                response_buffer,
                "ERR wrong number of arguments for 'ping' command"
            );
        }
        let message = command.arg(1).cloned();
        client_state.with_tx(response_buffer, move |_ctx, response_buffer| {
            let builder = RespBuilder::default();
            match message {
                Some(message) => builder.bulk_string(response_buffer, &message),
                None => builder.status_string(response_buffer, "PONG"),
            }
            Ok(())
        })
    }

    fn echo(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
        response_buffer: &mut BytesMut,
    ) -> Result<(), SableError> {
        let message = command_arg_at!(command, 1).clone();
        client_state.with_tx(response_buffer, move |_ctx, response_buffer| {
            RespBuilder::default().bulk_string(response_buffer, &message);
            Ok(())
        })
    }

    /// Switch the client's logical database. Inside a `MULTI` block the switch happens when
    /// `EXEC` reaches it, so later queued commands use the new database
    fn select(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
        response_buffer: &mut BytesMut,
    ) -> Result<(), SableError> {
        let Some(index) = BytesMutUtils::parse::<i64>(command_arg_at!(command, 1)) else {
            reject_command!(client_state, response_buffer, Strings::INVALID_DB_INDEX);
        };

        let databases_count = client_state
            .server_inner_state()
            .keyspace()
            .databases_count();
        let db_id = match u16::try_from(index) {
            Ok(db_id) if (db_id as usize) < databases_count => db_id,
            _ => {
                reject_command!(client_state, response_buffer, Strings::DB_INDEX_OUT_OF_RANGE);
            }
        };

        client_state.with_tx(response_buffer, move |ctx, response_buffer| {
            ctx.client_state().set_database_id(db_id);
            RespBuilder::default().ok(response_buffer);
            Ok(())
        })
    }
}
