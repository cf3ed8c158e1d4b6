use crate::{
    command_arg_at,
    commands::HandleCommandResult,
    server::ClientState,
    storage::{StringGetResult, StringsDb},
    RedisCommand, RedisCommandName, RespBuilder, SableError,
};

use bytes::BytesMut;
use std::rc::Rc;

/// Plain `SET key value` and `GET key`. Enough string support to put a key of another
/// type next to the sorted sets
pub struct StringCommands {}

impl StringCommands {
    pub fn handle_command(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
    ) -> Result<HandleCommandResult, SableError> {
        let mut response_buffer = BytesMut::with_capacity(64);
        match command.metadata().name() {
            RedisCommandName::Set => {
                Self::set(client_state, command, &mut response_buffer)?;
            }
            RedisCommandName::Get => {
                Self::get(client_state, command, &mut response_buffer)?;
            }
            _ => {
                return Err(SableError::InvalidArgument(format!(
                    "Non string command {}",
                    command.main_command()
                )));
            }
        }
        Ok(HandleCommandResult::ResponseBufferUpdated(response_buffer))
    }

    fn set(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
        response_buffer: &mut BytesMut,
    ) -> Result<(), SableError> {
        let key = command_arg_at!(command, 1).clone();
        let value = command_arg_at!(command, 2).clone();
        client_state.with_tx(response_buffer, move |ctx, response_buffer| {
            StringsDb::with_database(ctx.database()?).put(&key, &value);
            RespBuilder::default().ok(response_buffer);
            Ok(())
        })
    }

    fn get(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
        response_buffer: &mut BytesMut,
    ) -> Result<(), SableError> {
        let key = command_arg_at!(command, 1).clone();
        client_state.with_tx(response_buffer, move |ctx, response_buffer| {
            let builder = RespBuilder::default();
            match StringsDb::with_database(ctx.database()?).get(&key) {
                StringGetResult::Some(value) => builder.bulk_string(response_buffer, &value),
                StringGetResult::NotFound => builder.null_string(response_buffer),
                StringGetResult::WrongType => return Err(SableError::WrongType),
            }
            Ok(())
        })
    }
}
