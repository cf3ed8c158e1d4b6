use crate::{
    command_arg_at, commands::HandleCommandResult, server::ClientState, RedisCommand,
    RedisCommandName, RespBuilder, SableError,
};

use bytes::BytesMut;
use std::rc::Rc;

/// Commands that work on keys of any type
pub struct GenericCommands {}

impl GenericCommands {
    pub fn handle_command(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
    ) -> Result<HandleCommandResult, SableError> {
        let mut response_buffer = BytesMut::with_capacity(32);
        match command.metadata().name() {
            RedisCommandName::Del => {
                Self::del(client_state, command, &mut response_buffer)?;
            }
            RedisCommandName::Exists => {
                Self::exists(client_state, command, &mut response_buffer)?;
            }
            RedisCommandName::Type => {
                Self::key_type(client_state, command, &mut response_buffer)?;
            }
            RedisCommandName::FlushDb => {
                Self::flushdb(client_state, &mut response_buffer)?;
            }
            RedisCommandName::FlushAll => {
                Self::flushall(client_state, &mut response_buffer)?;
            }
            _ => {
                return Err(SableError::InvalidArgument(format!(
                    "Non generic command {}",
                    command.main_command()
                )));
            }
        }
        Ok(HandleCommandResult::ResponseBufferUpdated(response_buffer))
    }

    /// Delete the keys, reply with the number of keys that were removed
    fn del(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
        response_buffer: &mut BytesMut,
    ) -> Result<(), SableError> {
        let keys: Vec<BytesMut> = command.args_vec().iter().skip(1).cloned().collect();
        client_state.with_tx(response_buffer, move |ctx, response_buffer| {
            let db = ctx.database()?;
            let deleted = keys.iter().filter(|key| db.delete(key)).count();
            RespBuilder::default().number_usize(response_buffer, deleted);
            Ok(())
        })
    }

    /// Count the keys that exist. A key listed twice is counted twice
    fn exists(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
        response_buffer: &mut BytesMut,
    ) -> Result<(), SableError> {
        let keys: Vec<BytesMut> = command.args_vec().iter().skip(1).cloned().collect();
        client_state.with_tx(response_buffer, move |ctx, response_buffer| {
            let db = ctx.database()?;
            let found = keys.iter().filter(|key| db.exists(key)).count();
            RespBuilder::default().number_usize(response_buffer, found);
            Ok(())
        })
    }

    fn key_type(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
        response_buffer: &mut BytesMut,
    ) -> Result<(), SableError> {
        let key = command_arg_at!(command, 1).clone();
        client_state.with_tx(response_buffer, move |ctx, response_buffer| {
            let name = ctx
                .database()?
                .value_type(&key)
                .map(|value_type| value_type.name())
                .unwrap_or("none");
            RespBuilder::default().status_string(response_buffer, name);
            Ok(())
        })
    }

    fn flushdb(client_state: Rc<ClientState>, response_buffer: &mut BytesMut) -> Result<(), SableError> {
        client_state.with_tx(response_buffer, move |ctx, response_buffer| {
            ctx.database()?.flush();
            RespBuilder::default().ok(response_buffer);
            Ok(())
        })
    }

    fn flushall(client_state: Rc<ClientState>, response_buffer: &mut BytesMut) -> Result<(), SableError> {
        client_state.with_tx(response_buffer, move |ctx, response_buffer| {
            ctx.databases().iter_mut().for_each(|db| db.flush());
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
    use crate::tests::{execute_line, new_client_state};
    use test_case::test_case;

    #[test_case(vec![
        ("type k", "+none\r\n"),
        ("set k v", "+OK\r\n"),
        ("type k", "+string\r\n"),
        ("zadd z 1 a", ":1\r\n"),
        ("type z", "+zset\r\n"),
        ("exists k z nope k", ":3\r\n"),
        ("del k nope", ":1\r\n"),
        ("exists k", ":0\r\n"),
        ("del z z", ":1\r\n"),
        ("type z", "+none\r\n"),
    ]; "del exists type")]
    #[test_case(vec![
        ("set a 1", "+OK\r\n"),
        ("select 1", "+OK\r\n"),
        ("set b 1", "+OK\r\n"),
        ("flushdb", "+OK\r\n"),
        ("exists b", ":0\r\n"),
        ("select 0", "+OK\r\n"),
        ("exists a", ":1\r\n"),
        ("select 1", "+OK\r\n"),
        ("set b 1", "+OK\r\n"),
        ("flushall", "+OK\r\n"),
        ("exists b", ":0\r\n"),
        ("select 0", "+OK\r\n"),
        ("exists a", ":0\r\n"),
    ]; "flushdb and flushall")]
    fn test_generic_commands(args: Vec<(&'static str, &'static str)>) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let client = new_client_state();
            for (cmd, expected) in args {
                assert_eq!(execute_line(client.clone(), cmd).await, expected, "{}", cmd);
            }
        });
    }
}
