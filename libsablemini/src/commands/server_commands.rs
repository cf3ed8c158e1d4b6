use crate::{
    commands::{commands_manager, HandleCommandResult},
    reject_command,
    server::{ClientState, Telemetry},
    RedisCommand, RedisCommandName, RespBuilder, SableError,
};

use bytes::BytesMut;
use std::rc::Rc;

pub struct ServerCommands {}

impl ServerCommands {
    pub fn handle_command(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
    ) -> Result<HandleCommandResult, SableError> {
        let mut response_buffer = BytesMut::with_capacity(256);
        match command.metadata().name() {
            RedisCommandName::Command => {
                Self::command(client_state, command, &mut response_buffer)?;
            }
            RedisCommandName::Info => {
                Self::info(client_state, &mut response_buffer)?;
            }
            _ => {
                return Err(SableError::InvalidArgument(format!(
                    "Non server command {}",
                    command.main_command()
                )));
            }
        }
        Ok(HandleCommandResult::ResponseBufferUpdated(response_buffer))
    }

    /// `COMMAND` returns the command table, `COMMAND COUNT` its size
    fn command(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
        response_buffer: &mut BytesMut,
    ) -> Result<(), SableError> {
        let count_only = match command.arg_as_lowercase_string(1) {
            None => false,
            Some(sub) if sub == "count" && command.arg_count() == 2 => true,
            Some(sub) => {
                let errmsg = format!("ERR unknown subcommand '{}'", sub);
                reject_command!(client_state, response_buffer, &errmsg);
            }
        };

        client_state.with_tx(response_buffer, move |_ctx, response_buffer| {
            let builder = RespBuilder::default();
            if count_only {
                builder.number_usize(response_buffer, commands_manager().len());
            } else {
                response_buffer.clear();
                builder.add_resp_string(response_buffer, &commands_manager().command_output());
            }
            Ok(())
        })
    }

    /// Counters and per database key counts, as a bulk string
    fn info(client_state: Rc<ClientState>, response_buffer: &mut BytesMut) -> Result<(), SableError> {
        client_state.with_tx(response_buffer, move |ctx, response_buffer| {
            let info = Telemetry::snapshot().info_string(ctx.databases());
            RespBuilder::default().bulk_string(response_buffer, info.as_bytes());
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
    use super::*;
    use crate::tests::{execute_line, new_client_state};

    #[test]
    fn test_command_count_and_table() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let client = new_client_state();
            let expected = format!(":{}\r\n", commands_manager().len());
            assert_eq!(execute_line(client.clone(), "command count").await, expected);

            let table = execute_line(client.clone(), "command").await;
            let prefix = format!("*{}\r\n", commands_manager().len());
            assert!(table.starts_with(&prefix));
            assert!(table.contains("$16\r\nzrevrangebyscore\r\n"));

            assert_eq!(
                execute_line(client.clone(), "command docs").await,
                "-ERR unknown subcommand 'docs'\r\n"
            );
            assert!(client.is_txn_dirty());
        });
    }

    #[test]
    fn test_info_reports_keyspace() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let client = new_client_state();
            execute_line(client.clone(), "zadd z 1 a").await;
            execute_line(client.clone(), "select 2").await;
            execute_line(client.clone(), "set a b").await;
            execute_line(client.clone(), "set c d").await;

            let info = execute_line(client.clone(), "info").await;
            assert!(info.starts_with('$'));
            assert!(info.contains("# Stats\r\n"));
            assert!(info.contains("db0:keys=1\r\ndb2:keys=2\r\n"));
        });
    }
}
