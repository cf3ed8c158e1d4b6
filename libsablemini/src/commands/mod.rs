#[macro_export]
/// Reply with an error to a malformed command, mark the connection dirty and return.
/// Used for errors detected before the command body is handed to the transaction wrapper
macro_rules! reject_command {
    ($client_state:expr, $response_buffer:expr, $msg:expr) => {{
        $client_state.set_txn_dirty(true);
        let builder = $crate::RespBuilder::default();
        builder.error_string($response_buffer, $msg);
        return Ok(());
    }};
}

#[macro_export]
/// Parse `$val` into a number of type `$number_type`.
/// On failure, reject the command with `$err_str`
macro_rules! to_number_or_reject {
    ($client_state:expr, $val:expr, $number_type:ty, $response_buffer:expr, $err_str:expr) => {{
        let Some(res) = $crate::BytesMutUtils::parse::<$number_type>($val) else {
            $crate::reject_command!($client_state, $response_buffer, $err_str);
        };
        res
    }};
}

#[macro_export]
/// Parse `$val` into a number of type `$number_type`.
/// On failure, reject the command with `VALUE_NOT_AN_INT_OR_OUT_OF_RANGE`
macro_rules! to_number {
    ($client_state:expr, $val:expr, $number_type:ty, $response_buffer:expr) => {{
        $crate::to_number_or_reject!(
            $client_state,
            $val,
            $number_type,
            $response_buffer,
            $crate::commands::Strings::VALUE_NOT_AN_INT_OR_OUT_OF_RANGE
        )
    }};
}

#[macro_export]
/// Return the command argument at position `pos` as `&BytesMut`
macro_rules! command_arg_at {
    ($cmd:expr, $pos:expr) => {{
        let Some(cmdarg) = $cmd.arg($pos) else {
            return Err($crate::SableError::InvalidArgument(
                "requested argument is out of bounds".to_string(),
            ));
        };
        cmdarg
    }};
}

/// Possible return value for a "handle_command" function
#[derive(Debug)]
pub enum HandleCommandResult {
    ResponseBufferUpdated(bytes::BytesMut),
    /// Send the response and close the connection
    Quit(bytes::BytesMut),
}

#[derive(Debug)]
pub enum ClientNextAction {
    SendResponse(bytes::BytesMut),
    /// Send the response, then close the connection
    TerminateConnection(bytes::BytesMut),
}

mod client_commands;
mod cluster_commands;
mod command;
mod commander;
mod generic_commands;
mod server_commands;
mod string_commands;
mod strings;
mod transaction_commands;
mod tx_context;
mod zset_commands;

pub use crate::commands::strings::Strings;
pub use client_commands::ClientCommands;
pub use cluster_commands::ClusterCommands;
pub use command::commands_manager;
pub use command::RedisCommand;
pub use commander::{CommandMetadata, CommandsManager, RedisCommandFlags, RedisCommandName};
pub use generic_commands::GenericCommands;
pub use server_commands::ServerCommands;
pub use string_commands::StringCommands;
pub use transaction_commands::TransactionCommands;
pub use tx_context::{TxBody, TxContext};
pub use zset_commands::ZSetCommands;
