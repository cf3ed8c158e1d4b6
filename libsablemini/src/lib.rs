pub mod commands;
pub mod server;
pub mod storage;
pub mod types;
pub mod utils;

pub use commands::{
    ClientCommands, ClusterCommands, GenericCommands, RedisCommand, RedisCommandName,
    ServerCommands, StringCommands, TransactionCommands, ZSetCommands,
};
pub use server::*;
pub use utils::*;

#[macro_export]
macro_rules! ini_read_prop {
    ($ini_file:expr, $sect:expr, $name:expr) => {{
        let Some(properties) = $ini_file.section(Some($sect)) else {
            return Ok(());
        };

        let Some(val) = properties.get($name) else {
            return Ok(());
        };
        val
    }};
}

#[macro_export]
macro_rules! ini_usize {
    ($value:expr) => {{
        let Ok(num_usize) = $value.parse::<usize>() else {
            return Err(SableError::InvalidArgument(format!(
                "failed to convert INI value `{}` to usize",
                $value
            )));
        };
        num_usize
    }};
}

thread_local! {
    pub static LAST_ERROR_TS: std::cell::RefCell<u64> = const { std::cell::RefCell::new(0u64) };
}

#[macro_export]
/// Log message with throttling in order to avoid flooding the log file
macro_rules! error_with_throttling {
    ($delay_seconds:expr, $($arg:tt)*) => {{
        let current_time = $crate::TimeUtils::epoch_seconds().unwrap_or(0);
        $crate::LAST_ERROR_TS.with(|last_ts| {
            let last_logged_ts = *last_ts.borrow();
            if current_time.saturating_sub(last_logged_ts) >= $delay_seconds {
                *last_ts.borrow_mut() = current_time;
                tracing::error!($($arg)*);
                true
            } else {
                false
            }
        })
    }}
}

//  _    _ _   _ _____ _______      _______ ______  _____ _______ _____ _   _  _____
// | |  | | \ | |_   _|__   __|    |__   __|  ____|/ ____|__   __|_   _| \ | |/ ____|
// | |  | |  \| | | |    | |    _     | |  | |__  | (___    | |    | | |  \| | |  __|
// | |  | | . ` | | |    | |   / \    | |  |  __|  \___ \   | |    | | | . ` | | |_ |
// | |__| | |\  |_| |_   | |   \_/    | |  | |____ ____) |  | |   _| |_| |\  | |__| |
//  \____/|_| \_|_____|  |_|          |_|  |______|_____/   |_|  |_____|_| \_|\_____|
//
#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::ClientNextAction;
    use std::rc::Rc;
    use std::sync::Arc;

    /// A client state attached to a fresh, private server state
    pub fn new_client_state() -> Rc<ClientState> {
        Rc::new(ClientState::new(Arc::<ServerState>::default()))
    }

    /// A second connection to the same server as `client_state`
    pub fn another_client(client_state: &ClientState) -> Rc<ClientState> {
        Rc::new(ClientState::new(client_state.server_inner_state()))
    }

    /// Execute a command and return the raw RESP written to the client
    pub async fn execute_command(client_state: Rc<ClientState>, args: Vec<&str>) -> String {
        let command = Rc::new(RedisCommand::for_test(args));
        let mut sink = Vec::<u8>::new();
        let buffer = match Client::handle_command(client_state.clone(), command).unwrap() {
            ClientNextAction::SendResponse(buffer) => buffer,
            ClientNextAction::TerminateConnection(buffer) => buffer,
        };
        Client::send_response(&mut sink, &buffer, client_state.id())
            .await
            .unwrap();
        String::from_utf8_lossy(&sink).to_string()
    }

    /// Same as `execute_command`, the arguments are taken from a whitespace separated line
    pub async fn execute_line(client_state: Rc<ClientState>, line: &str) -> String {
        execute_command(client_state, line.split_whitespace().collect()).await
    }

    #[test]
    fn test_error_with_throttling() {
        LAST_ERROR_TS.with(|last_ts| *last_ts.borrow_mut() = 0);
        assert!(error_with_throttling!(300, "first"));
        assert!(!error_with_throttling!(300, "second"));
    }
}
