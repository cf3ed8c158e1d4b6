use crate::commands::{CommandMetadata, CommandsManager};
use crate::{BytesMutUtils, SableError};
use bytes::BytesMut;
use std::sync::Arc;

lazy_static::lazy_static! {
    static ref COMMANDS_MGR: CommandsManager = CommandsManager::default();
}

/// Return the global command table. Used by the `COMMAND` command
pub fn commands_manager() -> &'static CommandsManager {
    &COMMANDS_MGR
}

#[derive(Default, Debug, Clone)]
pub struct RedisCommand {
    /// the raw command arguments
    args: Vec<BytesMut>,

    /// the command name. in lowercase
    /// e.g. if `zadd KEY 1 MEMBER` is the full command, `zadd` is the `command_name`
    command_name: String,

    command_metadata: Arc<CommandMetadata>,
}

impl RedisCommand {
    #[cfg(test)]
    pub fn for_test(args: Vec<&str>) -> Self {
        let args: Vec<BytesMut> = args.iter().map(|s| BytesMut::from(s.as_bytes())).collect();
        Self::new(args).unwrap()
    }

    /// Construct `RedisCommand` from raw parsed data
    pub fn new(args: Vec<BytesMut>) -> Result<Self, SableError> {
        let Some(command_name) = args.first() else {
            return Err(SableError::EmptyCommand);
        };

        let command_name = String::from_utf8_lossy(command_name).to_lowercase();
        let metadata = COMMANDS_MGR.metadata(command_name.as_str());

        Ok(RedisCommand {
            args,
            command_name,
            command_metadata: metadata,
        })
    }

    /// return the primary command
    pub fn main_command(&self) -> &String {
        &self.command_name
    }

    /// Return argument at position `pos` as a lowercase `String`
    pub fn arg_as_lowercase_string(&self, pos: usize) -> Option<String> {
        let arg = self.args.get(pos)?;
        Some(BytesMutUtils::to_string(arg).to_lowercase())
    }

    /// Return argument at position `pos`
    pub fn arg(&self, pos: usize) -> Option<&BytesMut> {
        self.args.get(pos)
    }

    /// Return number of arguments, including the command name
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    pub fn metadata(&self) -> &CommandMetadata {
        &self.command_metadata
    }

    /// Does the number of arguments match the command arity?
    pub fn arity_ok(&self) -> bool {
        self.command_metadata.accepts_args_count(self.arg_count())
    }

    pub fn args_vec(&self) -> &Vec<BytesMut> {
        &self.args
    }
}
