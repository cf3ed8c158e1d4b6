use crate::RespBuilder;
use bytes::BytesMut;
use std::collections::HashMap;
use std::sync::Arc;
use strum_macros::EnumString;

bitflags::bitflags! {
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedisCommandFlags: u32 {
    /// A read command
    const Read = 1 << 0;
    /// A write command
    const Write = 1 << 1;
    /// Administration command
    const Admin = 1 << 2;
    /// @connection command
    const Connection = 1 << 3;
    /// This command can not be queued inside a `MULTI` block
    const NoTxn = 1 << 4;
}
}

#[derive(Clone, Debug, Default, EnumString, PartialEq, Eq)]
#[strum(ascii_case_insensitive)]
pub enum RedisCommandName {
    // Connection commands
    #[default]
    Ping,
    Echo,
    Select,
    Quit,
    // Server commands
    Command,
    Info,
    FlushAll,
    FlushDb,
    Cluster,
    // Generic commands
    Del,
    Exists,
    Type,
    // String commands
    Set,
    Get,
    // Transaction
    Multi,
    Exec,
    Discard,
    Watch,
    Unwatch,
    // ZSet commands
    Zadd,
    Zcard,
    Zcount,
    Zincrby,
    Zlexcount,
    Zrange,
    Zrangebylex,
    Zrangebyscore,
    Zrank,
    Zrem,
    Zremrangebylex,
    Zremrangebyrank,
    Zremrangebyscore,
    Zrevrange,
    Zrevrangebylex,
    Zrevrangebyscore,
    Zrevrank,
    Zscore,
    #[strum(disabled)]
    NotSupported(String),
}

pub struct CommandsManager {
    cmds: HashMap<&'static str, Arc<CommandMetadata>>,
}

impl CommandsManager {
    /// Return the metadata for a command
    pub fn metadata(&self, cmdname: &str) -> Arc<CommandMetadata> {
        match self.cmds.get(cmdname) {
            Some(t) => t.clone(),
            None => Arc::new(CommandMetadata::new(RedisCommandName::NotSupported(
                cmdname.to_string(),
            ))),
        }
    }

    /// Return the entire command table as a RESP array (`COMMAND`)
    pub fn command_output(&self) -> BytesMut {
        let builder = RespBuilder::default();
        let mut buffer = BytesMut::with_capacity(4096);

        let mut names: Vec<&&str> = self.cmds.keys().collect();
        names.sort();

        builder.add_array_len(&mut buffer, names.len());
        for name in names {
            if let Some(cmd_md) = self.cmds.get(*name) {
                builder.add_resp_string(&mut buffer, &cmd_md.to_resp(name));
            }
        }
        buffer
    }

    /// Number of commands in the table
    pub fn len(&self) -> usize {
        self.cmds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }
}

#[derive(Default, Debug, Clone)]
pub struct CommandMetadata {
    cmd_name: RedisCommandName,
    cmd_flags: RedisCommandFlags,
    /// Arity is the number of arguments a command expects. It follows a simple pattern:
    /// A positive integer means a fixed number of arguments.
    /// A negative integer means a minimal number of arguments.
    /// Command arity always includes the command's name itself (and the subcommand when applicable)
    arity: i16,
    first_key: i16,
    last_key: i16,
    step: u16,
}

impl CommandMetadata {
    pub fn new(cmd_name: RedisCommandName) -> Self {
        CommandMetadata {
            cmd_name,
            cmd_flags: RedisCommandFlags::empty(),
            arity: 2,
            first_key: 1,
            last_key: 1,
            step: 1,
        }
    }

    pub fn with_arity(mut self, arity: i16) -> Self {
        self.arity = arity;
        self
    }

    /// Commands without key arguments
    pub fn no_keys(mut self) -> Self {
        self.first_key = 0;
        self.last_key = 0;
        self.step = 0;
        self
    }

    /// The command accepts an arbitrary number of keys starting at position 1
    pub fn all_keys(mut self) -> Self {
        self.last_key = -1;
        self
    }

    pub fn no_transaction(mut self) -> Self {
        self.cmd_flags |= RedisCommandFlags::NoTxn;
        self
    }

    /// This command is a "write" command
    pub fn write(mut self) -> Self {
        self.cmd_flags |= RedisCommandFlags::Write;
        self
    }

    /// This command performs "read" on the database
    pub fn read_only(mut self) -> Self {
        self.cmd_flags |= RedisCommandFlags::Read;
        self
    }

    /// An administrator command
    pub fn admin(mut self) -> Self {
        self.cmd_flags |= RedisCommandFlags::Admin;
        self
    }

    /// This command falls under the @connection category
    pub fn connection(mut self) -> Self {
        self.cmd_flags |= RedisCommandFlags::Connection;
        self
    }

    pub fn name(&self) -> &RedisCommandName {
        &self.cmd_name
    }

    pub fn arity(&self) -> i16 {
        self.arity
    }

    /// Check `args_count` (command name included) against the arity.
    /// Unknown commands accept anything, they are rejected later with a dedicated error
    pub fn accepts_args_count(&self, args_count: usize) -> bool {
        if let RedisCommandName::NotSupported(_) = self.cmd_name {
            return true;
        }
        let expected = self.arity.unsigned_abs() as usize;
        if self.arity < 0 {
            args_count >= expected
        } else {
            args_count == expected
        }
    }

    pub fn to_resp(&self, cmdname: &str) -> BytesMut {
        let builder = RespBuilder::default();
        let mut buffer = BytesMut::with_capacity(64);

        let mut flags = Vec::<&str>::new();
        if self.cmd_flags.contains(RedisCommandFlags::Read) {
            flags.push("readonly");
        }
        if self.cmd_flags.contains(RedisCommandFlags::Write) {
            flags.push("write");
        }
        if self.cmd_flags.contains(RedisCommandFlags::Admin) {
            flags.push("admin");
        }
        if self.cmd_flags.contains(RedisCommandFlags::Connection) {
            flags.push("connection");
        }
        if self.cmd_flags.contains(RedisCommandFlags::NoTxn) {
            flags.push("notransaction");
        }

        builder.add_array_len(&mut buffer, 10);
        builder.add_bulk_string(&mut buffer, cmdname.as_bytes());
        builder.add_number(&mut buffer, self.arity);
        builder.add_strings(&mut buffer, &flags);
        builder.add_number(&mut buffer, self.first_key);
        builder.add_number(&mut buffer, self.last_key);
        builder.add_number(&mut buffer, self.step);
        builder.add_empty_array(&mut buffer); // ACL
        builder.add_empty_array(&mut buffer); // Tips
        builder.add_empty_array(&mut buffer); // Key specs
        builder.add_empty_array(&mut buffer); // Sub commands
        buffer
    }
}

impl Default for CommandsManager {
    fn default() -> Self {
        let cmds: Vec<(&'static str, CommandMetadata)> = vec![
            // connection
            (
                "ping",
                CommandMetadata::new(RedisCommandName::Ping)
                    .connection()
                    .with_arity(-1)
                    .no_keys(),
            ),
            (
                "echo",
                CommandMetadata::new(RedisCommandName::Echo)
                    .connection()
                    .with_arity(2)
                    .no_keys(),
            ),
            (
                "select",
                CommandMetadata::new(RedisCommandName::Select)
                    .connection()
                    .with_arity(2)
                    .no_keys(),
            ),
            (
                "quit",
                CommandMetadata::new(RedisCommandName::Quit)
                    .connection()
                    .with_arity(-1)
                    .no_keys(),
            ),
            // server
            (
                "command",
                CommandMetadata::new(RedisCommandName::Command)
                    .connection()
                    .with_arity(-1)
                    .no_keys(),
            ),
            (
                "info",
                CommandMetadata::new(RedisCommandName::Info)
                    .read_only()
                    .with_arity(-1)
                    .no_keys(),
            ),
            (
                "flushall",
                CommandMetadata::new(RedisCommandName::FlushAll)
                    .write()
                    .with_arity(-1)
                    .no_keys(),
            ),
            (
                "flushdb",
                CommandMetadata::new(RedisCommandName::FlushDb)
                    .write()
                    .with_arity(-1)
                    .no_keys(),
            ),
            (
                "cluster",
                CommandMetadata::new(RedisCommandName::Cluster)
                    .admin()
                    .with_arity(-2)
                    .no_keys(),
            ),
            // generic
            (
                "del",
                CommandMetadata::new(RedisCommandName::Del)
                    .write()
                    .with_arity(-2)
                    .all_keys(),
            ),
            (
                "exists",
                CommandMetadata::new(RedisCommandName::Exists)
                    .read_only()
                    .with_arity(-2)
                    .all_keys(),
            ),
            (
                "type",
                CommandMetadata::new(RedisCommandName::Type)
                    .read_only()
                    .with_arity(2),
            ),
            // strings
            (
                "set",
                CommandMetadata::new(RedisCommandName::Set)
                    .write()
                    .with_arity(3),
            ),
            (
                "get",
                CommandMetadata::new(RedisCommandName::Get)
                    .read_only()
                    .with_arity(2),
            ),
            // transactions
            (
                "multi",
                CommandMetadata::new(RedisCommandName::Multi)
                    .with_arity(1)
                    .no_keys()
                    .no_transaction(),
            ),
            (
                "exec",
                CommandMetadata::new(RedisCommandName::Exec)
                    .with_arity(1)
                    .no_keys()
                    .no_transaction(),
            ),
            (
                "discard",
                CommandMetadata::new(RedisCommandName::Discard)
                    .with_arity(1)
                    .no_keys()
                    .no_transaction(),
            ),
            (
                "watch",
                CommandMetadata::new(RedisCommandName::Watch)
                    .with_arity(-2)
                    .all_keys()
                    .no_transaction(),
            ),
            (
                "unwatch",
                CommandMetadata::new(RedisCommandName::Unwatch)
                    .with_arity(1)
                    .no_keys(),
            ),
            // sorted sets
            (
                "zadd",
                CommandMetadata::new(RedisCommandName::Zadd)
                    .write()
                    .with_arity(-4),
            ),
            (
                "zcard",
                CommandMetadata::new(RedisCommandName::Zcard)
                    .read_only()
                    .with_arity(2),
            ),
            (
                "zcount",
                CommandMetadata::new(RedisCommandName::Zcount)
                    .read_only()
                    .with_arity(4),
            ),
            (
                "zincrby",
                CommandMetadata::new(RedisCommandName::Zincrby)
                    .write()
                    .with_arity(4),
            ),
            (
                "zlexcount",
                CommandMetadata::new(RedisCommandName::Zlexcount)
                    .read_only()
                    .with_arity(4),
            ),
            (
                "zrange",
                CommandMetadata::new(RedisCommandName::Zrange)
                    .read_only()
                    .with_arity(-4),
            ),
            (
                "zrangebylex",
                CommandMetadata::new(RedisCommandName::Zrangebylex)
                    .read_only()
                    .with_arity(-4),
            ),
            (
                "zrangebyscore",
                CommandMetadata::new(RedisCommandName::Zrangebyscore)
                    .read_only()
                    .with_arity(-4),
            ),
            (
                "zrank",
                CommandMetadata::new(RedisCommandName::Zrank)
                    .read_only()
                    .with_arity(3),
            ),
            (
                "zrem",
                CommandMetadata::new(RedisCommandName::Zrem)
                    .write()
                    .with_arity(-3),
            ),
            (
                "zremrangebylex",
                CommandMetadata::new(RedisCommandName::Zremrangebylex)
                    .write()
                    .with_arity(4),
            ),
            (
                "zremrangebyrank",
                CommandMetadata::new(RedisCommandName::Zremrangebyrank)
                    .write()
                    .with_arity(4),
            ),
            (
                "zremrangebyscore",
                CommandMetadata::new(RedisCommandName::Zremrangebyscore)
                    .write()
                    .with_arity(4),
            ),
            (
                "zrevrange",
                CommandMetadata::new(RedisCommandName::Zrevrange)
                    .read_only()
                    .with_arity(-4),
            ),
            (
                "zrevrangebylex",
                CommandMetadata::new(RedisCommandName::Zrevrangebylex)
                    .read_only()
                    .with_arity(-4),
            ),
            (
                "zrevrangebyscore",
                CommandMetadata::new(RedisCommandName::Zrevrangebyscore)
                    .read_only()
                    .with_arity(-4),
            ),
            (
                "zrevrank",
                CommandMetadata::new(RedisCommandName::Zrevrank)
                    .read_only()
                    .with_arity(3),
            ),
            (
                "zscore",
                CommandMetadata::new(RedisCommandName::Zscore)
                    .read_only()
                    .with_arity(3),
            ),
        ];

        let cmds: HashMap<&'static str, Arc<CommandMetadata>> = cmds
            .into_iter()
            .map(|(name, md)| (name, Arc::new(md)))
            .collect();
        CommandsManager { cmds }
    }
}
