use std::rc::Rc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SableError {
    /// From system IO error
    #[error("I/O error. {0}")]
    StdIoError(#[from] std::io::Error),
    /// From tokio channel error
    #[error("Tokio channel error. {0}")]
    SendCommandError(#[from] tokio::sync::mpsc::error::SendError<Rc<crate::RedisCommand>>),
    #[error("Failed to send worker message. {0}")]
    WorkerChannel(#[from] tokio::sync::mpsc::error::SendError<crate::server::WorkerMessage>),
    #[error("Parse error. {0}")]
    Parser(#[from] ParserError),
    #[error("Empty command")]
    EmptyCommand,
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Error. {0}")]
    OtherError(String),
    #[error("Invalid argument error. {0}")]
    InvalidArgument(String),
    #[error("INI configuration error. {0}")]
    ConfigError(#[from] ini::Error),
    #[error("Failed parsing address. {0}")]
    AddressParseError(#[from] std::net::AddrParseError),
    #[error("Client is in invalid state")]
    ClientInvalidState,
    /// A typed accessor was used against a key holding a different type
    #[error("Wrong type")]
    WrongType,
    #[error("Poisoned lock. {0}")]
    PoisonedLock(String),
}

#[allow(dead_code)]
impl SableError {
    /// Is this parser error, equals `other` ?
    pub fn eq_parser_error(&self, other: &ParserError) -> bool {
        match self {
            SableError::Parser(e) => e == other,
            _ => false,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParserError {
    #[error("Need more to data to complete operation")]
    NeedMoreData,
    #[error("Protocol error. `{0}`")]
    ProtocolError(String),
    #[error("Input too big")]
    BufferTooBig,
    #[error("Overflow occurred")]
    Overflow,
    #[error("Invalid input. {0}")]
    InvalidInput(String),
}
