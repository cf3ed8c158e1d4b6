mod client;
mod client_state;
mod error_codes;
#[allow(clippy::module_inception)]
mod server;
mod server_options;
mod telemetry;
mod worker;

pub use client::*;
pub use client_state::*;
pub use error_codes::*;
pub use server::*;
pub use server_options::*;
pub use telemetry::*;
pub use worker::*;
