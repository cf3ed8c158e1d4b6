use crate::{
    commands::HandleCommandResult, reject_command, server::ClientState, BytesMutUtils,
    RedisCommand, RespBuilder, SableError,
};

use bytes::BytesMut;
use std::rc::Rc;

/// Node id reported by `CLUSTER SLOTS`
const NODE_ID: &str = "09dbe9720cda62f7865eabc5fd8857c5d2678366";
/// The single line reported by `CLUSTER NODES`
const NODES_LINE: &str = "e7d1eecce10fd6bb5eb35b9f99a514335d9ba9ca 127.0.0.1:7000@7000 myself,master - 0 0 1 connected 0-16383";
const KEY_SLOT: usize = 163;
const LAST_SLOT: usize = 16383;

/// A single node "cluster" owning every slot. Enough for cluster aware clients to connect
pub struct ClusterCommands {}

impl ClusterCommands {
    pub fn handle_command(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
    ) -> Result<HandleCommandResult, SableError> {
        let mut response_buffer = BytesMut::with_capacity(128);
        let sub_command = command.arg_as_lowercase_string(1).unwrap_or_default();
        match (sub_command.as_str(), command.arg_count()) {
            ("slots", 2) => Self::slots(client_state, &mut response_buffer)?,
            ("keyslot", 3) => Self::keyslot(client_state, &mut response_buffer)?,
            ("nodes", 2) => Self::nodes(client_state, &mut response_buffer)?,
            _ => Self::not_supported(client_state, command, &mut response_buffer)?,
        }
        Ok(HandleCommandResult::ResponseBufferUpdated(response_buffer))
    }

    /// `[[0, 16383, [ip, port, node-id]]]`, built from the address the server listens on
    fn slots(client_state: Rc<ClientState>, response_buffer: &mut BytesMut) -> Result<(), SableError> {
        let (ip, port) = client_state.server_inner_state().cluster_address();

        client_state.with_tx(response_buffer, move |_ctx, response_buffer| {
            let builder = RespBuilder::default();
            response_buffer.clear();
            builder.add_array_len(response_buffer, 1);
            builder.add_array_len(response_buffer, 3);
            builder.add_number(response_buffer, 0);
            builder.add_number(response_buffer, LAST_SLOT);
            builder.add_array_len(response_buffer, 3);
            builder.add_bulk_string(response_buffer, ip.as_bytes());
            builder.add_number(response_buffer, port);
            builder.add_bulk_string(response_buffer, NODE_ID.as_bytes());
            Ok(())
        })
    }

    /// Every key lives in the same slot
    fn keyslot(client_state: Rc<ClientState>, response_buffer: &mut BytesMut) -> Result<(), SableError> {
        client_state.with_tx(response_buffer, move |_ctx, response_buffer| {
            RespBuilder::default().number_usize(response_buffer, KEY_SLOT);
            Ok(())
        })
    }

    fn nodes(client_state: Rc<ClientState>, response_buffer: &mut BytesMut) -> Result<(), SableError> {
        client_state.with_tx(response_buffer, move |_ctx, response_buffer| {
            RespBuilder::default().bulk_string(response_buffer, NODES_LINE.as_bytes());
            Ok(())
        })
    }

    fn not_supported(
        client_state: Rc<ClientState>,
        command: Rc<RedisCommand>,
        response_buffer: &mut BytesMut,
    ) -> Result<(), SableError> {
        let args: Vec<String> = command
            .args_vec()
            .iter()
            .skip(1)
            .map(|arg| BytesMutUtils::to_string(arg))
            .collect();
        let errmsg = format!("ERR 'CLUSTER {}' not supported", args.join(" "));
        reject_command!(client_state, response_buffer, &errmsg);
    }
}
