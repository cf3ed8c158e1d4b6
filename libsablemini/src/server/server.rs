use crate::{
    server::{Worker, WorkerContext, WorkerMessage, WorkerSender},
    storage::Keyspace,
    SableError, ServerOptions,
};
use dashmap::DashMap;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
#[allow(unused_imports)]
use tracing::{debug, error, info};

/// State shared by all the workers of a single server instance
pub struct ServerState {
    keyspace: Keyspace,
    opts: ServerOptions,
    /// Registered worker channels, used to broadcast `Shutdown`
    worker_tx_channels: DashMap<std::thread::ThreadId, WorkerSender>,
    /// The address the listener is actually bound to, known once accepting starts
    bound_address: RwLock<Option<SocketAddr>>,
}

pub struct Server {
    state: Arc<ServerState>,
    workers: Vec<WorkerContext>,
    next_worker: AtomicUsize,
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new(ServerOptions::default())
    }
}

impl ServerState {
    pub fn new(opts: ServerOptions) -> Self {
        ServerState {
            keyspace: Keyspace::with_databases(opts.general_settings.databases),
            opts,
            worker_tx_channels: DashMap::<std::thread::ThreadId, WorkerSender>::default(),
            bound_address: RwLock::new(None),
        }
    }

    /// The logical databases served by this instance
    pub fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }

    pub fn options(&self) -> &ServerOptions {
        &self.opts
    }

    pub fn set_bound_address(&self, address: SocketAddr) {
        match self.bound_address.write() {
            Ok(mut bound_address) => *bound_address = Some(address),
            Err(e) => error!("failed to record the bound address. {:?}", e),
        }
    }

    pub fn bound_address(&self) -> Option<SocketAddr> {
        self.bound_address.read().ok().and_then(|address| *address)
    }

    /// The `(ip, port)` advertised to cluster aware clients. The bound address wins
    /// over the configured `public_address`, which may use port 0
    pub fn cluster_address(&self) -> (String, u16) {
        if let Some(address) = self.bound_address() {
            return (address.ip().to_string(), address.port());
        }
        let public_address = &self.opts.general_settings.public_address;
        match public_address.rsplit_once(':') {
            Some((ip, port)) => (ip.to_string(), port.parse::<u16>().unwrap_or(0)),
            None => (public_address.clone(), 0),
        }
    }

    pub fn add_worker_tx_channel(&self, worker_id: std::thread::ThreadId, tx: WorkerSender) {
        self.worker_tx_channels.insert(worker_id, tx);
    }

    /// Ask every worker to stop
    pub fn shutdown(&self) {
        for worker in self.worker_tx_channels.iter() {
            if let Err(e) = worker.value().try_send(WorkerMessage::Shutdown) {
                error!("failed to send Shutdown to worker {:?}. {:?}", worker.key(), e);
            }
        }
    }
}

impl Server {
    /// Create the shared state and start `opts.workers_count()` workers
    pub fn new(opts: ServerOptions) -> Result<Self, SableError> {
        let workers_count = opts.workers_count();
        let state = Arc::new(ServerState::new(opts));

        let mut workers = Vec::<WorkerContext>::with_capacity(workers_count);
        for worker_id in 0..workers_count {
            workers.push(Worker::run(state.clone(), worker_id)?);
        }
        info!("Successfully created {} workers", workers_count);

        Ok(Server {
            state,
            workers,
            next_worker: AtomicUsize::new(0),
        })
    }

    pub fn state(&self) -> Arc<ServerState> {
        self.state.clone()
    }

    /// Pick a worker, round robin
    pub fn get_worker(&self) -> Result<&WorkerContext, SableError> {
        if self.workers.is_empty() {
            return Err(SableError::OtherError("no workers".to_string()));
        }
        let index = self.next_worker.fetch_add(1, Ordering::Relaxed) % self.workers.len();
        self.workers
            .get(index)
            .ok_or_else(|| SableError::OtherError("no workers".to_string()))
    }

    /// Accept connections forever, handing each one to a worker
    pub fn accept_loop(&self, listener: TcpListener) {
        match listener.local_addr() {
            Ok(address) => {
                info!("Accepting connections on {}", address);
                self.state.set_bound_address(address);
            }
            Err(e) => error!("failed to read the listener address. {:?}", e),
        }
        loop {
            debug!("Waiting for new connections..");
            match listener.accept() {
                Ok((socket, addr)) => {
                    debug!("Accepted connection from {:?}", addr);
                    if let Err(e) = socket.set_nodelay(true) {
                        debug!("failed to set TCP_NODELAY. {:?}", e);
                    }

                    let worker = match self.get_worker() {
                        Ok(worker) => worker,
                        Err(e) => {
                            error!("{:?}", e);
                            continue;
                        }
                    };
                    debug!("Connection passed to {:?}", worker);
                    if let Err(e) = worker.send(WorkerMessage::NewConnection(socket)) {
                        error!("failed to send message to worker thread! {:?}", e);
                    }
                }
                Err(e) => {
                    crate::error_with_throttling!(300, "error accepting connection. {:?}", e);
                }
            }
        }
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

    #[test]
    fn test_server_state_uses_configured_databases() {
        let mut opts = ServerOptions::default();
        opts.general_settings.databases = 3;
        let state = ServerState::new(opts);
        assert_eq!(state.keyspace().databases_count(), 3);
        assert_eq!(state.options().general_settings.databases, 3);
    }

    #[test]
    fn test_independent_instances() {
        let first = ServerState::default();
        let second = ServerState::default();
        first.keyspace().lock().unwrap()[0].put(
            b"k",
            crate::storage::Value::Str(bytes::BytesMut::from("v")),
        );
        assert!(second.keyspace().lock().unwrap()[0].is_empty());
    }

    #[test]
    fn test_cluster_address() {
        let mut opts = ServerOptions::default();
        opts.general_settings.public_address = "127.0.0.1:0".to_string();
        let state = ServerState::new(opts);
        assert_eq!(state.bound_address(), None);
        assert_eq!(state.cluster_address(), ("127.0.0.1".to_string(), 0));

        state.set_bound_address("127.0.0.1:41234".parse().unwrap());
        assert_eq!(state.cluster_address(), ("127.0.0.1".to_string(), 41234));

        let mut opts = ServerOptions::default();
        opts.general_settings.public_address = "localhost".to_string();
        let state = ServerState::new(opts);
        assert_eq!(state.cluster_address(), ("localhost".to_string(), 0));
    }

    #[test]
    fn test_round_robin() {
        let mut opts = ServerOptions::default();
        opts.general_settings.workers = 2;
        let server = Server::new(opts).unwrap();
        let first = server.get_worker().unwrap().thread_id;
        let second = server.get_worker().unwrap().thread_id;
        let third = server.get_worker().unwrap().thread_id;
        assert_ne!(first, second);
        assert_eq!(first, third);
        server.state().shutdown();
    }
}
