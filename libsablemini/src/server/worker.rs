use crate::{Client, SableError, ServerState};
use std::net::TcpStream;
use std::sync::Arc;
#[allow(unused_imports)]
use tracing::{debug, error, info, trace};

#[derive(Debug)]
pub enum WorkerMessage {
    NewConnection(TcpStream),
    Shutdown,
}

pub type WorkerSender = tokio::sync::mpsc::Sender<WorkerMessage>;
pub type WorkerReceiver = tokio::sync::mpsc::Receiver<WorkerMessage>;

pub struct Worker {
    /// Shared server state
    server_state: Arc<ServerState>,
    /// The channel on which this worker accepts commands from the acceptor thread
    rx_channel: WorkerReceiver,
    worker_id: usize,
}

#[derive(Clone, Debug)]
/// The `WorkerContext` allows the acceptor thread to communicate with the workers
/// over a dedicated channel
pub struct WorkerContext {
    pub worker_send_channel: WorkerSender,
    pub thread_id: std::thread::ThreadId,
}

impl WorkerContext {
    /// Send message to the worker. Must not be called from within a `tokio` runtime
    pub fn send(&self, message: WorkerMessage) -> Result<(), SableError> {
        self.worker_send_channel.blocking_send(message)?;
        Ok(())
    }
}

impl Worker {
    /// Create a new worker and run it inside a separate thread using a dedicated
    /// single threaded `tokio` runtime. Connections handed to the worker are served
    /// as local tasks of that thread
    pub fn run(server_state: Arc<ServerState>, worker_id: usize) -> Result<WorkerContext, SableError> {
        let (tx, rx) = tokio::sync::mpsc::channel::<WorkerMessage>(1000); // channel with back-pressure of 1000
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .thread_name("Worker")
            .build()?;

        let state_clone = server_state.clone();
        let handle = std::thread::Builder::new()
            .name(format!("Worker-{}", worker_id))
            .spawn(move || {
                let local = tokio::task::LocalSet::new();
                local.block_on(&rt, async move {
                    let mut worker = Worker::new(rx, state_clone, worker_id);
                    worker.main_loop().await;
                });
            })?;

        let thread_id = handle.thread().id();
        server_state.add_worker_tx_channel(thread_id, tx.clone());
        Ok(WorkerContext {
            worker_send_channel: tx,
            thread_id,
        })
    }

    fn new(rx: WorkerReceiver, server_state: Arc<ServerState>, worker_id: usize) -> Self {
        Worker {
            server_state,
            rx_channel: rx,
            worker_id,
        }
    }

    /// The worker's main loop
    async fn main_loop(&mut self) {
        debug!("Worker {} ready to handle connections", self.worker_id);
        while let Some(msg) = self.rx_channel.recv().await {
            debug!("Worker {} received command: {:?}", self.worker_id, msg);
            match msg {
                WorkerMessage::NewConnection(stream) => {
                    if let Err(e) = self.handle_new_connection(stream) {
                        error!("Failed to handle new connection. {:?}", e);
                    } else {
                        debug!("Task created successfully");
                    }
                }
                WorkerMessage::Shutdown => {
                    info!("Worker {} shutting down", self.worker_id);
                    break;
                }
            }
        }
    }

    /// Create a client for `stream` and spawn it on a dedicated local task
    fn handle_new_connection(&self, stream: TcpStream) -> Result<(), SableError> {
        stream.set_nonblocking(true)?;
        let server_state = self.server_state.clone();
        tokio::task::spawn_local(async move {
            debug!("Handling new connection");
            let mut client = Client::new(server_state);
            if let Err(e) = client.run(stream).await {
                client.inner().debug(&format!("connection ended. {:?}", e));
            }
        });
        Ok(())
    }
}
