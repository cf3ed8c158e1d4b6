use crate::storage::Database;
use std::sync::atomic::{AtomicU64, Ordering};

lazy_static::lazy_static! {
    static ref CONNECTIONS_OPENED: AtomicU64 = AtomicU64::new(0);
    static ref CONNECTIONS_CLOSED: AtomicU64 = AtomicU64::new(0);
    static ref NET_BYTES_READ: AtomicU64 = AtomicU64::new(0);
    static ref NET_BYTES_WRITTEN: AtomicU64 = AtomicU64::new(0);
    static ref TOTAL_COMMANDS_PROCESSED: AtomicU64 = AtomicU64::new(0);
    static ref TRANSACTIONS_EXECUTED: AtomicU64 = AtomicU64::new(0);
    static ref TRANSACTIONS_ABORTED: AtomicU64 = AtomicU64::new(0);
}

/// Process wide counters, reported by the `INFO` command
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct Telemetry {
    /// Number of connections opened
    pub connections_opened: u64,
    /// Number of connections closed
    pub connections_closed: u64,
    /// Number of bytes read from the network
    pub net_bytes_read: u64,
    /// Number of bytes written to the network
    pub net_bytes_written: u64,
    /// Total number of commands processed
    pub total_commands_processed: u64,
    /// `EXEC` calls that ran their queued commands
    pub transactions_executed: u64,
    /// `EXEC` calls that were refused (dirty transaction or a watched key changed)
    pub transactions_aborted: u64,
}

impl Telemetry {
    pub fn inc_connections_opened() {
        CONNECTIONS_OPENED.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_connections_closed() {
        CONNECTIONS_CLOSED.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_net_bytes_read(bytes: u64) {
        NET_BYTES_READ.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn inc_net_bytes_written(bytes: u64) {
        NET_BYTES_WRITTEN.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn inc_total_commands_processed() {
        TOTAL_COMMANDS_PROCESSED.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_transactions_executed() {
        TRANSACTIONS_EXECUTED.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_transactions_aborted() {
        TRANSACTIONS_ABORTED.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a copy of the current counters
    pub fn snapshot() -> Self {
        Telemetry {
            connections_opened: CONNECTIONS_OPENED.load(Ordering::Relaxed),
            connections_closed: CONNECTIONS_CLOSED.load(Ordering::Relaxed),
            net_bytes_read: NET_BYTES_READ.load(Ordering::Relaxed),
            net_bytes_written: NET_BYTES_WRITTEN.load(Ordering::Relaxed),
            total_commands_processed: TOTAL_COMMANDS_PROCESSED.load(Ordering::Relaxed),
            transactions_executed: TRANSACTIONS_EXECUTED.load(Ordering::Relaxed),
            transactions_aborted: TRANSACTIONS_ABORTED.load(Ordering::Relaxed),
        }
    }

    /// Render the `INFO` text: the counters followed by a `# Keyspace` section listing
    /// every non empty database
    pub fn info_string(&self, databases: &[Database]) -> String {
        let mut lines = vec![
            "# Stats".to_string(),
            format!("connections_opened:{}", self.connections_opened),
            format!("connections_closed:{}", self.connections_closed),
            format!("total_commands_processed:{}", self.total_commands_processed),
            format!("total_net_input_bytes:{}", self.net_bytes_read),
            format!("total_net_output_bytes:{}", self.net_bytes_written),
            format!("transactions_executed:{}", self.transactions_executed),
            format!("transactions_aborted:{}", self.transactions_aborted),
            String::new(),
            "# Keyspace".to_string(),
        ];

        for (db_id, db) in databases.iter().enumerate() {
            if !db.is_empty() {
                lines.push(format!("db{}:keys={}", db_id, db.len()));
            }
        }
        lines.join("\r\n")
    }
}
