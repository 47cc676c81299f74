//! Server session: one connection lifecycle per server per cycle.
//!
//! The session owns the connect → rotate → fetch → normalize protocol. The
//! connection seam is a pair of capability traits so the orchestrator and the
//! tests can run against fakes while the binary uses the MySQL client.

mod mysql;

use thiserror::Error;

pub use self::mysql::MysqlClientFactory;

use crate::config::ServerConfig;
use crate::normalize::{NormalizeError, Normalizer};
use crate::record::{NormalizedEvent, RawRecord};

/// Boxed error produced by a client implementation.
pub type ClientError = Box<dyn std::error::Error + Send + Sync>;

/// An open connection to one server's administrative database.
///
/// The connection is released when the client is dropped, on every exit path.
pub trait SlowLogClient {
    /// Rotate the active slow log into the backup table.
    fn rotate(&mut self) -> Result<(), ClientError>;

    /// Fetch all rows from the backup table, in server order.
    fn fetch(&mut self) -> Result<Vec<RawRecord>, ClientError>;
}

/// Opens connections for server sessions.
pub trait ClientFactory: Send + Sync + 'static {
    /// Client type produced by this factory.
    type Client: SlowLogClient;

    /// Open a connection to `server`.
    fn connect(&self, server: &ServerConfig) -> Result<Self::Client, ClientError>;
}

/// Errors raised while processing one server in one cycle.
///
/// Caught at the orchestrator's server boundary; they never abort the cycle
/// for other servers or stop future cycles.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Opening the connection failed.
    #[error("failed to connect: {0}")]
    Connect(#[source] ClientError),

    /// The rotate command failed.
    #[error("rotate command failed: {0}")]
    Rotate(#[source] ClientError),

    /// The backup-table query failed.
    #[error("slow log query failed: {0}")]
    Query(#[source] ClientError),

    /// One fetched row could not be normalized.
    #[error("malformed row: {0}")]
    Row(#[from] NormalizeError),
}

/// Run one server's session, appending normalized events to `events`.
///
/// Events are appended row by row, so rows normalized before a failure
/// survive in `events` and stay available for emission. Rotation and the
/// backup-table read are two separate server-side operations; a failure
/// between them can lose rows already rotated out of the active log.
/// Delivery is best-effort by design of the upstream protocol.
pub fn run_session<F: ClientFactory>(
    factory: &F,
    server: &ServerConfig,
    normalizer: &Normalizer,
    events: &mut Vec<NormalizedEvent>,
) -> Result<(), SessionError> {
    let mut client = factory.connect(server).map_err(SessionError::Connect)?;
    client.rotate().map_err(SessionError::Rotate)?;
    let rows = client.fetch().map_err(SessionError::Query)?;
    for row in rows {
        events.push(normalizer.normalize(row)?);
    }
    Ok(())
}
