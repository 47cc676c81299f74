//! Blocking MySQL client for server sessions.
//!
//! Issues the two fixed commands against the server's administrative
//! database. The connection is closed when the client drops.

use mysql::prelude::Queryable;
use mysql::{Conn, OptsBuilder, Row, Value};

use super::{ClientError, ClientFactory, SlowLogClient};
use crate::config::ServerConfig;
use crate::record::RawRecord;

/// Administrative database holding the slow-log tables.
const ADMIN_DATABASE: &str = "mysql";

/// Rotates the currently-active slow log into the backup table.
const ROTATE_COMMAND: &str = "CALL mysql.rds_rotate_slow_log";

/// Reads everything the last rotation captured.
const FETCH_QUERY: &str = "SELECT * FROM slow_log_backup";

/// Opens one blocking connection per session.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlClientFactory;

/// A live connection to one server.
pub struct MysqlClient {
    conn: Conn,
}

impl ClientFactory for MysqlClientFactory {
    type Client = MysqlClient;

    fn connect(&self, server: &ServerConfig) -> Result<MysqlClient, ClientError> {
        let opts = OptsBuilder::new()
            .ip_or_hostname(Some(server.host.clone()))
            .tcp_port(server.port)
            .user(server.username.clone())
            .pass(server.password.clone())
            .db_name(Some(ADMIN_DATABASE));
        let conn = Conn::new(opts)?;
        Ok(MysqlClient { conn })
    }
}

impl SlowLogClient for MysqlClient {
    fn rotate(&mut self) -> Result<(), ClientError> {
        self.conn.query_drop(ROTATE_COMMAND)?;
        Ok(())
    }

    fn fetch(&mut self) -> Result<Vec<RawRecord>, ClientError> {
        let rows: Vec<Row> = self.conn.query(FETCH_QUERY)?;
        Ok(rows.iter().map(row_to_record).collect())
    }
}

fn row_to_record(row: &Row) -> RawRecord {
    row.columns_ref()
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let value = row.as_ref(index).cloned().unwrap_or(Value::NULL);
            (column.name_str().into_owned(), raw_bytes(value))
        })
        .collect()
}

/// The text protocol returns every non-NULL column as bytes; the remaining
/// variants can only appear over the binary protocol and are stringified in
/// the formats the normalizer expects.
fn raw_bytes(value: Value) -> Option<Vec<u8>> {
    match value {
        Value::NULL => None,
        Value::Bytes(bytes) => Some(bytes),
        Value::Int(n) => Some(n.to_string().into_bytes()),
        Value::UInt(n) => Some(n.to_string().into_bytes()),
        Value::Float(f) => Some(f.to_string().into_bytes()),
        Value::Double(d) => Some(d.to_string().into_bytes()),
        Value::Date(year, month, day, hour, minute, second, micros) => Some(
            format!(
                "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}.{micros:06}"
            )
            .into_bytes(),
        ),
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if negative { "-" } else { "" };
            let hours = days * 24 + u32::from(hours);
            Some(
                format!("{sign}{hours:02}:{minutes:02}:{seconds:02}.{micros:06}").into_bytes(),
            )
        }
    }
}
