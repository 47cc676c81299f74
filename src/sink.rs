//! Downstream hand-off.
//!
//! The collector forwards each server's batch through [`EventSink`], one call
//! per server per cycle, never streaming partial batches. Embedders implement
//! this for their transport; the binary ships [`JsonLinesSink`].

use std::io::Write;

use crate::record::Batch;

/// Error returned by a sink implementation.
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Ingestion interface of the downstream transport.
pub trait EventSink: Send + Sync + 'static {
    /// Forward one batch as a single unit.
    ///
    /// Events keep the row order returned by the fetch query. A sink error is
    /// treated like any other per-server failure: logged and isolated.
    fn emit(&self, batch: Batch) -> Result<(), SinkError>;
}

/// Sink that writes one JSON object per batch to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLinesSink;

impl EventSink for JsonLinesSink {
    fn emit(&self, batch: Batch) -> Result<(), SinkError> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        serde_json::to_writer(&mut handle, &batch)?;
        handle.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldValue, NormalizedEvent};

    #[test]
    fn test_batch_json_shape() {
        let event = NormalizedEvent {
            timestamp: 1_682_942_400,
            fields: [
                ("db".to_string(), FieldValue::Text("orders".into())),
                ("rows_sent".to_string(), FieldValue::Int(3)),
                ("sql_text".to_string(), FieldValue::Null),
            ]
            .into_iter()
            .collect(),
        };
        let json = serde_json::to_string(&Batch::new("app.db1", vec![event])).unwrap();
        assert_eq!(
            json,
            "{\"tag\":\"app.db1\",\"events\":[{\"timestamp\":1682942400,\
             \"fields\":{\"db\":\"orders\",\"rows_sent\":3,\"sql_text\":null}}]}"
        );
    }
}
