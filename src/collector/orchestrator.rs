//! Per-cycle collection across all configured servers.
//!
//! Servers are processed strictly sequentially, in configured order. Every
//! failure is contained at the server boundary: it is logged with its cause
//! and the cycle moves on to the next server.

use crate::config::{CollectorConfig, ServerConfig};
use crate::normalize::Normalizer;
use crate::record::{Batch, NormalizedEvent};
use crate::session::{run_session, ClientFactory};
use crate::sink::EventSink;

/// One server with its routing tag, composed once at construction.
#[derive(Debug, Clone)]
struct TaggedServer {
    tag: String,
    config: ServerConfig,
}

/// Runs one collection cycle per scheduler tick.
pub(crate) struct Orchestrator<F, S> {
    servers: Vec<TaggedServer>,
    normalizer: Normalizer,
    factory: F,
    sink: S,
}

impl<F: ClientFactory, S: EventSink> Orchestrator<F, S> {
    pub(crate) fn new(
        config: &CollectorConfig,
        normalizer: Normalizer,
        factory: F,
        sink: S,
    ) -> Self {
        let servers = config
            .servers
            .iter()
            .map(|server| TaggedServer {
                tag: config.tag_for(server),
                config: server.clone(),
            })
            .collect();
        Self {
            servers,
            normalizer,
            factory,
            sink,
        }
    }

    pub(crate) fn server_count(&self) -> usize {
        self.servers.len()
    }

    /// Run one collection cycle.
    ///
    /// A failed server contributes whatever rows were normalized before the
    /// failure (nothing, for connect/rotate/query errors) and never affects
    /// the remaining servers or future cycles.
    pub(crate) fn run_cycle(&self) {
        for server in &self.servers {
            let mut events = Vec::new();
            match run_session(&self.factory, &server.config, &self.normalizer, &mut events) {
                Ok(()) => self.emit(&server.tag, events),
                Err(error) => {
                    tracing::error!(
                        tag = %server.tag,
                        host = %server.config.host,
                        error = %error,
                        "server collection failed"
                    );
                    if !events.is_empty() {
                        self.emit(&server.tag, events);
                    }
                }
            }
        }
    }

    fn emit(&self, tag: &str, events: Vec<NormalizedEvent>) {
        let count = events.len();
        if let Err(error) = self.sink.emit(Batch::new(tag, events)) {
            tracing::error!(tag = %tag, error = %error, "failed to emit batch");
        } else {
            tracing::debug!(tag = %tag, events = count, "batch emitted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::record::RawRecord;
    use crate::session::{ClientError, SlowLogClient};
    use crate::sink::SinkError;

    /// Per-host script: either canned rows or a connect refusal.
    #[derive(Clone)]
    enum Script {
        Rows(Vec<RawRecord>),
        RefuseConnect,
    }

    struct ScriptedFactory {
        scripts: HashMap<String, Script>,
        connect_attempts: Arc<AtomicUsize>,
    }

    impl ScriptedFactory {
        fn new(scripts: Vec<(&str, Script)>) -> Self {
            Self {
                scripts: scripts
                    .into_iter()
                    .map(|(host, script)| (host.to_string(), script))
                    .collect(),
                connect_attempts: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    struct ScriptedClient {
        rows: Vec<RawRecord>,
    }

    impl SlowLogClient for ScriptedClient {
        fn rotate(&mut self) -> Result<(), ClientError> {
            Ok(())
        }

        fn fetch(&mut self) -> Result<Vec<RawRecord>, ClientError> {
            Ok(self.rows.clone())
        }
    }

    impl ClientFactory for ScriptedFactory {
        type Client = ScriptedClient;

        fn connect(&self, server: &ServerConfig) -> Result<ScriptedClient, ClientError> {
            self.connect_attempts.fetch_add(1, Ordering::SeqCst);
            match self.scripts.get(&server.host) {
                Some(Script::Rows(rows)) => Ok(ScriptedClient { rows: rows.clone() }),
                Some(Script::RefuseConnect) | None => Err("connection refused".into()),
            }
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSink {
        batches: Arc<Mutex<Vec<Batch>>>,
        fail_tags: Vec<String>,
    }

    impl EventSink for RecordingSink {
        fn emit(&self, batch: Batch) -> Result<(), SinkError> {
            if self.fail_tags.contains(&batch.tag) {
                return Err("sink unavailable".into());
            }
            self.batches.lock().unwrap().push(batch);
            Ok(())
        }
    }

    fn row(sql: &str) -> RawRecord {
        [
            (
                "start_time".to_string(),
                Some(b"2023-05-01 12:00:00.000000".to_vec()),
            ),
            ("sql_text".to_string(), Some(sql.as_bytes().to_vec())),
        ]
        .into_iter()
        .collect()
    }

    fn config(servers: Vec<ServerConfig>, tag_prefix: Option<&str>) -> CollectorConfig {
        CollectorConfig {
            database_timezone: None,
            emit_interval: 10,
            encoding: None,
            from_encoding: None,
            keep_time_key: false,
            null_empty_string: false,
            tag_prefix: tag_prefix.map(str::to_string),
            servers,
        }
    }

    #[test]
    fn test_failure_isolation_between_servers() {
        let config = config(
            vec![
                ServerConfig::new("bad.example.com", "db1"),
                ServerConfig::new("good.example.com", "db2"),
            ],
            None,
        );
        let factory = ScriptedFactory::new(vec![
            ("bad.example.com", Script::RefuseConnect),
            (
                "good.example.com",
                Script::Rows(vec![row("select 1"), row("select 2")]),
            ),
        ]);
        let attempts = Arc::clone(&factory.connect_attempts);
        let sink = RecordingSink::default();
        let batches = Arc::clone(&sink.batches);

        let orchestrator =
            Orchestrator::new(&config, Normalizer::default(), factory, sink);
        orchestrator.run_cycle();

        // Exactly one batch, for the healthy server, with both rows.
        {
            let batches = batches.lock().unwrap();
            assert_eq!(batches.len(), 1);
            assert_eq!(batches[0].tag, "db2");
            assert_eq!(batches[0].events.len(), 2);
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 2);

        // Next cycle attempts both servers again independently.
        orchestrator.run_cycle();
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert_eq!(batches.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_tag_prefix_applied_to_batches() {
        let config = config(vec![ServerConfig::new("good.example.com", "db1")], Some("app"));
        let factory = ScriptedFactory::new(vec![(
            "good.example.com",
            Script::Rows(vec![row("select 1")]),
        )]);
        let sink = RecordingSink::default();
        let batches = Arc::clone(&sink.batches);

        Orchestrator::new(&config, Normalizer::default(), factory, sink).run_cycle();

        assert_eq!(batches.lock().unwrap()[0].tag, "app.db1");
    }

    #[test]
    fn test_successful_empty_fetch_still_emits() {
        let config = config(vec![ServerConfig::new("good.example.com", "db1")], None);
        let factory = ScriptedFactory::new(vec![("good.example.com", Script::Rows(vec![]))]);
        let sink = RecordingSink::default();
        let batches = Arc::clone(&sink.batches);

        Orchestrator::new(&config, Normalizer::default(), factory, sink).run_cycle();

        let batches = batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert!(batches[0].is_empty());
    }

    #[test]
    fn test_partial_batch_survives_row_failure() {
        let mut bad = row("select 3");
        bad.insert("start_time".to_string(), Some(b"garbage".to_vec()));
        let config = config(vec![ServerConfig::new("good.example.com", "db1")], None);
        let factory = ScriptedFactory::new(vec![(
            "good.example.com",
            Script::Rows(vec![row("select 1"), row("select 2"), bad]),
        )]);
        let sink = RecordingSink::default();
        let batches = Arc::clone(&sink.batches);

        Orchestrator::new(&config, Normalizer::default(), factory, sink).run_cycle();

        let batches = batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].events.len(), 2);
    }

    #[test]
    fn test_sink_failure_is_isolated() {
        let config = config(
            vec![
                ServerConfig::new("one.example.com", "db1"),
                ServerConfig::new("two.example.com", "db2"),
            ],
            None,
        );
        let factory = ScriptedFactory::new(vec![
            ("one.example.com", Script::Rows(vec![row("select 1")])),
            ("two.example.com", Script::Rows(vec![row("select 2")])),
        ]);
        let sink = RecordingSink {
            fail_tags: vec!["db1".to_string()],
            ..Default::default()
        };
        let batches = Arc::clone(&sink.batches);

        Orchestrator::new(&config, Normalizer::default(), factory, sink).run_cycle();

        let batches = batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].tag, "db2");
    }
}
