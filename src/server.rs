use std::{
    fs,
    io::ErrorKind,
    os::unix::fs::FileTypeExt,
    path::Path,
    sync::Arc,
};

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{UnixListener, UnixStream},
    signal::unix::{SignalKind, signal},
    sync::mpsc,
};

use crate::{
    audit::{AuditSink, AuditTrail, JsonlAuditSink},
    config::Config,
    diagnosis::{HistoricalPatternPort, NoopHistory, StaticHistory},
    intake::IncidentReport,
    orchestrator::{Collaborators, IncidentEngine, IncidentOutcome, Orchestrator},
    protocol::{ClientMessage, parse_client_message},
    reasoning::{
        BoundedReasoner, ReasoningPort, adapters::openai_compatible::OpenAiCompatibleReasoner,
        noop::OfflineReasoner,
    },
};

enum ExitReason {
    SocketMessage,
    Signal(&'static str),
}

/// Wires the configured adapters into a ready engine.
pub fn build_engine(config: &Config) -> Result<IncidentEngine> {
    let policy = Arc::new(config.policy.clone());

    let audit = match &config.audit.path {
        Some(path) => {
            let records = JsonlAuditSink::load(path)
                .with_context(|| format!("failed to restore audit trail from {}", path.display()))?;
            let restored = records.len();
            let sink: Arc<dyn AuditSink> = Arc::new(
                JsonlAuditSink::open(path.clone())
                    .with_context(|| format!("failed to open audit trail {}", path.display()))?,
            );
            tracing::info!(
                target: "server",
                path = %path.display(),
                restored_records = restored,
                "audit_trail_opened"
            );
            AuditTrail::restore(sink, records)
        }
        None => {
            tracing::warn!(target: "server", "audit_trail_in_memory");
            AuditTrail::in_memory()
        }
    };

    let history: Arc<dyn HistoricalPatternPort> = match &config.history.path {
        Some(path) => {
            let history = StaticHistory::load(path)
                .with_context(|| format!("failed to load incident history {}", path.display()))?;
            tracing::info!(
                target: "server",
                path = %path.display(),
                incidents = history.len(),
                "incident_history_loaded"
            );
            Arc::new(history)
        }
        None => Arc::new(NoopHistory),
    };

    let port: Arc<dyn ReasoningPort> = match &config.reasoning.backend {
        Some(backend) => {
            tracing::info!(
                target: "server",
                endpoint = %backend.endpoint,
                model = %backend.model,
                "reasoning_backend_configured"
            );
            Arc::new(
                OpenAiCompatibleReasoner::new(backend.clone())
                    .context("failed to build reasoning backend")?,
            )
        }
        None => {
            tracing::warn!(target: "server", "reasoning_backend_offline");
            Arc::new(OfflineReasoner)
        }
    };
    let reasoner = BoundedReasoner::new(port, config.reasoning.retry_policy(policy.max_retries));

    let orchestrator = Orchestrator::new(
        policy,
        reasoner,
        history,
        Arc::new(audit),
        Collaborators::default(),
    );
    Ok(IncidentEngine::new(
        Arc::new(orchestrator),
        config.server.max_concurrent_incidents,
    ))
}

pub async fn run(config: Config) -> Result<()> {
    let engine = build_engine(&config)?;
    let socket_path = &config.server.socket_path;

    prepare_socket_path(socket_path)?;
    let listener = UnixListener::bind(socket_path)
        .with_context(|| format!("unable to bind socket {}", socket_path.display()))?;

    let mut sigint =
        signal(SignalKind::interrupt()).context("unable to listen for SIGINT (Ctrl+C)")?;
    let mut sigterm = signal(SignalKind::terminate()).context("unable to listen for SIGTERM")?;
    let (exit_tx, mut exit_rx) = mpsc::unbounded_channel::<()>();

    tracing::info!(
        target: "server",
        socket = %socket_path.display(),
        max_concurrent_incidents = config.server.max_concurrent_incidents,
        "server_listening"
    );
    eprintln!("healer listening on unix socket (NDJSON): {}", socket_path.display());

    let exit_reason = loop {
        tokio::select! {
            _ = sigint.recv() => break ExitReason::Signal("SIGINT"),
            _ = sigterm.recv() => break ExitReason::Signal("SIGTERM"),
            Some(()) = exit_rx.recv() => break ExitReason::SocketMessage,
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, _)) => {
                        let sender = exit_tx.clone();
                        let engine = engine.clone();
                        tokio::spawn(async move {
                            if let Err(err) = handle_client(stream, engine, sender).await {
                                tracing::warn!(target: "server", error = %format!("{err:#}"), "client_handling_failed");
                            }
                        });
                    }
                    Err(err) => {
                        tracing::warn!(target: "server", error = %err, "accept_failed");
                    }
                }
            }
        }
    };

    engine.shutdown();
    engine.drain().await;
    cleanup_socket_path(socket_path)?;
    match exit_reason {
        ExitReason::SocketMessage => {
            tracing::info!(target: "server", reason = "exit_message", "server_stopped");
            eprintln!("healer stopped: received exit message");
        }
        ExitReason::Signal(signal_name) => {
            tracing::info!(target: "server", reason = signal_name, "server_stopped");
            eprintln!("healer stopped: received {signal_name}");
        }
    }

    Ok(())
}

/// Handles every report in an NDJSON file concurrently and prints one outcome
/// line per report, in file order. Returns the number of reports handled.
pub async fn process_file(engine: &IncidentEngine, path: &Path) -> Result<usize> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read incident file {}", path.display()))?;

    let mut pending = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match IncidentReport::parse(line) {
            Ok(report) => pending.push((index + 1, Ok(engine.submit(report)))),
            Err(err) => pending.push((index + 1, Err(err.to_string()))),
        }
    }

    let mut handled = 0;
    for (line_no, submitted) in pending {
        let reply = match submitted {
            Ok(handle) => match handle.await {
                Ok(Ok(outcome)) => {
                    handled += 1;
                    outcome_reply(&outcome)
                }
                Ok(Err(err)) => error_reply(format!("line {line_no}: {err}")),
                Err(err) => error_reply(format!("line {line_no}: incident task failed: {err}")),
            },
            Err(message) => {
                tracing::warn!(target: "server", line = line_no, error = %message, "invalid_incident_line");
                error_reply(format!("line {line_no}: {message}"))
            }
        };
        println!("{reply}");
    }

    Ok(handled)
}

async fn handle_client(
    stream: UnixStream,
    engine: IncidentEngine,
    exit_tx: mpsc::UnboundedSender<()>,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<Value>();

    let writer_task = tokio::spawn(async move {
        while let Some(reply) = reply_rx.recv().await {
            let mut line = reply.to_string();
            line.push('\n');
            if writer.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_client_message(line) {
            Ok(ClientMessage::Report(report)) => {
                let engine = engine.clone();
                let reply_tx = reply_tx.clone();
                tokio::spawn(async move {
                    let reply = match engine.process(report).await {
                        Ok(outcome) => outcome_reply(&outcome),
                        Err(err) => error_reply(err.to_string()),
                    };
                    let _ = reply_tx.send(reply);
                });
            }
            Ok(ClientMessage::Audit { incident_id }) => {
                let reply = match engine.orchestrator().audit().records(&incident_id) {
                    Ok(records) => json!({
                        "type": "audit",
                        "incident_id": incident_id,
                        "records": records,
                    }),
                    Err(err) => error_reply(err.to_string()),
                };
                let _ = reply_tx.send(reply);
            }
            Ok(ClientMessage::Exit) => {
                let _ = exit_tx.send(());
                break;
            }
            Err(err) => {
                tracing::warn!(target: "server", error = %err, "invalid_protocol_message");
                let _ = reply_tx.send(error_reply(err.to_string()));
            }
        }
    }

    drop(reply_tx);
    let _ = writer_task.await;
    Ok(())
}

fn outcome_reply(outcome: &IncidentOutcome) -> Value {
    json!({ "type": "outcome", "outcome": outcome })
}

fn error_reply(message: String) -> Value {
    json!({ "type": "error", "message": message })
}

fn prepare_socket_path(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("unable to create {}", parent.display()))?;
    }

    match fs::symlink_metadata(path) {
        Ok(metadata) => {
            if metadata.file_type().is_socket() || metadata.is_file() {
                fs::remove_file(path)
                    .with_context(|| format!("unable to remove stale socket {}", path.display()))?;
            } else {
                bail!(
                    "socket path exists but is not removable as file/socket: {}",
                    path.display()
                );
            }
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("unable to inspect {}", path.display()));
        }
    }

    Ok(())
}

fn cleanup_socket_path(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("unable to remove {}", path.display())),
    }
}
