//! Stockfish process management over UCI.

use crate::uci::{parse_uci_line, UciLine};
use crate::{EngineCommand, EngineError, EngineEvent};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;

const HANDSHAKE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// A running Stockfish process.
///
/// Communication runs through three background tasks: an stdout reader
/// that parses lines into [`EngineEvent`]s, an stdin writer, and a
/// command processor that serializes [`EngineCommand`]s into UCI text.
pub struct StockfishEngine {
    process: Child,
    command_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl StockfishEngine {
    /// Spawn a new Stockfish instance and complete the UCI handshake.
    #[tracing::instrument(level = "info")]
    pub async fn spawn() -> Result<Self, EngineError> {
        // Probing candidate paths runs child processes; keep that off
        // the async worker threads.
        let path = tokio::task::spawn_blocking(find_stockfish_path)
            .await
            .ok()
            .flatten()
            .ok_or(EngineError::NotFound)?;
        tracing::info!("Found Stockfish at: {:?}", path);

        let mut process = tokio::process::Command::new(&path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(EngineError::Spawn)?;

        let mut stdin = process
            .stdin
            .take()
            .ok_or(EngineError::MissingPipe("stdin"))?;
        let stdout = process
            .stdout
            .take()
            .ok_or(EngineError::MissingPipe("stdout"))?;

        stdin.write_all(b"uci\n").await?;
        stdin.flush().await?;

        let (command_tx, mut command_rx) = mpsc::channel::<EngineCommand>(32);
        let (event_tx, event_rx) = mpsc::channel::<EngineEvent>(32);

        let reader_event_tx = event_tx.clone();
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        tracing::warn!("Stockfish stdout EOF, engine closed");
                        break;
                    }
                    Ok(_) => {
                        let trimmed = line.trim();
                        tracing::trace!("UCI << {}", trimmed);

                        let event = match parse_uci_line(trimmed) {
                            Ok(UciLine::UciOk) | Ok(UciLine::ReadyOk) => EngineEvent::Ready,
                            Ok(UciLine::BestMove { mv, .. }) => {
                                tracing::debug!("Received bestmove: {:?}", mv);
                                EngineEvent::BestMove(mv)
                            }
                            Ok(UciLine::Id { .. }) => continue,
                            // Info lines and option announcements are noise here.
                            Err(_) => continue,
                        };

                        if reader_event_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!("Error reading from Stockfish stdout: {}", e);
                        let _ = reader_event_tx
                            .send(EngineEvent::Error(e.to_string()))
                            .await;
                        break;
                    }
                }
            }
        });

        // Wait for uciok before accepting commands.
        let mut event_rx = event_rx;
        let handshake = tokio::time::timeout(HANDSHAKE_TIMEOUT, async {
            while let Some(event) = event_rx.recv().await {
                if matches!(event, EngineEvent::Ready) {
                    return Ok(());
                }
            }
            Err(EngineError::HandshakeClosed)
        })
        .await;

        match handshake {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(EngineError::HandshakeTimeout),
        }

        let (stdin_tx, mut stdin_rx) = mpsc::channel::<String>(32);

        tokio::spawn(async move {
            while let Some(cmd) = stdin_rx.recv().await {
                tracing::trace!("UCI >> {}", cmd.trim());
                if let Err(e) = stdin.write_all(cmd.as_bytes()).await {
                    tracing::error!("Failed to write to engine stdin: {}", e);
                    break;
                }
                if let Err(e) = stdin.flush().await {
                    tracing::error!("Failed to flush engine stdin: {}", e);
                    break;
                }
            }
        });

        let command_stdin_tx = stdin_tx.clone();
        tokio::spawn(async move {
            while let Some(cmd) = command_rx.recv().await {
                let cmd_str = match cmd {
                    EngineCommand::SetPosition { fen } => {
                        tracing::debug!("Setting position: {}", fen);
                        format!("position fen {}\n", fen)
                    }
                    EngineCommand::Go { depth } => {
                        tracing::debug!("Starting search at depth {}", depth);
                        format!("go depth {}\n", depth)
                    }
                    EngineCommand::Stop => "stop\n".to_string(),
                    EngineCommand::Quit => {
                        let _ = command_stdin_tx.send("quit\n".to_string()).await;
                        break;
                    }
                };

                if command_stdin_tx.send(cmd_str).await.is_err() {
                    break;
                }
            }
        });

        tracing::info!("Stockfish engine initialized");
        Ok(Self {
            process,
            command_tx,
            event_rx,
        })
    }

    /// Queue a command for the engine.
    pub async fn send_command(&self, cmd: EngineCommand) -> Result<(), EngineError> {
        self.command_tx
            .send(cmd)
            .await
            .map_err(|_| EngineError::ChannelClosed)
    }

    /// Receive the next engine event.
    pub async fn recv_event(&mut self) -> Option<EngineEvent> {
        self.event_rx.recv().await
    }

    /// Receive the next engine event without blocking.
    pub fn try_recv_event(&mut self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Quit the engine and reap the process.
    pub async fn shutdown(mut self) {
        let _ = self.send_command(EngineCommand::Quit).await;
        let _ = tokio::time::timeout(std::time::Duration::from_secs(1), self.process.wait()).await;
        let _ = self.process.kill().await;
    }
}

/// Find a Stockfish executable in common locations.
fn find_stockfish_path() -> Option<PathBuf> {
    let candidates = [
        "/usr/local/bin/stockfish",
        "/usr/bin/stockfish",
        "/opt/homebrew/bin/stockfish",
        "/usr/games/stockfish",
        "stockfish", // In PATH
    ];

    for path_str in candidates {
        let path = Path::new(path_str);
        if path.exists() || path_str == "stockfish" {
            if std::process::Command::new(path_str)
                .arg("--help")
                .output()
                .is_ok()
            {
                return Some(PathBuf::from(path_str));
            }
        }
    }

    None
}
