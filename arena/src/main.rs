mod config;
mod match_loop;
mod seats;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use chess::PlayerSide;
use clap::Parser;
use selector::{find_by_model, LlmSelector, Player, PlayerKind, CATALOG};

use match_loop::{spawn_match, MatchConfig, MatchEvent, MatchPhase, RetryPolicy};
use seats::{SeatAssignment, Seats};

/// Pit two configured players against each other and print the move log.
#[derive(Parser, Debug)]
#[command(name = "arena", version, about)]
struct Args {
    /// Catalog model for the White seat (e.g. "gpt-4o", "Stockfish 16")
    #[arg(long)]
    white: String,

    /// Catalog model for the Black seat
    #[arg(long)]
    black: String,

    /// API key for the White seat (overrides ARENA_WHITE_API_KEY)
    #[arg(long)]
    white_api_key: Option<String>,

    /// API key for the Black seat (overrides ARENA_BLACK_API_KEY)
    #[arg(long)]
    black_api_key: Option<String>,

    /// Delay between move ticks in milliseconds (overrides ARENA_MOVE_DELAY_MS)
    #[arg(long)]
    move_delay_ms: Option<u64>,

    /// Selection attempts per move before the tick gives up
    #[arg(long, default_value_t = 1)]
    retry_attempts: u32,

    /// Backoff between selection attempts in milliseconds
    #[arg(long, default_value_t = 0)]
    retry_backoff_ms: u64,

    /// Stop after this many applied moves
    #[arg(long)]
    max_moves: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let white = resolve_player(&args.white)?;
    let black = resolve_player(&args.black)?;

    let seats = Seats {
        white: Some(seat_for(
            white,
            args.white_api_key.or_else(|| config::env_api_key(PlayerSide::White)),
        )),
        black: Some(seat_for(
            black,
            args.black_api_key.or_else(|| config::env_api_key(PlayerSide::Black)),
        )),
    };

    let move_delay_ms = args.move_delay_ms.unwrap_or_else(config::env_move_delay_ms);
    let match_config = MatchConfig {
        move_delay: Duration::from_millis(move_delay_ms),
        retry: RetryPolicy {
            attempts: args.retry_attempts,
            backoff: Duration::from_millis(args.retry_backoff_ms),
        },
    };

    tracing::info!(
        white = white.model,
        black = black.model,
        move_delay_ms,
        "Starting match"
    );

    let handle = spawn_match(seats, match_config, Arc::new(LlmSelector::new()));
    let (snapshot, mut events) = handle
        .subscribe()
        .await
        .context("Failed to subscribe to match events")?;
    let mut printed = snapshot.history.len();

    handle.start().await.context("Failed to start the match")?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted; shutting down");
                break;
            }
            event = events.recv() => match event {
                Ok(MatchEvent::StateChanged(snap)) => {
                    // A reset shrinks the history; realign before printing.
                    printed = printed.min(snap.history.len());
                    for entry in &snap.history[printed..] {
                        println!("{}", entry);
                    }
                    printed = snap.history.len();
                    if snap.phase == MatchPhase::Over {
                        break;
                    }
                    if args.max_moves.is_some_and(|max| snap.move_count >= max) {
                        tracing::info!("Reached the move limit; stopping");
                        break;
                    }
                }
                Ok(MatchEvent::Error(msg)) => {
                    eprintln!("{}", msg);
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Dropped {} match events", skipped);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    handle.shutdown().await;
    Ok(())
}

fn resolve_player(model: &str) -> anyhow::Result<&'static Player> {
    match find_by_model(model) {
        Some(player) => Ok(player),
        None => {
            let known: Vec<&str> = CATALOG.iter().map(|p| p.model).collect();
            bail!("Unknown model {:?}; known models: {}", model, known.join(", "));
        }
    }
}

fn seat_for(player: &'static Player, api_key: Option<String>) -> SeatAssignment {
    if matches!(player.kind, PlayerKind::Service(_)) && api_key.is_none() {
        tracing::warn!(
            model = player.model,
            "No API key configured; this seat will not move until one is provided"
        );
    }
    SeatAssignment {
        player: *player,
        api_key,
    }
}
