mod keymap;
mod terminal;

use std::fs::File;
use std::io::{self, Stdout};
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossterm::event::{Event, EventStream, KeyEventKind};
use futures::StreamExt;
use tracing_subscriber::EnvFilter;

use skyclimb_core::host::GameHost;
use skyclimb_tower::ClimbEngine;
use skyclimb_tower::config::ClimbConfig;
use skyclimb_tower::scheduler::{IntervalTicks, LoopCommand, LoopEndReason, LoopOutcome, LoopSlot};

use keymap::{HostKey, KeyTracker};
use terminal::{TerminalKeys, TerminalSession, TerminalSurface};

const LOG_FILE_ENV: &str = "SKYCLIMB_LOG_FILE";
const DEFAULT_LOG_FILE: &str = "skyclimb.log";
/// How often held keys are checked for a synthesized release.
const RELEASE_SWEEP: Duration = Duration::from_millis(30);

type Outcome = LoopOutcome<TerminalSurface<Stdout>, TerminalKeys>;

/// Collects completed runs so they can be printed once the terminal is back.
#[derive(Default, Clone)]
struct TermHost {
    runs: Arc<Mutex<Vec<(u64, u64)>>>,
}

impl GameHost for TermHost {
    fn run_complete(&mut self, final_score: u64, awarded_points: u64) {
        tracing::info!(final_score, awarded_points, "Run complete");
        if let Ok(mut runs) = self.runs.lock() {
            runs.push((final_score, awarded_points));
        }
    }

    fn exit_requested(&mut self) {
        tracing::info!("Player quit");
    }
}

fn init_logging() {
    let path = std::env::var(LOG_FILE_ENV).unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
    match File::create(&path) {
        Ok(file) => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::from_default_env())
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        },
        Err(e) => eprintln!("skyclimb: logging disabled, cannot open {path}: {e}"),
    }
}

fn main() -> ExitCode {
    init_logging();
    let config = ClimbConfig::load();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("skyclimb: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        },
    };

    let host = TermHost::default();
    let runs = Arc::clone(&host.runs);
    let result = runtime.block_on(play(config, host));

    let runs = runs.lock().map(|r| r.clone()).unwrap_or_default();
    for (i, (final_score, awarded)) in runs.iter().enumerate() {
        println!("Run {}: final score {final_score}, points awarded {awarded}", i + 1);
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Skyclimb exited with an error");
            eprintln!("skyclimb: {e}");
            ExitCode::FAILURE
        },
    }
}

async fn play(config: ClimbConfig, host: TermHost) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ClimbEngine::new(config.clone(), Box::new(host))?;
    tracing::info!(seed = engine.run_seed(), difficulty = ?config.difficulty, "Skyclimb starting");

    let session = TerminalSession::enter()?;
    let (cols, rows) = crossterm::terminal::size()?;
    let aspect = config.canvas.width / config.canvas.height;
    let surface = TerminalSurface::new(io::stdout(), cols, rows, aspect);
    let keys = TerminalKeys::new(session.release_events());
    let delivering = keys.delivering();
    let mut tracker = KeyTracker::new(session.release_events());

    let mut slot = LoopSlot::new();
    slot.start(engine, IntervalTicks::new(config.tick_rate_hz), surface, keys)
        .await;
    let mut running = true;
    let mut parked: Option<Outcome> = None;

    let mut events = EventStream::new();
    let mut sweep = tokio::time::interval(RELEASE_SWEEP);

    loop {
        tokio::select! {
            finished = slot.finished(), if running => {
                running = false;
                let Some(outcome) = finished else { break };
                let outcome = outcome?;
                if outcome.reason == LoopEndReason::GameOver {
                    parked = Some(outcome);
                } else {
                    break;
                }
            }
            event = events.next() => {
                let Some(event) = event else { break };
                let Event::Key(key) = event? else { continue };
                match keymap::classify(&key) {
                    HostKey::Game(code) => {
                        if running && delivering.load(Ordering::SeqCst)
                            && let Some(cmd) = tracker.on_key(code, key.kind, Instant::now())
                        {
                            slot.send(cmd);
                        }
                    },
                    HostKey::Quit if key.kind != KeyEventKind::Release => {
                        if running {
                            slot.send(LoopCommand::Exit);
                        } else {
                            if let Some(mut outcome) = parked.take() {
                                outcome.engine.exit();
                            }
                            break;
                        }
                    },
                    HostKey::Restart if key.kind != KeyEventKind::Release => {
                        let Some(outcome) = parked.take() else { continue };
                        let Some(keys) = outcome.keys else { break };
                        let mut engine = outcome.engine;
                        if engine.restart() {
                            tracker.clear();
                            slot.start(engine, IntervalTicks::new(config.tick_rate_hz), outcome.surface, keys)
                                .await;
                            running = true;
                        }
                    },
                    _ => {},
                }
            }
            _ = sweep.tick() => {
                for cmd in tracker.expire(Instant::now()) {
                    slot.send(cmd);
                }
            }
        }
    }

    if let Some(Ok(outcome)) = slot.stop().await {
        tracing::debug!(reason = ?outcome.reason, "Tick loop stopped on shutdown");
    }
    drop(session);
    Ok(())
}
