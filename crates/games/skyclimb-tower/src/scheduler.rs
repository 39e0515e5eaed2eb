//! Tick scheduling for a `ClimbEngine`.
//!
//! One tokio task owns the engine, the drawing surface and the key listener
//! guard for the lifetime of a loop. Commands arrive over an unbounded
//! channel and are drained ahead of ticks; a tick runs `frame` (update then
//! render) to completion before anything else touches the engine.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

use skyclimb_core::host::KeySource;
use skyclimb_core::surface::Surface;

use crate::error::EngineError;
use crate::input::ListenerGuard;
use crate::{ClimbEngine, ClimbEvent};

/// Something that paces the loop.
pub trait TickSource: Send + 'static {
    /// Wait for the next tick and return its `dt` in seconds, or `None` once
    /// the source is exhausted.
    fn next_tick(&mut self) -> impl Future<Output = Option<f32>> + Send;
}

/// Wall-clock ticks at a fixed rate. Late ticks are skipped, not bunched.
pub struct IntervalTicks {
    period: Duration,
    interval: Option<Interval>,
}

impl IntervalTicks {
    pub fn new(rate_hz: f32) -> Self {
        let rate = if rate_hz.is_finite() && rate_hz > 0.0 {
            rate_hz
        } else {
            60.0
        };
        Self {
            period: Duration::from_secs_f32(1.0 / rate),
            interval: None,
        }
    }
}

impl TickSource for IntervalTicks {
    async fn next_tick(&mut self) -> Option<f32> {
        let period = self.period;
        // Created on first use so it is bound to the running runtime.
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });
        interval.tick().await;
        Some(period.as_secs_f32())
    }
}

/// A finite run of immediately-ready ticks, for tests and replays.
pub struct FixedTicks {
    remaining: u64,
    dt: f32,
}

impl FixedTicks {
    pub fn new(count: u64, dt: f32) -> Self {
        Self {
            remaining: count,
            dt,
        }
    }
}

impl TickSource for FixedTicks {
    async fn next_tick(&mut self) -> Option<f32> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        // Give queued commands a chance between ticks.
        tokio::task::yield_now().await;
        Some(self.dt)
    }
}

/// Commands sent from the host to a running loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopCommand {
    KeyDown(String),
    KeyUp(String),
    Start,
    /// Call `ClimbEngine::exit` and end the loop.
    Exit,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEndReason {
    Stopped,
    Exited,
    TicksExhausted,
    GameOver,
}

/// Everything a finished loop hands back.
pub struct LoopOutcome<S, K> {
    pub engine: ClimbEngine,
    pub surface: S,
    pub keys: Option<K>,
    pub reason: LoopEndReason,
    pub frames: u64,
}

type LoopResult<S, K> = Result<LoopOutcome<S, K>, EngineError>;

/// Control handle for a spawned loop. Dropping a live handle aborts the task.
pub struct LoopHandle<S, K> {
    tx: mpsc::UnboundedSender<LoopCommand>,
    task: Option<JoinHandle<LoopResult<S, K>>>,
}

impl<S, K> LoopHandle<S, K> {
    /// Queue a command. Returns false once the loop has ended.
    pub fn send(&self, cmd: LoopCommand) -> bool {
        self.tx.send(cmd).is_ok()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|t| t.is_finished())
    }

    /// Wait for the loop to end on its own. `None` if it was already joined.
    pub async fn finished(&mut self) -> Option<LoopResult<S, K>> {
        let task = self.task.as_mut()?;
        let joined = task.await;
        self.task = None;
        Some(joined.unwrap_or_else(|e| Err(EngineError::Loop(e.to_string()))))
    }

    /// Ask the loop to stop and wait until it has.
    pub async fn stop(mut self) -> Option<LoopResult<S, K>> {
        let _ = self.tx.send(LoopCommand::Stop);
        self.finished().await
    }
}

impl<S, K> Drop for LoopHandle<S, K> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Spawn a tick loop on the current tokio runtime.
pub fn spawn_tick_loop<T, S, K>(
    engine: ClimbEngine,
    ticks: T,
    surface: S,
    keys: K,
) -> LoopHandle<S, K>
where
    T: TickSource,
    S: Surface + Send + 'static,
    K: KeySource + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run_tick_loop(engine, ticks, surface, keys, rx));
    LoopHandle {
        tx,
        task: Some(task),
    }
}

async fn run_tick_loop<T, S, K>(
    mut engine: ClimbEngine,
    mut ticks: T,
    mut surface: S,
    keys: K,
    mut rx: mpsc::UnboundedReceiver<LoopCommand>,
) -> LoopResult<S, K>
where
    T: TickSource,
    S: Surface + Send + 'static,
    K: KeySource + 'static,
{
    let guard = match ListenerGuard::acquire(keys) {
        Ok(guard) => guard,
        Err((_, e)) => {
            tracing::warn!(error = %e, "Tick loop could not attach key listeners");
            return Err(e.into());
        },
    };
    tracing::debug!("Tick loop started");

    let mut frames: u64 = 0;
    let reason = loop {
        tokio::select! {
            biased;
            cmd = rx.recv() => {
                match cmd {
                    Some(LoopCommand::KeyDown(code)) => {
                        engine.key_down(&code);
                    },
                    Some(LoopCommand::KeyUp(code)) => {
                        engine.key_up(&code);
                    },
                    Some(LoopCommand::Start) => {
                        engine.start();
                    },
                    Some(LoopCommand::Exit) => {
                        engine.exit();
                        break LoopEndReason::Exited;
                    },
                    Some(LoopCommand::Stop) | None => break LoopEndReason::Stopped,
                }
            }
            dt = ticks.next_tick() => {
                let Some(dt) = dt else {
                    break LoopEndReason::TicksExhausted;
                };
                let events = engine.frame(dt, &mut surface)?;
                frames += 1;
                if events.iter().any(|e| matches!(e, ClimbEvent::RunComplete { .. })) {
                    break LoopEndReason::GameOver;
                }
            }
        }
    };

    let keys = guard.into_inner();
    tracing::info!(?reason, frames, "Tick loop ended");
    Ok(LoopOutcome {
        engine,
        surface,
        keys,
        reason,
        frames,
    })
}

/// Holds at most one running loop.
pub struct LoopSlot<S, K> {
    current: Option<LoopHandle<S, K>>,
}

impl<S, K> Default for LoopSlot<S, K> {
    fn default() -> Self {
        Self { current: None }
    }
}

impl<S, K> LoopSlot<S, K>
where
    S: Surface + Send + 'static,
    K: KeySource + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop and await any previous loop, then spawn a new one. Returns the
    /// previous loop's outcome, if there was one.
    pub async fn start<T: TickSource>(
        &mut self,
        engine: ClimbEngine,
        ticks: T,
        surface: S,
        keys: K,
    ) -> Option<LoopResult<S, K>> {
        let previous = match self.current.take() {
            Some(handle) => handle.stop().await,
            None => None,
        };
        self.current = Some(spawn_tick_loop(engine, ticks, surface, keys));
        previous
    }

    pub fn send(&self, cmd: LoopCommand) -> bool {
        self.current.as_ref().is_some_and(|h| h.send(cmd))
    }

    pub fn is_running(&self) -> bool {
        self.current.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Wait for the current loop to end on its own and clear the slot.
    pub async fn finished(&mut self) -> Option<LoopResult<S, K>> {
        let result = self.current.as_mut()?.finished().await;
        self.current = None;
        result
    }

    pub async fn stop(&mut self) -> Option<LoopResult<S, K>> {
        self.current.take()?.stop().await
    }
}
