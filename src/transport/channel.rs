use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::SimConfig;
use crate::dynamics::state::Controls;
use crate::error::TransportError;
use crate::gnc::{ParseErrors, SasMode};
use crate::safety::{DestructOutcome, Trigger};
use crate::sim::{SimEvent, SimulationContext};
use super::shared::SharedRegion;
use super::snapshot::Snapshot;

/// Messages accepted by the simulation task, processed in send order.
#[derive(Debug)]
pub enum SimCommand {
    Init { width: f64, ground_y: f64 },
    Step { dt: f64, time_scale: f64, controls: Controls },
    Stage,
    Abort,
    LoadScript { name: String, text: String, reply: oneshot::Sender<Result<usize, ParseErrors>> },
    Activate { reply: oneshot::Sender<bool> },
    Deactivate,
    Pause,
    SetSas(SasMode),
    ArmFault { id: String, trigger: Trigger },
    InjectFault { id: String },
    ResetFault { id: String },
    FtsArm,
    FtsDisarm,
    ManualDestruct { reply: oneshot::Sender<DestructOutcome> },
    Snapshot { reply: oneshot::Sender<Snapshot> },
    Shutdown,
}

// ---------------------------------------------------------------------------
// Simulation task
// ---------------------------------------------------------------------------

/// Move backlogged events onto the queue in order, stopping when it fills.
/// A closed queue has no reader left, so the backlog goes with it.
fn flush(events: &mpsc::Sender<SimEvent>, pending: &mut VecDeque<SimEvent>) {
    while let Some(event) = pending.pop_front() {
        match events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                pending.push_front(event);
                debug!(backlog = pending.len(), "event queue full, holding");
                break;
            }
            Err(TrySendError::Closed(_)) => {
                pending.clear();
                break;
            }
        }
    }
}

/// Apply one command. Returns `false` on shutdown.
fn handle(ctx: &mut SimulationContext, command: SimCommand, pending: &mut VecDeque<SimEvent>) -> bool {
    match command {
        SimCommand::Init { width, ground_y } => ctx.init(width, ground_y),
        SimCommand::Step { dt, time_scale, controls } => {
            let report = ctx.step(dt, time_scale, &controls);
            pending.extend(report.events);
        }
        SimCommand::Stage => ctx.request_stage(),
        SimCommand::Abort => ctx.abort(),
        SimCommand::LoadScript { name, text, reply } => {
            let _ = reply.send(ctx.load_script(&name, &text));
        }
        SimCommand::Activate { reply } => {
            let _ = reply.send(ctx.activate());
        }
        SimCommand::Deactivate => ctx.deactivate(),
        SimCommand::Pause => ctx.toggle_pause(),
        SimCommand::SetSas(mode) => ctx.set_sas(mode),
        SimCommand::ArmFault { id, trigger } => {
            ctx.arm_fault(&id, trigger);
        }
        SimCommand::InjectFault { id } => {
            ctx.inject_fault(&id);
        }
        SimCommand::ResetFault { id } => ctx.reset_fault(&id),
        SimCommand::FtsArm => ctx.fts_arm(),
        SimCommand::FtsDisarm => ctx.fts_disarm(),
        SimCommand::ManualDestruct { reply } => {
            let _ = reply.send(ctx.manual_destruct());
        }
        SimCommand::Snapshot { reply } => {
            let _ = reply.send(ctx.snapshot().clone());
        }
        SimCommand::Shutdown => return false,
    }
    // Commands outside Step can raise events too (abort, destruct, faults).
    pending.extend(ctx.drain_events());
    true
}

/// Command loop. Events the queue cannot take yet wait in a backlog; the
/// loop keeps serving commands while a slot for the oldest one opens.
async fn run(mut ctx: SimulationContext, mut commands: mpsc::Receiver<SimCommand>, events: mpsc::Sender<SimEvent>) {
    let mut pending = VecDeque::new();
    loop {
        flush(&events, &mut pending);
        let command = if pending.is_empty() {
            commands.recv().await
        } else {
            tokio::select! {
                permit = events.reserve() => {
                    match permit {
                        Ok(permit) => {
                            if let Some(event) = pending.pop_front() {
                                permit.send(event);
                            }
                        }
                        Err(_) => pending.clear(),
                    }
                    continue;
                }
                command = commands.recv() => command,
            }
        };
        let Some(command) = command else { break };
        if !handle(&mut ctx, command, &mut pending) {
            break;
        }
    }
    debug!(undelivered = pending.len(), "simulation task stopped");
}

/// Start the simulation on its own task. Must be called inside a tokio
/// runtime.
pub fn spawn(config: SimConfig) -> SimHandle {
    spawn_context(SimulationContext::new(config))
}

pub fn spawn_context(mut ctx: SimulationContext) -> SimHandle {
    let (command_tx, command_rx) = mpsc::channel(ctx.config().command_capacity);
    let (event_tx, event_rx) = mpsc::channel(ctx.config().event_capacity);
    let region = Arc::new(SharedRegion::new(ctx.config().region_capacity));
    ctx.attach_region(region.clone());

    let task = tokio::spawn(run(ctx, command_rx, event_tx));
    SimHandle { commands: command_tx, events: event_rx, region, task: Some(task) }
}

// ---------------------------------------------------------------------------
// Driver-side handle
// ---------------------------------------------------------------------------

pub struct SimHandle {
    commands: mpsc::Sender<SimCommand>,
    events: mpsc::Receiver<SimEvent>,
    region: Arc<SharedRegion>,
    task: Option<JoinHandle<()>>,
}

impl SimHandle {
    /// Queue a command; waits while the queue is full.
    pub async fn send(&self, command: SimCommand) -> Result<(), TransportError> {
        self.commands.send(command).await?;
        Ok(())
    }

    pub async fn init(&self, width: f64, ground_y: f64) -> Result<(), TransportError> {
        self.send(SimCommand::Init { width, ground_y }).await
    }

    pub async fn step(&self, dt: f64, time_scale: f64, controls: Controls) -> Result<(), TransportError> {
        self.send(SimCommand::Step { dt, time_scale, controls }).await
    }

    pub async fn stage(&self) -> Result<(), TransportError> {
        self.send(SimCommand::Stage).await
    }

    pub async fn abort(&self) -> Result<(), TransportError> {
        self.send(SimCommand::Abort).await
    }

    pub async fn load_script(
        &self,
        name: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<Result<usize, ParseErrors>, TransportError> {
        let (reply, rx) = oneshot::channel();
        self.send(SimCommand::LoadScript { name: name.into(), text: text.into(), reply }).await?;
        Ok(rx.await?)
    }

    /// `false` when no script is loaded.
    pub async fn activate(&self) -> Result<bool, TransportError> {
        let (reply, rx) = oneshot::channel();
        self.send(SimCommand::Activate { reply }).await?;
        Ok(rx.await?)
    }

    pub async fn deactivate(&self) -> Result<(), TransportError> {
        self.send(SimCommand::Deactivate).await
    }

    pub async fn pause(&self) -> Result<(), TransportError> {
        self.send(SimCommand::Pause).await
    }

    pub async fn set_sas(&self, mode: SasMode) -> Result<(), TransportError> {
        self.send(SimCommand::SetSas(mode)).await
    }

    pub async fn arm_fault(&self, id: impl Into<String>, trigger: Trigger) -> Result<(), TransportError> {
        self.send(SimCommand::ArmFault { id: id.into(), trigger }).await
    }

    pub async fn inject_fault(&self, id: impl Into<String>) -> Result<(), TransportError> {
        self.send(SimCommand::InjectFault { id: id.into() }).await
    }

    pub async fn reset_fault(&self, id: impl Into<String>) -> Result<(), TransportError> {
        self.send(SimCommand::ResetFault { id: id.into() }).await
    }

    pub async fn fts_arm(&self) -> Result<(), TransportError> {
        self.send(SimCommand::FtsArm).await
    }

    pub async fn fts_disarm(&self) -> Result<(), TransportError> {
        self.send(SimCommand::FtsDisarm).await
    }

    pub async fn manual_destruct(&self) -> Result<DestructOutcome, TransportError> {
        let (reply, rx) = oneshot::channel();
        self.send(SimCommand::ManualDestruct { reply }).await?;
        Ok(rx.await?)
    }

    /// Consistent snapshot taken between ticks.
    pub async fn snapshot(&self) -> Result<Snapshot, TransportError> {
        let (reply, rx) = oneshot::channel();
        self.send(SimCommand::Snapshot { reply }).await?;
        Ok(rx.await?)
    }

    /// Lock-free view written once per tick.
    pub fn region(&self) -> Arc<SharedRegion> {
        self.region.clone()
    }

    pub async fn next_event(&mut self) -> Option<SimEvent> {
        self.events.recv().await
    }

    /// Every event already delivered, without waiting.
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }

    /// Stop the task after the commands already queued and wait for it.
    pub async fn shutdown(mut self) -> Result<(), TransportError> {
        self.send(SimCommand::Shutdown).await?;
        if let Some(task) = self.task.take() {
            task.await.map_err(|_| TransportError::Closed)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::CooldownClock;
    use crate::gnc::ScriptErrorKind;
    use crate::sim::EventKind;
    use crate::vehicle::Kind;

    fn config() -> SimConfig {
        SimConfig { cooldown_clock: CooldownClock::Mission, ..Default::default() }
    }

    #[tokio::test]
    async fn init_publishes_snapshot_and_region() {
        let sim = spawn(config());
        sim.init(2000.0, 1000.0).await.unwrap();
        let snap = sim.snapshot().await.unwrap();
        assert_eq!(snap.vessels.len(), 1);
        assert_eq!(snap.vessels[0].kind, Kind::FullStack);
        assert!(sim.region().generation() >= 1);
        assert_eq!(sim.region().read(), snap);
        sim.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn stage_command_reports_separation() {
        let mut sim = spawn(config());
        sim.init(2000.0, 1000.0).await.unwrap();
        sim.stage().await.unwrap();
        sim.step(0.02, 1.0, Controls::default()).await.unwrap();
        let snap = sim.snapshot().await.unwrap();

        let kinds: Vec<EventKind> = sim.drain_events().into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::StagingS1]);
        assert_eq!(snap.vessels.len(), 2);
        assert_eq!(snap.tracked_vessel().unwrap().kind, Kind::UpperStage);
        sim.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn rejected_script_is_reported() {
        let sim = spawn(config());
        sim.init(2000.0, 1000.0).await.unwrap();
        let errors = sim
            .load_script("bad", "WHEN TIME >= 0 THEN STAGE\nWHEN BOGUS > 1 THEN STAGE")
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(errors.0.len(), 1);
        assert_eq!(errors.0[0].line, 2);
        assert_eq!(errors.0[0].kind, ScriptErrorKind::InvalidCondition);
        assert!(!sim.activate().await.unwrap(), "nothing loaded to run");
        sim.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn destruct_needs_operator_arm() {
        let mut sim = spawn(config());
        sim.init(2000.0, 1000.0).await.unwrap();
        assert_eq!(sim.manual_destruct().await.unwrap(), DestructOutcome::Denied);
        sim.fts_arm().await.unwrap();
        assert_eq!(sim.manual_destruct().await.unwrap(), DestructOutcome::Executed);
        let snap = sim.snapshot().await.unwrap();

        assert!(!snap.vessels[0].active);
        let events = sim.drain_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::FtsDestruct);
        sim.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn full_event_queue_loses_nothing() {
        let mut sim = spawn(config());
        sim.init(2000.0, 1000.0).await.unwrap();
        let burst = config().event_capacity + 44;
        for _ in 0..burst {
            sim.abort().await.unwrap();
        }
        sim.snapshot().await.unwrap();

        let mut received = 0;
        while received < burst {
            let event = tokio::time::timeout(Duration::from_secs(5), sim.next_event())
                .await
                .expect("backlog stalled")
                .unwrap();
            assert_eq!(event.kind, EventKind::Abort);
            received += 1;
        }
        assert!(sim.drain_events().is_empty());
        sim.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn scripted_flight_climbs() {
        let mut sim = spawn(config());
        sim.init(2000.0, 1000.0).await.unwrap();
        let loaded = sim.load_script("hop", crate::gnc::presets::HOP).await.unwrap().unwrap();
        assert_eq!(loaded, 3);
        assert!(sim.activate().await.unwrap());

        let ignite = Controls { ignition: true, ..Default::default() };
        sim.step(0.02, 1.0, ignite).await.unwrap();
        for _ in 0..500 {
            sim.step(0.02, 1.0, Controls::default()).await.unwrap();
        }
        let snap = sim.snapshot().await.unwrap();
        let v = snap.tracked_vessel().unwrap();
        assert!(1000.0 - v.y > 10.0, "altitude {}", 1000.0 - v.y);
        assert!(snap.mission_time > 9.0);
        sim.shutdown().await.unwrap();
    }
}
