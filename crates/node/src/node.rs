//! The node context: owns the sensors, the store, the clock, the latest
//! readings and the task schedule, and dispatches due tasks one at a time.

use std::time::Duration;

use tracing::{debug, info};

use crate::activity::{ActivityKind, ActivityLog};
use crate::calibration::Calibration;
use crate::clock::Clock;
use crate::path::RecordPath;
use crate::remote::RemoteStore;
use crate::repair::{repair_record, RepairReport};
use crate::sampling::{sample_climate, sample_light, sample_soil, SOIL_WINDOW};
use crate::scheduler::Scheduler;
use crate::sensors::SensorSource;
use crate::snapshot::push_snapshot;
use crate::state::SensorState;
use crate::sync::{sync_telemetry, SyncStrategy};
use crate::ticker::Repeat;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Soil,
    Light,
    Climate,
    Sync,
    Snapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intervals {
    pub soil_ms: u64,
    pub light_ms: u64,
    pub climate_ms: u64,
    pub sync_ms: u64,
    pub snapshot_ms: u64,
}

impl Default for Intervals {
    fn default() -> Self {
        Self {
            soil_ms: 2_000,
            light_ms: 2_000,
            climate_ms: 2_000,
            sync_ms: 5_000,
            snapshot_ms: 300_000,
        }
    }
}

/// Which sensor groups are fitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorSet {
    pub soil: bool,
    pub light: bool,
    pub climate: bool,
}

impl Default for SensorSet {
    fn default() -> Self {
        Self {
            soil: true,
            light: true,
            climate: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeSettings {
    pub record: RecordPath,
    /// Written to `plantID` when the record lacks one.
    pub plant_id: String,
    pub calibration: Calibration,
    pub soil_window: usize,
    pub sensors: SensorSet,
    pub intervals: Intervals,
    pub strategy: SyncStrategy,
    /// Upper bound on one idle sleep in [`Node::run_forever`].
    pub max_idle_ms: u64,
}

impl NodeSettings {
    pub fn new(record: RecordPath, calibration: Calibration) -> Self {
        Self {
            plant_id: record.plant().to_string(),
            record,
            calibration,
            soil_window: SOIL_WINDOW,
            sensors: SensorSet::default(),
            intervals: Intervals::default(),
            strategy: SyncStrategy::default(),
            max_idle_ms: 50,
        }
    }
}

pub struct Node<S, R, C> {
    settings: NodeSettings,
    source: S,
    store: R,
    clock: C,
    state: SensorState,
    scheduler: Scheduler<TaskKind>,
    activity: ActivityLog,
}

impl<S, R, C> Node<S, R, C>
where
    S: SensorSource,
    R: RemoteStore,
    C: Clock,
{
    pub fn new(settings: NodeSettings, source: S, store: R, clock: C) -> Self {
        let mut scheduler = Scheduler::new();
        let iv = settings.intervals;
        let tasks = [
            (settings.sensors.soil, iv.soil_ms, TaskKind::Soil),
            (settings.sensors.light, iv.light_ms, TaskKind::Light),
            (settings.sensors.climate, iv.climate_ms, TaskKind::Climate),
            (true, iv.sync_ms, TaskKind::Sync),
            (true, iv.snapshot_ms, TaskKind::Snapshot),
        ];
        for (enabled, interval_ms, kind) in tasks {
            if enabled {
                scheduler.register_task(interval_ms, Repeat::Forever, kind);
            }
        }

        Self {
            settings,
            source,
            store,
            clock,
            state: SensorState::new(),
            scheduler,
            activity: ActivityLog::new(),
        }
    }

    /// Repair the record schema, then arm every task at the current time.
    pub async fn bootstrap(&mut self) -> RepairReport {
        let report = repair_record(&self.store, &self.settings.record, &self.settings.plant_id).await;
        let now = self.clock.now_ms();
        for (name, value) in &report.written {
            self.activity.push(
                now,
                ActivityKind::Repair,
                format!("{} = {value}", self.settings.record.field(name)),
            );
        }
        for name in &report.failed {
            self.activity.push(
                now,
                ActivityKind::WriteFailed,
                self.settings.record.field(name),
            );
        }

        self.scheduler.start(self.clock.now_ms());
        info!(
            record = %self.settings.record,
            tasks = self.scheduler.len(),
            strategy = ?self.settings.strategy,
            "scheduler started"
        );
        report
    }

    /// Run every task that is due now, in registration order.  Returns how
    /// many ran.
    pub async fn run_once(&mut self) -> usize {
        let due = self.scheduler.poll(self.clock.now_ms());
        for &task in &due {
            self.dispatch(task).await;
        }
        due.len()
    }

    /// Run tasks forever, sleeping until the next deadline between rounds.
    pub async fn run_forever(&mut self) {
        let max_idle = self.settings.max_idle_ms;
        loop {
            self.run_once().await;
            let now = self.clock.now_ms();
            let wait = self
                .scheduler
                .next_deadline()
                .map_or(max_idle, |d| d.saturating_sub(now))
                .min(max_idle);
            tokio::time::sleep(Duration::from_millis(wait)).await;
        }
    }

    async fn dispatch(&mut self, task: TaskKind) {
        let now = self.clock.now_ms();
        debug!(?task, now, "dispatch");
        match task {
            TaskKind::Soil => {
                match sample_soil(
                    &mut self.source,
                    &mut self.state,
                    &self.settings.calibration,
                    self.settings.soil_window,
                    now,
                ) {
                    Ok(r) => self.activity.push(
                        now,
                        ActivityKind::Sample,
                        format!("soil raw={} percent={}", r.raw, r.percent),
                    ),
                    Err(e) => self
                        .activity
                        .push(now, ActivityKind::SensorFault, format!("soil: {e}")),
                }
            }
            TaskKind::Light => match sample_light(&mut self.source, &mut self.state, now) {
                Ok(()) => self
                    .activity
                    .push(now, ActivityKind::Sample, "light".to_string()),
                Err(e) => self
                    .activity
                    .push(now, ActivityKind::SensorFault, format!("light: {e}")),
            },
            TaskKind::Climate => match sample_climate(&mut self.source, &mut self.state, now) {
                Ok(()) => self
                    .activity
                    .push(now, ActivityKind::Sample, "climate".to_string()),
                Err(e) => self
                    .activity
                    .push(now, ActivityKind::SensorFault, format!("climate: {e}")),
            },
            TaskKind::Sync => {
                let telemetry = self.state.telemetry();
                let report = sync_telemetry(
                    &self.store,
                    &self.settings.record,
                    &telemetry,
                    self.settings.strategy,
                )
                .await;
                for (path, value) in report.written {
                    self.activity
                        .push(now, ActivityKind::Write, format!("{path} = {value}"));
                }
                for (path, e) in report.failed {
                    self.activity
                        .push(now, ActivityKind::WriteFailed, format!("{path}: {e}"));
                }
            }
            TaskKind::Snapshot => {
                let entry = self.state.telemetry();
                match push_snapshot(&self.store, &self.settings.record, &entry).await {
                    Ok(id) => self.activity.push(now, ActivityKind::Snapshot, id),
                    Err(e) => self
                        .activity
                        .push(now, ActivityKind::SnapshotFailed, e.to_string()),
                }
            }
        }
    }

    pub fn settings(&self) -> &NodeSettings {
        &self.settings
    }

    pub fn state(&self) -> &SensorState {
        &self.state
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    pub fn scheduler(&self) -> &Scheduler<TaskKind> {
        &self.scheduler
    }

    pub fn store(&self) -> &R {
        &self.store
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

// ===========================================================================
// Tests
// ===========================================================================
