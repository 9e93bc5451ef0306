//! Single-flight scheduling of sync passes.
//!
//! Triggers come from user mutations, explicit sync requests and
//! connectivity changes. At most one pass runs at a time; triggers that
//! arrive while a pass is running collapse into one follow-up pass.

use std::sync::Arc;

use tokio::sync::{broadcast, watch, Mutex};

use super::engine::{SyncEngine, SyncReport};
use crate::error::{Error, Result};
use crate::remote::RemoteStore;
use crate::state::SyncStatus;

const EVENT_CAPACITY: usize = 64;

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Running,
    /// A pass is running and one more is owed after it
    RunningWithRetrigger,
}

/// What a trigger did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A new pass with this number started
    Started(u64),
    /// Folded into the follow-up pass with this number
    Queued(u64),
    /// Connectivity is down; nothing was scheduled
    Offline,
}

impl TriggerOutcome {
    pub const fn pass(self) -> Option<u64> {
        match self {
            Self::Started(pass) | Self::Queued(pass) => Some(pass),
            Self::Offline => None,
        }
    }
}

/// Published when a pass ends
#[derive(Debug, Clone)]
pub enum SyncEvent {
    Completed { pass: u64, report: SyncReport },
    Failed { pass: u64, error: Arc<Error> },
    /// A queued pass was dropped because connectivity went away
    Skipped { pass: u64 },
}

impl SyncEvent {
    pub const fn pass(&self) -> u64 {
        match self {
            Self::Completed { pass, .. } | Self::Failed { pass, .. } | Self::Skipped { pass } => {
                *pass
            }
        }
    }
}

#[derive(Debug)]
struct Control {
    phase: SyncPhase,
    online: bool,
    /// Number of the most recently started or skipped pass
    last_pass: u64,
    last_succeeded: Option<bool>,
}

struct Shared<R> {
    engine: SyncEngine<R>,
    control: Mutex<Control>,
    phase: watch::Sender<SyncPhase>,
    events: broadcast::Sender<SyncEvent>,
}

/// Runs sync passes one at a time on the tokio runtime.
pub struct SyncOrchestrator<R> {
    shared: Arc<Shared<R>>,
}

impl<R> Clone for SyncOrchestrator<R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<R: RemoteStore + 'static> SyncOrchestrator<R> {
    pub fn new(engine: SyncEngine<R>, online: bool) -> Self {
        let (phase, _) = watch::channel(SyncPhase::Idle);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                engine,
                control: Mutex::new(Control {
                    phase: SyncPhase::Idle,
                    online,
                    last_pass: 0,
                    last_succeeded: None,
                }),
                phase,
                events,
            }),
        }
    }

    pub fn engine(&self) -> &SyncEngine<R> {
        &self.shared.engine
    }

    /// Request a pass.
    pub async fn trigger(&self) -> TriggerOutcome {
        let mut control = self.shared.control.lock().await;
        if !control.online {
            tracing::debug!("Sync trigger ignored while offline");
            return TriggerOutcome::Offline;
        }

        match control.phase {
            SyncPhase::Idle => {
                control.last_pass += 1;
                let pass = control.last_pass;
                self.set_phase(&mut control, SyncPhase::Running);
                drop(control);

                tokio::spawn(Self::drive(Arc::clone(&self.shared), pass));
                TriggerOutcome::Started(pass)
            }
            SyncPhase::Running => {
                self.set_phase(&mut control, SyncPhase::RunningWithRetrigger);
                tracing::debug!("Sync pass {} running; queued a follow-up", control.last_pass);
                TriggerOutcome::Queued(control.last_pass + 1)
            }
            SyncPhase::RunningWithRetrigger => TriggerOutcome::Queued(control.last_pass + 1),
        }
    }

    /// Connectivity changed. Coming back online triggers a pass.
    pub async fn set_online(&self, online: bool) -> Option<TriggerOutcome> {
        let was_online = {
            let mut control = self.shared.control.lock().await;
            std::mem::replace(&mut control.online, online)
        };

        if was_online == online {
            return None;
        }
        tracing::info!("Connectivity changed: {}", if online { "online" } else { "offline" });
        if online {
            Some(self.trigger().await)
        } else {
            None
        }
    }

    pub async fn is_online(&self) -> bool {
        self.shared.control.lock().await.online
    }

    /// Trigger a pass and wait for the pass that serves this request.
    pub async fn sync_now(&self) -> Result<SyncReport> {
        let mut events = self.subscribe();
        let Some(target) = self.trigger().await.pass() else {
            return Err(Error::Offline);
        };

        loop {
            match events.recv().await {
                Ok(event) if event.pass() < target => {}
                Ok(SyncEvent::Completed { report, .. }) => return Ok(report),
                Ok(SyncEvent::Failed { error, .. }) => return Err(Error::SyncFailed(error)),
                Ok(SyncEvent::Skipped { .. }) => return Err(Error::Offline),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::debug!("Sync waiter lagged by {missed} event(s)");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(Error::SyncAborted("sync orchestrator shut down".into()));
                }
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.shared.events.subscribe()
    }

    /// Follow phase changes
    pub fn watch_phase(&self) -> watch::Receiver<SyncPhase> {
        self.shared.phase.subscribe()
    }

    /// Wait until no pass is running or owed.
    pub async fn wait_idle(&self) {
        let mut phase = self.watch_phase();
        let _ = phase.wait_for(|phase| *phase == SyncPhase::Idle).await;
    }

    pub async fn status(&self) -> SyncStatus {
        let control = self.shared.control.lock().await;
        if !control.online {
            SyncStatus::Offline
        } else if control.phase != SyncPhase::Idle {
            SyncStatus::Syncing
        } else {
            match control.last_succeeded {
                Some(true) => SyncStatus::Synced,
                Some(false) => SyncStatus::Error,
                None => SyncStatus::Idle,
            }
        }
    }

    fn set_phase(&self, control: &mut Control, phase: SyncPhase) {
        control.phase = phase;
        self.shared.phase.send_replace(phase);
    }

    async fn drive(shared: Arc<Shared<R>>, mut pass: u64) {
        let orchestrator = Self { shared };
        loop {
            tracing::debug!("Sync pass {pass} started");
            let result = orchestrator.shared.engine.run().await;

            let (next, skipped) = {
                let mut control = orchestrator.shared.control.lock().await;
                control.last_succeeded = Some(result.is_ok());
                match control.phase {
                    SyncPhase::RunningWithRetrigger if control.online => {
                        control.last_pass += 1;
                        orchestrator.set_phase(&mut control, SyncPhase::Running);
                        (Some(control.last_pass), None)
                    }
                    SyncPhase::RunningWithRetrigger => {
                        control.last_pass += 1;
                        orchestrator.set_phase(&mut control, SyncPhase::Idle);
                        (None, Some(control.last_pass))
                    }
                    _ => {
                        orchestrator.set_phase(&mut control, SyncPhase::Idle);
                        (None, None)
                    }
                }
            };

            let event = match result {
                Ok(report) => SyncEvent::Completed { pass, report },
                Err(error) => {
                    tracing::warn!("Sync pass {pass} failed: {error}");
                    SyncEvent::Failed {
                        pass,
                        error: Arc::new(error),
                    }
                }
            };
            let _ = orchestrator.shared.events.send(event);

            if let Some(pass) = skipped {
                tracing::debug!("Dropped queued sync pass {pass} while offline");
                let _ = orchestrator.shared.events.send(SyncEvent::Skipped { pass });
            }

            match next {
                Some(next) => pass = next,
                None => break,
            }
        }
    }
}
