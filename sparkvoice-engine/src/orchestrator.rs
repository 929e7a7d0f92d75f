use parking_lot::Mutex;
use sparkvoice_core::config::{ControllerConfig, photo_position_altitude};
use sparkvoice_core::error::CommandError;
use sparkvoice_core::intent::Intent;
use sparkvoice_core::types::{CommandId, CommandStep, Subsystem, TimelineAction};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::camera_mode::CameraModeManager;
use crate::events::{ControllerEvent, EventSink};
use crate::traits::{CameraService, FlightService, MissionService};
use crate::vehicle::VehicleLink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Started,
    Succeeded,
    Failed,
}

/// One dispatched intent. Not retained after its completion is reported.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandExecution {
    pub id: CommandId,
    pub intent: Intent,
    pub state: ExecutionState,
    pub error: Option<CommandError>,
}

impl CommandExecution {
    pub fn start(intent: Intent) -> Self {
        Self {
            id: CommandId::new(),
            intent,
            state: ExecutionState::Started,
            error: None,
        }
    }

    pub fn complete(mut self, result: Result<(), CommandError>) -> Self {
        match result {
            Ok(()) => self.state = ExecutionState::Succeeded,
            Err(e) => {
                self.state = ExecutionState::Failed;
                self.error = Some(e);
            }
        }
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.state != ExecutionState::Started
    }
}

struct Inner {
    link: VehicleLink,
    camera_modes: CameraModeManager,
    events: EventSink,
    cfg: ControllerConfig,
}

/// Executes classified intents against the connected vehicle.
///
/// Commands run one at a time on a single worker, in the order they were dispatched.
#[derive(Clone)]
pub struct CommandOrchestrator {
    inner: Arc<Inner>,
    queue: mpsc::UnboundedSender<CommandExecution>,

    // Taken by the first `handle` call, which starts the worker.
    pending_worker: Arc<Mutex<Option<mpsc::UnboundedReceiver<CommandExecution>>>>,
}

impl CommandOrchestrator {
    pub fn new(
        cfg: ControllerConfig,
        link: VehicleLink,
        camera_modes: CameraModeManager,
        events: EventSink,
    ) -> Self {
        let (queue, rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                link,
                camera_modes,
                events,
                cfg,
            }),
            queue,
            pending_worker: Arc::new(Mutex::new(Some(rx))),
        }
    }

    /// Fire-and-forget dispatch. `CommandStarted` is emitted before this returns; exactly one
    /// `CommandCompleted` follows once the action sequence reaches a terminal outcome.
    ///
    /// Must be called from within a tokio runtime.
    pub fn handle(&self, intent: Intent) -> CommandId {
        let execution = CommandExecution::start(intent);
        let id = execution.id;

        log::info!("command {id} started: {intent}");
        self.inner
            .events
            .emit(ControllerEvent::CommandStarted { id, intent });

        if let Some(rx) = self.pending_worker.lock().take() {
            tokio::spawn(run_worker(self.inner.clone(), rx));
        }
        if let Err(mpsc::error::SendError(execution)) = self.queue.send(execution) {
            // Only possible if the worker panicked; still report the outcome.
            log::error!("command worker gone; dropping {id}");
            self.inner.finish(execution.complete(Err(CommandError::Unavailable(
                Subsystem::Vehicle,
            ))));
        }

        id
    }
}

async fn run_worker(inner: Arc<Inner>, mut rx: mpsc::UnboundedReceiver<CommandExecution>) {
    while let Some(execution) = rx.recv().await {
        let result = inner.execute(execution.intent).await;
        inner.finish(execution.complete(result));
    }
    log::debug!("command worker stopped");
}

impl Inner {
    fn finish(&self, execution: CommandExecution) {
        let CommandExecution {
            id, intent, error, ..
        } = execution;
        match &error {
            None => log::info!("command {id} completed: {intent}"),
            Some(e) => log::warn!("command {id} failed: {intent}: {e}"),
        }
        self.events
            .emit(ControllerEvent::CommandCompleted { id, intent, error });
    }

    async fn execute(&self, intent: Intent) -> Result<(), CommandError> {
        match intent {
            Intent::TakeOff => {
                let flight = self.flight()?;
                flight
                    .start_takeoff()
                    .await
                    .map_err(|source| CommandError::Rejected {
                        step: CommandStep::Takeoff,
                        source,
                    })
            }
            Intent::Land => {
                let flight = self.flight()?;
                flight
                    .start_landing()
                    .await
                    .map_err(|source| CommandError::Rejected {
                        step: CommandStep::Landing,
                        source,
                    })
            }
            Intent::TakePhoto => self.take_photo().await,
            Intent::PhotoPosition => self.run_photo_position().await,
        }
    }

    async fn take_photo(&self) -> Result<(), CommandError> {
        let camera = self.camera()?;
        let mut lease = self.camera_modes.acquire(camera.clone()).await;

        // Never capture against an unconfirmed mode.
        lease
            .switch_to(self.cfg.photo_mode)
            .await
            .map_err(|source| CommandError::Rejected {
                step: CommandStep::SetCameraMode,
                source,
            })?;

        camera
            .start_capture()
            .await
            .map_err(|source| CommandError::Rejected {
                step: CommandStep::Capture,
                source,
            })
    }

    /// Take off, climb, take one photo, scheduled on the mission timeline.
    async fn run_photo_position(&self) -> Result<(), CommandError> {
        let mission = self.mission()?;
        let current = self.link.flight().and_then(|f| f.current_altitude());
        let meters = photo_position_altitude(current, &self.cfg.flight);
        log::info!("photo position: current altitude {current:?}, target {meters:.1} m");

        mission.stop_timeline().await;
        mission.unschedule_all().await;

        let actions = [
            TimelineAction::TakeOff,
            TimelineAction::GoToAltitude { meters },
            TimelineAction::ShootPhoto,
        ];
        mission
            .schedule_actions(&actions)
            .await
            .map_err(|source| CommandError::SequenceAborted {
                failed: CommandStep::ScheduleTimeline,
                source,
                skipped: vec![CommandStep::StartTimeline],
            })?;

        mission
            .start_timeline()
            .await
            .map_err(|source| CommandError::Rejected {
                step: CommandStep::StartTimeline,
                source,
            })?;

        // No completion signal from the timeline engine: report success once it had time to
        // get going. This does not mean the routine finished.
        tokio::time::sleep(self.cfg.timeline_completion_delay()).await;
        Ok(())
    }

    fn flight(&self) -> Result<Arc<dyn FlightService>, CommandError> {
        let vehicle = self
            .link
            .current()
            .ok_or(CommandError::Unavailable(Subsystem::Vehicle))?;
        vehicle
            .flight
            .ok_or(CommandError::Unavailable(Subsystem::Flight))
    }

    fn camera(&self) -> Result<Arc<dyn CameraService>, CommandError> {
        let vehicle = self
            .link
            .current()
            .ok_or(CommandError::Unavailable(Subsystem::Vehicle))?;
        vehicle
            .camera
            .ok_or(CommandError::Unavailable(Subsystem::Camera))
    }

    fn mission(&self) -> Result<Arc<dyn MissionService>, CommandError> {
        let vehicle = self
            .link
            .current()
            .ok_or(CommandError::Unavailable(Subsystem::Vehicle))?;
        vehicle
            .mission
            .ok_or(CommandError::Unavailable(Subsystem::Mission))
    }
}
