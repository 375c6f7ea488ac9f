//! Session actor: a Tokio task that owns a [`DungeonSession`].
//!
//! The actor is the only place the session is mutated. The outside world
//! talks to it through a [`SessionHandle`] and listens to what happened on
//! an event channel. Growth batches are spread over scheduler turns: the
//! actor places one chain, yields, and serves pending commands before the
//! next chain.

use delve_clock::GrowthClock;
use delve_graph::{EntityId, TaskProgress, TaskSlotId};
use delve_placement::Removal;
use tokio::sync::{mpsc, oneshot};

use crate::{
    BatchReport, DelveError, DungeonSession, PlacedChain, PlayerLocator, RoomCleared,
    SessionOutcome, SessionSnapshot, StepOutcome, TemplateSource,
};

/// Something the session did on its own, reported to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ChainPlaced(PlacedChain),
    BatchFinished(BatchReport),
    RoomCleared(RoomCleared),
    Ended {
        outcome: SessionOutcome,
        removal: Removal,
    },
}

/// Commands sent to the session actor. Variants carrying a `oneshot`
/// sender expect a reply.
pub(crate) enum SessionCommand {
    TaskCompleted {
        room: EntityId,
        slot: TaskSlotId,
        reply: oneshot::Sender<Result<TaskProgress, DelveError>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    /// Start a batch now instead of waiting for the clock.
    GrowNow,
    End {
        outcome: SessionOutcome,
        reply: oneshot::Sender<Result<Removal, DelveError>>,
    },
}

/// Handle to a running session actor. Cheap to clone.
#[derive(Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Reports a finished task. Completing a room's last task removes the
    /// room before this returns.
    pub async fn task_completed(
        &self,
        room: EntityId,
        slot: TaskSlotId,
    ) -> Result<TaskProgress, DelveError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::TaskCompleted {
                room,
                slot,
                reply: reply_tx,
            })
            .await
            .map_err(|_| DelveError::Unavailable)?;
        reply_rx.await.map_err(|_| DelveError::Unavailable)?
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, DelveError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| DelveError::Unavailable)?;
        reply_rx.await.map_err(|_| DelveError::Unavailable)
    }

    /// Starts a growth batch without waiting for the clock (fire-and-forget).
    pub async fn grow_now(&self) -> Result<(), DelveError> {
        self.sender
            .send(SessionCommand::GrowNow)
            .await
            .map_err(|_| DelveError::Unavailable)
    }

    /// Ends the session and tears the dungeon down to its spawn.
    pub async fn end(&self, outcome: SessionOutcome) -> Result<Removal, DelveError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::End {
                outcome,
                reply: reply_tx,
            })
            .await
            .map_err(|_| DelveError::Unavailable)?;
        reply_rx.await.map_err(|_| DelveError::Unavailable)?
    }
}

/// Spawns the actor for `session`, driven by `clock`.
///
/// The actor runs until every [`SessionHandle`] is dropped. Events are sent
/// on the returned receiver; dropping it is fine.
pub fn spawn_session<S, P>(
    session: DungeonSession<S, P>,
    clock: GrowthClock,
    channel_size: usize,
) -> (SessionHandle, mpsc::UnboundedReceiver<SessionEvent>)
where
    S: TemplateSource + Send + 'static,
    P: PlayerLocator + Send + 'static,
{
    let (cmd_tx, cmd_rx) = mpsc::channel(channel_size.max(1));
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let actor = SessionActor {
        session,
        clock,
        receiver: cmd_rx,
        events: event_tx,
    };
    tokio::spawn(actor.run());
    (SessionHandle { sender: cmd_tx }, event_rx)
}

struct SessionActor<S, P> {
    session: DungeonSession<S, P>,
    clock: GrowthClock,
    receiver: mpsc::Receiver<SessionCommand>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl<S: TemplateSource, P: PlayerLocator> SessionActor<S, P> {
    async fn run(mut self) {
        tracing::info!(spawn = %self.session.spawn(), "session actor started");

        loop {
            let growing = self.session.is_growing();
            tokio::select! {
                biased;

                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },

                tick = self.clock.wait_for_tick(), if !growing => {
                    tracing::trace!(tick = tick.tick, "growth tick");
                    self.session.on_growth_tick();
                }

                // One chain per scheduler turn.
                _ = tokio::task::yield_now(), if growing => self.step(),
            }
        }

        tracing::info!(spawn = %self.session.spawn(), "session actor stopped");
    }

    fn handle(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::TaskCompleted { room, slot, reply } => {
                let result = self.session.report_task_completed(room, slot);
                for cleared in self.session.process_completions() {
                    self.emit(SessionEvent::RoomCleared(cleared));
                }
                let _ = reply.send(result);
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.session.snapshot());
            }
            SessionCommand::GrowNow => {
                self.session.on_growth_tick();
            }
            SessionCommand::End { outcome, reply } => {
                let result = self.session.end(outcome);
                if let Ok(removal) = &result {
                    self.clock.pause();
                    self.emit(SessionEvent::Ended {
                        outcome,
                        removal: removal.clone(),
                    });
                }
                let _ = reply.send(result);
            }
        }
    }

    fn step(&mut self) {
        match self.session.step_growth() {
            StepOutcome::Placed(chain) => self.emit(SessionEvent::ChainPlaced(chain)),
            StepOutcome::BatchDone(report) => self.emit(SessionEvent::BatchFinished(report)),
            StepOutcome::Idle => {}
        }
    }

    fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }
}
