/// Effect executor: runs the work `step` asks for on a tokio runtime.
///
/// Provider calls and timers are spawned as tasks. Each task reports back
/// with a `SessionEvent` over an unbounded channel, and the frame loop feeds
/// those into `step` through `pump()`. The session itself never leaves the
/// calling thread.
///
/// Every task carries the attempt it was spawned for. `CancelPending` aborts
/// whatever is still running, but a task that already sent its event cannot
/// be recalled; `step` discards those by attempt.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use super::event::{Effect, Notice, SessionEvent, TimerKind};
use super::level::{GenerationParams, MazeProvider, ProviderError};
use super::session::{AttemptId, GameSession};
use super::step::step;

pub struct SessionRuntime<P: MazeProvider> {
    session: GameSession,
    provider: Arc<P>,
    handle: Handle,
    tx: UnboundedSender<SessionEvent>,
    rx: UnboundedReceiver<SessionEvent>,
    tasks: Vec<JoinHandle<()>>,
    generation_timeout: Duration,
}

impl<P: MazeProvider> SessionRuntime<P> {
    pub fn new(session: GameSession, provider: P, handle: Handle, generation_timeout: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        SessionRuntime {
            session,
            provider: Arc::new(provider),
            handle,
            tx,
            rx,
            tasks: vec![],
            generation_timeout,
        }
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Apply one event and carry out its effects. Returns the notices to show.
    pub fn dispatch(&mut self, event: SessionEvent) -> Vec<Notice> {
        let effects = step(&mut self.session, event);
        let mut notices = vec![];
        for effect in effects {
            self.execute(effect, &mut notices);
        }
        self.tasks.retain(|t| !t.is_finished());
        notices
    }

    /// Feed every event that has arrived from finished tasks.
    pub fn pump(&mut self) -> Vec<Notice> {
        let mut notices = vec![];
        while let Ok(event) = self.rx.try_recv() {
            notices.extend(self.dispatch(event));
        }
        notices
    }

    fn execute(&mut self, effect: Effect, notices: &mut Vec<Notice>) {
        match effect {
            Effect::CancelPending => self.cancel_pending(),
            Effect::RequestMaze { attempt, params } => self.request_maze(attempt, params),
            Effect::Schedule { attempt, timer, after } => self.schedule(attempt, timer, after),
            Effect::Notify(notice) => {
                info!("{}: {}", notice.title(), notice);
                notices.push(notice);
            }
        }
    }

    fn cancel_pending(&mut self) {
        if !self.tasks.is_empty() {
            debug!("aborting {} pending task(s)", self.tasks.len());
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    fn request_maze(&mut self, attempt: AttemptId, params: GenerationParams) {
        let provider = Arc::clone(&self.provider);
        let tx = self.tx.clone();
        let limit = self.generation_timeout;

        let task = self.handle.spawn(async move {
            let event = match tokio::time::timeout(limit, provider.generate(params)).await {
                Ok(Ok(maze_data)) => SessionEvent::MazeGenerated { attempt, maze_data },
                Ok(Err(e)) => failure(attempt, e),
                Err(_) => failure(attempt, ProviderError::Timeout(limit)),
            };
            // Receiver gone means the game is shutting down.
            let _ = tx.send(event);
        });
        self.tasks.push(task);
    }

    fn schedule(&mut self, attempt: AttemptId, timer: TimerKind, after: Duration) {
        let tx = self.tx.clone();
        let task = self.handle.spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(SessionEvent::TimerFired { attempt, timer });
        });
        self.tasks.push(task);
    }
}

impl<P: MazeProvider> Drop for SessionRuntime<P> {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

fn failure(attempt: AttemptId, err: ProviderError) -> SessionEvent {
    warn!("attempt {attempt}: {err}");
    SessionEvent::GenerationFailed { attempt, reason: err.to_string() }
}
