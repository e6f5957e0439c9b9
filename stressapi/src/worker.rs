use rand::rngs::ThreadRng;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use stressapi_client::{classify_error, RequestParts};
use tracing::{debug, warn};

use crate::config::Cycle;
use crate::session::Session;
use crate::template::UrlTemplate;

/// How often a paused worker re-checks its flags.
pub const PAUSE_POLL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Running = 0,
    Stopping = 1,
    Stopped = 2,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Running,
            1 => WorkerState::Stopping,
            _ => WorkerState::Stopped,
        }
    }
}

struct Shared {
    stop: AtomicBool,
    state: AtomicU8,
}

/// Handle to one request-issuing thread.
pub struct Worker {
    id: usize,
    shared: Arc<Shared>,
    thread: JoinHandle<()>,
}

impl Worker {
    pub fn spawn(id: usize, session: Arc<Session>) -> io::Result<Self> {
        let shared = Arc::new(Shared {
            stop: AtomicBool::new(false),
            state: AtomicU8::new(WorkerState::Running as u8),
        });
        let looped = Arc::clone(&shared);
        let thread = thread::Builder::new()
            .name(format!("worker-{id:02}"))
            .spawn(move || {
                WorkerLoop { id, session, shared: Arc::clone(&looped) }.run();
                looped.state.store(WorkerState::Stopped as u8, Ordering::Release);
            })?;
        Ok(Self { id, shared, thread })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    /// Ask the loop to exit at its next check. An in-flight request is left to finish.
    pub fn stop(&self) {
        self.shared.stop.store(true, Ordering::Release);
        let _ = self.shared.state.compare_exchange(
            WorkerState::Running as u8,
            WorkerState::Stopping as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        self.thread.thread().unpark();
    }

    pub fn join(self) {
        if self.thread.join().is_err() {
            warn!("Thread #{:02} panicked", self.id);
        }
    }
}

struct WorkerLoop {
    id: usize,
    session: Arc<Session>,
    shared: Arc<Shared>,
}

impl WorkerLoop {
    fn should_stop(&self) -> bool {
        self.shared.stop.load(Ordering::Acquire) || self.session.should_quit()
    }

    fn run(&self) {
        let template = match UrlTemplate::parse(self.session.config.url()) {
            Ok(template) => template,
            Err(e) => {
                warn!("Thread #{:02} cannot start: {e}", self.id);
                return;
            }
        };
        let label = format!("[#{:02}]", self.id);
        let mut rng = rand::thread_rng();
        debug!("Thread #{:02} started", self.id);

        while !self.should_stop() {
            if self.session.is_paused() {
                self.idle(PAUSE_POLL);
                continue;
            }

            let cycle = self.session.config.cycle();
            for _ in 0..cycle.burst {
                if self.should_stop() {
                    break;
                }
                self.fire(&template, &cycle, &label, &mut rng);
            }
            self.idle(cycle.interval);
        }
        debug!("Thread #{:02} stopped", self.id);
    }

    fn fire(&self, template: &UrlTemplate, cycle: &Cycle, label: &str, rng: &mut ThreadRng) {
        let config = &self.session.config;
        let url = template.render(rng);
        let request = RequestParts {
            method: config.method(),
            url: &url,
            headers: config.headers(),
            body: config.body(),
            timeout: cycle.timeout,
        };

        let started = Instant::now();
        let outcome = self.session.client.send(&request);
        let elapsed = started.elapsed();

        let (status, body) = match outcome {
            Ok(reply) => (reply.status, reply.body),
            Err(err) => {
                let classified = classify_error(&err);
                debug!("{label} {} {}", classified.code, classified.message);
                (classified.code, classified.message)
            }
        };

        self.session.stats.record(status, elapsed);
        self.session.log_response(label, status, elapsed, &body);
    }

    /// Sleep up to `duration`, returning early once asked to stop.
    fn idle(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while !self.should_stop() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::park_timeout(deadline - now);
        }
    }
}
