use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use tracing::info;

use crate::session::Session;
use crate::worker::Worker;

/// The live workers of a run, oldest first.
pub struct WorkerPool {
    session: Arc<Session>,
    workers: VecDeque<Worker>,
    next_id: usize,
}

impl WorkerPool {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session, workers: VecDeque::new(), next_id: 1 }
    }

    /// Create a pool running `threads` workers.
    pub fn start(session: Arc<Session>, threads: usize) -> io::Result<Self> {
        let mut pool = Self::new(session);
        for _ in 0..threads.max(1) {
            pool.grow()?;
        }
        Ok(pool)
    }

    /// Start one more worker; returns its id.
    pub fn grow(&mut self) -> io::Result<usize> {
        let id = self.next_id;
        let worker = Worker::spawn(id, Arc::clone(&self.session))?;
        self.next_id += 1;
        self.workers.push_back(worker);
        self.session.config.set_thread_target(self.workers.len());
        info!("Thread #{id:02} started, {} running", self.workers.len());
        Ok(id)
    }

    /// Stop and join the oldest worker; returns its id. The last worker is never removed.
    pub fn shrink_oldest(&mut self) -> Option<usize> {
        if self.workers.len() <= 1 {
            info!("At least one thread must be running");
            return None;
        }
        let worker = self.workers.pop_front()?;
        let id = worker.id();
        worker.stop();
        worker.join();
        self.session.config.set_thread_target(self.workers.len());
        info!("Thread #{id:02} stopped, {} running", self.workers.len());
        Some(id)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn ids(&self) -> Vec<usize> {
        self.workers.iter().map(Worker::id).collect()
    }

    /// Signal every worker first, then join them, so their shutdowns overlap.
    pub fn stop_all(&mut self) {
        for worker in &self.workers {
            worker.stop();
        }
        for worker in self.workers.drain(..) {
            worker.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop_all();
    }
}
