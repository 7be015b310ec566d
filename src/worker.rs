// Generation worker module
// Single background queue that runs generation jobs one at a time

use crate::display::DisplaySource;
use crate::error::{Error, Result};
use crate::generator::{GenerationReport, Generator, WallpaperRequest};
use log::{debug, warn};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

type Completion = Box<dyn FnOnce(Result<GenerationReport>) + Send>;

struct Job {
    request: WallpaperRequest,
    completion: Completion,
}

/// Owns the generation thread; jobs run in submission order, never overlapping
pub struct GenerationWorker {
    tx: Option<mpsc::Sender<Job>>,
    handle: Option<JoinHandle<()>>,
}

impl GenerationWorker {
    pub fn spawn(generator: Generator, displays: Arc<dyn DisplaySource>) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<Job>();

        let handle = thread::Builder::new()
            .name("generation".to_string())
            .spawn(move || {
                for job in rx {
                    // Displays are re-read per job so hotplug is picked up
                    let result = displays
                        .displays()
                        .and_then(|targets| generator.generate(&job.request, &targets));
                    (job.completion)(result);
                }
                debug!("Generation queue closed");
            })
            .map_err(|e| Error::io("spawn generation worker", e))?;

        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    /// Queue a job; `completion` runs on the worker thread with the result
    pub fn submit<F>(&self, request: WallpaperRequest, completion: F)
    where
        F: FnOnce(Result<GenerationReport>) + Send + 'static,
    {
        let job = Job {
            request,
            completion: Box::new(completion),
        };
        let Some(tx) = &self.tx else {
            (job.completion)(Err(Error::WorkerStopped));
            return;
        };
        if let Err(mpsc::SendError(job)) = tx.send(job) {
            warn!("Generation worker is gone; dropping job");
            (job.completion)(Err(Error::WorkerStopped));
        }
    }

    /// Queue a job and wait for its result
    pub fn generate_blocking(&self, request: WallpaperRequest) -> Result<GenerationReport> {
        let (done_tx, done_rx) = mpsc::sync_channel(1);
        self.submit(request, move |result| {
            let _ = done_tx.send(result);
        });
        done_rx
            .recv()
            .unwrap_or_else(|_| Err(Error::WorkerStopped))
    }
}

impl Drop for GenerationWorker {
    fn drop(&mut self) {
        // Closing the channel lets the thread drain its queue and exit
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Generation worker panicked");
            }
        }
    }
}
