// Debounce module
// Timer-gated scheduler: bursts of inputs collapse into one delayed run

use log::{debug, warn};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

enum Message<T> {
    Schedule(T),
    Cancel,
}

/// Runs `on_fire` with the newest input once no new input arrived for `delay`
///
/// Each `schedule` cancels the pending run and restarts the timer. The
/// callback runs on the debouncer's own thread.
pub struct Debouncer<T: Send + 'static> {
    tx: Option<mpsc::Sender<Message<T>>>,
    handle: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F>(name: &str, delay: Duration, mut on_fire: F) -> std::io::Result<Self>
    where
        F: FnMut(T) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Message<T>>();

        let handle = thread::Builder::new().name(name.to_string()).spawn(move || {
            let mut pending: Option<(T, Instant)> = None;

            loop {
                let deadline = pending.as_ref().map(|(_, deadline)| *deadline);
                let message = match deadline {
                    Some(deadline) => {
                        let now = Instant::now();
                        if deadline <= now {
                            if let Some((value, _)) = pending.take() {
                                on_fire(value);
                            }
                            continue;
                        }
                        rx.recv_timeout(deadline - now)
                    }
                    None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
                };

                match message {
                    Ok(Message::Schedule(value)) => {
                        pending = Some((value, Instant::now() + delay));
                    }
                    Ok(Message::Cancel) => {
                        pending = None;
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!("Debouncer stopped");
        })?;

        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    /// Replace any pending input and restart the delay
    pub fn schedule(&self, value: T) {
        self.send(Message::Schedule(value));
    }

    /// Drop the pending input, if any
    pub fn cancel(&self) {
        self.send(Message::Cancel);
    }

    fn send(&self, message: Message<T>) {
        if let Some(tx) = &self.tx {
            if tx.send(message).is_err() {
                warn!("Debouncer thread is gone");
            }
        }
    }
}

impl<T: Send + 'static> Drop for Debouncer<T> {
    fn drop(&mut self) {
        // Pending input is discarded, not flushed
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl FnMut(u32) + Send + 'static) {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = fired.clone();
        (fired, move |v| sink.lock().unwrap().push(v))
    }

    #[test]
    fn burst_collapses_to_last_value() {
        let (fired, on_fire) = recorder();
        let debouncer = Debouncer::new("test-debounce", Duration::from_millis(60), on_fire).unwrap();

        for v in 1..=5 {
            debouncer.schedule(v);
            thread::sleep(Duration::from_millis(5));
        }
        thread::sleep(Duration::from_millis(250));

        assert_eq!(*fired.lock().unwrap(), vec![5]);
    }

    #[test]
    fn spaced_inputs_each_fire() {
        let (fired, on_fire) = recorder();
        let debouncer = Debouncer::new("test-debounce", Duration::from_millis(20), on_fire).unwrap();

        debouncer.schedule(1);
        thread::sleep(Duration::from_millis(200));
        debouncer.schedule(2);
        thread::sleep(Duration::from_millis(200));

        assert_eq!(*fired.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn cancel_drops_pending() {
        let (fired, on_fire) = recorder();
        let debouncer = Debouncer::new("test-debounce", Duration::from_millis(50), on_fire).unwrap();

        debouncer.schedule(7);
        debouncer.cancel();
        thread::sleep(Duration::from_millis(200));

        assert!(fired.lock().unwrap().is_empty());
    }

    #[test]
    fn drop_discards_pending() {
        let (fired, on_fire) = recorder();
        {
            let debouncer = Debouncer::new("test-debounce", Duration::from_secs(5), on_fire).unwrap();
            debouncer.schedule(1);
        }
        assert!(fired.lock().unwrap().is_empty());
    }
}
