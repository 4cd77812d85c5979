use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Collapses bursts of values into the last one, emitted once `delay` has passed
/// without a newer value. Dropping the debouncer discards anything still waiting.
pub struct Debouncer<T> {
    input: UnboundedSender<T>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn spawn(delay: Duration) -> (Self, UnboundedReceiver<T>) {
        let (input, input_rx) = mpsc::unbounded_channel();
        let (output, output_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(delay, input_rx, output));
        (Self { input, task }, output_rx)
    }

    /// Returns false once the debouncer has been cancelled.
    pub fn push(&self, value: T) -> bool {
        self.input.send(value).is_ok()
    }

    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<T>(delay: Duration, mut input: UnboundedReceiver<T>, output: UnboundedSender<T>) {
    let mut pending: Option<T> = None;
    loop {
        if pending.is_none() {
            match input.recv().await {
                Some(value) => pending = Some(value),
                None => return,
            }
            continue;
        }

        tokio::select! {
            next = input.recv() => match next {
                Some(value) => pending = Some(value),
                None => return,
            },
            _ = sleep(delay) => {
                if let Some(value) = pending.take() {
                    if output.send(value).is_err() {
                        return;
                    }
                }
            }
        }
    }
}
