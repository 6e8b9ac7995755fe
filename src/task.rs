//! Background execution for network calls with single-consumer delivery.
//!
//! The interactive context owns a [`TaskRunner`]. It starts work with
//! [`TaskRunner::spawn`] and later drains [`TaskEvent`]s with
//! [`TaskRunner::try_next`] (from a UI frame) or [`TaskRunner::next`]
//! (from async code). Workers only produce a value; all state changes happen
//! where the events are drained.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::error::MonitorError;

/// Logical slot a task occupies. One task per slot at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskSlot {
    Login,
    LogFetch,
    RawRequest,
}

impl fmt::Display for TaskSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskSlot::Login => "login",
            TaskSlot::LogFetch => "log fetch",
            TaskSlot::RawRequest => "raw request",
        })
    }
}

#[derive(Debug)]
pub enum TaskEvent<T> {
    /// Emitted before the work starts; drives the busy indicator.
    Started(TaskSlot),
    /// The task's output.
    Finished { slot: TaskSlot, output: T },
    /// The task panicked; no output will follow.
    Aborted { slot: TaskSlot, reason: String },
}

impl<T> TaskEvent<T> {
    pub fn slot(&self) -> TaskSlot {
        match self {
            TaskEvent::Started(slot) => *slot,
            TaskEvent::Finished { slot, .. } | TaskEvent::Aborted { slot, .. } => *slot,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskEvent::Started(_))
    }
}

/// Runs futures on a tokio runtime and hands their results back over a
/// channel in completion order.
///
/// Starting a second task on a busy slot is rejected with
/// [`MonitorError::SlotBusy`]; nothing is queued.
pub struct TaskRunner<T> {
    handle: Handle,
    tx: mpsc::UnboundedSender<TaskEvent<T>>,
    rx: mpsc::UnboundedReceiver<TaskEvent<T>>,
    in_flight: HashSet<TaskSlot>,
}

impl<T: Send + 'static> TaskRunner<T> {
    pub fn with_handle(handle: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            handle,
            tx,
            rx,
            in_flight: HashSet::new(),
        }
    }

    /// Use the runtime this is called from.
    pub fn current() -> Result<Self, MonitorError> {
        let handle = Handle::try_current()
            .map_err(|e| MonitorError::config(format!("no tokio runtime: {}", e)))?;
        Ok(Self::with_handle(handle))
    }

    pub fn is_busy(&self, slot: TaskSlot) -> bool {
        self.in_flight.contains(&slot)
    }

    pub fn any_busy(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn spawn<F>(&mut self, slot: TaskSlot, work: F) -> Result<(), MonitorError>
    where
        F: Future<Output = T> + Send + 'static,
    {
        if !self.in_flight.insert(slot) {
            return Err(MonitorError::SlotBusy(slot));
        }
        let _ = self.tx.send(TaskEvent::Started(slot));

        let tx = self.tx.clone();
        let inner = self.handle.spawn(work);
        self.handle.spawn(async move {
            let event = match inner.await {
                Ok(output) => TaskEvent::Finished { slot, output },
                Err(e) => TaskEvent::Aborted {
                    slot,
                    reason: e.to_string(),
                },
            };
            // Receiver gone means the owner shut down; nothing to deliver to.
            let _ = tx.send(event);
        });
        Ok(())
    }

    /// Non-blocking drain step for a UI frame.
    pub fn try_next(&mut self) -> Option<TaskEvent<T>> {
        let event = self.rx.try_recv().ok()?;
        self.settle(&event);
        Some(event)
    }

    /// Wait for the next event. `None` only when nothing is in flight and
    /// no events are pending.
    pub async fn next(&mut self) -> Option<TaskEvent<T>> {
        let event = match self.rx.try_recv() {
            Ok(event) => event,
            Err(_) if self.in_flight.is_empty() => return None,
            Err(_) => self.rx.recv().await?,
        };
        self.settle(&event);
        Some(event)
    }

    fn settle(&mut self, event: &TaskEvent<T>) {
        if event.is_terminal() {
            self.in_flight.remove(&event.slot());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::oneshot;

    use super::*;

    async fn terminal(runner: &mut TaskRunner<u32>) -> TaskEvent<u32> {
        loop {
            let event = runner.next().await.expect("event");
            if event.is_terminal() {
                return event;
            }
        }
    }

    #[tokio::test]
    async fn started_then_exactly_one_finished() {
        let mut runner = TaskRunner::current().unwrap();
        runner.spawn(TaskSlot::Login, async { 7 }).unwrap();
        assert!(runner.is_busy(TaskSlot::Login));

        assert!(matches!(runner.next().await, Some(TaskEvent::Started(TaskSlot::Login))));
        match runner.next().await {
            Some(TaskEvent::Finished { slot, output }) => {
                assert_eq!(slot, TaskSlot::Login);
                assert_eq!(output, 7);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!runner.is_busy(TaskSlot::Login));
        assert!(runner.next().await.is_none());
    }

    #[tokio::test]
    async fn busy_slot_rejects_second_task() {
        let mut runner = TaskRunner::current().unwrap();
        let (release, gate) = oneshot::channel::<()>();
        runner
            .spawn(TaskSlot::LogFetch, async move {
                let _ = gate.await;
                1
            })
            .unwrap();

        assert_eq!(
            runner.spawn(TaskSlot::LogFetch, async { 2 }),
            Err(MonitorError::SlotBusy(TaskSlot::LogFetch))
        );
        // Other slots are independent.
        runner.spawn(TaskSlot::Login, async { 3 }).unwrap();

        let _ = release.send(());
        let mut outputs = Vec::new();
        while let Some(event) = runner.next().await {
            if let TaskEvent::Finished { output, .. } = event {
                outputs.push(output);
            }
        }
        outputs.sort();
        assert_eq!(outputs, [1, 3]);

        runner.spawn(TaskSlot::LogFetch, async { 4 }).unwrap();
        assert!(matches!(terminal(&mut runner).await, TaskEvent::Finished { output: 4, .. }));
    }

    #[tokio::test]
    async fn delivery_follows_completion_order() {
        let mut runner = TaskRunner::current().unwrap();
        let (release_slow, slow_gate) = oneshot::channel::<()>();
        runner
            .spawn(TaskSlot::Login, async move {
                let _ = slow_gate.await;
                1
            })
            .unwrap();
        runner.spawn(TaskSlot::LogFetch, async { 2 }).unwrap();

        let first = terminal(&mut runner).await;
        assert_eq!(first.slot(), TaskSlot::LogFetch);

        let _ = release_slow.send(());
        let second = terminal(&mut runner).await;
        assert_eq!(second.slot(), TaskSlot::Login);
    }

    #[tokio::test]
    async fn panicking_task_still_terminates_slot() {
        let mut runner: TaskRunner<u32> = TaskRunner::current().unwrap();
        runner
            .spawn(TaskSlot::RawRequest, async {
                if true {
                    panic!("boom");
                }
                0
            })
            .unwrap();

        assert!(matches!(
            terminal(&mut runner).await,
            TaskEvent::Aborted { slot: TaskSlot::RawRequest, .. }
        ));
        assert!(!runner.is_busy(TaskSlot::RawRequest));
    }

    #[test]
    fn sync_owner_polls_with_try_next() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let mut runner = TaskRunner::with_handle(rt.handle().clone());
        runner.spawn(TaskSlot::Login, async { 9u32 }).unwrap();

        let mut finished = None;
        for _ in 0..200 {
            match runner.try_next() {
                Some(TaskEvent::Finished { output, .. }) => {
                    finished = Some(output);
                    break;
                }
                Some(_) => {}
                None => std::thread::sleep(Duration::from_millis(5)),
            }
        }
        assert_eq!(finished, Some(9));
        assert!(!runner.any_busy());
    }
}
