// Copyright (c) Aptos
// SPDX-License-Identifier: Apache-2.0

use std::any::Any;
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Write};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::time::{Duration, Instant};

use crate::event::Event;
use crate::handle::EventSystemHandle;
use crate::mediator::Mediator;

const TIME_ZERO_TOLERANCE: f64 = 0.0;

/// One recorded delivery: the virtual-clock second the event was scheduled at, and the
/// event itself. JSON-serialized one per line.
#[derive(Serialize, Deserialize)]
struct RecordedEvent<E> {
    fire_at: f64,
    event: E,
}

/// Interchangeable backend for `DelayedEventMediator::execute`. Swapping the executor
/// is how a node moves between `instant`, `record` and `replay` run modes without the
/// Sync/Round layers knowing the difference.
pub trait DelayedEventExecutor<E: Event>: Send + Sync {
    fn execute(&mut self, delay_secs: f64, event: E);

    /// Cancels every outstanding timer and returns `(remaining_delay_secs, event)` for
    /// each, so the caller can re-schedule them relative to a freshly captured start
    /// time (used to make an interactive pause transparent to the protocol).
    fn cancel_all(&mut self) -> Vec<(f64, E)>;
}

struct TimerHandle<E> {
    join: tokio::task::JoinHandle<()>,
    fire_at: Instant,
    event: E,
}

/// Live timer, no recording. Used by the `instant` run mode.
pub struct InstantExecutor<E: Event> {
    requeue: EventSystemHandle<E>,
    handles: Vec<TimerHandle<E>>,
}

impl<E: Event> InstantExecutor<E> {
    pub fn new(requeue: EventSystemHandle<E>) -> Self {
        Self {
            requeue,
            handles: Vec::new(),
        }
    }
}

impl<E: Event> DelayedEventExecutor<E> for InstantExecutor<E> {
    fn execute(&mut self, delay_secs: f64, event: E) {
        let fire_at = Instant::now() + Duration::from_secs_f64(delay_secs.max(TIME_ZERO_TOLERANCE));
        let tx = self.requeue.clone();
        let queued_event = event.clone();
        let join = tokio::spawn(async move {
            tokio::time::sleep_until(fire_at).await;
            tx.raise_event(queued_event);
        });
        self.handles.push(TimerHandle {
            join,
            fire_at,
            event,
        });
    }

    fn cancel_all(&mut self) -> Vec<(f64, E)> {
        let now = Instant::now();
        self.handles
            .drain(..)
            .map(|handle| {
                handle.join.abort();
                let remaining = handle.fire_at.saturating_duration_since(now).as_secs_f64();
                (remaining, handle.event)
            })
            .collect()
    }
}

/// Live timer plus an append-only JSON-lines record of every scheduled delivery. Used
/// by the `record` run mode.
pub struct RecorderExecutor<E: Event + Serialize> {
    inner: InstantExecutor<E>,
    origin: Instant,
    sink: Arc<Mutex<std::fs::File>>,
}

impl<E: Event + Serialize> RecorderExecutor<E> {
    pub fn new(requeue: EventSystemHandle<E>, sink: std::fs::File) -> Self {
        Self {
            inner: InstantExecutor::new(requeue),
            origin: Instant::now(),
            sink: Arc::new(Mutex::new(sink)),
        }
    }
}

impl<E: Event + Serialize> DelayedEventExecutor<E> for RecorderExecutor<E> {
    fn execute(&mut self, delay_secs: f64, event: E) {
        if event.is_deterministic() {
            let fire_at = self.origin.elapsed().as_secs_f64() + delay_secs.max(TIME_ZERO_TOLERANCE);
            let record = RecordedEvent {
                fire_at,
                event: event.clone(),
            };
            if let Ok(mut file) = self.sink.lock() {
                if let Ok(line) = serde_json::to_string(&record) {
                    let _ = writeln!(file, "{line}");
                }
            }
        }
        self.inner.execute(delay_secs, event);
    }

    fn cancel_all(&mut self) -> Vec<(f64, E)> {
        self.inner.cancel_all()
    }
}

/// No real timers: pulls the next recorded delivery time from the log, advances a
/// virtual clock to that point, and enqueues immediately. Used by the `replay` run
/// mode; ordering is bit-reproducible because fire times are read verbatim from the
/// log rather than re-derived.
pub struct ReplayerExecutor<E: Event + for<'de> Deserialize<'de>> {
    requeue: EventSystemHandle<E>,
    pending: VecDeque<RecordedEvent<E>>,
    virtual_clock: f64,
}

impl<E: Event + for<'de> Deserialize<'de>> ReplayerExecutor<E> {
    pub fn new(requeue: EventSystemHandle<E>, log: std::fs::File) -> std::io::Result<Self> {
        let reader = BufReader::new(log);
        let mut pending = VecDeque::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(record) = serde_json::from_str::<RecordedEvent<E>>(&line) {
                pending.push_back(record);
            }
        }
        Ok(Self {
            requeue,
            pending,
            virtual_clock: 0.0,
        })
    }

    pub fn virtual_clock(&self) -> f64 {
        self.virtual_clock
    }
}

impl<E: Event + for<'de> Deserialize<'de>> DelayedEventExecutor<E> for ReplayerExecutor<E> {
    fn execute(&mut self, _delay_secs: f64, event: E) {
        if let Some(record) = self.pending.pop_front() {
            self.virtual_clock = record.fire_at;
        }
        self.requeue.raise_event(event);
    }

    fn cancel_all(&mut self) -> Vec<(f64, E)> {
        // Replay has no real timers to cancel; nothing to reschedule.
        Vec::new()
    }
}

/// Schedules delivery of `event` after `delay` wall-seconds via whichever executor the
/// run mode selected.
pub struct DelayedEventMediator<E: Event> {
    executor: Box<dyn DelayedEventExecutor<E>>,
}

impl<E: Event> DelayedEventMediator<E> {
    pub fn new(executor: Box<dyn DelayedEventExecutor<E>>) -> Self {
        Self { executor }
    }

    pub fn execute(&mut self, delay_secs: f64, event: E) {
        self.executor.execute(delay_secs, event);
    }

    /// Cancels outstanding timers and re-schedules each with its original remaining
    /// delay, relative to now. Used to make an interactive pause (the console's ESC
    /// handler, out of scope here) transparent to the protocol.
    pub fn reschedule_remaining(&mut self) {
        for (remaining, event) in self.executor.cancel_all() {
            self.executor.execute(remaining.max(TIME_ZERO_TOLERANCE), event);
        }
    }
}

impl<E: Event> Mediator for DelayedEventMediator<E> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::EventHandler;
    use crate::system::EventSystem;
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};
    use std::io::Seek;
    use std::sync::Mutex as StdMutex;

    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
    struct Ping(u32);

    impl Event for Ping {
        fn kind(&self) -> crate::event::EventKind {
            "ping"
        }
        fn is_deterministic(&self) -> bool {
            true
        }
    }

    struct Recorder(Arc<StdMutex<Vec<Ping>>>);

    #[async_trait]
    impl EventHandler<Ping> for Recorder {
        async fn handle(&self, event: Ping) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(event);
            Ok(())
        }
    }

    fn system_with_recorder() -> (EventSystem<Ping>, Arc<StdMutex<Vec<Ping>>>) {
        let mut system = EventSystem::<Ping>::new();
        let received = Arc::new(StdMutex::new(Vec::new()));
        system.register_handler("ping", Arc::new(Recorder(received.clone())));
        (system, received)
    }

    #[tokio::test(start_paused = true)]
    async fn instant_executor_requeues_after_delay() {
        let (mut system, received) = system_with_recorder();
        let mut mediator = DelayedEventMediator::new(Box::new(InstantExecutor::new(system.handle())));
        mediator.execute(1.0, Ping(7));

        tokio::time::advance(Duration::from_millis(1100)).await;
        system.drain_ready().await;
        assert_eq!(*received.lock().unwrap(), vec![Ping(7)]);
    }

    #[tokio::test(start_paused = true)]
    async fn reschedule_remaining_preserves_event() {
        let (mut system, received) = system_with_recorder();
        let mut mediator = DelayedEventMediator::new(Box::new(InstantExecutor::new(system.handle())));
        mediator.execute(5.0, Ping(1));

        tokio::time::advance(Duration::from_secs(2)).await;
        mediator.reschedule_remaining();

        tokio::time::advance(Duration::from_secs(4)).await;
        system.drain_ready().await;
        assert_eq!(*received.lock().unwrap(), vec![Ping(1)]);
    }

    #[tokio::test]
    async fn recorder_then_replayer_reconstruct_same_order() {
        let mut tmp = tempfile::tempfile().unwrap();

        let (mut system, received) = system_with_recorder();
        {
            let cloned = tmp.try_clone().unwrap();
            let mut recorder = RecorderExecutor::new(system.handle(), cloned);
            recorder.execute(0.0, Ping(1));
            recorder.execute(0.0, Ping(2));
            // let the spawned instant timers fire before reading the file back
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        system.drain_ready().await;
        assert_eq!(*received.lock().unwrap(), vec![Ping(1), Ping(2)]);

        tmp.rewind().unwrap();
        let (mut replay_system, replay_received) = system_with_recorder();
        let mut replayer = ReplayerExecutor::new(replay_system.handle(), tmp).unwrap();
        replayer.execute(0.0, Ping(1));
        replayer.execute(0.0, Ping(2));

        replay_system.drain_ready().await;
        assert_eq!(*replay_received.lock().unwrap(), vec![Ping(1), Ping(2)]);
    }
}
