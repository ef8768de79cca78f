//! Frame and timer scheduling for a threaded host
//!
//! Frames are not pushed: the scheduler only remembers the one outstanding
//! request and the host loop collects it on each display tick. Timeouts go
//! to a single timer thread that keeps a deadline heap and posts each token
//! back to the host when it falls due.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{after, never, select, unbounded, Receiver, Sender};
use pendulum_core::{FrameScheduler, FrameToken, TimerToken};
use tracing::trace;

#[derive(Debug, Clone)]
pub struct ThreadScheduler {
    next_token: Arc<AtomicU64>,
    pending: Arc<Mutex<Option<FrameToken>>>,
    timers: Sender<(Instant, TimerToken)>,
}

impl ThreadScheduler {
    /// Spawns the timer thread. It exits once every clone of the scheduler is dropped.
    pub fn new(fired: Sender<TimerToken>) -> Self {
        let (timers, requests) = unbounded();
        thread::spawn(move || run_timers(requests, fired));
        Self {
            next_token: Arc::new(AtomicU64::new(1)),
            pending: Arc::new(Mutex::new(None)),
            timers,
        }
    }

    fn next(&self) -> u64 {
        self.next_token.fetch_add(1, Ordering::Relaxed)
    }

    /// Claim the outstanding frame request, if any
    pub fn take_frame(&self) -> Option<FrameToken> {
        self.pending.lock().ok().and_then(|mut slot| slot.take())
    }

    pub fn has_pending_frame(&self) -> bool {
        self.pending.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }
}

impl FrameScheduler for ThreadScheduler {
    fn request_frame(&mut self) -> FrameToken {
        let token = FrameToken(self.next());
        if let Ok(mut slot) = self.pending.lock() {
            *slot = Some(token);
        }
        token
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        if let Ok(mut slot) = self.pending.lock() {
            if *slot == Some(token) {
                *slot = None;
            }
        }
    }

    fn schedule_timeout(&mut self, delay_secs: f64) -> TimerToken {
        let token = TimerToken(self.next());
        let delay = Duration::try_from_secs_f64(delay_secs).unwrap_or_default();
        let Some(at) = Instant::now().checked_add(delay) else {
            trace!(token = token.0, delay_secs, "Timeout too far ahead, never fires");
            return token;
        };
        if self.timers.send((at, token)).is_err() {
            trace!(token = token.0, "Timer thread gone");
        }
        token
    }
}

fn run_timers(requests: Receiver<(Instant, TimerToken)>, fired: Sender<TimerToken>) {
    let mut deadlines: BinaryHeap<Reverse<(Instant, u64)>> = BinaryHeap::new();

    loop {
        let wake = match deadlines.peek() {
            Some(Reverse((at, _))) => after(at.saturating_duration_since(Instant::now())),
            None => never(),
        };

        select! {
            recv(requests) -> msg => match msg {
                Ok((at, token)) => deadlines.push(Reverse((at, token.0))),
                Err(_) => return,
            },
            recv(wake) -> _ => {
                let now = Instant::now();
                while let Some(&Reverse((at, id))) = deadlines.peek() {
                    if at > now {
                        break;
                    }
                    deadlines.pop();
                    if fired.send(TimerToken(id)).is_err() {
                        trace!(token = id, "Timer fired after host shutdown");
                        return;
                    }
                }
            },
        }
    }
}
