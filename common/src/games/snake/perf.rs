use std::sync::Mutex;
use std::time::Duration;

use ringbuffer::{AllocRingBuffer, RingBuffer};

use crate::{SessionId, log};

pub const PERF_SAMPLE_CAPACITY: usize = 64;

/// Where the time of one accepted move went.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TurnTimings {
    pub engine: Duration,
    pub render: Duration,
    pub display: Duration,
    pub total: Duration,
}

impl TurnTimings {
    pub fn frame_latency(&self) -> Duration {
        self.engine + self.render
    }

    /// Frames per second the engine alone could sustain.
    pub fn theoretical_fps(&self) -> Option<u64> {
        let nanos = self.frame_latency().as_nanos();
        (nanos > 0).then(|| (1_000_000_000 / nanos) as u64)
    }
}

pub trait TurnInstrumentation: Send + Sync {
    fn record(&self, session_id: &SessionId, timings: TurnTimings);
}

/// Keeps the most recent turns and logs each one next to the rolling average.
pub struct PerfLog {
    samples: Mutex<AllocRingBuffer<TurnTimings>>,
}

impl PerfLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Mutex::new(AllocRingBuffer::new(capacity.max(1))),
        }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn average(&self) -> Option<TurnTimings> {
        let samples = self.samples.lock().ok()?;
        let count = samples.len() as u32;
        if count == 0 {
            return None;
        }

        let sum = samples.iter().fold(TurnTimings::default(), |acc, t| TurnTimings {
            engine: acc.engine + t.engine,
            render: acc.render + t.render,
            display: acc.display + t.display,
            total: acc.total + t.total,
        });

        Some(TurnTimings {
            engine: sum.engine / count,
            render: sum.render / count,
            display: sum.display / count,
            total: sum.total / count,
        })
    }
}

impl Default for PerfLog {
    fn default() -> Self {
        Self::new(PERF_SAMPLE_CAPACITY)
    }
}

impl TurnInstrumentation for PerfLog {
    fn record(&self, session_id: &SessionId, timings: TurnTimings) {
        if let Ok(mut samples) = self.samples.lock() {
            samples.enqueue(timings);
        }

        log!(
            "[session:{}] turn: engine {:?}, render {:?}, frame {:?} ({} fps in theory), display {:?}, total {:?}",
            session_id,
            timings.engine,
            timings.render,
            timings.frame_latency(),
            timings.theoretical_fps().unwrap_or(0),
            timings.display,
            timings.total
        );

        if let Some(average) = self.average() {
            log!(
                "[session:{}] average over {} turns: frame {:?}, display {:?}, total {:?}",
                session_id,
                self.sample_count(),
                average.frame_latency(),
                average.display,
                average.total
            );
        }
    }
}
