//! # Frame Pacing
//!
//! The ingress unit owns the frame clock and pulses a bounded(1) "go"
//! channel; the render unit blocks on it. A pulse that finds the channel
//! full is skipped, so a slow render unit never builds a backlog.

use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Milliseconds since the node started, shared by both units.
#[derive(Clone, Copy, Debug)]
pub struct Clock {
    start: Instant,
}

impl Clock {
    /// A clock starting now.
    #[must_use]
    pub fn start() -> Self {
        Self { start: Instant::now() }
    }

    /// Elapsed milliseconds. Wraps after ~49 days.
    #[must_use]
    pub fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

/// Decides when the next frame is due.
#[derive(Clone, Copy, Debug)]
pub struct FramePacer {
    period: Duration,
    next_due: Instant,
}

impl FramePacer {
    /// Pacer for `frame_rate` frames per second, first frame due now.
    #[must_use]
    pub fn new(frame_rate: u32) -> Self {
        Self {
            period: Duration::from_micros(1_000_000 / u64::from(frame_rate.max(1))),
            next_due: Instant::now(),
        }
    }

    /// Frame period.
    #[inline]
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// True if a frame is due at `now`. Missed frames are not replayed.
    pub fn due(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due += self.period;
        if self.next_due <= now {
            self.next_due = now + self.period;
        }
        true
    }

    /// Time left until the next frame.
    #[must_use]
    pub fn until_next(&self, now: Instant) -> Duration {
        self.next_due.saturating_duration_since(now)
    }
}

/// Outcome of one pulse.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pulse {
    /// The render unit will run a frame.
    Sent,
    /// The previous pulse has not been taken yet.
    Skipped,
    /// The render unit is gone.
    Closed,
}

/// Ingress end of the go channel.
#[derive(Clone, Debug)]
pub struct GoSender(Sender<()>);

impl GoSender {
    /// Signals one frame.
    pub fn pulse(&self) -> Pulse {
        match self.0.try_send(()) {
            Ok(()) => Pulse::Sent,
            Err(TrySendError::Full(())) => Pulse::Skipped,
            Err(TrySendError::Disconnected(())) => Pulse::Closed,
        }
    }
}

/// Creates the go channel.
#[must_use]
pub fn go_channel() -> (GoSender, Receiver<()>) {
    let (tx, rx) = bounded(1);
    (GoSender(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pacer_does_not_replay_missed_frames() {
        let mut pacer = FramePacer::new(10);
        let t0 = Instant::now();
        assert!(pacer.due(t0));
        assert!(!pacer.due(t0));

        let late = t0 + Duration::from_millis(550);
        assert!(pacer.due(late));
        assert!(!pacer.due(late));
        assert_eq!(pacer.until_next(late), Duration::from_millis(100));
    }

    #[test]
    fn test_go_channel_holds_one_pulse() {
        let (go, rx) = go_channel();
        assert_eq!(go.pulse(), Pulse::Sent);
        assert_eq!(go.pulse(), Pulse::Skipped);
        assert!(rx.try_recv().is_ok());
        assert_eq!(go.pulse(), Pulse::Sent);
        drop(rx);
        assert_eq!(go.pulse(), Pulse::Closed);
    }
}
