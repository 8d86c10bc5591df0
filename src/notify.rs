//! Rate-limited lane notifier.
//!
//! Forwards the lane signal at most once per interval, independent of the
//! frame rate. The timer has two states:
//!
//! - `Ready`: nothing sent yet, or more than `interval` has elapsed since the
//!   last send. The next poll emits a command.
//! - `Waiting`: a command went out less than (or exactly) `interval` ago.
//!
//! The timer advances on every emitted command whether or not a serial device
//! is attached.

use std::time::{Duration, Instant};

use anyhow::Result;

use crate::aggregate::SignalState;
use crate::command::Command;
use crate::serial::SerialLink;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    Ready,
    Waiting,
}

pub struct RateLimitedNotifier {
    lane: u8,
    interval: Duration,
    last_sent: Option<Instant>,
}

impl RateLimitedNotifier {
    pub fn new(lane: u8, interval: Duration) -> Self {
        Self {
            lane,
            interval,
            last_sent: None,
        }
    }

    pub fn lane(&self) -> u8 {
        self.lane
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_sent(&self) -> Option<Instant> {
        self.last_sent
    }

    pub fn state(&self, now: Instant) -> TimerState {
        match self.last_sent {
            None => TimerState::Ready,
            Some(last) if now.saturating_duration_since(last) > self.interval => TimerState::Ready,
            Some(_) => TimerState::Waiting,
        }
    }

    /// Emit the command for `signal` if the timer is ready, and restart it.
    pub fn poll(&mut self, now: Instant, signal: &SignalState) -> Option<Command> {
        if self.state(now) == TimerState::Waiting {
            return None;
        }
        self.last_sent = Some(now);
        Some(Command::for_state(self.lane, signal))
    }

    /// Poll and write the resulting command to `link`.
    ///
    /// Returns the command that was due, even when the link is null.
    pub fn notify(
        &mut self,
        now: Instant,
        signal: &SignalState,
        link: &mut SerialLink,
    ) -> Result<Option<Command>> {
        let Some(command) = self.poll(now, signal) else {
            return Ok(None);
        };
        if !link.send(&command)? {
            log::debug!("{} due but no serial device attached", command);
        }
        Ok(Some(command))
    }
}

impl Default for RateLimitedNotifier {
    fn default() -> Self {
        Self::new(2, DEFAULT_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> SignalState {
        SignalState::default()
    }

    #[test]
    fn first_poll_fires_immediately() {
        let mut notifier = RateLimitedNotifier::default();
        let t0 = Instant::now();
        assert_eq!(notifier.state(t0), TimerState::Ready);
        assert_eq!(
            notifier.poll(t0, &quiet()),
            Some(Command::Count { lane: 2, count: 0 })
        );
        assert_eq!(notifier.state(t0), TimerState::Waiting);
    }

    #[test]
    fn interval_must_be_strictly_exceeded() {
        let mut notifier = RateLimitedNotifier::new(2, Duration::from_secs(1));
        let t0 = Instant::now();
        assert!(notifier.poll(t0, &quiet()).is_some());
        assert!(notifier.poll(t0 + Duration::from_millis(500), &quiet()).is_none());
        assert!(notifier.poll(t0 + Duration::from_secs(1), &quiet()).is_none());
        assert!(notifier
            .poll(t0 + Duration::from_millis(1001), &quiet())
            .is_some());
        assert_eq!(notifier.last_sent(), Some(t0 + Duration::from_millis(1001)));
    }

    #[test]
    fn at_most_one_command_per_window() {
        let mut notifier = RateLimitedNotifier::new(2, Duration::from_secs(1));
        let t0 = Instant::now();
        // ~30 fps for 10 seconds.
        let sent: Vec<Instant> = (0..300u64)
            .map(|i| t0 + Duration::from_millis(i * 33))
            .filter(|&now| notifier.poll(now, &quiet()).is_some())
            .collect();

        for pair in sent.windows(2) {
            assert!(pair[1] - pair[0] > Duration::from_secs(1));
        }
        // 1.023 s between sends (the first frame past each interval).
        assert_eq!(sent.len(), 10);
    }

    #[test]
    fn ambulance_preempts_count_on_tick() {
        let mut notifier = RateLimitedNotifier::new(2, Duration::from_secs(1));
        let signal = SignalState {
            vehicle_count: 3,
            ambulance: true,
        };
        assert_eq!(
            notifier.poll(Instant::now(), &signal),
            Some(Command::Ambulance { lane: 2 })
        );
    }

    #[test]
    fn null_link_still_advances_timer() {
        let mut notifier = RateLimitedNotifier::default();
        let mut link = SerialLink::null();
        let t0 = Instant::now();

        let first = notifier.notify(t0, &quiet(), &mut link).unwrap();
        assert_eq!(first, Some(Command::Count { lane: 2, count: 0 }));
        assert_eq!(link.commands_sent(), 0);
        assert!(notifier
            .notify(t0 + Duration::from_millis(10), &quiet(), &mut link)
            .unwrap()
            .is_none());
    }
}
