use std::time::Duration;

use crate::options::{MAX_RECONNECT_WAIT, MIN_RECONNECT_WAIT};
use crate::timer::Countdown;

/// Connection lifecycle state (§4.F).
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum ConnectionState {
    Disconnected,
    WaitingConnack,
    Connected,
}

/// Reconnect backoff and keep-alive bookkeeping owned by the session.
///
/// Doubles on each consecutive failure up to [`MAX_RECONNECT_WAIT`] and
/// resets to [`MIN_RECONNECT_WAIT`] on a successful CONNACK, per §4.F.
#[derive(Debug)]
pub struct Session {
    pub state: ConnectionState,
    pub was_manually_disconnected: bool,
    pub is_ping_outstanding: bool,
    pub disconnect_count: u64,
    pub connection_tag: String,
    reconnect_wait: Duration,
    reconnect_timer: Countdown,
    keep_alive_timer: Countdown,
}

impl Session {
    pub fn new() -> Self {
        Session {
            state: ConnectionState::Disconnected,
            was_manually_disconnected: false,
            is_ping_outstanding: false,
            disconnect_count: 0,
            connection_tag: String::new(),
            reconnect_wait: MIN_RECONNECT_WAIT,
            reconnect_timer: Countdown::new(),
            keep_alive_timer: Countdown::new(),
        }
    }

    pub fn reset_reconnect_backoff(&mut self) {
        self.reconnect_wait = MIN_RECONNECT_WAIT;
    }

    pub fn schedule_reconnect(&mut self) {
        self.reconnect_timer.start(self.reconnect_wait);
        self.reconnect_wait = (self.reconnect_wait * 2).min(MAX_RECONNECT_WAIT);
    }

    pub fn reconnect_due(&self) -> bool {
        !self.reconnect_timer.is_running() || self.reconnect_timer.expired()
    }

    /// Halts the reconnect-delay timer once a session is established; it is
    /// re-armed by the next call to [`Session::schedule_reconnect`].
    pub fn cancel_reconnect_timer(&mut self) {
        self.reconnect_timer.stop();
    }

    pub fn start_keep_alive(&mut self, interval: Duration) {
        self.keep_alive_timer.start(interval);
    }

    pub fn keep_alive_expired(&self) -> bool {
        self.keep_alive_timer.expired()
    }

    pub fn keep_alive_remaining(&self) -> Option<Duration> {
        self.keep_alive_timer.remaining()
    }

    pub fn mark_disconnected(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.is_ping_outstanding = false;
        self.disconnect_count += 1;
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_starts_disconnected() {
        let session = Session::new();
        assert_eq!(session.state, ConnectionState::Disconnected);
        assert_eq!(session.disconnect_count, 0);
    }

    #[test]
    fn mark_disconnected_increments_counter_and_clears_ping_flag() {
        let mut session = Session::new();
        session.is_ping_outstanding = true;
        session.mark_disconnected();
        assert_eq!(session.disconnect_count, 1);
        assert!(!session.is_ping_outstanding);
    }

    #[test]
    fn reconnect_backoff_doubles_and_caps() {
        let mut session = Session::new();
        session.schedule_reconnect();
        assert_eq!(session.reconnect_wait, (MIN_RECONNECT_WAIT * 2).min(MAX_RECONNECT_WAIT));
    }

    #[test]
    fn reset_backoff_returns_to_minimum() {
        let mut session = Session::new();
        session.schedule_reconnect();
        session.schedule_reconnect();
        session.reset_reconnect_backoff();
        assert_eq!(session.reconnect_wait, MIN_RECONNECT_WAIT);
    }
}
