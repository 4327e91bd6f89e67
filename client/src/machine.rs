//! Pure reconnection state machine. No I/O and no clocks: the controller task
//! feeds it events and carries out the [`Step`] it returns.

use presence_protocol::DisconnectReason;
use std::time::Duration;

use crate::policy::ReconnectPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Waiting for, or performing, a retry. `attempt` 0 is the manual
    /// reconnect after an administrative drop; 1.. count automatic retries.
    Reconnecting { attempt: u32 },
    /// Retries exhausted or no credential. Stays here until `connect` is called again.
    Failed,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// What the driver must do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Open the transport now.
    Dial,
    /// Arm the retry timer; dial when it fires.
    Retry(Duration),
    /// Nothing scheduled. Wait for the caller.
    Idle,
}

#[derive(Debug, Clone)]
pub struct ReconnectMachine {
    policy: ReconnectPolicy,
    state: ConnectionState,
    attempts: u32,
}

impl ReconnectMachine {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            state: ConnectionState::Disconnected,
            attempts: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Automatic retries used since the last successful handshake.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Explicit `connect` from the caller. Always starts over with a full budget.
    pub fn start(&mut self) -> Step {
        self.attempts = 0;
        self.state = ConnectionState::Connecting;
        Step::Dial
    }

    /// Caller tried to connect without a credential. Nothing is dialed.
    pub fn reject_missing_credential(&mut self) -> Step {
        self.attempts = 0;
        self.state = ConnectionState::Failed;
        Step::Idle
    }

    pub fn timer_fired(&mut self) -> Step {
        Step::Dial
    }

    /// Handshake completed.
    pub fn connected(&mut self) {
        self.attempts = 0;
        self.state = ConnectionState::Connected;
    }

    /// A dial (initial, manual or automatic) did not reach `connected`.
    pub fn dial_failed(&mut self) -> Step {
        self.schedule_retry()
    }

    /// A live connection ended.
    pub fn dropped(&mut self, reason: &DisconnectReason) -> Step {
        self.attempts = 0;
        match reason {
            DisconnectReason::ServerDisconnect => {
                // Manual reconnect; does not draw on the retry budget
                self.state = ConnectionState::Reconnecting { attempt: 0 };
                Step::Retry(self.policy.delay())
            }
            DisconnectReason::SessionReplaced => {
                self.state = ConnectionState::Disconnected;
                Step::Idle
            }
            DisconnectReason::AuthRejected(_) | DisconnectReason::Transport(_) => {
                self.schedule_retry()
            }
        }
    }

    /// Intentional teardown by the caller.
    pub fn teardown(&mut self) {
        self.attempts = 0;
        self.state = ConnectionState::Disconnected;
    }

    fn schedule_retry(&mut self) -> Step {
        if self.attempts >= self.policy.max_attempts {
            self.state = ConnectionState::Failed;
            return Step::Idle;
        }
        self.attempts += 1;
        self.state = ConnectionState::Reconnecting {
            attempt: self.attempts,
        };
        Step::Retry(self.policy.delay())
    }
}
