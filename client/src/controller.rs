//! Connection lifecycle task.
//!
//! One spawned task owns the transport, the live link and the retry timer.
//! [`ReconnectController`] is the caller's handle to it: commands go in over
//! an mpsc channel, state comes out over a watch channel, server events over
//! a second mpsc channel. Dropping the handle tears the task down, so no
//! timer or link outlives it.

use presence_protocol::{ClientEvent, ConnectStatus, DisconnectReason, ServerEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::{ClientError, TransportError};
use crate::machine::{ConnectionState, ReconnectMachine, Step};
use crate::policy::ReconnectPolicy;
use crate::transport::{Frame, Link, Transport};

#[derive(Debug)]
enum Command {
    Connect(String),
    MissingCredential,
    Send(ClientEvent),
    Shutdown,
}

enum Flow {
    Next(Step),
    Exit,
}

pub struct ReconnectController {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    events: mpsc::UnboundedReceiver<ServerEvent>,
    task: Option<JoinHandle<()>>,
}

impl ReconnectController {
    /// Spawn the lifecycle task in `Disconnected`. Nothing is dialed until
    /// [`connect`](Self::connect) is called.
    pub fn spawn<T: Transport>(transport: T, policy: ReconnectPolicy) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let task = ControllerTask {
            transport: Arc::new(transport),
            machine: ReconnectMachine::new(policy.clone()),
            policy,
            credential: None,
            commands: commands_rx,
            state: state_tx,
            events: events_tx,
        };

        Self {
            commands: commands_tx,
            state: state_rx,
            events: events_rx,
            task: Some(tokio::spawn(task.run())),
        }
    }

    /// Start a connection with a fresh retry budget. A missing or blank
    /// credential moves the controller to `Failed` without dialing.
    pub fn connect(&self, credential: Option<String>) -> Result<(), ClientError> {
        match credential.filter(|c| !c.trim().is_empty()) {
            Some(credential) => self.command(Command::Connect(credential)),
            None => {
                self.command(Command::MissingCredential)?;
                Err(ClientError::MissingCredential)
            }
        }
    }

    /// Queue an event for the server. Events sent while not connected are dropped.
    pub fn send(&self, event: ClientEvent) -> Result<(), ClientError> {
        self.command(Command::Send(event))
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Resolve once the state satisfies `predicate`, or with the last state
    /// if the task has exited.
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(ConnectionState) -> bool,
    ) -> ConnectionState {
        let mut rx = self.state.clone();
        if let Ok(state) = rx.wait_for(|state| predicate(*state)).await {
            return *state;
        }
        let last = *rx.borrow();
        last
    }

    /// Next event pushed by the server, `connect_status` included.
    pub async fn next_event(&mut self) -> Option<ServerEvent> {
        self.events.recv().await
    }

    /// Close the link, cancel any pending retry and wait for the task to finish.
    pub async fn shutdown(mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    fn command(&self, command: Command) -> Result<(), ClientError> {
        self.commands
            .send(command)
            .map_err(|_| ClientError::Stopped)
    }
}

impl Drop for ReconnectController {
    fn drop(&mut self) {
        // The task closes its link and exits once it sees this (or the closed channel)
        let _ = self.commands.send(Command::Shutdown);
    }
}

struct ControllerTask<T: Transport> {
    transport: Arc<T>,
    machine: ReconnectMachine,
    policy: ReconnectPolicy,
    credential: Option<String>,
    commands: mpsc::UnboundedReceiver<Command>,
    state: watch::Sender<ConnectionState>,
    events: mpsc::UnboundedSender<ServerEvent>,
}

impl<T: Transport> ControllerTask<T> {
    async fn run(mut self) {
        let mut step = Step::Idle;
        loop {
            let flow = match step {
                Step::Idle => self.idle().await,
                Step::Retry(delay) => self.wait_retry(delay).await,
                Step::Dial => self.dial().await,
            };
            self.publish();
            match flow {
                Flow::Next(next) => step = next,
                Flow::Exit => break,
            }
        }
        tracing::debug!("Reconnect controller stopped");
    }

    fn publish(&self) {
        self.state.send_replace(self.machine.state());
    }

    /// Handle a command that arrived while no link is live. `None` means the
    /// command does not change the current step.
    fn on_command(&mut self, command: Option<Command>) -> Option<Flow> {
        match command {
            Some(Command::Connect(credential)) => {
                self.credential = Some(credential);
                Some(Flow::Next(self.machine.start()))
            }
            Some(Command::MissingCredential) => {
                tracing::warn!("Connect called without a credential");
                self.credential = None;
                Some(Flow::Next(self.machine.reject_missing_credential()))
            }
            Some(Command::Send(event)) => {
                tracing::debug!(?event, "Not connected, dropping outbound event");
                None
            }
            Some(Command::Shutdown) | None => {
                self.machine.teardown();
                Some(Flow::Exit)
            }
        }
    }

    async fn idle(&mut self) -> Flow {
        loop {
            let command = self.commands.recv().await;
            if let Some(flow) = self.on_command(command) {
                return flow;
            }
        }
    }

    /// The timer lives on this frame; returning early for any command drops it.
    async fn wait_retry(&mut self, delay: Duration) -> Flow {
        let timer = tokio::time::sleep(delay);
        tokio::pin!(timer);

        loop {
            tokio::select! {
                _ = &mut timer => return Flow::Next(self.machine.timer_fired()),
                command = self.commands.recv() => {
                    if let Some(flow) = self.on_command(command) {
                        return flow;
                    }
                }
            }
        }
    }

    async fn dial(&mut self) -> Flow {
        let Some(credential) = self.credential.clone() else {
            return Flow::Next(self.machine.reject_missing_credential());
        };

        tracing::info!(state = ?self.machine.state(), "Connecting");

        let transport = Arc::clone(&self.transport);
        let result = {
            let attempt = handshake(&*transport, &credential, self.policy.handshake_timeout());
            tokio::pin!(attempt);

            loop {
                tokio::select! {
                    result = &mut attempt => break result,
                    command = self.commands.recv() => {
                        if let Some(flow) = self.on_command(command) {
                            return flow;
                        }
                    }
                }
            }
        };

        match result {
            Ok((link, status)) => {
                self.machine.connected();
                self.publish();
                tracing::info!(user_id = %status.user_id, role = %status.role, "Connected");
                let _ = self.events.send(ServerEvent::ConnectStatus(status));
                self.serve(link).await
            }
            Err(e) => {
                tracing::warn!(error = %e, "Connection attempt failed");
                Flow::Next(self.machine.dial_failed())
            }
        }
    }

    async fn serve(&mut self, mut link: T::Link) -> Flow {
        loop {
            tokio::select! {
                frame = link.recv() => match frame {
                    Ok(Frame::Event(event)) => {
                        let _ = self.events.send(event);
                    }
                    Ok(Frame::Closed(reason)) => {
                        let reason = DisconnectReason::classify(reason.as_deref());
                        tracing::info!(%reason, "Connection closed by server");
                        return Flow::Next(self.machine.dropped(&reason));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Connection lost");
                        return Flow::Next(
                            self.machine.dropped(&DisconnectReason::Transport(e.to_string())),
                        );
                    }
                },
                command = self.commands.recv() => match command {
                    Some(Command::Send(event)) => {
                        if let Err(e) = link.send(&event).await {
                            tracing::warn!(error = %e, "Send failed");
                            link.close().await;
                            return Flow::Next(
                                self.machine.dropped(&DisconnectReason::Transport(e.to_string())),
                            );
                        }
                    }
                    other => {
                        link.close().await;
                        if let Some(flow) = self.on_command(other) {
                            return flow;
                        }
                    }
                },
            }
        }
    }
}

/// Open the transport and wait for `connect_status`. Anything else before it
/// counts as a failed attempt.
async fn handshake<T: Transport>(
    transport: &T,
    credential: &str,
    wait: Duration,
) -> Result<(T::Link, ConnectStatus), TransportError> {
    let mut link = transport.open(credential).await?;

    match tokio::time::timeout(wait, link.recv()).await {
        Ok(Ok(Frame::Event(ServerEvent::ConnectStatus(status)))) if status.connected => {
            Ok((link, status))
        }
        Ok(Ok(Frame::Closed(reason))) => {
            match DisconnectReason::classify(reason.as_deref()) {
                DisconnectReason::AuthRejected(reason) => Err(TransportError::Rejected(reason)),
                other => Err(TransportError::Closed(other.to_string())),
            }
        }
        Ok(Ok(Frame::Event(event))) => {
            link.close().await;
            Err(TransportError::Protocol(format!(
                "expected connect_status, got {event:?}"
            )))
        }
        Ok(Err(e)) => Err(e),
        Err(_) => {
            link.close().await;
            Err(TransportError::HandshakeTimeout)
        }
    }
}
