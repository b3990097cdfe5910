//! Fail-safe polling state machine for the command issuer.
//!
//! The poller looks at one cloud fetch outcome per tick and decides between
//! re-issuing a command, suppressing it, or forcing a safety Stop. Faults are
//! edge-triggered: a Stop goes out once per entry into the error condition,
//! never once per tick, so the low-bandwidth link is not flooded while the
//! vehicle is still commanded to stop within one poll interval of any fault.

use std::future::Future;

use log::{info, warn};

use crate::control::Command;
use crate::error::LinkError;
use crate::payload::{self, DriveRequest};
use crate::DEFAULT_SPEED;

/// Result of one cloud poll, as seen by the state machine. Transport errors,
/// timeouts and non-200 statuses all collapse into `Unreachable`.
#[derive(Debug)]
pub enum FetchOutcome {
    Unreachable(String),
    Body(String),
}

/// Where encrypted control frames go. The production implementation wraps a
/// `FrameEncoder` and a radio; tests substitute a recorder.
pub trait CommandSink {
    fn send_command(
        &mut self,
        command: Command,
        left_speed: u8,
        right_speed: u8,
    ) -> impl Future<Output = Result<(), LinkError>>;
}

/// Process-wide mutable state of the command issuer. Owned by the poller and
/// touched by exactly one logical thread of control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollState {
    /// Last known good speed pair; what a safety Stop is sent with.
    pub current_left: u8,
    pub current_right: u8,
    /// Last pair actually accepted by the radio. A failed transmission leaves
    /// these untouched so the next tick naturally retries.
    pub last_sent_left: u8,
    pub last_sent_right: u8,
    pub last_command_sent: Command,
    /// Sticky fault latch: true while connectivity or data is untrustworthy.
    pub api_error_active: bool,
}

impl PollState {
    pub fn new() -> Self {
        PollState {
            current_left: DEFAULT_SPEED,
            current_right: DEFAULT_SPEED,
            last_sent_left: 0,
            last_sent_right: 0,
            last_command_sent: Command::Stop,
            api_error_active: false,
        }
    }
}

impl Default for PollState {
    fn default() -> Self {
        PollState::new()
    }
}

pub struct CommandPoller {
    state: PollState,
}

impl CommandPoller {
    pub fn new() -> Self {
        CommandPoller { state: PollState::new() }
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    /// Push the default speed pair to the receiver so both ends agree on
    /// speeds before the first poll.
    pub async fn send_initial_speeds<S: CommandSink>(&mut self, sink: &mut S) {
        let (left, right) = (self.state.current_left, self.state.current_right);
        if sink.send_command(Command::SetSpeed, left, right).await.is_ok() {
            self.state.last_sent_left = left;
            self.state.last_sent_right = right;
        }
    }

    /// Evaluate one poll tick. At most two frames leave this function: one for
    /// a speed change, one for a command change.
    pub async fn tick<S: CommandSink>(&mut self, outcome: FetchOutcome, sink: &mut S) {
        match outcome {
            FetchOutcome::Unreachable(reason) => {
                self.enter_error_state(&reason, sink).await;
            }
            FetchOutcome::Body(body) => {
                // A completed fetch clears the latch before content is judged.
                self.state.api_error_active = false;
                match payload::parse_desired_state(&body) {
                    Err(e) => self.enter_error_state(&e.to_string(), sink).await,
                    Ok(request) => self.apply_request(request, sink).await,
                }
            }
        }
    }

    async fn enter_error_state<S: CommandSink>(&mut self, reason: &str, sink: &mut S) {
        if self.state.api_error_active {
            return;
        }
        warn!("{} -> sending Stop (entering error state)", reason);

        // The latch advances even if the radio rejects the Stop frame; the
        // fault condition, not the transmission, is what is being latched.
        let _ = sink
            .send_command(Command::Stop, self.state.current_left, self.state.current_right)
            .await;
        self.state.last_command_sent = Command::Stop;
        self.state.api_error_active = true;
    }

    async fn apply_request<S: CommandSink>(&mut self, request: DriveRequest, sink: &mut S) {
        // Speed and command changes are independent triggers; either, both,
        // or neither may fire in a single tick.
        let (left, right) = (request.left_speed, request.right_speed);
        if left != self.state.last_sent_left || right != self.state.last_sent_right {
            self.state.current_left = left;
            self.state.current_right = right;
            info!("speeds changed -> SetSpeed L={} R={}", left, right);
            if sink.send_command(Command::SetSpeed, left, right).await.is_ok() {
                self.state.last_sent_left = left;
                self.state.last_sent_right = right;
            }
        }

        if request.command != self.state.last_command_sent {
            info!(
                "state changed -> {:?} with L={} R={}",
                request.command, self.state.current_left, self.state.current_right
            );
            if sink
                .send_command(request.command, self.state.current_left, self.state.current_right)
                .await
                .is_ok()
            {
                self.state.last_command_sent = request.command;
            }
        }
    }
}

impl Default for CommandPoller {
    fn default() -> Self {
        CommandPoller::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockSink {
        sent: Vec<(Command, u8, u8)>,
        fail: bool,
    }

    impl MockSink {
        fn new() -> Self {
            MockSink { sent: Vec::new(), fail: false }
        }
    }

    impl CommandSink for MockSink {
        async fn send_command(
            &mut self,
            command: Command,
            left_speed: u8,
            right_speed: u8,
        ) -> Result<(), LinkError> {
            self.sent.push((command, left_speed, right_speed));
            if self.fail {
                Err(LinkError::Transport("mock radio down".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn body(estado: &str, left: i64, right: i64) -> FetchOutcome {
        FetchOutcome::Body(format!(
            r#"{{"estado":{{"value":"{}"}},"left_speed":{{"value":{}}},"right_speed":{{"value":{}}}}}"#,
            estado, left, right
        ))
    }

    fn unreachable() -> FetchOutcome {
        FetchOutcome::Unreachable("connection refused".to_string())
    }

    #[tokio::test]
    async fn test_identical_ticks_send_once() {
        let mut poller = CommandPoller::new();
        let mut sink = MockSink::new();

        poller.tick(body("forward", 10, 10), &mut sink).await;
        poller.tick(body("forward", 10, 10), &mut sink).await;

        assert_eq!(
            sink.sent,
            vec![(Command::SetSpeed, 10, 10), (Command::Forward, 10, 10)],
            "one SetSpeed and one Forward in total, both on the first tick"
        );
    }

    #[tokio::test]
    async fn test_repeated_transport_failures_send_one_stop() {
        let mut poller = CommandPoller::new();
        let mut sink = MockSink::new();

        for _ in 0..5 {
            poller.tick(unreachable(), &mut sink).await;
        }

        assert_eq!(sink.sent, vec![(Command::Stop, 10, 10)]);
        assert!(poller.state().api_error_active);
    }

    #[tokio::test]
    async fn test_latch_clears_on_successful_poll() {
        let mut poller = CommandPoller::new();
        let mut sink = MockSink::new();

        poller.tick(unreachable(), &mut sink).await;
        assert!(poller.state().api_error_active);

        poller.tick(body("forward", 10, 10), &mut sink).await;
        assert!(!poller.state().api_error_active);
        assert_eq!(poller.state().last_command_sent, Command::Forward);
        assert_eq!(
            sink.sent,
            vec![(Command::Stop, 10, 10), (Command::SetSpeed, 10, 10), (Command::Forward, 10, 10)]
        );
    }

    #[tokio::test]
    async fn test_failure_after_recovery_latches_again() {
        let mut poller = CommandPoller::new();
        let mut sink = MockSink::new();

        poller.tick(unreachable(), &mut sink).await;
        poller.tick(body("forward", 30, 30), &mut sink).await;
        sink.sent.clear();

        poller.tick(unreachable(), &mut sink).await;
        poller.tick(unreachable(), &mut sink).await;

        // Re-entry into the fault sends exactly one Stop, with the speeds
        // last seen from the cloud.
        assert_eq!(sink.sent, vec![(Command::Stop, 30, 30)]);
    }

    #[tokio::test]
    async fn test_malformed_body_stops_and_latches() {
        let mut poller = CommandPoller::new();
        let mut sink = MockSink::new();

        poller.tick(FetchOutcome::Body("{\"broken\":".to_string()), &mut sink).await;

        assert_eq!(sink.sent, vec![(Command::Stop, 10, 10)]);
        assert_eq!(poller.state().last_command_sent, Command::Stop);
        assert!(poller.state().api_error_active);
    }

    #[tokio::test]
    async fn test_each_successful_fetch_rearms_the_parse_latch() {
        let mut poller = CommandPoller::new();
        let mut sink = MockSink::new();

        // Every 200 response clears the latch before validation, so each
        // malformed body is a fresh entry into the error condition.
        poller.tick(FetchOutcome::Body("nonsense".to_string()), &mut sink).await;
        poller.tick(FetchOutcome::Body("nonsense".to_string()), &mut sink).await;

        assert_eq!(sink.sent.len(), 2);
        assert!(sink.sent.iter().all(|(cmd, _, _)| *cmd == Command::Stop));
    }

    #[tokio::test]
    async fn test_speed_change_alone_sends_only_setspeed() {
        let mut poller = CommandPoller::new();
        let mut sink = MockSink::new();

        poller.tick(body("forward", 10, 10), &mut sink).await;
        sink.sent.clear();

        poller.tick(body("forward", 50, 60), &mut sink).await;
        assert_eq!(sink.sent, vec![(Command::SetSpeed, 50, 60)]);
    }

    #[tokio::test]
    async fn test_command_change_alone_uses_current_speeds() {
        let mut poller = CommandPoller::new();
        let mut sink = MockSink::new();

        poller.tick(body("forward", 80, 90), &mut sink).await;
        sink.sent.clear();

        poller.tick(body("left", 80, 90), &mut sink).await;
        assert_eq!(sink.sent, vec![(Command::Left, 80, 90)]);
    }

    #[tokio::test]
    async fn test_failed_transmission_retries_next_tick() {
        let mut poller = CommandPoller::new();
        let mut sink = MockSink::new();
        sink.fail = true;

        poller.tick(body("forward", 20, 20), &mut sink).await;
        assert_eq!(poller.state().last_sent_left, 0, "failed send must not update last-sent");
        assert_eq!(poller.state().last_command_sent, Command::Stop);

        // Radio back: the same content is still "different from last sent"
        // and goes out again.
        sink.fail = false;
        sink.sent.clear();
        poller.tick(body("forward", 20, 20), &mut sink).await;
        assert_eq!(sink.sent, vec![(Command::SetSpeed, 20, 20), (Command::Forward, 20, 20)]);

        sink.sent.clear();
        poller.tick(body("forward", 20, 20), &mut sink).await;
        assert!(sink.sent.is_empty());
    }

    #[tokio::test]
    async fn test_clamping_applies_before_comparison() {
        let mut poller = CommandPoller::new();
        let mut sink = MockSink::new();

        poller.tick(body("forward", -5, 300), &mut sink).await;
        assert_eq!(sink.sent[0], (Command::SetSpeed, 0, 255));

        // Different raw values, same clamped pair: no second SetSpeed.
        sink.sent.clear();
        poller.tick(body("forward", -99, 999), &mut sink).await;
        assert!(sink.sent.is_empty());
    }

    #[tokio::test]
    async fn test_initial_speeds_recorded_on_success() {
        let mut poller = CommandPoller::new();
        let mut sink = MockSink::new();

        poller.send_initial_speeds(&mut sink).await;
        assert_eq!(sink.sent, vec![(Command::SetSpeed, 10, 10)]);
        assert_eq!(poller.state().last_sent_left, 10);

        // The first poll with the same speeds has nothing to update.
        sink.sent.clear();
        poller.tick(body("stop", 10, 10), &mut sink).await;
        assert!(sink.sent.is_empty());
    }
}
