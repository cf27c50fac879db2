//! AutomationUseCase: a background loop that turns frames into control actions.
//!
//! While automation is enabled for a live session, the [`AutomationConsumer`]
//! repeatedly:
//!
//! 1. takes the latest frame from the session's [`FrameChannel`],
//! 2. asks its [`AutomationScript`] which actions to perform,
//! 3. sends those actions through the session's connection,
//! 4. sleeps for the configured interval.
//!
//! # Exit and escalation
//!
//! The loop ends when automation is disabled, when the session stops being
//! alive, when the frame channel closes, or when sending an action fails.
//! On every exit except a plain disable it clears the session's `running`
//! flag.  On failure the [`EscalationPolicy`] decides whether the failure
//! also tears down the whole session: with
//! [`EscalationPolicy::TearDownSession`] the consumer clears `alive` and the
//! session controller, notified through the returned [`AutomationExit`],
//! moves the session to `Disconnected`.
//!
//! # One consumer at a time
//!
//! Each consumer holds an [`AutomationLease`].  Enabling automation again
//! issues a new lease and revokes the previous one, so a consumer that is
//! still sleeping from an earlier run exits at its next check instead of
//! running alongside its replacement.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use mirror_core::{ControlAction, Frame, FrameChannel, SessionFlags};
use tracing::{debug, info, warn};

use super::transport::DeviceConnection;

/// How long a consumer waits for a frame before re-checking its flags.
const FRAME_WAIT: Duration = Duration::from_millis(250);

/// What a failing automation run does to its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EscalationPolicy {
    /// Only automation is switched off; the session stays connected.
    DisableOnly,
    /// Automation failure is session failure.
    #[default]
    TearDownSession,
}

/// Why an [`AutomationConsumer::run`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutomationExit {
    /// Automation was switched off, or a newer consumer took over.
    Disabled,
    /// The session stopped being alive or its frame channel closed.
    SessionEnded,
    /// Sending an action failed.
    Failed(String),
}

/// A scripted reaction to one frame.
pub trait AutomationScript: Send + Sync {
    /// Returns the actions to send for `frame`, in order.
    fn actions(&self, frame: &Frame) -> Vec<ControlAction>;
}

/// Taps a fixed device coordinate on every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedTap {
    pub x: i32,
    pub y: i32,
}

impl Default for FixedTap {
    fn default() -> Self {
        Self { x: 300, y: 1000 }
    }
}

impl AutomationScript for FixedTap {
    fn actions(&self, _frame: &Frame) -> Vec<ControlAction> {
        ControlAction::tap(self.x, self.y).to_vec()
    }
}

/// Cadence and failure handling of automation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomationSettings {
    /// Pause after each scripted step.
    pub interval: Duration,
    pub policy: EscalationPolicy,
}

impl Default for AutomationSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            policy: EscalationPolicy::default(),
        }
    }
}

/// Issues leases so that only the most recently started consumer keeps
/// running.
#[derive(Debug, Default)]
pub struct AutomationLeases {
    current: Arc<AtomicU64>,
}

impl AutomationLeases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revokes every outstanding lease and returns a fresh one.
    pub fn issue(&self) -> AutomationLease {
        let id = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        AutomationLease {
            current: Arc::clone(&self.current),
            id,
        }
    }

    /// Revokes every outstanding lease.
    pub fn revoke_all(&self) {
        self.current.fetch_add(1, Ordering::AcqRel);
    }
}

/// Permission for one consumer to keep running.
#[derive(Debug, Clone)]
pub struct AutomationLease {
    current: Arc<AtomicU64>,
    id: u64,
}

impl AutomationLease {
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::Acquire) == self.id
    }
}

/// The automation loop bound to one session.
pub struct AutomationConsumer {
    frames: Arc<FrameChannel>,
    flags: Arc<SessionFlags>,
    connection: Arc<dyn DeviceConnection>,
    script: Arc<dyn AutomationScript>,
    settings: AutomationSettings,
    lease: AutomationLease,
}

impl AutomationConsumer {
    pub fn new(
        frames: Arc<FrameChannel>,
        flags: Arc<SessionFlags>,
        connection: Arc<dyn DeviceConnection>,
        script: Arc<dyn AutomationScript>,
        settings: AutomationSettings,
        lease: AutomationLease,
    ) -> Self {
        Self {
            frames,
            flags,
            connection,
            script,
            settings,
            lease,
        }
    }

    /// Runs the loop on the calling thread until it exits.
    pub fn run(&self) -> AutomationExit {
        info!("automation started");
        let exit = self.run_loop();

        if self.lease.is_current() {
            if exit != AutomationExit::Disabled {
                self.flags.set_running(false);
            }
            if matches!(exit, AutomationExit::Failed(_))
                && self.settings.policy == EscalationPolicy::TearDownSession
            {
                self.flags.set_alive(false);
            }
        }

        info!(?exit, "automation stopped");
        exit
    }

    fn run_loop(&self) -> AutomationExit {
        loop {
            if let Some(exit) = self.check_flags() {
                return exit;
            }

            let frame = match self.frames.pop_timeout(FRAME_WAIT) {
                Some(frame) => frame,
                None if self.frames.is_closed() => return AutomationExit::SessionEnded,
                None => continue,
            };
            if let Some(exit) = self.check_flags() {
                return exit;
            }

            debug!(sequence = frame.sequence(), "automation step");
            for action in self.script.actions(&frame) {
                if let Err(e) = self.connection.send_control(action) {
                    warn!(error = %e, "automation action failed");
                    return AutomationExit::Failed(e.to_string());
                }
            }

            thread::sleep(self.settings.interval);
        }
    }

    fn check_flags(&self) -> Option<AutomationExit> {
        if !self.flags.is_alive() {
            Some(AutomationExit::SessionEnded)
        } else if !self.flags.is_running() || !self.lease.is_current() {
            Some(AutomationExit::Disabled)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adb::mock::MockConnection;
    use mirror_core::{ActionPhase, PixelFormat, Resolution};

    fn frame() -> Frame {
        Frame::new(vec![0u8; 4], 1, 1, PixelFormat::Rgba8888).expect("valid frame")
    }

    struct Fixture {
        frames: Arc<FrameChannel>,
        flags: Arc<SessionFlags>,
        connection: Arc<MockConnection>,
        leases: AutomationLeases,
    }

    impl Fixture {
        fn new() -> Self {
            let flags = Arc::new(SessionFlags::new(false));
            flags.set_running(true);
            Self {
                frames: Arc::new(FrameChannel::new()),
                flags,
                connection: Arc::new(MockConnection::new("ABC123", "Pixel", Resolution::new(1080, 2400))),
                leases: AutomationLeases::new(),
            }
        }

        fn consumer(&self, policy: EscalationPolicy) -> AutomationConsumer {
            AutomationConsumer::new(
                Arc::clone(&self.frames),
                Arc::clone(&self.flags),
                self.connection.clone(),
                Arc::new(FixedTap::default()),
                AutomationSettings {
                    interval: Duration::from_millis(5),
                    policy,
                },
                self.leases.issue(),
            )
        }
    }

    #[test]
    fn test_fixed_tap_defaults_to_300_1000() {
        let actions = FixedTap::default().actions(&frame());
        assert_eq!(actions, ControlAction::tap(300, 1000).to_vec());
    }

    #[test]
    fn test_consumer_taps_for_frame_then_exits_when_disabled() {
        // Arrange
        let fixture = Fixture::new();
        let consumer = fixture.consumer(EscalationPolicy::TearDownSession);
        fixture.frames.push(frame());
        let flags = Arc::clone(&fixture.flags);
        let connection = Arc::clone(&fixture.connection);
        let disabler = thread::spawn(move || {
            while connection.sent_actions().len() < 2 {
                thread::sleep(Duration::from_millis(1));
            }
            flags.set_running(false);
        });

        // Act
        let exit = consumer.run();
        disabler.join().expect("disabler panicked");

        // Assert
        assert_eq!(exit, AutomationExit::Disabled);
        let sent = fixture.connection.sent_actions();
        assert_eq!(sent[0].phase(), ActionPhase::Down);
        assert_eq!(sent[1].phase(), ActionPhase::Up);
        assert!(fixture.flags.is_alive());
    }

    #[test]
    fn test_closed_channel_ends_run_and_clears_running() {
        let fixture = Fixture::new();
        let consumer = fixture.consumer(EscalationPolicy::TearDownSession);
        fixture.frames.close();

        let exit = consumer.run();

        assert_eq!(exit, AutomationExit::SessionEnded);
        assert!(!fixture.flags.is_running());
    }

    #[test]
    fn test_failure_with_teardown_policy_clears_alive() {
        // Arrange
        let fixture = Fixture::new();
        fixture.connection.fail_controls(true);
        let consumer = fixture.consumer(EscalationPolicy::TearDownSession);
        fixture.frames.push(frame());

        // Act
        let exit = consumer.run();

        // Assert
        assert!(matches!(exit, AutomationExit::Failed(_)));
        assert!(!fixture.flags.is_running());
        assert!(!fixture.flags.is_alive());
    }

    #[test]
    fn test_failure_with_disable_only_policy_keeps_session_alive() {
        let fixture = Fixture::new();
        fixture.connection.fail_controls(true);
        let consumer = fixture.consumer(EscalationPolicy::DisableOnly);
        fixture.frames.push(frame());

        let exit = consumer.run();

        assert!(matches!(exit, AutomationExit::Failed(_)));
        assert!(!fixture.flags.is_running());
        assert!(fixture.flags.is_alive());
    }

    #[test]
    fn test_superseded_consumer_exits_without_touching_flags() {
        // Arrange
        let fixture = Fixture::new();
        let old = fixture.consumer(EscalationPolicy::TearDownSession);
        let _newer = fixture.leases.issue();

        // Act
        let exit = old.run();

        // Assert
        assert_eq!(exit, AutomationExit::Disabled);
        assert!(fixture.flags.is_running(), "the newer run owns the flag");
    }
}
