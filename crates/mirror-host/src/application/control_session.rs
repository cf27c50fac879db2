//! ControlSessionUseCase: owns the one active device session.
//!
//! The [`SessionController`] is the only place session state changes.  The
//! presentation layer calls its operations; worker threads (the transport's
//! `start()` loop and the automation consumer) only read the shared
//! [`SessionFlags`] and report back through the controller's own handlers.
//!
//! # Session lifecycle
//!
//! ```text
//!   Idle ──select_device──► Connecting ──Initialized──► Connected
//!    ▲                          │                           │
//!    └──── Stopping ◄───────────┴── switch / stop / close ──┘
//!
//!   Connecting / Connected ──start() returns, or automation escalates──► Disconnected
//! ```
//!
//! - `select_device` validates the serial against the device registry,
//!   tears down any existing session, and starts the new connection on a
//!   dedicated worker thread.  The transport's `start()` blocks that worker
//!   for the whole life of the connection.
//! - A failed or finished connection leaves the session in `Disconnected`
//!   with a user-visible message.  The controller never retries; only the
//!   reconnector bounces devices, and only at the bridge level.
//! - Input operations (`send_home`, `send_back`, pointer, key, automation
//!   toggle) are silently ignored unless the session is connected *and* its
//!   serial still matches the serial selected in the UI.
//!
//! # Events
//!
//! The controller publishes [`SessionEvent`]s synchronously on the thread
//! that caused them.  Handlers that update UI state must marshal back onto
//! the UI thread themselves.  No lock is held while events are published,
//! so handlers may call back into the controller.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use mirror_core::domain::device::is_placeholder_serial;
use mirror_core::{
    ActionPhase, ControlAction, EventBus, Frame, FrameChannel, KeyCode, Resolution,
    SequenceCounter, SessionFlags, SessionId, SessionState, SubscriptionId,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::automation::{
    AutomationConsumer, AutomationExit, AutomationLeases, AutomationScript, AutomationSettings,
    EscalationPolicy, FixedTap,
};
use super::manage_devices::{read_registry, SharedRegistry};
use super::transport::{
    ConnectOptions, ConnectionEvent, DeviceConnection, DeviceConnector, TransportError,
};
use super::translate_input::InputTranslator;

/// Error type for session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The selected serial is not in the current device list.
    #[error("device {0} is not in the device list")]
    DeviceNotFound(String),

    /// The transport could not connect or its connection failed.
    #[error("connection to {serial} failed: {source}")]
    ConnectionFailure {
        serial: String,
        #[source]
        source: TransportError,
    },

    /// A worker thread could not be spawned.
    #[error("failed to spawn {role} worker: {source}")]
    WorkerSpawn {
        role: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Events published to the presentation layer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The controller entered `state`.  `serial` is the session's device, if
    /// any.
    StateChanged {
        serial: Option<String>,
        state: SessionState,
    },
    /// The transport completed its handshake.
    Initialized {
        serial: String,
        device_name: String,
        resolution: Resolution,
    },
    /// A frame to render, already flipped if the flip flag is set.
    Frame(Frame),
    /// Automation was switched on or off.
    AutomationChanged { running: bool },
    /// The session ended on its own.  `message` is meant for the user.
    ConnectionLost { serial: String, message: String },
    /// A user-visible notice that does not change state.
    Notice { message: String },
}

/// Read-only view of the controller for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub session_id: Option<SessionId>,
    pub serial: Option<String>,
    pub state: SessionState,
    pub device_name: Option<String>,
    pub resolution: Option<Resolution>,
    pub running: bool,
    pub flip: bool,
    pub ui_selection: Option<String>,
}

/// Static configuration of a [`SessionController`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerSettings {
    pub connect: ConnectOptions,
    /// Initial flip flag for new sessions.
    pub flip: bool,
    pub automation: AutomationSettings,
}

/// The live binding between one device and one connection.
struct ActiveSession {
    id: SessionId,
    serial: String,
    state: SessionState,
    flags: Arc<SessionFlags>,
    connection: Arc<dyn DeviceConnection>,
    frames: Arc<FrameChannel>,
    subscription: SubscriptionId,
    leases: AutomationLeases,
    resolution: Option<Resolution>,
    device_name: Option<String>,
}

impl ActiveSession {
    /// Stops every worker bound to this session.  Cooperative: workers exit
    /// at their next check.
    fn shut_down(&self) {
        self.flags.set_running(false);
        self.flags.set_alive(false);
        self.leases.revoke_all();
        self.connection.events().unsubscribe(self.subscription);
        self.connection.stop();
        self.frames.close();
    }
}

/// Handles needed to act on a session outside the controller lock.
struct SessionHandles {
    id: SessionId,
    serial: String,
    flags: Arc<SessionFlags>,
    connection: Arc<dyn DeviceConnection>,
    frames: Arc<FrameChannel>,
    subscription: SubscriptionId,
    resolution: Option<Resolution>,
}

impl SessionHandles {
    fn of(session: &ActiveSession) -> Self {
        Self {
            id: session.id,
            serial: session.serial.clone(),
            flags: Arc::clone(&session.flags),
            connection: Arc::clone(&session.connection),
            frames: Arc::clone(&session.frames),
            subscription: session.subscription,
            resolution: session.resolution,
        }
    }
}

struct Slot {
    active: Option<ActiveSession>,
    /// Reported state when there is no active session.
    resting: SessionState,
    ui_selection: Option<String>,
    flip: bool,
}

struct ControllerInner {
    registry: SharedRegistry,
    connector: Arc<dyn DeviceConnector>,
    translator: InputTranslator,
    settings: ControllerSettings,
    script: Arc<dyn AutomationScript>,
    slot: Mutex<Slot>,
    events: EventBus<SessionEvent>,
}

/// Owns the single active session.  Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<ControllerInner>,
}

impl SessionController {
    /// Creates an idle controller that automates with the default
    /// [`FixedTap`].
    pub fn new(
        registry: SharedRegistry,
        connector: Arc<dyn DeviceConnector>,
        settings: ControllerSettings,
    ) -> Self {
        Self::with_script(registry, connector, settings, Arc::new(FixedTap::default()))
    }

    /// Creates an idle controller with a custom automation script.
    pub fn with_script(
        registry: SharedRegistry,
        connector: Arc<dyn DeviceConnector>,
        settings: ControllerSettings,
        script: Arc<dyn AutomationScript>,
    ) -> Self {
        let slot = Slot {
            active: None,
            resting: SessionState::Idle,
            ui_selection: None,
            flip: settings.flip,
        };
        Self {
            inner: Arc::new(ControllerInner {
                registry,
                connector,
                translator: InputTranslator::new(settings.connect.max_width),
                settings,
                script,
                slot: Mutex::new(slot),
                events: EventBus::new(),
            }),
        }
    }

    /// Events for the presentation layer.
    pub fn events(&self) -> &EventBus<SessionEvent> {
        &self.inner.events
    }

    pub fn state(&self) -> SessionState {
        let slot = self.inner.lock();
        slot.active.as_ref().map_or(slot.resting, |s| s.state)
    }

    pub fn status(&self) -> SessionStatus {
        let slot = self.inner.lock();
        match &slot.active {
            Some(s) => SessionStatus {
                session_id: Some(s.id),
                serial: Some(s.serial.clone()),
                state: s.state,
                device_name: s.device_name.clone(),
                resolution: s.resolution,
                running: s.flags.is_running(),
                flip: s.flags.is_flipped(),
                ui_selection: slot.ui_selection.clone(),
            },
            None => SessionStatus {
                session_id: None,
                serial: None,
                state: slot.resting,
                device_name: None,
                resolution: None,
                running: false,
                flip: slot.flip,
                ui_selection: slot.ui_selection.clone(),
            },
        }
    }

    /// Records which serial the UI currently shows as selected.
    ///
    /// Input is only forwarded while this matches the session's serial.
    pub fn set_ui_selection(&self, serial: Option<&str>) {
        self.inner.lock().ui_selection = serial.map(str::to_string);
    }

    /// Switches the session to `serial`.
    ///
    /// Selecting the placeholder tears down the current session and leaves
    /// the controller idle; `Ok(None)` is returned in that case.
    ///
    /// # Errors
    ///
    /// - [`SessionError::DeviceNotFound`] if `serial` is not in the device
    ///   registry.  The current session is left untouched.
    /// - [`SessionError::ConnectionFailure`] if the connector rejects the
    ///   serial.  The controller ends up `Disconnected`.
    /// - [`SessionError::WorkerSpawn`] if the connection worker cannot be
    ///   started.
    pub fn select_device(&self, serial: &str) -> Result<Option<SessionId>, SessionError> {
        let inner = &self.inner;

        if is_placeholder_serial(serial) {
            info!("no device selected, waiting for device");
            inner.lock().ui_selection = None;
            inner.teardown();
            return Ok(None);
        }

        if !read_registry(&inner.registry).contains(serial) {
            warn!(%serial, "selected device is not in the device list");
            let err = SessionError::DeviceNotFound(serial.to_string());
            inner.events.publish(&SessionEvent::Notice {
                message: err.to_string(),
            });
            return Err(err);
        }

        inner.teardown();
        inner.lock().ui_selection = Some(serial.to_string());

        let connection = match inner.connector.connect(serial, &inner.settings.connect) {
            Ok(connection) => connection,
            Err(source) => return Err(inner.fail_connect(serial, source)),
        };

        let id = Uuid::new_v4();
        let flags = Arc::new(SessionFlags::new(inner.lock().flip));
        let frames = Arc::new(FrameChannel::new());
        let subscription = {
            let weak = Arc::downgrade(inner);
            let flags = Arc::clone(&flags);
            let frames = Arc::clone(&frames);
            let sequence = SequenceCounter::new();
            connection.events().subscribe(move |event: &ConnectionEvent| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_connection_event(id, &flags, &frames, &sequence, event);
                }
            })
        };

        let displaced = inner.lock().active.replace(ActiveSession {
            id,
            serial: serial.to_string(),
            state: SessionState::Connecting,
            flags,
            connection: Arc::clone(&connection),
            frames,
            subscription,
            leases: AutomationLeases::new(),
            resolution: None,
            device_name: None,
        });
        // A concurrent select may have slipped in between teardown and here.
        if let Some(displaced) = displaced {
            displaced.shut_down();
        }

        info!(%serial, session = %id, "connecting");
        inner.publish_state(Some(serial), SessionState::Connecting);

        let spawned = {
            let weak = Arc::downgrade(inner);
            thread::Builder::new()
                .name(format!("mirror-session-{serial}"))
                .spawn(move || {
                    let result = connection.start();
                    if let Some(inner) = weak.upgrade() {
                        inner.on_worker_exit(id, result);
                    }
                })
        };
        if let Err(source) = spawned {
            error!(%serial, error = %source, "failed to spawn session worker");
            inner.teardown();
            return Err(SessionError::WorkerSpawn {
                role: "session",
                source,
            });
        }

        Ok(Some(id))
    }

    /// Tears down the current session, leaving the controller idle.
    pub fn stop(&self) {
        self.inner.teardown();
    }

    /// Handles the window closing.
    pub fn close(&self) {
        info!("closing session controller");
        self.inner.lock().ui_selection = None;
        self.inner.teardown();
    }

    /// Sets the flip flag.
    ///
    /// The value becomes the initial flag of future sessions.  It is applied
    /// to the current session only while connected, effective from the next
    /// frame.  Returns `true` if it was applied live.
    pub fn set_flip(&self, flip: bool) -> bool {
        let mut slot = self.inner.lock();
        slot.flip = flip;
        match slot.active.as_ref() {
            Some(s) if s.state == SessionState::Connected => {
                s.flags.set_flip(flip);
                debug!(flip, "flip applied");
                true
            }
            _ => false,
        }
    }

    /// Flips the automation flag of the connected session.
    ///
    /// Enabling spawns an automation consumer; disabling lets the running
    /// consumer finish its current iteration.  Returns the new value, or
    /// `None` if the call was ignored.
    pub fn toggle_automation(&self) -> Option<bool> {
        let inner = &self.inner;
        let (running, consumer, id) = {
            let slot = inner.lock();
            let session = inner.input_session(&slot)?;
            let running = session.flags.toggle_running();
            let consumer = running.then(|| {
                AutomationConsumer::new(
                    Arc::clone(&session.frames),
                    Arc::clone(&session.flags),
                    Arc::clone(&session.connection),
                    Arc::clone(&inner.script),
                    inner.settings.automation.clone(),
                    session.leases.issue(),
                )
            });
            (running, consumer, session.id)
        };

        if let Some(consumer) = consumer {
            let weak = Arc::downgrade(inner);
            let spawned = thread::Builder::new()
                .name("mirror-automation".to_string())
                .spawn(move || {
                    let exit = consumer.run();
                    if let Some(inner) = weak.upgrade() {
                        inner.on_automation_exit(id, exit);
                    }
                });
            if let Err(e) = spawned {
                error!(error = %e, "failed to spawn automation worker");
                inner.set_running_if_current(id, false);
                inner.events.publish(&SessionEvent::AutomationChanged { running: false });
                return Some(false);
            }
        }

        info!(running, "automation toggled");
        inner.events.publish(&SessionEvent::AutomationChanged { running });
        Some(running)
    }

    /// Sends HOME (down, then up).  Returns `false` if ignored or failed.
    pub fn send_home(&self) -> bool {
        self.inner
            .send_guarded(|_| Some(ControlAction::key_press(KeyCode::HOME).to_vec()))
    }

    /// Sends BACK (down, then up).  Returns `false` if ignored or failed.
    pub fn send_back(&self) -> bool {
        self.inner
            .send_guarded(|_| Some(ControlAction::key_press(KeyCode::BACK).to_vec()))
    }

    /// Forwards a pointer event given in window coordinates.
    pub fn pointer_event(&self, raw_x: f64, raw_y: f64, phase: ActionPhase) -> bool {
        let translator = self.inner.translator;
        self.inner.send_guarded(|resolution| {
            translator
                .pointer_action(raw_x, raw_y, phase, resolution?)
                .map(|a| vec![a])
        })
    }

    /// Forwards a host key event.  Unmapped keys are dropped.
    pub fn key_event(&self, raw_code: i32, phase: ActionPhase) -> bool {
        let translator = self.inner.translator;
        self.inner
            .send_guarded(|_| translator.key_action(raw_code, phase).map(|a| vec![a]))
    }
}

impl ControllerInner {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish_state(&self, serial: Option<&str>, state: SessionState) {
        self.events.publish(&SessionEvent::StateChanged {
            serial: serial.map(str::to_string),
            state,
        });
    }

    /// Returns the session input may be sent to: connected, alive, and
    /// matching the UI selection.
    fn input_session<'a>(&self, slot: &'a Slot) -> Option<&'a ActiveSession> {
        let session = slot.active.as_ref()?;
        if session.state != SessionState::Connected || !session.flags.is_alive() {
            debug!(state = session.state.as_str(), "input ignored: session not connected");
            return None;
        }
        if slot.ui_selection.as_deref() != Some(session.serial.as_str()) {
            debug!(serial = %session.serial, "input ignored: UI selection changed");
            return None;
        }
        Some(session)
    }

    /// Builds actions with `build` and sends them if the guard passes.
    fn send_guarded<F>(&self, build: F) -> bool
    where
        F: FnOnce(Option<Resolution>) -> Option<Vec<ControlAction>>,
    {
        let handles = {
            let slot = self.lock();
            match self.input_session(&slot) {
                Some(session) => SessionHandles::of(session),
                None => return false,
            }
        };
        let Some(actions) = build(handles.resolution) else {
            return false;
        };

        for action in actions {
            if let Err(e) = handles.connection.send_control(action) {
                warn!(serial = %handles.serial, error = %e, "control action failed");
                return false;
            }
        }
        true
    }

    fn on_connection_event(
        &self,
        id: SessionId,
        flags: &SessionFlags,
        frames: &FrameChannel,
        sequence: &SequenceCounter,
        event: &ConnectionEvent,
    ) {
        match event {
            ConnectionEvent::Initialized {
                device_name,
                resolution,
            } => self.mark_connected(id, device_name, *resolution),
            ConnectionEvent::FrameReceived(frame) => {
                if !flags.is_alive() {
                    return;
                }
                let mut frame = frame.clone().with_sequence(sequence.next());
                if flags.is_flipped() {
                    frame = frame.flipped_horizontally();
                }
                if flags.is_running() {
                    frames.push(frame.clone());
                }
                self.events.publish(&SessionEvent::Frame(frame));
            }
        }
    }

    fn mark_connected(&self, id: SessionId, device_name: &str, resolution: Resolution) {
        let serial = {
            let mut slot = self.lock();
            match slot.active.as_mut() {
                Some(s) if s.id == id && s.state == SessionState::Connecting => {
                    s.state = SessionState::Connected;
                    s.device_name = Some(device_name.to_string());
                    s.resolution = Some(resolution);
                    s.serial.clone()
                }
                _ => return,
            }
        };

        info!(
            %serial,
            device_name,
            width = resolution.width,
            height = resolution.height,
            "session connected"
        );
        self.events.publish(&SessionEvent::Initialized {
            serial: serial.clone(),
            device_name: device_name.to_string(),
            resolution,
        });
        self.publish_state(Some(&serial), SessionState::Connected);
    }

    /// Moves session `id` to `Disconnected` and stops its workers.
    ///
    /// Returns the session's handles, or `None` if `id` is no longer the
    /// active session or is already disconnected.
    fn mark_disconnected(&self, id: SessionId) -> Option<SessionHandles> {
        let handles = {
            let mut slot = self.lock();
            let session = slot.active.as_mut().filter(|s| s.id == id)?;
            if session.state == SessionState::Disconnected {
                return None;
            }
            session.state = SessionState::Disconnected;
            session.leases.revoke_all();
            SessionHandles::of(session)
        };

        handles.flags.set_running(false);
        handles.flags.set_alive(false);
        handles.connection.events().unsubscribe(handles.subscription);
        handles.connection.stop();
        handles.frames.close();
        Some(handles)
    }

    fn on_worker_exit(&self, id: SessionId, result: Result<(), TransportError>) {
        let Some(handles) = self.mark_disconnected(id) else {
            return;
        };
        let serial = handles.serial;

        let message = match result {
            Ok(()) => {
                warn!(%serial, session = %handles.id, "connection closed");
                format!("connection to {serial} closed")
            }
            Err(source) => {
                let err = SessionError::ConnectionFailure {
                    serial: serial.clone(),
                    source,
                };
                error!(error = %err, "session failed");
                err.to_string()
            }
        };

        self.events.publish(&SessionEvent::ConnectionLost {
            serial: serial.clone(),
            message,
        });
        self.publish_state(Some(&serial), SessionState::Disconnected);
    }

    fn on_automation_exit(&self, id: SessionId, exit: AutomationExit) {
        let reason = match exit {
            AutomationExit::Disabled => return,
            AutomationExit::SessionEnded => None,
            AutomationExit::Failed(reason) => Some(reason),
        };

        let is_current = self
            .lock()
            .active
            .as_ref()
            .is_some_and(|s| s.id == id && s.state == SessionState::Connected);
        if is_current {
            self.events.publish(&SessionEvent::AutomationChanged { running: false });
        }

        let Some(reason) = reason else {
            return;
        };
        if self.settings.automation.policy != EscalationPolicy::TearDownSession {
            return;
        }
        let Some(handles) = self.mark_disconnected(id) else {
            return;
        };

        error!(serial = %handles.serial, %reason, "automation failed, tearing down session");
        self.events.publish(&SessionEvent::ConnectionLost {
            serial: handles.serial.clone(),
            message: format!("automation failed: {reason}"),
        });
        self.publish_state(Some(&handles.serial), SessionState::Disconnected);
    }

    fn set_running_if_current(&self, id: SessionId, running: bool) {
        let slot = self.lock();
        if let Some(s) = slot.active.as_ref().filter(|s| s.id == id) {
            s.flags.set_running(running);
        }
    }

    fn fail_connect(&self, serial: &str, source: TransportError) -> SessionError {
        self.lock().resting = SessionState::Disconnected;
        let err = SessionError::ConnectionFailure {
            serial: serial.to_string(),
            source,
        };
        error!(error = %err, "connect failed");
        self.events.publish(&SessionEvent::ConnectionLost {
            serial: serial.to_string(),
            message: err.to_string(),
        });
        self.publish_state(Some(serial), SessionState::Disconnected);
        err
    }

    /// Stopping → Idle for the active session, if any.
    fn teardown(&self) {
        let session = {
            let mut slot = self.lock();
            let session = slot.active.take();
            slot.resting = if session.is_some() {
                SessionState::Stopping
            } else {
                SessionState::Idle
            };
            session
        };
        let Some(session) = session else {
            return;
        };

        self.publish_state(Some(&session.serial), SessionState::Stopping);
        session.shut_down();
        info!(serial = %session.serial, session = %session.id, "session stopped");

        {
            let mut slot = self.lock();
            if slot.active.is_none() && slot.resting == SessionState::Stopping {
                slot.resting = SessionState::Idle;
            }
        }
        self.publish_state(None, SessionState::Idle);
    }
}

// Workers hold only weak references, so dropping the last controller handle
// must stop the session explicitly.
impl Drop for ControllerInner {
    fn drop(&mut self) {
        let slot = self.slot.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = slot.active.take() {
            session.shut_down();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::manage_devices::{write_registry, DeviceRegistry};
    use crate::infrastructure::adb::mock::MockConnector;
    use mirror_core::Device;
    use std::time::{Duration, Instant};

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        condition()
    }

    fn controller_with(serials: &[&str]) -> (SessionController, Arc<MockConnector>) {
        let registry = DeviceRegistry::shared();
        let devices: Vec<Device> = serials.iter().map(|s| Device::new(*s)).collect();
        write_registry(&registry).reconcile(&devices);
        let connector = Arc::new(MockConnector::new("Pixel 7", Resolution::new(1080, 2400)));
        let controller = SessionController::new(registry, connector.clone(), ControllerSettings::default());
        (controller, connector)
    }

    #[test]
    fn test_new_controller_is_idle() {
        let (controller, _) = controller_with(&[]);
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(controller.status().session_id.is_none());
    }

    #[test]
    fn test_placeholder_selection_stays_idle() {
        let (controller, connector) = controller_with(&["ABC123"]);

        let result = controller.select_device(mirror_core::PLACEHOLDER_SERIAL);

        assert!(matches!(result, Ok(None)));
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(connector.connections().is_empty());
    }

    #[test]
    fn test_set_flip_while_idle_is_remembered_for_next_session() {
        // Arrange
        let (controller, _) = controller_with(&["ABC123"]);

        // Act
        let applied = controller.set_flip(true);
        controller.select_device("ABC123").expect("select succeeds");

        // Assert
        assert!(!applied);
        assert!(wait_until(|| controller.state() == SessionState::Connected));
        assert!(controller.status().flip);
        controller.close();
    }

    #[test]
    fn test_connect_rejection_ends_disconnected() {
        // Arrange
        let (controller, connector) = controller_with(&["ABC123"]);
        connector.fail_connect(true);

        // Act
        let result = controller.select_device("ABC123");

        // Assert
        assert!(matches!(result, Err(SessionError::ConnectionFailure { .. })));
        assert_eq!(controller.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_toggle_automation_ignored_when_not_connected() {
        let (controller, _) = controller_with(&[]);
        assert_eq!(controller.toggle_automation(), None);
    }

    #[test]
    fn test_dropping_controller_stops_connection() {
        // Arrange
        let (controller, connector) = controller_with(&["ABC123"]);
        controller.select_device("ABC123").expect("select succeeds");
        assert!(wait_until(|| controller.state() == SessionState::Connected));
        let connection = connector.last_connection().expect("connection created");

        // Act
        drop(controller);

        // Assert
        assert!(connection.is_stopped());
    }
}
