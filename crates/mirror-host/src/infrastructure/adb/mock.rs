//! Mock device connection for unit and integration testing.
//!
//! [`MockConnector`] hands out [`MockConnection`]s that behave like a real
//! mirroring connection without a device: `start()` raises `Initialized`
//! and then blocks until `stop()`, control actions are recorded, and tests
//! push frames with [`MockConnection::emit_frame`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use mirror_core::{ControlAction, EventBus, Frame, Resolution};

use crate::application::transport::{
    ConnectOptions, ConnectionEvent, DeviceConnection, DeviceConnector, TransportError,
};

#[derive(Default)]
struct RunState {
    stopped: bool,
    end_error: Option<String>,
}

/// A scripted [`DeviceConnection`] that records what it is asked to do.
pub struct MockConnection {
    serial: String,
    device_name: String,
    resolution: Resolution,
    events: EventBus<ConnectionEvent>,
    sent: Mutex<Vec<ControlAction>>,
    run: Mutex<RunState>,
    run_changed: Condvar,
    started: AtomicBool,
    auto_initialize: AtomicBool,
    fail_controls: AtomicBool,
    start_failure: Mutex<Option<String>>,
}

impl MockConnection {
    pub fn new(serial: &str, device_name: &str, resolution: Resolution) -> Self {
        Self {
            serial: serial.to_string(),
            device_name: device_name.to_string(),
            resolution,
            events: EventBus::new(),
            sent: Mutex::new(Vec::new()),
            run: Mutex::new(RunState::default()),
            run_changed: Condvar::new(),
            started: AtomicBool::new(false),
            auto_initialize: AtomicBool::new(true),
            fail_controls: AtomicBool::new(false),
            start_failure: Mutex::new(None),
        }
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Makes the next `start()` fail immediately with `message`.
    pub fn fail_start_with(&self, message: &str) {
        *self.start_failure.lock().expect("lock poisoned") = Some(message.to_string());
    }

    /// When `false`, `start()` waits for [`initialize`](Self::initialize)
    /// instead of raising `Initialized` itself.
    pub fn set_auto_initialize(&self, value: bool) {
        self.auto_initialize.store(value, Ordering::SeqCst);
    }

    /// Makes every subsequent `send_control` fail.
    pub fn fail_controls(&self, value: bool) {
        self.fail_controls.store(value, Ordering::SeqCst);
    }

    /// Raises the `Initialized` event.
    pub fn initialize(&self) {
        self.events.publish(&ConnectionEvent::Initialized {
            device_name: self.device_name.clone(),
            resolution: self.resolution,
        });
    }

    /// Raises a `FrameReceived` event.
    pub fn emit_frame(&self, frame: Frame) {
        self.events.publish(&ConnectionEvent::FrameReceived(frame));
    }

    /// Ends a running `start()` with an error, as if the link dropped.
    pub fn drop_link(&self, message: &str) {
        let mut run = self.run.lock().expect("lock poisoned");
        run.stopped = true;
        run.end_error = Some(message.to_string());
        self.run_changed.notify_all();
    }

    /// Control actions received so far, in order.
    pub fn sent_actions(&self) -> Vec<ControlAction> {
        self.sent.lock().expect("lock poisoned").clone()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.run.lock().expect("lock poisoned").stopped
    }

    /// Blocks until `start()` has been entered or `timeout` elapses.
    pub fn wait_started(&self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while !self.is_started() {
            if std::time::Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }
}

impl DeviceConnection for MockConnection {
    fn start(&self) -> Result<(), TransportError> {
        self.started.store(true, Ordering::SeqCst);

        if let Some(message) = self.start_failure.lock().expect("lock poisoned").take() {
            return Err(TransportError::Protocol(message));
        }
        if self.auto_initialize.load(Ordering::SeqCst) {
            self.initialize();
        }

        let mut run = self.run.lock().expect("lock poisoned");
        while !run.stopped {
            run = self.run_changed.wait(run).expect("lock poisoned");
        }
        match run.end_error.take() {
            Some(message) => Err(TransportError::Protocol(message)),
            None => Ok(()),
        }
    }

    fn stop(&self) {
        let mut run = self.run.lock().expect("lock poisoned");
        run.stopped = true;
        self.run_changed.notify_all();
    }

    fn events(&self) -> &EventBus<ConnectionEvent> {
        &self.events
    }

    fn send_control(&self, action: ControlAction) -> Result<(), TransportError> {
        if self.is_stopped() {
            return Err(TransportError::Closed);
        }
        if self.fail_controls.load(Ordering::SeqCst) {
            return Err(TransportError::CommandFailed {
                command: "input".to_string(),
                detail: "mock failure".to_string(),
            });
        }
        self.sent.lock().expect("lock poisoned").push(action);
        Ok(())
    }
}

/// A [`DeviceConnector`] producing [`MockConnection`]s.
pub struct MockConnector {
    device_name: String,
    resolution: Resolution,
    fail_connect: AtomicBool,
    fail_start: Mutex<Option<String>>,
    auto_initialize: AtomicBool,
    connections: Mutex<Vec<Arc<MockConnection>>>,
    options: Mutex<Vec<ConnectOptions>>,
}

impl MockConnector {
    pub fn new(device_name: &str, resolution: Resolution) -> Self {
        Self {
            device_name: device_name.to_string(),
            resolution,
            fail_connect: AtomicBool::new(false),
            fail_start: Mutex::new(None),
            auto_initialize: AtomicBool::new(true),
            connections: Mutex::new(Vec::new()),
            options: Mutex::new(Vec::new()),
        }
    }

    /// Makes subsequent `connect` calls fail.
    pub fn fail_connect(&self, value: bool) {
        self.fail_connect.store(value, Ordering::SeqCst);
    }

    /// Makes the `start()` of subsequently created connections fail.
    pub fn fail_start_with(&self, message: &str) {
        *self.fail_start.lock().expect("lock poisoned") = Some(message.to_string());
    }

    /// See [`MockConnection::set_auto_initialize`].
    pub fn set_auto_initialize(&self, value: bool) {
        self.auto_initialize.store(value, Ordering::SeqCst);
    }

    /// Every connection created so far, oldest first.
    pub fn connections(&self) -> Vec<Arc<MockConnection>> {
        self.connections.lock().expect("lock poisoned").clone()
    }

    pub fn last_connection(&self) -> Option<Arc<MockConnection>> {
        self.connections.lock().expect("lock poisoned").last().cloned()
    }

    /// Options passed to each `connect` call.
    pub fn received_options(&self) -> Vec<ConnectOptions> {
        self.options.lock().expect("lock poisoned").clone()
    }
}

impl DeviceConnector for MockConnector {
    fn connect(
        &self,
        serial: &str,
        options: &ConnectOptions,
    ) -> Result<Arc<dyn DeviceConnection>, TransportError> {
        self.options
            .lock()
            .expect("lock poisoned")
            .push(options.clone());
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(TransportError::Spawn {
                program: "adb".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "mock connect failure"),
            });
        }

        let connection = Arc::new(MockConnection::new(serial, &self.device_name, self.resolution));
        connection.set_auto_initialize(self.auto_initialize.load(Ordering::SeqCst));
        if let Some(message) = self.fail_start.lock().expect("lock poisoned").as_deref() {
            connection.fail_start_with(message);
        }
        self.connections
            .lock()
            .expect("lock poisoned")
            .push(Arc::clone(&connection));
        Ok(connection)
    }
}
