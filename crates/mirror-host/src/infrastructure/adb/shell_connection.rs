//! A mirroring transport built from plain `adb shell` commands.
//!
//! No helper has to be pushed to the device:
//!
//! - The resolution comes from `wm size` (the override size wins over the
//!   physical one, since that is what input coordinates refer to) and the
//!   display name from `getprop ro.product.model`.
//! - Frames are grabbed with `exec-out screencap` (raw RGBA), scaled down to
//!   the requested longest side, and published as `FrameReceived`.
//! - Control actions go to a per-connection worker that turns them into
//!   `input motionevent` / `input keyevent` calls one at a time, so
//!   concurrent senders are serialised and never block the frame loop.
//!
//! The frame rate is bounded by `screencap` itself, typically a few frames
//! per second.  Bitrate and encoder selection do not apply to this transport.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use mirror_core::{ActionPhase, ControlAction, EventBus, Frame, PixelFormat, Resolution};
use tracing::{debug, info, trace, warn};

use super::process::{describe, run_with_timeout};
use super::DEFAULT_COMMAND_TIMEOUT;
use crate::application::transport::{
    ConnectOptions, ConnectionEvent, DeviceConnection, DeviceConnector, TransportError,
};

/// Consecutive failed grabs after which the connection gives up.
const MAX_CAPTURE_FAILURES: u32 = 3;

/// `screencap` pixel format codes.
const FORMAT_RGBA_8888: u32 = 1;
const FORMAT_RGBX_8888: u32 = 2;
const FORMAT_RGB_888: u32 = 3;
const FORMAT_BGRA_8888: u32 = 5;

/// Builds [`AdbShellConnection`]s.
#[derive(Debug, Clone)]
pub struct AdbShellConnector {
    adb_path: String,
    command_timeout: Duration,
}

impl AdbShellConnector {
    pub fn new(adb_path: impl Into<String>, command_timeout: Duration) -> Self {
        Self {
            adb_path: adb_path.into(),
            command_timeout,
        }
    }
}

impl Default for AdbShellConnector {
    fn default() -> Self {
        Self::new("adb", DEFAULT_COMMAND_TIMEOUT)
    }
}

impl DeviceConnector for AdbShellConnector {
    fn connect(
        &self,
        serial: &str,
        options: &ConnectOptions,
    ) -> Result<Arc<dyn DeviceConnection>, TransportError> {
        if serial.trim().is_empty() {
            return Err(TransportError::Protocol("empty device serial".to_string()));
        }
        debug!(
            %serial,
            bitrate = options.bitrate,
            encoder = options.encoder_name.as_deref().unwrap_or("auto"),
            "video stream options are ignored by the shell transport"
        );
        Ok(Arc::new(AdbShellConnection {
            serial: serial.to_string(),
            adb_path: self.adb_path.clone(),
            command_timeout: self.command_timeout,
            options: options.clone(),
            events: EventBus::new(),
            stopped: AtomicBool::new(false),
            controls: Mutex::new(None),
        }))
    }
}

/// One `adb shell` mirroring connection.
pub struct AdbShellConnection {
    serial: String,
    adb_path: String,
    command_timeout: Duration,
    options: ConnectOptions,
    events: EventBus<ConnectionEvent>,
    stopped: AtomicBool,
    controls: Mutex<Option<Sender<ControlAction>>>,
}

impl AdbShellConnection {
    fn shell(&self, args: &[&str]) -> Result<Vec<u8>, TransportError> {
        let mut full = vec!["-s", self.serial.as_str()];
        full.extend_from_slice(args);
        let output = run_with_timeout(&self.adb_path, &full, self.command_timeout)?;
        if !output.success() {
            return Err(TransportError::CommandFailed {
                command: describe(&self.adb_path, &full),
                detail: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    fn query_resolution(&self) -> Result<Resolution, TransportError> {
        let stdout = self.shell(&["shell", "wm", "size"])?;
        let text = String::from_utf8_lossy(&stdout);
        parse_wm_size(&text)
            .ok_or_else(|| TransportError::Protocol(format!("unrecognised `wm size` output: {}", text.trim())))
    }

    fn query_device_name(&self) -> String {
        match self.shell(&["shell", "getprop", "ro.product.model"]) {
            Ok(stdout) => {
                let name = String::from_utf8_lossy(&stdout).trim().to_string();
                if name.is_empty() {
                    self.serial.clone()
                } else {
                    name
                }
            }
            Err(e) => {
                warn!(serial = %self.serial, error = %e, "could not read device model");
                self.serial.clone()
            }
        }
    }

    fn grab_frame(&self) -> Result<Frame, TransportError> {
        let raw = self.shell(&["exec-out", "screencap"])?;
        let image = scale_to_fit(decode_screencap(&raw)?, self.options.max_width);
        Frame::new(image.pixels, image.width, image.height, image.format)
            .map_err(|e| TransportError::Protocol(e.to_string()))
    }

    fn spawn_control_worker(&self) -> Result<thread::JoinHandle<()>, TransportError> {
        let (tx, rx) = mpsc::channel();
        let adb_path = self.adb_path.clone();
        let serial = self.serial.clone();
        let timeout = self.command_timeout;
        let handle = thread::Builder::new()
            .name(format!("mirror-control-{}", self.serial))
            .spawn(move || run_control_worker(&adb_path, &serial, timeout, rx))?;
        *self.lock_controls() = Some(tx);
        Ok(handle)
    }

    fn lock_controls(&self) -> std::sync::MutexGuard<'_, Option<Sender<ControlAction>>> {
        self.controls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    fn frame_loop(&self) -> Result<(), TransportError> {
        let mut failures = 0;
        while !self.is_stopped() {
            match self.grab_frame() {
                Ok(frame) => {
                    failures = 0;
                    trace!(width = frame.width(), height = frame.height(), "frame grabbed");
                    self.events.publish(&ConnectionEvent::FrameReceived(frame));
                }
                Err(_) if self.is_stopped() => break,
                Err(e) => {
                    failures += 1;
                    warn!(serial = %self.serial, error = %e, failures, "frame grab failed");
                    if failures >= MAX_CAPTURE_FAILURES {
                        return Err(e);
                    }
                }
            }
            thread::sleep(self.options.frame_interval);
        }
        Ok(())
    }
}

impl DeviceConnection for AdbShellConnection {
    fn start(&self) -> Result<(), TransportError> {
        if self.is_stopped() {
            return Ok(());
        }

        let resolution = self.query_resolution()?;
        let device_name = self.query_device_name();
        let worker = self.spawn_control_worker()?;
        info!(
            serial = %self.serial,
            %device_name,
            width = resolution.width,
            height = resolution.height,
            "shell transport initialised"
        );
        self.events.publish(&ConnectionEvent::Initialized {
            device_name,
            resolution,
        });

        let result = self.frame_loop();

        // Closing the channel ends the worker once queued actions drain.
        self.lock_controls().take();
        let _ = worker.join();
        result
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.lock_controls().take();
    }

    fn events(&self) -> &EventBus<ConnectionEvent> {
        &self.events
    }

    fn send_control(&self, action: ControlAction) -> Result<(), TransportError> {
        let controls = self.lock_controls();
        let tx = controls.as_ref().ok_or(TransportError::Closed)?;
        tx.send(action).map_err(|_| TransportError::Closed)
    }
}

fn run_control_worker(adb_path: &str, serial: &str, timeout: Duration, rx: Receiver<ControlAction>) {
    for action in rx {
        let Some(input_args) = input_command(action) else {
            continue;
        };
        let mut args = vec!["-s".to_string(), serial.to_string(), "shell".to_string()];
        args.extend(input_args);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        match run_with_timeout(adb_path, &args, timeout) {
            Ok(output) if output.success() => {}
            Ok(output) => warn!(%serial, stderr = %output.stderr.trim(), "input command failed"),
            Err(e) => warn!(%serial, error = %e, "input command failed"),
        }
    }
    debug!(%serial, "control worker finished");
}

/// The `input ...` arguments for `action`, or `None` if nothing is sent.
///
/// Key presses are injected whole on the down phase, since `input keyevent`
/// has no separate up.
pub fn input_command(action: ControlAction) -> Option<Vec<String>> {
    match action {
        ControlAction::Touch { x, y, phase } => {
            let phase = match phase {
                ActionPhase::Down => "DOWN",
                ActionPhase::Move => "MOVE",
                ActionPhase::Up => "UP",
            };
            Some(vec![
                "input".to_string(),
                "motionevent".to_string(),
                phase.to_string(),
                x.to_string(),
                y.to_string(),
            ])
        }
        ControlAction::Keycode {
            code,
            phase: ActionPhase::Down,
        } => Some(vec![
            "input".to_string(),
            "keyevent".to_string(),
            code.value().to_string(),
        ]),
        ControlAction::Keycode { .. } => None,
    }
}

/// Parses `wm size` output, preferring `Override size` over `Physical size`.
pub fn parse_wm_size(text: &str) -> Option<Resolution> {
    let mut physical = None;
    let mut overridden = None;
    for line in text.lines() {
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let Some((w, h)) = value.trim().split_once('x') else {
            continue;
        };
        let (Ok(w), Ok(h)) = (w.trim().parse::<u32>(), h.trim().parse::<u32>()) else {
            continue;
        };
        if label.trim().eq_ignore_ascii_case("override size") {
            overridden = Some(Resolution::new(w, h));
        } else {
            physical = Some(Resolution::new(w, h));
        }
    }
    overridden.or(physical)
}

/// One decoded `screencap` image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screencap {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: Vec<u8>,
}

/// Decodes raw `screencap` output.
///
/// The header is width, height, and format as little-endian `u32`s, followed
/// on newer devices by a colour-space `u32`.  The header length is inferred
/// from the payload size.  Four-byte formats come out as
/// [`PixelFormat::Rgba8888`], `RGB_888` as [`PixelFormat::Bgr888`].
pub fn decode_screencap(raw: &[u8]) -> Result<Screencap, TransportError> {
    let word = |i: usize| -> Option<u32> {
        raw.get(i * 4..i * 4 + 4)
            .and_then(|b| b.try_into().ok())
            .map(u32::from_le_bytes)
    };
    let (Some(width), Some(height), Some(code)) = (word(0), word(1), word(2)) else {
        return Err(TransportError::Protocol(format!(
            "screencap output too short: {} bytes",
            raw.len()
        )));
    };

    let format = match code {
        FORMAT_RGBA_8888 | FORMAT_RGBX_8888 | FORMAT_BGRA_8888 => PixelFormat::Rgba8888,
        FORMAT_RGB_888 => PixelFormat::Bgr888,
        other => {
            return Err(TransportError::Protocol(format!(
                "unsupported screencap pixel format {other}"
            )))
        }
    };

    let payload = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(format.bytes_per_pixel()))
        .ok_or_else(|| TransportError::Protocol(format!("implausible screen size {width}x{height}")))?;
    let header = [12usize, 16]
        .into_iter()
        .find(|h| raw.len() == h + payload)
        .ok_or_else(|| {
            TransportError::Protocol(format!(
                "screencap payload of {} bytes does not match {width}x{height}",
                raw.len()
            ))
        })?;

    let mut pixels = raw[header..].to_vec();
    match code {
        FORMAT_RGBX_8888 => pixels.chunks_exact_mut(4).for_each(|px| px[3] = 0xFF),
        FORMAT_BGRA_8888 => pixels.chunks_exact_mut(4).for_each(|px| px.swap(0, 2)),
        FORMAT_RGB_888 => pixels.chunks_exact_mut(3).for_each(|px| px.swap(0, 2)),
        _ => {}
    }
    Ok(Screencap {
        width,
        height,
        format,
        pixels,
    })
}

/// Nearest-neighbour downscale so the longest side is at most `max_side`.
pub fn scale_to_fit(image: Screencap, max_side: u32) -> Screencap {
    let (width, height, format) = (image.width, image.height, image.format);
    let longest = width.max(height);
    if max_side == 0 || longest <= max_side {
        return image;
    }

    let bpp = format.bytes_per_pixel();
    let scaled = |side: u32| ((u64::from(side) * u64::from(max_side)) / u64::from(longest)).max(1) as u32;
    let (new_w, new_h) = (scaled(width), scaled(height));

    let mut out = Vec::with_capacity(new_w as usize * new_h as usize * bpp);
    for y in 0..new_h {
        let src_y = (u64::from(y) * u64::from(height) / u64::from(new_h)) as usize;
        for x in 0..new_w {
            let src_x = (u64::from(x) * u64::from(width) / u64::from(new_w)) as usize;
            let offset = (src_y * width as usize + src_x) * bpp;
            out.extend_from_slice(&image.pixels[offset..offset + bpp]);
        }
    }
    Screencap {
        width: new_w,
        height: new_h,
        format,
        pixels: out,
    }
}
