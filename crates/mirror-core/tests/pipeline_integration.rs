//! Integration tests for the frame pipeline primitives.
//!
//! These tests wire `FrameChannel`, `EventBus`, and `SequenceCounter`
//! together the way a session does: a producer thread publishes frames on a
//! bus, a handler stamps and forwards them into the channel, and a consumer
//! thread drains the channel.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use mirror_core::listing::{offline_serials, parse_device_listing};
use mirror_core::{EventBus, Frame, FrameChannel, KeyCode, KeyMapper, PixelFormat, SequenceCounter};

fn blank_frame() -> Frame {
    Frame::new(vec![0u8; 2 * 2 * 4], 2, 2, PixelFormat::Rgba8888).expect("valid frame")
}

#[test]
fn test_bus_to_channel_delivers_latest_stamped_frame() {
    // Arrange
    let bus: EventBus<Frame> = EventBus::new();
    let channel = Arc::new(FrameChannel::new());
    let counter = Arc::new(SequenceCounter::new());
    {
        let channel = Arc::clone(&channel);
        let counter = Arc::clone(&counter);
        bus.subscribe(move |frame: &Frame| {
            channel.push(frame.clone().with_sequence(counter.next()));
        });
    }

    // Act – five frames arrive before anyone consumes
    for _ in 0..5 {
        bus.publish(&blank_frame());
    }

    // Assert
    let latest = channel.pop().expect("frame available");
    assert_eq!(latest.sequence(), 4);
    assert_eq!(channel.dropped_frames(), 4);
}

#[test]
fn test_slow_consumer_only_observes_increasing_sequences() {
    // Arrange
    let channel = Arc::new(FrameChannel::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let consumer = {
        let channel = Arc::clone(&channel);
        let seen = Arc::clone(&seen);
        thread::spawn(move || {
            while let Some(frame) = channel.pop() {
                seen.lock().unwrap().push(frame.sequence());
                thread::sleep(Duration::from_millis(2));
            }
        })
    };

    // Act
    for seq in 0..200 {
        channel.push(blank_frame().with_sequence(seq));
        thread::sleep(Duration::from_micros(200));
    }
    thread::sleep(Duration::from_millis(20));
    channel.close();
    consumer.join().expect("consumer panicked");

    // Assert
    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    assert!(seen.windows(2).all(|w| w[1] > w[0]));
    assert!(seen.len() < 200, "a slow consumer must skip stale frames");
}

#[test]
fn test_listing_feeds_both_registry_and_reconnector_views() {
    let text = "List of devices attached\nA device model:Pixel_7\nB offline\nemulator-5556 offline\n";

    let devices = parse_device_listing(text);
    let offline = offline_serials(text);

    assert_eq!(devices.len(), 3);
    assert_eq!(devices[0].name, "Pixel 7");
    assert_eq!(offline, vec!["B".to_string()]);
}

#[test]
fn test_key_mapper_is_case_insensitive_for_letters() {
    assert_eq!(KeyMapper::host_to_android('q' as i32), KeyMapper::host_to_android('Q' as i32));
    assert_eq!(KeyMapper::host_to_android('A' as i32), KeyCode::A);
}
