// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the session controller lifecycle
//!
//! A scripted host stands in for the platform. In auto mode it completes the
//! asynchronous steps inline; in manual mode the test fires the completion
//! callbacks itself through the controller's event surface, which is how the
//! cancellation and disconnect paths are exercised.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use viewfinder::{
    CaptureHost, CaptureSize, DeviceDescriptor, DeviceId, ErrorKind, FrameSink, HostResult,
    LensFacing, SessionConfig, SessionController, SessionEvents, SessionState, SinkTarget,
    StateChange, Transform, ViewportSize,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn test_device() -> DeviceDescriptor {
    DeviceDescriptor {
        id: DeviceId::new("/dev/video0"),
        name: "Fake Camera".to_string(),
        supported_sizes: vec![
            CaptureSize::new(1920, 1080),
            CaptureSize::new(1280, 720),
            CaptureSize::new(640, 480),
        ],
        facing: LensFacing::External,
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Completion {
    /// Post the success callback before returning
    Auto,
    /// Post nothing; the test delivers callbacks itself
    Manual,
    /// Post the open-failure callback
    FailOpen,
    /// Post the configure-failure callback
    FailConfigure,
}

struct FakeHost {
    calls: Arc<Mutex<Vec<String>>>,
    devices: Vec<DeviceDescriptor>,
    completion: Completion,
}

impl FakeHost {
    fn new(completion: Completion) -> (Self, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let host = Self {
            calls: Arc::clone(&calls),
            devices: vec![test_device()],
            completion,
        };
        (host, calls)
    }

    fn log(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

impl CaptureHost for FakeHost {
    fn list_devices(&mut self) -> Vec<DeviceDescriptor> {
        self.log("list_devices");
        self.devices.clone()
    }

    fn open_device(&mut self, _device: &DeviceDescriptor, events: &SessionEvents) {
        self.log("open_device");
        match self.completion {
            Completion::Auto | Completion::FailConfigure => events.device_opened(),
            Completion::FailOpen => events.device_error("fake open failure"),
            Completion::Manual => {}
        }
    }

    fn build_session(&mut self, _target: SinkTarget, _size: CaptureSize, events: &SessionEvents) {
        self.log("build_session");
        match self.completion {
            Completion::Auto => events.session_configured(),
            Completion::FailConfigure => events.session_config_failed("fake config failure"),
            Completion::FailOpen | Completion::Manual => {}
        }
    }

    fn start_repeating(&mut self, _continuous_autofocus: bool) -> HostResult<()> {
        self.log("start_repeating");
        Ok(())
    }

    fn stop_repeating(&mut self) -> HostResult<()> {
        self.log("stop_repeating");
        Ok(())
    }

    fn abort_captures(&mut self) -> HostResult<()> {
        self.log("abort_captures");
        Ok(())
    }

    fn release_session(&mut self) -> HostResult<()> {
        self.log("release_session");
        Ok(())
    }

    fn release_device(&mut self) -> HostResult<()> {
        self.log("release_device");
        Ok(())
    }
}

struct TestSink {
    transforms: Mutex<Vec<Transform>>,
    detach_count: Mutex<u32>,
}

impl TestSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            transforms: Mutex::new(Vec::new()),
            detach_count: Mutex::new(0),
        })
    }
}

impl FrameSink for TestSink {
    fn set_transform(&self, transform: Transform) {
        self.transforms.lock().unwrap().push(transform);
    }

    fn capture_target(&self) -> SinkTarget {
        SinkTarget::new(42)
    }

    fn detach(&self) {
        *self.detach_count.lock().unwrap() += 1;
    }
}

/// Poll until the predicate holds; the worker thread needs a moment
fn wait_until(what: &str, predicate: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if predicate() {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("timed out waiting for {}", what);
}

fn observed_changes(controller: &SessionController) -> Arc<Mutex<Vec<StateChange>>> {
    let changes = Arc::new(Mutex::new(Vec::new()));
    let changes_clone = Arc::clone(&changes);
    controller.on_state_changed(move |change| {
        changes_clone.lock().unwrap().push(change);
    });
    changes
}

#[test]
fn test_bind_reaches_streaming() {
    init_tracing();
    let (host, calls) = FakeHost::new(Completion::Auto);
    let sink = TestSink::new();
    let controller =
        SessionController::new(Box::new(host), sink.clone(), SessionConfig::default());
    let changes = observed_changes(&controller);

    controller.bind(ViewportSize::new(800, 480)).unwrap();

    wait_until("streaming", || {
        controller.state() == SessionState::Streaming
    });
    assert!(controller.is_bound());
    assert_eq!(*changes.lock().unwrap(), vec![StateChange::Streaming]);
    assert_eq!(
        *calls.lock().unwrap(),
        vec![
            "list_devices",
            "open_device",
            "build_session",
            "start_repeating",
        ]
    );

    // 1280x720 is the best match for an 800x480 viewport; width fills
    let transforms = sink.transforms.lock().unwrap();
    assert_eq!(transforms.len(), 1);
    assert!((transforms[0].scale_x - 1.0).abs() < 1e-4);
    assert!((transforms[0].scale_y - 0.9375).abs() < 1e-4);
    assert!((transforms[0].translate_y - 15.0).abs() < 1e-4);
}

#[test]
fn test_zero_area_viewport_is_rejected_synchronously() {
    init_tracing();
    let (host, calls) = FakeHost::new(Completion::Auto);
    let controller =
        SessionController::new(Box::new(host), TestSink::new(), SessionConfig::default());

    let result = controller.bind(ViewportSize::new(0, 480));
    assert!(matches!(
        result,
        Err(viewfinder::SessionError::InvalidViewport)
    ));

    // the rejected bind must not have reached the platform
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(controller.state(), SessionState::Closed);
    assert!(calls.lock().unwrap().is_empty());
}

#[test]
fn test_double_bind_opens_the_device_once() {
    init_tracing();
    let (host, calls) = FakeHost::new(Completion::Auto);
    let controller =
        SessionController::new(Box::new(host), TestSink::new(), SessionConfig::default());

    controller.bind(ViewportSize::new(800, 480)).unwrap();
    controller.bind(ViewportSize::new(800, 480)).unwrap();

    wait_until("streaming", || {
        controller.state() == SessionState::Streaming
    });
    std::thread::sleep(Duration::from_millis(30));

    let opens = calls
        .lock()
        .unwrap()
        .iter()
        .filter(|c| *c == "open_device")
        .count();
    assert_eq!(opens, 1);
    assert_eq!(controller.state(), SessionState::Streaming);
}

#[test]
fn test_unbind_without_bind_is_a_no_op() {
    init_tracing();
    let (host, calls) = FakeHost::new(Completion::Auto);
    let controller =
        SessionController::new(Box::new(host), TestSink::new(), SessionConfig::default());

    controller.unbind();
    std::thread::sleep(Duration::from_millis(30));

    assert_eq!(controller.state(), SessionState::Closed);
    assert!(calls.lock().unwrap().is_empty());
}

#[test]
fn test_bind_then_immediate_unbind_never_streams() {
    init_tracing();
    let (host, calls) = FakeHost::new(Completion::Manual);
    let controller =
        SessionController::new(Box::new(host), TestSink::new(), SessionConfig::default());
    let changes = observed_changes(&controller);

    // no callback has arrived between these two calls
    controller.bind(ViewportSize::new(800, 480)).unwrap();
    controller.unbind();

    // the pending open resolves afterwards
    controller.events().device_opened();

    wait_until("closed", || controller.state() == SessionState::Closed);
    std::thread::sleep(Duration::from_millis(30));

    let changes = changes.lock().unwrap();
    assert!(!changes.contains(&StateChange::Streaming));
    assert_eq!(*changes, vec![StateChange::Closed]);

    let calls = calls.lock().unwrap();
    assert!(calls.contains(&"release_device".to_string()));
    assert!(!calls.contains(&"build_session".to_string()));
}

#[test]
fn test_open_failure_is_reported_and_unbind_recovers() {
    init_tracing();
    let (host, calls) = FakeHost::new(Completion::FailOpen);
    let controller =
        SessionController::new(Box::new(host), TestSink::new(), SessionConfig::default());
    let changes = observed_changes(&controller);

    controller.bind(ViewportSize::new(800, 480)).unwrap();

    wait_until("failure", || {
        matches!(controller.state(), SessionState::Failed(_))
    });
    assert_eq!(
        controller.state(),
        SessionState::Failed(ErrorKind::DeviceOpenFailed)
    );
    assert!(!controller.is_bound());

    controller.unbind();
    wait_until("closed", || controller.state() == SessionState::Closed);

    // nothing was acquired, so no release path may run
    let calls = calls.lock().unwrap();
    assert!(!calls.contains(&"release_device".to_string()));
    assert!(!calls.contains(&"release_session".to_string()));
    assert!(!calls.contains(&"stop_repeating".to_string()));
    assert_eq!(
        *changes.lock().unwrap(),
        vec![
            StateChange::Failed(ErrorKind::DeviceOpenFailed),
            StateChange::Closed,
        ]
    );
}

#[test]
fn test_config_failure_keeps_device_until_unbind() {
    init_tracing();
    let (host, calls) = FakeHost::new(Completion::FailConfigure);
    let controller =
        SessionController::new(Box::new(host), TestSink::new(), SessionConfig::default());
    let changes = observed_changes(&controller);

    controller.bind(ViewportSize::new(800, 480)).unwrap();

    wait_until("failure", || {
        matches!(controller.state(), SessionState::Failed(_))
    });
    assert_eq!(
        controller.state(),
        SessionState::Failed(ErrorKind::SessionConfigFailed)
    );
    assert!(!calls.lock().unwrap().contains(&"release_device".to_string()));

    controller.unbind();
    wait_until("closed", || controller.state() == SessionState::Closed);

    let calls = calls.lock().unwrap();
    assert!(calls.contains(&"release_device".to_string()));
    assert!(!calls.contains(&"release_session".to_string()));
    assert_eq!(
        *changes.lock().unwrap(),
        vec![
            StateChange::Failed(ErrorKind::SessionConfigFailed),
            StateChange::Closed,
        ]
    );
}

#[test]
fn test_disconnect_while_streaming_tears_down_in_order() {
    init_tracing();
    let (host, calls) = FakeHost::new(Completion::Auto);
    let sink = TestSink::new();
    let controller =
        SessionController::new(Box::new(host), sink.clone(), SessionConfig::default());
    let changes = observed_changes(&controller);

    controller.bind(ViewportSize::new(800, 480)).unwrap();
    wait_until("streaming", || {
        controller.state() == SessionState::Streaming
    });

    controller.events().device_disconnected();
    wait_until("closed", || controller.state() == SessionState::Closed);

    let calls = calls.lock().unwrap();
    let teardown: Vec<&String> = calls
        .iter()
        .filter(|c| {
            matches!(
                c.as_str(),
                "stop_repeating" | "abort_captures" | "release_session" | "release_device"
            )
        })
        .collect();
    assert_eq!(
        teardown,
        vec![
            "stop_repeating",
            "abort_captures",
            "release_session",
            "release_device",
        ]
    );
    assert_eq!(*sink.detach_count.lock().unwrap(), 1);
    assert_eq!(
        *changes.lock().unwrap(),
        vec![
            StateChange::Streaming,
            StateChange::Failed(ErrorKind::DeviceDisconnected),
            StateChange::Closed,
        ]
    );
}

#[test]
fn test_rebind_after_unbind_runs_a_fresh_cycle() {
    init_tracing();
    let (host, calls) = FakeHost::new(Completion::Auto);
    let sink = TestSink::new();
    let controller =
        SessionController::new(Box::new(host), sink.clone(), SessionConfig::default());

    controller.bind(ViewportSize::new(800, 480)).unwrap();
    wait_until("streaming", || {
        controller.state() == SessionState::Streaming
    });

    controller.unbind();
    wait_until("closed", || controller.state() == SessionState::Closed);
    assert_eq!(*sink.detach_count.lock().unwrap(), 1);

    // rotated surface: new viewport, full second negotiation
    controller.bind(ViewportSize::new(480, 800)).unwrap();
    wait_until("streaming again", || {
        controller.state() == SessionState::Streaming
    });

    let opens = calls
        .lock()
        .unwrap()
        .iter()
        .filter(|c| *c == "open_device")
        .count();
    assert_eq!(opens, 2);
    assert_eq!(sink.transforms.lock().unwrap().len(), 2);
}

#[test]
fn test_controller_drop_tears_down_a_live_session() {
    init_tracing();
    let (host, calls) = FakeHost::new(Completion::Auto);
    let sink = TestSink::new();
    {
        let controller =
            SessionController::new(Box::new(host), sink.clone(), SessionConfig::default());
        controller.bind(ViewportSize::new(800, 480)).unwrap();
        wait_until("streaming", || {
            controller.state() == SessionState::Streaming
        });
    }

    // drop joined the worker, so the teardown already ran
    let calls = calls.lock().unwrap();
    assert!(calls.contains(&"stop_repeating".to_string()));
    assert!(calls.contains(&"release_device".to_string()));
    assert_eq!(*sink.detach_count.lock().unwrap(), 1);
}
