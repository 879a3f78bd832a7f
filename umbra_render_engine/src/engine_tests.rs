//! Unit tests for the engine singleton
//!
//! The singleton is process-global state, so these run serially.

use std::sync::{Arc, Mutex};

use serial_test::serial;

use crate::engine::Engine;
use crate::log::{LogEntry, LogSeverity, Logger};
use crate::render::mock_device::MockDevice;

/// Logger that captures entries for inspection
struct CapturingLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CapturingLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

#[test]
#[serial]
fn test_device_singleton_lifecycle() {
    Engine::initialize().unwrap();

    // No device yet
    Engine::destroy_device().unwrap();
    assert!(Engine::device().is_err());

    Engine::create_device(MockDevice::new()).unwrap();
    assert!(Engine::device().is_ok());

    // Exactly one device per process
    assert!(Engine::create_device(MockDevice::new()).is_err());

    Engine::destroy_device().unwrap();
    assert!(Engine::device().is_err());

    // A new device may be registered after destruction
    Engine::create_device(MockDevice::new()).unwrap();
    Engine::shutdown();
    assert!(Engine::device().is_err());
}

#[test]
#[serial]
fn test_log_routes_through_active_logger() {
    Engine::initialize().unwrap();

    let entries = Arc::new(Mutex::new(Vec::new()));
    Engine::set_logger(Arc::new(CapturingLogger {
        entries: entries.clone(),
    }));

    Engine::log(LogSeverity::Info, "umbra::test", "hello".to_string());
    Engine::log_detailed(
        LogSeverity::Error,
        "umbra::test",
        "broken".to_string(),
        file!(),
        line!(),
    );

    {
        // Other tests may log concurrently; only this test's source
        // counts
        let captured = entries.lock().unwrap();
        let ours: Vec<&LogEntry> = captured
            .iter()
            .filter(|e| e.source == "umbra::test")
            .collect();
        assert_eq!(ours.len(), 2);
        assert_eq!(ours[0].severity, LogSeverity::Info);
        assert_eq!(ours[0].message, "hello");
        assert!(ours[0].file.is_none());
        assert_eq!(ours[1].severity, LogSeverity::Error);
        assert!(ours[1].file.is_some());
        assert!(ours[1].line.is_some());
    }

    // Restore the default logger for other tests
    Engine::set_logger(Arc::new(crate::log::DefaultLogger));
}
