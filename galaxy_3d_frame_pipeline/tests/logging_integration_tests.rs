//! Integration tests for the Engine logging system
//!
//! These tests verify the logger facade and the entries the frame pipeline
//! writes while executing commands.
//! No GPU required.
//!
//! Run with: cargo test --test logging_integration_tests


use galaxy_3d_frame_pipeline::galaxy3d::command::RendererCommand;
use galaxy_3d_frame_pipeline::galaxy3d::handles::{DisplayHandle, SceneId};
use galaxy_3d_frame_pipeline::galaxy3d::log::{LogEntry, LogSeverity, Logger};
use galaxy_3d_frame_pipeline::galaxy3d::Engine;
use serial_test::serial;
use std::sync::{Arc, Mutex};
use test_device_utils::{create_test_pipeline, run_command};

// ============================================================================
// TEST LOGGER IMPLEMENTATION
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

// ============================================================================
// LOGGING TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_custom_logger() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    Engine::log(LogSeverity::Info, "test::module", "Test info message".to_string());
    Engine::log(LogSeverity::Warn, "test::module", "Test warning message".to_string());
    Engine::log(LogSeverity::Error, "test::module", "Test error message".to_string());

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 3);
        assert_eq!(captured[0].severity, LogSeverity::Info);
        assert_eq!(captured[1].severity, LogSeverity::Warn);
        assert_eq!(captured[2].severity, LogSeverity::Error);
        assert!(captured.iter().all(|entry| entry.source == "test::module"));
        assert_eq!(captured[2].message, "Test error message");
    }

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_error_logging_with_location() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    Engine::log_detailed(
        LogSeverity::Error,
        "test::error",
        "Critical error occurred".to_string(),
        "test_file.rs",
        42,
    );

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].file, Some("test_file.rs"));
        assert_eq!(captured[0].line, Some(42));
    }

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_logger_reset() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    Engine::log(LogSeverity::Info, "test", "Message 1".to_string());
    assert_eq!(entries.lock().unwrap().len(), 1);

    // Later messages go to the default logger
    Engine::reset_logger();
    Engine::log(LogSeverity::Info, "test", "Message 2".to_string());

    assert_eq!(entries.lock().unwrap().len(), 1);
}

#[test]
#[serial]
fn test_integration_failed_command_logs_error_with_location() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    let (_devices, mut pipeline) = create_test_pipeline();
    run_command(&mut pipeline, RendererCommand::MapScene { scene: SceneId(9), display: DisplayHandle(3) });

    {
        let captured = entries.lock().unwrap();
        let error = captured
            .iter()
            .find(|entry| entry.severity == LogSeverity::Error)
            .expect("map failure logged");
        assert_eq!(error.source, "galaxy3d::FramePipeline");
        assert!(error.message.contains("scene:9"));
        assert!(error.file.is_some_and(|file| file.ends_with("frame_pipeline.rs")));
        assert!(error.line.is_some());

        let executing = captured
            .iter()
            .find(|entry| entry.source == "galaxy3d::RendererCommandExecutor" && entry.message.contains("MapScene"));
        assert!(executing.is_some_and(|entry| entry.severity == LogSeverity::Info));
    }

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_scene_updates_log_at_debug() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    let (_devices, mut pipeline) = create_test_pipeline();
    pipeline.enqueue_command(RendererCommand::UpdateScene { scene: SceneId(1), update: Default::default() });
    pipeline.update();

    {
        let captured = entries.lock().unwrap();
        let executing = captured
            .iter()
            .find(|entry| entry.message.contains("executing UpdateScene"))
            .expect("update logged");
        assert_eq!(executing.severity, LogSeverity::Debug);
        assert!(captured.iter().any(|entry| entry.severity == LogSeverity::Error && entry.message.contains("scene:1")));
    }

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_confirmation_echo_is_logged() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    let (_devices, mut pipeline) = create_test_pipeline();
    run_command(&mut pipeline, RendererCommand::ConfirmationEcho { text: "frame ready".to_string() });

    assert!(entries
        .lock()
        .unwrap()
        .iter()
        .any(|entry| entry.severity == LogSeverity::Info && entry.message == "confirmation: frame ready"));

    Engine::reset_logger();
}
