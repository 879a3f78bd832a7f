/// Umbra Engine - Singleton manager for engine subsystems
///
/// This module provides global singleton management for the graphics
/// device and the logger. It uses thread-safe static storage with
/// RwLock for safe concurrent access.

use std::sync::{OnceLock, RwLock, Arc};
use std::time::SystemTime;

use crate::error::{Error, Result};
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
use crate::render::GraphicsDevice;

// ===== INTERNAL STATE =====

/// Global engine state storage
static ENGINE_STATE: OnceLock<EngineState> = OnceLock::new();

/// Internal state structure holding all engine singletons
struct EngineState {
    /// Active logger (replaceable via Engine::set_logger)
    logger: RwLock<Arc<dyn Logger>>,

    /// Graphics device singleton
    device: RwLock<Option<Arc<dyn GraphicsDevice>>>,
}

impl EngineState {
    fn new() -> Self {
        Self {
            logger: RwLock::new(Arc::new(DefaultLogger)),
            device: RwLock::new(None),
        }
    }
}

fn state() -> &'static EngineState {
    ENGINE_STATE.get_or_init(EngineState::new)
}

// ===== PUBLIC API =====

/// Main engine singleton manager
///
/// Manages the lifecycle of the engine singletons (graphics device,
/// logger). The device invariant is one per running process: created
/// once at startup and destroyed last, after all dependents have
/// released their resources.
pub struct Engine;

impl Engine {
    /// Helper to log errors before returning them (internal use)
    fn log_and_return_error(error: Error) -> Error {
        crate::engine_error!("umbra::Engine", "{}", error);
        error
    }

    /// Initialize the engine
    ///
    /// This must be called once at application startup before creating
    /// any subsystems.
    pub fn initialize() -> Result<()> {
        state();
        Ok(())
    }

    /// Shutdown the entire engine and destroy all singletons
    ///
    /// After calling this, a new device may be registered again.
    pub fn shutdown() {
        if let Some(s) = ENGINE_STATE.get() {
            if let Ok(mut device) = s.device.write() {
                *device = None;
            }
        }
    }

    /// Replace the active logger
    pub fn set_logger(logger: Arc<dyn Logger>) {
        if let Ok(mut slot) = state().logger.write() {
            *slot = logger;
        }
    }

    /// Log a message through the active logger
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        let entry = LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: None,
            line: None,
        };
        if let Ok(logger) = state().logger.read() {
            logger.log(&entry);
        }
    }

    /// Log a message with file:line details (used by `engine_error!`)
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        let entry = LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: Some(file),
            line: Some(line),
        };
        if let Ok(logger) = state().logger.read() {
            logger.log(&entry);
        }
    }

    /// Create and register the graphics device singleton
    ///
    /// # Errors
    ///
    /// Returns an error if a device already exists - there is exactly
    /// one device per running process.
    pub fn create_device<D: GraphicsDevice + 'static>(device: D) -> Result<()> {
        let arc_device: Arc<dyn GraphicsDevice> = Arc::new(device);
        Self::register_device(arc_device)?;
        crate::engine_info!("umbra::Engine", "Graphics device singleton created successfully");
        Ok(())
    }

    /// Register an already-shared device singleton
    pub fn register_device(device: Arc<dyn GraphicsDevice>) -> Result<()> {
        let mut lock = state().device.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("Device lock poisoned".to_string())
            ))?;

        if lock.is_some() {
            return Err(Self::log_and_return_error(
                Error::InitializationFailed(
                    "Graphics device already exists. Call Engine::destroy_device() first.".to_string()
                )
            ));
        }

        *lock = Some(device);
        Ok(())
    }

    /// Get the graphics device singleton
    ///
    /// # Errors
    ///
    /// Returns an error if the device has not been created.
    pub fn device() -> Result<Arc<dyn GraphicsDevice>> {
        let lock = state().device.read()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("Device lock poisoned".to_string())
            ))?;

        lock.clone()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed(
                    "Graphics device not created. Call Engine::create_device() first.".to_string()
                )
            ))
    }

    /// Destroy the graphics device singleton
    ///
    /// Removes the singleton, allowing a new one to be created. All
    /// existing device references remain valid until dropped.
    pub fn destroy_device() -> Result<()> {
        let mut lock = state().device.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("Device lock poisoned".to_string())
            ))?;

        *lock = None;
        Ok(())
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
