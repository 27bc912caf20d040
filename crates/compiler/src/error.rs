//! Fatal compile errors.
//!
//! Every error aborts the whole compile atomically — no partial script is
//! ever returned. Messages are multi-line and actionable; the caller is
//! expected to surface them verbatim and leave the program unmodified.

use crate::registry::{Backend, DeviceClass};
use scpi_toolchain_diagnostics::codes;
use thiserror::Error;

/// A fatal, non-retried compile error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    /// Two device bindings resolve to the same canonical connection resource.
    #[error(
        "devices '{first}' and '{second}' both connect to '{resource}'\n\
         Each instrument needs its own connection resource.\n\
         Fix: change the address of one device, or delete the duplicate connect block."
    )]
    ResourceCollision {
        /// Alias that claimed the resource first.
        first: String,
        /// Alias that collided with it.
        second: String,
        /// The shared canonical resource.
        resource: String,
    },

    /// A block is not executable on the resolved device's backend.
    #[error(
        "the '{node}' block cannot run on device '{alias}' ({backend} backend)\n\
         The {backend} backend has no read path, so blocks that wait for or read a \
         response are not supported on it.\n\
         Fix: move the block to a device on a query-capable backend, or change the \
         device's backend in the device settings."
    )]
    CapabilityViolation {
        /// Human-readable block name.
        node: String,
        /// Device alias the block resolved to.
        alias: String,
        /// The offending backend.
        backend: Backend,
    },

    /// A command's implied instrument class disagrees with the device it
    /// would be sent to.
    #[error(
        "command '{command}' is a {implied} command, but it would be sent to \
         '{alias}' which is a {actual}\n\
         Fix: add a 'use device' block before this command so it targets a \
         {implied}, or correct the device's class in the device settings."
    )]
    CommandDeviceMismatch {
        /// The offending command string.
        command: String,
        /// Instrument class implied by the command's subsystem prefix.
        implied: DeviceClass,
        /// Device alias the command resolved to.
        alias: String,
        /// That device's declared class.
        actual: DeviceClass,
    },

    /// A variable is assigned but never read.
    #[error(
        "variable '{name}' is assigned but never used\n\
         Fix: add a block that reads '{name}', or delete the assignment."
    )]
    UnusedVariable {
        /// The unused variable name.
        name: String,
    },

    /// A device is connected but never used by any operation.
    #[error(
        "device '{alias}' is connected but never used\n\
         Fix: add an operation that targets '{alias}', or delete its connect block."
    )]
    UnusedDevice {
        /// The unused device alias.
        alias: String,
    },

    /// A device binding has no resolvable connection endpoint.
    #[error(
        "device '{alias}' has no resolvable connection endpoint: {reason}\n\
         Fix: give '{alias}' an address or an explicit resource string in the \
         device settings."
    )]
    UnresolvedDeviceConfig {
        /// The misconfigured alias.
        alias: String,
        /// Why resolution failed.
        reason: String,
    },

    /// An operation block could not be resolved to any device context.
    #[error(
        "{node} has no device to run on\n\
         Fix: place a connect block (or a 'use device' block) before it."
    )]
    NoDeviceContext {
        /// Human-readable description of the block.
        node: String,
    },
}

impl CompileError {
    /// Stable diagnostic code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::ResourceCollision { .. } => codes::COMPILE_RESOURCE_COLLISION,
            CompileError::CapabilityViolation { .. } => codes::COMPILE_CAPABILITY_VIOLATION,
            CompileError::CommandDeviceMismatch { .. } => {
                codes::COMPILE_COMMAND_DEVICE_MISMATCH
            }
            CompileError::UnusedVariable { .. } => codes::COMPILE_UNUSED_VARIABLE,
            CompileError::UnusedDevice { .. } => codes::COMPILE_UNUSED_DEVICE,
            CompileError::UnresolvedDeviceConfig { .. } => codes::COMPILE_UNRESOLVED_DEVICE,
            CompileError::NoDeviceContext { .. } => codes::COMPILE_NO_DEVICE_CONTEXT,
        }
    }
}
