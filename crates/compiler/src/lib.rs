//! Block-program-to-Python compiler.
//!
//! Takes a block program (as produced by the visual editor) plus a device
//! registry, and synthesizes a complete Python automation script: imports,
//! connection setup, the translated body, and symmetric teardown. Raw-protocol
//! devices are driven through VISA sessions; command-tree devices through a
//! device-manager object tree.
//!
//! Compilation is atomic: any error aborts the whole compile and no partial
//! script is returned. Validation runs in a fixed order — backend capability
//! pre-pass, synthesis with inline resource/device checks, then variable- and
//! device-usage checks over the finished session.
//!
//! Completion waits are approximated with an `*OPC?` synchronization query;
//! long acquisitions may need an explicit delay in front on instruments with
//! short I/O timeouts.

#![warn(missing_docs)]

mod emit;
mod session;

/// Fatal compile errors.
pub mod error;
/// Program intermediate representation.
pub mod ir;
/// Compile passes surrounding synthesis.
mod passes;
/// Device registry model.
pub mod registry;

pub use error::CompileError;
pub use ir::{BlockNode, NodeKind, Program};
pub use registry::{Backend, DeviceBinding, DeviceClass, DeviceRegistry};

use ir::NodeIndex;

/// Compile a block program against a device registry into a Python script.
///
/// All state lives in a per-call session; concurrent compiles are
/// independent. Compiling the same program and registry twice yields
/// byte-identical output.
pub fn compile(program: &Program, registry: &DeviceRegistry) -> Result<String, CompileError> {
    let index = NodeIndex::build(program);
    let facts = passes::check_capabilities(program, registry, &index)?;
    let (script, session) = emit::Emitter::new(program, registry, &index, facts).synthesize()?;
    passes::check_variable_usage(&session)?;
    passes::check_device_usage(&session)?;
    Ok(script)
}
