//! Artifact generation
//!
//! Emits the three synchronized texts of the call boundary: the
//! identifier defs header, the caller-side stubs, and the executor-side
//! dispatcher. All three are produced in one pass over the same ordered
//! call list so they cannot drift apart within a run; across runs the
//! ledger keeps the identifiers pinned.
//!
//! # Frame layout
//!
//! The boundary moves one flat frame of unsigned machine words. Caller
//! view:
//!
//! ```text
//!   [0]        library name tag
//!   [1]        request id; the executor stores the response id here
//!   [2..2+N)   the N parameters, in declared order
//!   [2+N]      reserved response value slot
//! ```
//!
//! The executor receives the frame advanced one word past the library
//! tag, so its parameter offsets sit one below the stub's. Both sides
//! are generated from the same declaration, which is what makes the
//! layout agreement byte-exact.

mod defs;
mod dispatch;
mod stub;

pub use defs::emit_defs;
pub use dispatch::emit_dispatch;
pub use stub::emit_stubs;

use crate::alloc::AllocatedCall;
use crate::alloc::SEQUENCE_MASK;
use crate::config::GeneratorConfig;
use crate::decl::{Declaration, Parameter};
use crate::error::Error;

/// First parameter slot as the stub indexes the frame
pub const STUB_FIRST_PARAM: usize = 2;
/// First parameter slot as the dispatcher indexes the frame
pub const DISPATCH_FIRST_PARAM: usize = 1;
/// Reserved response words after the parameter slots
pub const RESPONSE_WORDS: usize = 1;

/// Banner heading every generated file
pub const BANNER: &str = "/* MACHINE GENERATED: DO NOT MODIFY */\n";

/// The three generated texts of one run
#[derive(Debug, Clone, PartialEq)]
pub struct Artifacts {
    pub defs: String,
    pub stubs: String,
    pub dispatch: String,
}

/// Generate all three artifacts for an allocated call list.
pub fn generate(
    calls: &[AllocatedCall],
    library_name: &str,
    config: &GeneratorConfig,
) -> Result<Artifacts, Error> {
    let defs_include = config.defs_include_name(library_name);
    Ok(Artifacts {
        defs: emit_defs(calls, library_name)?,
        stubs: emit_stubs(calls, library_name, config.hardened, &defs_include)?,
        dispatch: emit_dispatch(calls, library_name, config.hardened, &defs_include)?,
    })
}

/// Name of the request id constant for one call
pub fn const_id_in(library_name: &str, function_name: &str) -> String {
    format!("GATECALL_{}_{}_ID_IN", library_name, function_name)
}

/// Name of the response id constant for one call
pub fn const_id_out(library_name: &str, function_name: &str) -> String {
    format!("GATECALL_{}_{}_ID_OUT", library_name, function_name)
}

/// Include guard of the defs header
fn include_guard(library_name: &str) -> String {
    format!("GATE_{}_DEFS_H", library_name.to_ascii_uppercase())
}

/// The routing mask as a C literal, e.g. `0xfffffUL`
fn routing_mask_literal() -> String {
    format!("0x{:x}UL", SEQUENCE_MASK)
}

/// Whether a type descriptor is `void`
fn is_void(type_name: &str) -> bool {
    crate::canon::normalize_type(type_name) == "void"
}

/// Parameters that occupy frame slots; a lone `void` entry means none
fn frame_params(decl: &Declaration) -> &[Parameter] {
    match decl.parameters.as_slice() {
        [only] if is_void(&only.type_name) => &[],
        params => params,
    }
}
