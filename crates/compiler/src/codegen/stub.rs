//! Caller-side stub emission
//!
//! Each stub carries the exact declared signature, marshals its
//! arguments into the shared frame, crosses the boundary through the
//! single opaque call primitive, and (in hardened mode) refuses to
//! return unless the executor stored the expected response identifier.

use super::{
    BANNER, RESPONSE_WORDS, STUB_FIRST_PARAM, const_id_in, const_id_out, frame_params,
};
use crate::alloc::AllocatedCall;
use crate::canon::normalize_type;
use crate::error::Error;
use std::fmt::Write as _;

/// Emit the stub translation unit for the whole call list.
pub fn emit_stubs(
    calls: &[AllocatedCall],
    library_name: &str,
    hardened: bool,
    defs_include: &str,
) -> Result<String, Error> {
    let mut out = String::new();

    out.push_str(BANNER);
    writeln!(out)?;
    writeln!(out, "#include \"{}.h\"", library_name)?;
    writeln!(out, "#include \"{}\"", defs_include)?;
    writeln!(out)?;
    writeln!(out, "/* boundary primitives provided by the runtime */")?;
    writeln!(out, "extern void gate_call(unsigned int *frame);")?;
    if hardened {
        writeln!(
            out,
            "extern void gate_fault_security(void) __attribute__((noreturn));"
        )?;
    }
    writeln!(out)?;

    for call in calls {
        emit_stub(&mut out, call, library_name, hardened)?;
    }

    Ok(out)
}

fn emit_stub(
    out: &mut String,
    call: &AllocatedCall,
    library_name: &str,
    hardened: bool,
) -> Result<(), Error> {
    let decl = &call.declaration;
    let params = frame_params(decl);
    let id_in = const_id_in(library_name, &decl.name);
    let id_out = const_id_out(library_name, &decl.name);
    let return_type = normalize_type(&decl.return_type);
    let response_slot = STUB_FIRST_PARAM + params.len();

    writeln!(out, "{}", call.prototype.trim_end())?;
    writeln!(out, "{{")?;
    if params.is_empty() {
        writeln!(
            out,
            "  unsigned int frame[{} + {}];",
            STUB_FIRST_PARAM, RESPONSE_WORDS
        )?;
    } else {
        writeln!(
            out,
            "  unsigned int frame[{} + {} + {}];",
            STUB_FIRST_PARAM,
            params.len(),
            RESPONSE_WORDS
        )?;
    }
    writeln!(out, "  frame[0] = (unsigned int)\"{}\";", library_name)?;
    writeln!(out, "  frame[1] = (unsigned int){};", id_in)?;
    for (i, param) in params.iter().enumerate() {
        writeln!(
            out,
            "  frame[{}] = (unsigned int){};",
            STUB_FIRST_PARAM + i,
            param.name
        )?;
    }
    writeln!(out, "  gate_call(frame);")?;
    if hardened {
        // a response id other than the expected one means control flow
        // was redirected across the boundary; never hand back a value
        writeln!(out, "  if (frame[1] != {}) {{", id_out)?;
        writeln!(out, "    gate_fault_security();")?;
        writeln!(out, "  }}")?;
    }
    if return_type != "void" {
        writeln!(
            out,
            "  return ({})frame[{}];",
            return_type, response_slot
        )?;
    }
    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}
