//! Executor-side dispatcher emission
//!
//! The dispatcher is the library image's entry point: it routes the
//! incoming frame to the real function by the sequence-bearing middle
//! bits of the request identifier, unmarshals the arguments, and stores
//! the result and (in hardened mode) the response identifier back into
//! the frame. Routing is deliberately coarser than the stub's full-ID
//! comparison: the byte-level hash uniquifier exists for the caller-side
//! integrity check, not for routing.

use super::{
    BANNER, DISPATCH_FIRST_PARAM, const_id_in, const_id_out, frame_params, routing_mask_literal,
};
use crate::alloc::AllocatedCall;
use crate::canon::normalize_type;
use crate::error::Error;
use std::fmt::Write as _;

/// Emit the dispatcher translation unit for the whole call list.
pub fn emit_dispatch(
    calls: &[AllocatedCall],
    library_name: &str,
    hardened: bool,
    defs_include: &str,
) -> Result<String, Error> {
    let mask = routing_mask_literal();
    let mut out = String::new();

    out.push_str(BANNER);
    writeln!(out)?;
    writeln!(out, "#include \"{}.h\"", library_name)?;
    writeln!(out, "#include \"{}\"", defs_include)?;
    writeln!(out)?;
    writeln!(out, "/* boundary primitives provided by the runtime */")?;
    writeln!(out, "extern void gate_end(unsigned int *frame);")?;
    writeln!(
        out,
        "extern void gate_fault_security(void) __attribute__((noreturn));"
    )?;
    writeln!(out)?;
    writeln!(out, "void gate_enter(unsigned int call_id, unsigned int *params);")?;
    writeln!(out, "void gate_exit(void);")?;
    writeln!(out)?;
    writeln!(out, "/*")?;
    writeln!(
        out,
        " * Library entry point. The incoming frame points one word past the"
    )?;
    writeln!(
        out,
        " * library tag: frame[0] is the call identifier, parameters follow."
    )?;
    writeln!(out, " */")?;
    writeln!(out, "void gate_main(unsigned int *frame)")?;
    writeln!(out, "{{")?;
    writeln!(out, "  gate_enter(frame[0], &frame[1]);")?;
    writeln!(out)?;
    writeln!(out, "  switch ((frame[0] >> 8) & {}) {{", mask)?;

    for call in calls {
        emit_case(&mut out, call, library_name, hardened, &mask)?;
    }

    writeln!(out, "    default:")?;
    writeln!(
        out,
        "      /* unknown identifier: unrecoverable security fault */"
    )?;
    writeln!(out, "      gate_fault_security();")?;
    writeln!(out, "      break;")?;
    writeln!(out, "  }}")?;
    writeln!(out)?;
    writeln!(out, "  gate_exit();")?;
    writeln!(out, "  gate_end(frame);")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    writeln!(out, "/* overridable observation hooks */")?;
    writeln!(
        out,
        "__attribute__((weak)) void gate_enter(unsigned int call_id, unsigned int *params)"
    )?;
    writeln!(out, "{{")?;
    writeln!(out, "  (void)call_id;")?;
    writeln!(out, "  (void)params;")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    writeln!(out, "__attribute__((weak)) void gate_exit(void)")?;
    writeln!(out, "{{")?;
    writeln!(out, "}}")?;

    Ok(out)
}

fn emit_case(
    out: &mut String,
    call: &AllocatedCall,
    library_name: &str,
    hardened: bool,
    mask: &str,
) -> Result<(), Error> {
    let decl = &call.declaration;
    let params = frame_params(decl);
    let id_in = const_id_in(library_name, &decl.name);
    let id_out = const_id_out(library_name, &decl.name);
    let return_type = normalize_type(&decl.return_type);
    let response_slot = DISPATCH_FIRST_PARAM + params.len();

    let args = params
        .iter()
        .enumerate()
        .map(|(i, param)| {
            format!(
                "({})frame[{}]",
                normalize_type(&param.type_name),
                DISPATCH_FIRST_PARAM + i
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    let invocation = format!("{}({})", decl.name, args);

    writeln!(out, "    case (({} >> 8) & {}):", id_in, mask)?;
    if hardened && decl.is_task_switch() {
        // control returns to the caller image inside the call, so the
        // response id must already be in place
        writeln!(out, "      frame[0] = {};", id_out)?;
    }
    if return_type == "void" {
        writeln!(out, "      {};", invocation)?;
    } else {
        writeln!(
            out,
            "      frame[{}] = (unsigned int){};",
            response_slot, invocation
        )?;
    }
    if hardened && !decl.is_task_switch() {
        // stored only once the call has completed; a fault mid-call must
        // never leave a valid response id behind
        writeln!(out, "      frame[0] = {};", id_out)?;
    }
    writeln!(out, "      break;")?;
    Ok(())
}
