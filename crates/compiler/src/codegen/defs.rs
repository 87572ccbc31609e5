//! Identifier defs header emission

use super::{BANNER, const_id_in, const_id_out, include_guard};
use crate::alloc::AllocatedCall;
use crate::error::Error;
use std::fmt::Write as _;

/// Emit the defs header: one request/response constant pair per call,
/// wrapped in an include guard.
pub fn emit_defs(calls: &[AllocatedCall], library_name: &str) -> Result<String, Error> {
    let guard = include_guard(library_name);
    let mut out = String::new();

    out.push_str(BANNER);
    writeln!(out, "#ifndef {}", guard)?;
    writeln!(out, "#define {}", guard)?;
    writeln!(out)?;

    for call in calls {
        let name = &call.declaration.name;
        writeln!(
            out,
            "#define {}  0x{:08x}UL",
            const_id_in(library_name, name),
            call.ids.id_in
        )?;
        writeln!(
            out,
            "#define {}  0x{:08x}UL",
            const_id_out(library_name, name),
            call.ids.id_out
        )?;
    }

    writeln!(out)?;
    writeln!(out, "#endif // {}", guard)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::allocate;
    use crate::decl::Declaration;
    use crate::ledger::Ledger;

    #[test]
    fn test_defs_format() {
        let decls = vec![Declaration::new("screen_update", "void")];
        let allocation = allocate(&decls, &Ledger::new()).unwrap();
        let defs = emit_defs(&allocation.calls, "bagl").unwrap();

        assert!(defs.starts_with("/* MACHINE GENERATED: DO NOT MODIFY */\n"));
        assert!(defs.contains("#ifndef GATE_BAGL_DEFS_H\n"));
        assert!(defs.contains("#define GATE_BAGL_DEFS_H\n"));
        assert!(defs.ends_with("#endif // GATE_BAGL_DEFS_H\n"));

        let ids = allocation.calls[0].ids;
        assert!(defs.contains(&format!(
            "#define GATECALL_bagl_screen_update_ID_IN  0x{:08x}UL\n",
            ids.id_in
        )));
        assert!(defs.contains(&format!(
            "#define GATECALL_bagl_screen_update_ID_OUT  0x{:08x}UL\n",
            ids.id_out
        )));
    }

    #[test]
    fn test_one_constant_pair_per_call() {
        let decls = vec![
            Declaration::new("a", "void"),
            Declaration::new("b", "void"),
            Declaration::new("a", "void"), // redeclaration, deduplicated
        ];
        let allocation = allocate(&decls, &Ledger::new()).unwrap();
        let defs = emit_defs(&allocation.calls, "lib").unwrap();
        assert_eq!(defs.matches("#define GATECALL_").count(), 4);
    }
}
