//! Call identifier allocation
//!
//! Turns the ordered declaration list into the ordered list of calls the
//! generator emits, assigning each distinct prototype a stable sequence
//! number through the ledger and deriving its request/response identifier
//! pair.
//!
//! The identifier layout packs three independent pieces into 32 bits:
//!
//! ```text
//!   tag (high nibble) | sequence (bits 8..27) | digest byte (bits 0..7)
//! ```
//!
//! The sequence number alone routes the call; the digest byte exists so
//! the caller-side integrity check covers the prototype, not just the
//! position. Two prototypes with colliding low digest bytes still get
//! disjoint identifiers as long as their sequence numbers differ.

use crate::canon;
use crate::decl::Declaration;
use crate::error::Error;
use crate::ledger::Ledger;
use std::collections::HashSet;
use tracing::debug;

/// High-nibble tag of request identifiers
pub const TAG_IN: u32 = 0x7000_0000;
/// High-nibble tag of response identifiers
pub const TAG_OUT: u32 = 0xA000_0000;
/// Bit offset of the sequence number within an identifier
pub const SEQUENCE_SHIFT: u32 = 8;
/// The sequence number occupies bits 8..27 of an identifier
pub const SEQUENCE_MASK: u32 = 0x000F_FFFF;

/// The derived identifier pair for one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallIds {
    pub id_in: u32,
    pub id_out: u32,
    pub sequence: u32,
}

/// Derive the identifier pair from a prototype digest and an assigned
/// sequence number. Never stored: recomputed on every run so that the
/// ledger stays the single source of truth.
pub fn derive_call_ids(digest: &[u8; 32], sequence: u32) -> CallIds {
    let middle = (sequence & SEQUENCE_MASK) << SEQUENCE_SHIFT;
    CallIds {
        id_in: u32::from(digest[0]) | middle | TAG_IN,
        id_out: u32::from(digest[1]) | middle | TAG_OUT,
        sequence,
    }
}

/// One declaration with everything the generator needs to emit it
#[derive(Debug, Clone)]
pub struct AllocatedCall {
    pub declaration: Declaration,
    pub prototype: String,
    pub digest: [u8; 32],
    pub digest_hex: String,
    pub ids: CallIds,
}

/// The result of an allocation pass
#[derive(Debug, Clone)]
pub struct Allocation {
    /// Surviving calls in input order
    pub calls: Vec<AllocatedCall>,
    /// The input ledger plus any entries assigned this run
    pub ledger: Ledger,
}

/// Split declarations into survivors and ignored redeclarations.
///
/// The first declaration with a given name wins; later occurrences (the
/// same boundary macro expanding in several translation units) are
/// tracked but produce no identifiers and no artifact entries.
pub fn dedup_first_wins(declarations: &[Declaration]) -> (Vec<&Declaration>, Vec<&Declaration>) {
    let mut seen = HashSet::new();
    let mut survivors = Vec::new();
    let mut ignored = Vec::new();
    for decl in declarations {
        if seen.insert(decl.name.as_str()) {
            survivors.push(decl);
        } else {
            ignored.push(decl);
        }
    }
    (survivors, ignored)
}

/// Allocate identifiers for an ordered declaration list.
///
/// Deterministic and idempotent: the same declarations against the same
/// ledger always produce the same calls and leave the ledger unchanged.
/// New prototypes are numbered above the highest sequence the ledger has
/// ever held, so removals never free a number for reuse.
pub fn allocate(declarations: &[Declaration], existing: &Ledger) -> Result<Allocation, Error> {
    let (survivors, ignored) = dedup_first_wins(declarations);
    for decl in &ignored {
        debug!(name = %decl.name, "ignoring redeclaration");
    }

    let mut ledger = existing.clone();
    let mut watermark = ledger.max_sequence();
    let mut calls = Vec::with_capacity(survivors.len());

    for decl in survivors {
        if !decl.is_boundary() {
            debug!(name = %decl.name, "skipping non-boundary declaration");
            continue;
        }
        // refuse any length annotation we cannot render deterministically
        for param in &decl.parameters {
            if let Some(length) = &param.length {
                canon::render_length_expr(length)?;
            }
        }

        let prototype = canon::canonical_prototype(decl);
        let digest = canon::prototype_digest(&prototype);
        let digest_hex = hex::encode(digest);

        let sequence = match ledger.get(&digest_hex) {
            Some(sequence) => sequence,
            None => {
                watermark += 1;
                ledger.insert(digest_hex.clone(), watermark);
                debug!(name = %decl.name, sequence = watermark, "assigned new sequence");
                watermark
            }
        };

        calls.push(AllocatedCall {
            declaration: decl.clone(),
            prototype,
            digest,
            digest_hex,
            ids: derive_call_ids(&digest, sequence),
        });
    }

    Ok(Allocation { calls, ledger })
}
