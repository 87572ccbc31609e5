//! Call identifier ledger
//!
//! The on-disk table pinning each canonical prototype digest to the
//! sequence number it was first assigned. The table is append-only:
//! entries whose declarations have disappeared are kept forever, so a
//! previously shipped binary that still carries the old identifier keeps
//! routing to the right place if the declaration ever comes back.
//!
//! File format: one `<hex-digest>:<sequence>` entry per line, newline
//! terminated. Sequence numbers are written in decimal; a `0x` prefix is
//! accepted on read. Line order carries no meaning but is preserved
//! (existing entries first, new entries appended) so rewrites diff
//! cleanly.

use crate::error::Error;
use std::collections::HashMap;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Length of a hex-encoded SHA-256 digest.
const DIGEST_HEX_LEN: usize = 64;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    /// Entries in file order, for stable rewrites
    entries: Vec<(String, u32)>,
    /// Digest -> sequence lookup
    index: HashMap<String, u32>,
}

impl Ledger {
    pub fn new() -> Self {
        Ledger::default()
    }

    /// Load a ledger file. A missing file is an empty ledger, not an
    /// error; anything unreadable or unparsable is fatal.
    pub fn load(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            return Ok(Ledger::new());
        }
        let content = fs::read_to_string(path)?;
        Ledger::parse(&content)
    }

    /// Parse ledger content. A malformed line is a fatal
    /// `LedgerCorrupt`, never silently skipped: dropping an entry would
    /// free its sequence number for reuse and break every binary that
    /// already carries the old identifier.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let mut ledger = Ledger::new();
        let mut seen_sequences = HashSet::new();
        for (idx, line) in content.lines().enumerate() {
            let line_no = idx + 1;
            if line.is_empty() {
                continue;
            }
            let corrupt = || Error::LedgerCorrupt {
                line_no,
                line: line.to_string(),
            };
            let (digest, sequence) = line.split_once(':').ok_or_else(corrupt)?;
            if digest.len() != DIGEST_HEX_LEN
                || !digest.chars().all(|c| c.is_ascii_hexdigit())
            {
                return Err(corrupt());
            }
            let sequence = parse_sequence(sequence).ok_or_else(corrupt)?;
            let digest = digest.to_ascii_lowercase();
            if ledger.index.contains_key(&digest) || !seen_sequences.insert(sequence) {
                return Err(corrupt());
            }
            ledger.entries.push((digest.clone(), sequence));
            ledger.index.insert(digest, sequence);
        }
        Ok(ledger)
    }

    /// Sequence number previously assigned to a digest, if any
    pub fn get(&self, digest_hex: &str) -> Option<u32> {
        self.index.get(digest_hex).copied()
    }

    /// Record a newly assigned sequence number. The digest must not be
    /// present yet; assignments are never overwritten.
    pub fn insert(&mut self, digest_hex: String, sequence: u32) {
        debug_assert!(!self.index.contains_key(&digest_hex));
        self.entries.push((digest_hex.clone(), sequence));
        self.index.insert(digest_hex, sequence);
    }

    /// Highest sequence number ever assigned (0 for an empty ledger).
    /// New allocations always go above this watermark, regardless of
    /// which entries still have live declarations.
    pub fn max_sequence(&self) -> u32 {
        self.entries.iter().map(|&(_, seq)| seq).max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in file order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.entries.iter().map(|(d, s)| (d.as_str(), *s))
    }

    /// Serialize to the on-disk line format
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (digest, sequence) in &self.entries {
            out.push_str(digest);
            out.push(':');
            out.push_str(&sequence.to_string());
            out.push('\n');
        }
        out
    }

    /// Rewrite the ledger file in full
    pub fn write(&self, path: &Path) -> Result<(), Error> {
        fs::write(path, self.serialize())?;
        Ok(())
    }
}

fn parse_sequence(raw: &str) -> Option<u32> {
    let sequence = match raw.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => raw.parse().ok()?,
    };
    // sequence numbers start at 1; 0 would collide with "unallocated"
    (sequence > 0).then_some(sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const DIGEST_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    #[test]
    fn test_parse_and_lookup() {
        let content = format!("{}:1\n{}:2\n", DIGEST_A, DIGEST_B);
        let ledger = Ledger::parse(&content).unwrap();
        assert_eq!(ledger.get(DIGEST_A), Some(1));
        assert_eq!(ledger.get(DIGEST_B), Some(2));
        assert_eq!(ledger.max_sequence(), 2);
    }

    #[test]
    fn test_parse_accepts_hex_sequence() {
        let content = format!("{}:0x10\n", DIGEST_A);
        let ledger = Ledger::parse(&content).unwrap();
        assert_eq!(ledger.get(DIGEST_A), Some(16));
    }

    #[test]
    fn test_serialize_round_trip_preserves_order() {
        // B first on purpose: order is file order, not sequence order
        let content = format!("{}:2\n{}:1\n", DIGEST_B, DIGEST_A);
        let ledger = Ledger::parse(&content).unwrap();
        assert_eq!(ledger.serialize(), content);
    }

    #[test]
    fn test_insert_appends_after_existing_entries() {
        let mut ledger = Ledger::parse(&format!("{}:1\n", DIGEST_A)).unwrap();
        ledger.insert(DIGEST_B.to_string(), 2);
        assert_eq!(ledger.serialize(), format!("{}:1\n{}:2\n", DIGEST_A, DIGEST_B));
    }

    #[test]
    fn test_malformed_line_is_fatal() {
        let result = Ledger::parse("not-a-ledger-line\n");
        match result {
            Err(Error::LedgerCorrupt { line_no, .. }) => assert_eq!(line_no, 1),
            other => panic!("expected LedgerCorrupt, got {:?}", other),
        }
    }

    #[test]
    fn test_short_digest_is_fatal() {
        assert!(matches!(
            Ledger::parse("abc123:1\n"),
            Err(Error::LedgerCorrupt { .. })
        ));
    }

    #[test]
    fn test_zero_sequence_is_fatal() {
        assert!(matches!(
            Ledger::parse(&format!("{}:0\n", DIGEST_A)),
            Err(Error::LedgerCorrupt { .. })
        ));
    }

    #[test]
    fn test_duplicate_digest_is_fatal() {
        let content = format!("{}:1\n{}:2\n", DIGEST_A, DIGEST_A);
        assert!(matches!(
            Ledger::parse(&content),
            Err(Error::LedgerCorrupt { .. })
        ));
    }

    #[test]
    fn test_duplicate_sequence_is_fatal() {
        let content = format!("{}:1\n{}:1\n", DIGEST_A, DIGEST_B);
        assert!(matches!(
            Ledger::parse(&content),
            Err(Error::LedgerCorrupt { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_empty_ledger() {
        let temp = tempfile::tempdir().unwrap();
        let ledger = Ledger::load(&temp.path().join("no-such-ledger")).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_write_then_load() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("calls.ledger");
        let mut ledger = Ledger::new();
        ledger.insert(DIGEST_A.to_string(), 1);
        ledger.write(&path).unwrap();
        assert_eq!(Ledger::load(&path).unwrap(), ledger);
    }
}
