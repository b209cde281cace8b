//! Triangle paint codes
//!
//! Multi-material painting stores, per triangle, a hex string encoding a
//! subdivision tree. The string is read from its last character towards the
//! first, one nibble per node:
//!
//! - the low two bits give the number of split sides; a non-zero value means
//!   `split + 1` child nodes follow
//! - otherwise the node is a leaf. If both high bits are set the state is the
//!   next nibble plus 3, else the state is the high two bits
//!
//! State 0 means "object default"; state `n > 0` is extruder `n`, i.e.
//! filament slot `n - 1`.

use std::collections::BTreeSet;
use tracing::warn;

/// Deepest subdivision a code may describe
const MAX_DEPTH: usize = 32;

/// Decode a paint code into the 0-based filament slots it paints with
///
/// Returns an error message for non-hex characters, truncated trees and
/// trees nested deeper than any slicer produces.
pub fn decode_slots(code: &str) -> Result<BTreeSet<usize>, String> {
    let states = decode_states(code)?;
    Ok(states.into_iter().filter(|&s| s > 0).map(|s| s - 1).collect())
}

/// Decode a paint code into the extruder states it contains, 0 included
///
/// A code holds one tree. Nibbles left over after it are decoded as further
/// trees so that no referenced state goes unseen.
pub fn decode_states(code: &str) -> Result<BTreeSet<usize>, String> {
    let mut nibbles = Nibbles::new(code);
    let mut states = BTreeSet::new();
    decode_node(&mut nibbles, &mut states, 0)?;
    if !nibbles.is_empty() {
        warn!(code, remaining = nibbles.remaining, "paint code has trailing data");
        while !nibbles.is_empty() {
            decode_node(&mut nibbles, &mut states, 0)?;
        }
    }
    Ok(states)
}

/// Paint code assigning a whole triangle to one extruder state
pub fn encode_state(state: usize) -> String {
    if state < 3 {
        format!("{:X}", state << 2)
    } else {
        // Two nibbles, written in reverse reading order
        format!("{:X}C", state - 3)
    }
}

fn decode_node(nibbles: &mut Nibbles<'_>, states: &mut BTreeSet<usize>, depth: usize) -> Result<(), String> {
    if depth > MAX_DEPTH {
        return Err(format!("paint code nested deeper than {} levels", MAX_DEPTH));
    }

    let code = nibbles.next_nibble()?;
    let split_sides = code & 0b11;
    if split_sides > 0 {
        for _ in 0..=split_sides {
            decode_node(nibbles, states, depth + 1)?;
        }
        return Ok(());
    }

    let state = if code & 0b1100 == 0b1100 {
        usize::from(nibbles.next_nibble()?) + 3
    } else {
        usize::from(code >> 2)
    };
    states.insert(state);
    Ok(())
}

struct Nibbles<'a> {
    code: &'a [u8],
    remaining: usize,
}

impl<'a> Nibbles<'a> {
    fn new(code: &'a str) -> Self {
        let code = code.trim().as_bytes();
        Self {
            code,
            remaining: code.len(),
        }
    }

    fn is_empty(&self) -> bool {
        self.remaining == 0
    }

    fn next_nibble(&mut self) -> Result<u8, String> {
        if self.remaining == 0 {
            return Err("paint code ends in the middle of a node".to_string());
        }
        self.remaining -= 1;
        let c = self.code[self.remaining];
        match c {
            b'0'..=b'9' => Ok(c - b'0'),
            b'a'..=b'f' => Ok(c - b'a' + 10),
            b'A'..=b'F' => Ok(c - b'A' + 10),
            _ => Err(format!("invalid character '{}' in paint code", char::from(c))),
        }
    }
}
