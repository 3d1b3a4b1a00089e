//! RPM version comparison
//!
//! Implements the segment-wise ordering used by the RPM package manager
//! over `[epoch:]version[-release]` strings. The tie-break order of tilde,
//! caret, numeric and alphabetic segments governs real package ordering
//! and is preserved exactly.

use std::cmp::Ordering;

/// A parsed `[epoch:]version[-release]` string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpmVersion<'a> {
    pub epoch: u64,
    pub version: &'a str,
    pub release: &'a str,
}

impl<'a> RpmVersion<'a> {
    /// Split an EVR string; epoch defaults to 0, release to empty
    pub fn parse(input: &'a str) -> Self {
        let input = input.trim();
        let (epoch, rest) = match input.split_once(':') {
            Some((prefix, rest)) if prefix.bytes().all(|b| b.is_ascii_digit()) => {
                (prefix.parse().unwrap_or(0), rest)
            }
            _ => (0, input),
        };
        let (version, release) = match rest.split_once('-') {
            Some((version, release)) => (version, release),
            None => (rest, ""),
        };
        Self {
            epoch,
            version,
            release,
        }
    }
}

/// Compare two RPM version strings
pub fn compare(a: &str, b: &str) -> Ordering {
    let a = RpmVersion::parse(a);
    let b = RpmVersion::parse(b);
    a.epoch
        .cmp(&b.epoch)
        .then_with(|| segment_compare(a.version, b.version))
        .then_with(|| segment_compare(a.release, b.release))
}

/// The rpmvercmp segment walk
fn segment_compare(a: &str, b: &str) -> Ordering {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let mut i = 0;
    let mut j = 0;

    while i < a.len() || j < b.len() {
        // separators carry no ordering information of their own
        while i < a.len() && !is_segment_byte(a[i]) {
            i += 1;
        }
        while j < b.len() && !is_segment_byte(b[j]) {
            j += 1;
        }

        let ca = a.get(i).copied();
        let cb = b.get(j).copied();

        // tilde sorts before everything, including the end of the string
        if ca == Some(b'~') || cb == Some(b'~') {
            if ca != Some(b'~') {
                return Ordering::Greater;
            }
            if cb != Some(b'~') {
                return Ordering::Less;
            }
            i += 1;
            j += 1;
            continue;
        }

        // caret works like tilde, except that an ended string sorts below it
        if ca == Some(b'^') || cb == Some(b'^') {
            if ca.is_none() {
                return Ordering::Less;
            }
            if cb.is_none() {
                return Ordering::Greater;
            }
            if ca != Some(b'^') {
                return Ordering::Greater;
            }
            if cb != Some(b'^') {
                return Ordering::Less;
            }
            i += 1;
            j += 1;
            continue;
        }

        if ca.is_none() || cb.is_none() {
            break;
        }

        // walk the maximal run of one type, determined by the first string
        let start_i = i;
        let start_j = j;
        let numeric = a[i].is_ascii_digit();
        if numeric {
            while i < a.len() && a[i].is_ascii_digit() {
                i += 1;
            }
            while j < b.len() && b[j].is_ascii_digit() {
                j += 1;
            }
        } else {
            while i < a.len() && a[i].is_ascii_alphabetic() {
                i += 1;
            }
            while j < b.len() && b[j].is_ascii_alphabetic() {
                j += 1;
            }
        }

        let seg_a = &a[start_i..i];
        let mut seg_b = &b[start_j..j];

        // mismatched run types: a numeric run always outranks an alphabetic one
        if seg_b.is_empty() {
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let mut seg_a = seg_a;
        if numeric {
            while seg_a.first() == Some(&b'0') {
                seg_a = &seg_a[1..];
            }
            while seg_b.first() == Some(&b'0') {
                seg_b = &seg_b[1..];
            }
            // more digits means a bigger number
            match seg_a.len().cmp(&seg_b.len()) {
                Ordering::Equal => {}
                other => return other,
            }
        }

        match seg_a.cmp(seg_b) {
            Ordering::Equal => {}
            other => return other,
        }
    }

    // whichever version still has segments left over wins
    if i >= a.len() && j >= b.len() {
        Ordering::Equal
    } else if i >= a.len() {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

fn is_segment_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'~' || byte == b'^'
}
