//! IPv6 literal extraction
//!
//! Dynamic DNS notifiers post whatever text they like (plain strings, JSON,
//! log lines). [`extract_ipv6`] pulls the first IPv6 literal out of it.
//!
//! Candidates are maximal runs of hex digits, colons and dots, optionally
//! followed by a `%zone`. A run is only accepted when it is a complete
//! address on its own, so `1:2:3:4:5:6:7:8:9` or `1::2::3` never yield a
//! shorter address cut out of the middle. A single leading `:` and trailing
//! sentence punctuation (`.` or a single `:`) are tolerated, which covers
//! text such as `ip:2001:db8::1` or `now at 2001:db8::1.`.
//!
//! A label glued to the front of the address (`IPv6:2001:db8::1`,
//! `updated:2001:db8::1`) is cut off at its first `:`. Hex letters in the
//! label would otherwise start the run early.
//!
//! # Example
//!
//! ```
//! use relay64_extract::extract_ipv6;
//!
//! assert_eq!(extract_ipv6("update: 2001:db8::42 done"), Some("2001:db8::42"));
//! assert_eq!(extract_ipv6("nothing here"), None);
//! ```

use regex_lite::Regex;
use std::net::Ipv6Addr;
use std::sync::OnceLock;

const CANDIDATE_PATTERN: &str = r"[0-9A-Fa-f:.]+(?:%[0-9A-Za-z]+)?";

fn candidates() -> &'static Regex {
    static CANDIDATES: OnceLock<Regex> = OnceLock::new();
    CANDIDATES.get_or_init(|| Regex::new(CANDIDATE_PATTERN).expect("candidate pattern is valid"))
}

/// Return the left-most IPv6 literal in `text`
///
/// Accepts every textual form: full eight group notation, `::` compression
/// anywhere (including `::` alone), embedded dotted-quad suffixes such as
/// `::ffff:192.0.2.1`, and link-local addresses with a `%zone`. No semantic
/// checks are made beyond syntax.
pub fn extract_ipv6(text: &str) -> Option<&str> {
    candidates().find_iter(text).find_map(|candidate| {
        let glued = text[..candidate.start()]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric() || c == '_');
        literal_in(candidate.as_str(), glued)
    })
}

/// True when `text` is exactly one IPv6 literal and nothing else
pub fn is_ipv6_literal(text: &str) -> bool {
    extract_ipv6(text) == Some(text)
}

/// Address inside one candidate run, skipping a label glued to its front
///
/// `glued` means the run continues a word, so everything up to its first
/// `:` belongs to that word. Otherwise the run is tried whole first, and the
/// label is only dropped when it is too long to be a group (`added:`).
fn literal_in(candidate: &str, glued: bool) -> Option<&str> {
    let label_end = candidate.find(':');

    if glued && !candidate.starts_with(':') {
        return address_in(&candidate[label_end? + 1..]);
    }

    address_in(candidate).or_else(|| {
        let label_end = label_end?;
        if label_end > 4 {
            address_in(&candidate[label_end + 1..])
        } else {
            None
        }
    })
}

/// Longest acceptable address inside one run
fn address_in(candidate: &str) -> Option<&str> {
    let address_end = candidate.find('%').unwrap_or(candidate.len());
    let address = &candidate[..address_end];
    let has_zone = address_end < candidate.len();

    let leading = usize::from(address.starts_with(':') && !address.starts_with("::"));
    let trailing = trailing_punctuation(address);

    for (start, end) in [
        (0, address.len()),
        (leading, address.len()),
        (0, address.len() - trailing),
        (leading, address.len() - trailing),
    ] {
        if start >= end {
            continue;
        }

        let Ok(parsed) = address[start..end].parse::<Ipv6Addr>() else {
            continue;
        };

        // A zone is only kept when it directly follows a link-local address.
        if has_zone && end == address.len() && is_link_local(&parsed) {
            return Some(&candidate[start..]);
        }
        return Some(&candidate[start..end]);
    }

    None
}

/// Number of trailing bytes that are sentence punctuation rather than address
fn trailing_punctuation(address: &str) -> usize {
    let without_dots = address.trim_end_matches('.');
    let mut trimmed = address.len() - without_dots.len();

    if without_dots.ends_with(':') && !without_dots.ends_with("::") {
        trimmed += 1;
    }

    trimmed
}

fn is_link_local(address: &Ipv6Addr) -> bool {
    address.segments()[0] & 0xffc0 == 0xfe80
}
