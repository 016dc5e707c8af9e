//! Fast URL parsing utilities for the hot path
//!
//! These functions avoid allocations and work directly on string slices.

// =============================================================================
// Scheme
// =============================================================================

/// Get the position after "://".
#[inline]
pub fn get_scheme_end(url: &str) -> Option<usize> {
    let bytes = url.as_bytes();

    let colon_pos = bytes.iter().position(|&b| b == b':')?;

    if bytes.len() > colon_pos + 2 && bytes[colon_pos + 1] == b'/' && bytes[colon_pos + 2] == b'/' {
        return Some(colon_pos + 3);
    }

    None
}

// =============================================================================
// Host Extraction
// =============================================================================

/// Get the start and end positions of the hostname in a URL.
///
/// Userinfo and port are excluded. Bracketed IPv6 literals keep their
/// brackets.
#[inline]
pub fn get_host_position(url: &str) -> Option<(usize, usize)> {
    let scheme_end = get_scheme_end(url)?;
    let bytes = url.as_bytes();

    // Skip userinfo
    let mut host_start = scheme_end;
    for i in scheme_end..bytes.len() {
        match bytes[i] {
            b'@' => {
                host_start = i + 1;
                break;
            }
            b'/' | b'?' | b'#' => break,
            _ => {}
        }
    }

    if bytes.get(host_start) == Some(&b'[') {
        let close = bytes[host_start..].iter().position(|&b| b == b']')?;
        return Some((host_start, host_start + close + 1));
    }

    let mut host_end = bytes.len();
    for (i, &b) in bytes.iter().enumerate().skip(host_start) {
        if b == b'/' || b == b'?' || b == b'#' || b == b':' {
            host_end = i;
            break;
        }
    }

    Some((host_start, host_end))
}

/// Fast host extraction without allocations.
/// Returns a slice into the original URL.
#[inline]
pub fn extract_host(url: &str) -> Option<&str> {
    let (host_start, host_end) = get_host_position(url)?;
    Some(&url[host_start..host_end])
}

/// Positions in `url` where a `||` domain anchor may start matching: the
/// beginning of the hostname and the character after each dot in it.
pub fn domain_anchor_positions(url: &str) -> impl Iterator<Item = usize> + '_ {
    let (start, end) = get_host_position(url).unwrap_or((0, 0));
    let dots = url.as_bytes()[start..end]
        .iter()
        .enumerate()
        .filter(|&(_, &b)| b == b'.')
        .map(move |(i, _)| start + i + 1);
    let first = if end > start { Some(start) } else { None };
    first.into_iter().chain(dots)
}

// =============================================================================
// Separator Check
// =============================================================================

/// Check if a character is a rule separator (`^`).
/// Anything but a letter, a digit, or one of `_ - . %` separates.
#[inline]
pub fn is_separator_char(c: u8) -> bool {
    !(c.is_ascii_alphanumeric() || matches!(c, b'_' | b'-' | b'.' | b'%'))
}
