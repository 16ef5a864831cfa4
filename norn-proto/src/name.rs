//! Helpers over names in presentation form. Every name handled by the
//! resolver is fully qualified: `example.com.`, or `.` for the root.

/// Longest label, per RFC 1035.
pub const MAX_LABEL: usize = 63;

pub fn is_fqdn(name: &str) -> bool {
    name.ends_with('.')
}

/// Number of labels in a fully qualified name; the root counts zero.
pub fn label_count(name: &str) -> usize {
    name.split('.').filter(|part| !part.is_empty()).count()
}

/// Pick a single label out of a name. Negative indexes count from the
/// end, `-1` being the last label. The label is returned bare, without
/// any separator dot.
pub fn label_from(name: &str, index: i32) -> Option<&str> {
    let labels: Vec<&str> = name.split('.').filter(|part| !part.is_empty()).collect();
    let idx = if index < 0 {
        labels.len().checked_sub(index.unsigned_abs() as usize)?
    } else {
        index as usize
    };
    labels.get(idx).copied()
}

/// First label of a name.
pub fn label_get(name: &str) -> Option<&str> {
    label_from(name, 0)
}

fn is_label_char(ch: u8) -> bool {
    ch.is_ascii_lowercase() || ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == b'-' || ch == b'_'
}

/// Check a name against the hostname charset: fully qualified, at most
/// 254 bytes of presentation form, labels of 1 to 63 bytes drawn from
/// `[A-Za-z0-9_-]`.
pub fn verify(name: &str) -> bool {
    if !is_fqdn(name) || name.len() > 254 {
        return false;
    }
    if name == "." {
        return true;
    }
    name[..name.len() - 1].split('.').all(|label| {
        !label.is_empty()
            && label.len() <= MAX_LABEL
            && label.bytes().all(is_label_char)
    })
}
