//! Dotted-numeric version comparison
//!
//! Schema versions are short dotted-numeric strings (`3.1.12`). Comparison
//! is segment-by-segment numeric; missing segments count as zero and
//! non-numeric segments as zero.

use std::cmp::Ordering;

/// Compare two dotted version strings
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let segments_a: Vec<u64> = a.split('.').map(|s| s.trim().parse().unwrap_or(0)).collect();
    let segments_b: Vec<u64> = b.split('.').map(|s| s.trim().parse().unwrap_or(0)).collect();

    let len = segments_a.len().max(segments_b.len());
    for i in 0..len {
        let sa = segments_a.get(i).copied().unwrap_or(0);
        let sb = segments_b.get(i).copied().unwrap_or(0);
        match sa.cmp(&sb) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    Ordering::Equal
}
