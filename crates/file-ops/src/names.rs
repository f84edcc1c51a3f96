//! Deterministic "name (n).ext" collision resolution.

/// Suffix attempts before falling back to a timestamped name.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;

/// Splits a filename into base and extension at the last `.`.
///
/// The extension keeps its leading dot. A name without a dot, or whose only
/// dot is the first character (`.env`), has no extension.
pub fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Returns a name for which `probe` reports no existing entry.
///
/// Tries `desired`, then `base (1)ext` through `base (max_attempts)ext`.
/// When every candidate is taken, returns `base <millis>ext` without
/// probing again. `probe` must reflect the exact target container.
pub fn resolve_free_name(
    desired: &str,
    probe: impl FnMut(&str) -> bool,
    max_attempts: u32,
) -> String {
    resolve_with_clock(desired, probe, max_attempts, || {
        chrono::Utc::now().timestamp_millis()
    })
}

fn resolve_with_clock(
    desired: &str,
    mut probe: impl FnMut(&str) -> bool,
    max_attempts: u32,
    now_millis: impl FnOnce() -> i64,
) -> String {
    if !probe(desired) {
        return desired.to_string();
    }

    let (base, ext) = split_name(desired);
    for i in 1..=max_attempts {
        let candidate = format!("{base} ({i}){ext}");
        if !probe(&candidate) {
            return candidate;
        }
    }

    let fallback = format!("{base} {}{ext}", now_millis());
    tracing::warn!(
        desired,
        attempts = max_attempts,
        fallback = %fallback,
        "name suffixes exhausted, using timestamp"
    );
    fallback
}
