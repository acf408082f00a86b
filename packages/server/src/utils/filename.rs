const MAX_STEM_CHARS: usize = 100;
const MAX_EXT_CHARS: usize = 10;

/// Turn a client-supplied upload name into a URL-safe stored name.
///
/// Directory components are dropped, the stem is lowercased with every run of
/// characters outside `[a-z0-9_]` collapsed to a single `-`, and leading or
/// trailing `-` and `_` are trimmed. An empty stem becomes
/// `fallback_stem`; a missing or odd extension becomes `default_ext`.
pub fn sanitize_upload_name(original: &str, fallback_stem: &str, default_ext: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let (raw_stem, raw_ext) = match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (base, None),
    };

    let ext = raw_ext
        .filter(|e| !e.is_empty() && e.len() <= MAX_EXT_CHARS)
        .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| default_ext.to_string());

    let mut stem = String::with_capacity(raw_stem.len());
    let mut pending_dash = false;
    for c in raw_stem.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_dash && !stem.is_empty() {
                stem.push('-');
            }
            pending_dash = false;
            stem.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    let stem: String = stem
        .trim_matches(['-', '_'])
        .chars()
        .take(MAX_STEM_CHARS)
        .collect();
    let stem = stem.trim_end_matches(['-', '_']);

    if stem.is_empty() {
        format!("{fallback_stem}.{ext}")
    } else {
        format!("{stem}.{ext}")
    }
}

/// Whether `name` could have been produced by [`sanitize_upload_name`].
///
/// Used to reject media paths that would never match a stored file.
pub fn is_stored_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_STEM_CHARS + MAX_EXT_CHARS + 1
        && !name.starts_with(['.', '-', '_'])
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
}
