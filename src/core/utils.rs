use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;

/// Characters a caption may keep when it becomes a file name
static CAPTION_DISALLOWED: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"[^A-Za-z0-9 \-!()\[\]]+").expect("caption regex is valid")
});

/// Escapes characters that are not allowed in file names.
///
/// Path separators and reserved characters become `_` so the result can never
/// leave the directory it is joined to.
///
/// # Arguments
///
/// * `filename` - Raw file name from a message attribute or a folder directive
///
/// # Returns
///
/// A safe file name, or `"unnamed"` when nothing usable is left.
///
/// # Example
///
/// ```
/// use tgdrop::core::utils::escape_filename;
///
/// assert_eq!(escape_filename("a/b:c.pdf"), "a_b_c.pdf");
/// assert_eq!(escape_filename(".."), "unnamed");
/// ```
pub fn escape_filename(filename: &str) -> String {
    let mut result = String::with_capacity(filename.len());

    for c in filename.chars() {
        match c {
            '/' | '\\' => result.push('_'),
            ':' | '*' | '?' | '<' | '>' | '|' => result.push('_'),
            '"' => result.push('\''),
            c if c.is_control() => result.push('_'),
            _ => result.push(c),
        }
    }

    // Leading/trailing dots would allow "." and ".." components
    let result = result.trim_matches(|c: char| c.is_whitespace() || c == '.');

    if result.is_empty() {
        "unnamed".to_string()
    } else {
        result.to_string()
    }
}

/// Turns a caption into a file name stem.
///
/// Every run of characters outside ASCII letters, digits, space and `-!()[]`
/// collapses to a single space; the result is trimmed. May return an empty
/// string, in which case the caller falls back to a generated name.
pub fn sanitize_caption(caption: &str) -> String {
    let replaced = CAPTION_DISALLOWED.replace_all(caption, " ");
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Local wall-clock time as `HH:MM`
pub fn short_time() -> String {
    Local::now().format("%H:%M").to_string()
}

/// Local date and time as `dd/mm/YYYY HH:MM:SS`
pub fn long_time() -> String {
    Local::now().format("%d/%m/%Y %H:%M:%S").to_string()
}

/// Human-readable size, e.g. `1.5 GB`
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
