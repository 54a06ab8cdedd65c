//! Filename sanitization for names taken from URLs.

/// Longest file name accepted by common filesystems (Linux NAME_MAX).
const NAME_MAX: usize = 255;

/// Makes a URL-derived name safe to use as a single path component.
///
/// - Replaces NUL, `/`, `\`, control characters and whitespace with `_`
/// - Collapses runs of `_`
/// - Trims leading/trailing dots, spaces and underscores (no hidden files, no `..`)
/// - Limits length to 255 bytes on a char boundary
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;

    for c in name.chars() {
        let unsafe_char = c == '\0' || c == '/' || c == '\\' || c.is_control() || c.is_whitespace();
        let c = if unsafe_char { '_' } else { c };
        if c == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(c);
            prev_underscore = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    let mut take = trimmed.len().min(NAME_MAX);
    while take > 0 && !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_separators_become_underscores() {
        assert_eq!(sanitize_filename("a/b\\c.txt"), "a_b_c.txt");
        assert_eq!(sanitize_filename("../../etc/passwd"), "etc_passwd");
    }

    #[test]
    fn trims_dots_and_spaces() {
        assert_eq!(sanitize_filename("  ..  file.txt  ..  "), "file.txt");
    }

    #[test]
    fn collapses_underscores_and_control_chars() {
        assert_eq!(sanitize_filename("file___name.txt"), "file_name.txt");
        assert_eq!(sanitize_filename("file\x00\x07name.txt"), "file_name.txt");
    }

    #[test]
    fn truncates_on_char_boundary() {
        let long = "é".repeat(200);
        let out = sanitize_filename(&long);
        assert!(out.len() <= NAME_MAX);
        assert!(out.chars().all(|c| c == 'é'));
    }
}
