use rand::Rng;
use rand::distr::Alphanumeric;

/// Length of the random component in generated names.
pub const RANDOM_LENGTH: usize = 20;

/// Result of validating a flat filename.
#[derive(Debug)]
pub enum FilenameError {
    /// Filename is empty or whitespace-only.
    Empty,
    /// Filename contains path separators (`/` or `\`).
    ContainsPathSeparator,
    /// Filename contains path traversal patterns (`..`).
    PathTraversal,
    /// Filename contains null bytes.
    NullByte,
    /// Filename starts with a dot (hidden file).
    Hidden,
    /// Filename contains control characters (CR, LF, etc.).
    ControlCharacter,
}

impl FilenameError {
    /// Returns a human-readable error message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "Filename cannot be empty",
            Self::ContainsPathSeparator => "Invalid filename: path separators are not allowed",
            Self::PathTraversal => "Invalid filename: '..' is not allowed",
            Self::NullByte => "Invalid filename: null bytes are not allowed",
            Self::Hidden => "Invalid filename: hidden files (starting with '.') are not allowed",
            Self::ControlCharacter => "Invalid filename: control characters are not allowed",
        }
    }
}

/// Validates a client-supplied flat filename (no directory components allowed).
pub fn validate_flat_filename(filename: &str) -> Result<&str, FilenameError> {
    let trimmed = filename.trim();

    if trimmed.is_empty() {
        return Err(FilenameError::Empty);
    }

    if trimmed.contains('\0') {
        return Err(FilenameError::NullByte);
    }

    // Reject ASCII control characters to prevent
    // HTTP header injection (e.g. CRLF in Content-Disposition).
    if trimmed.chars().any(|c| c.is_ascii_control()) {
        return Err(FilenameError::ControlCharacter);
    }

    if trimmed.contains('/') || trimmed.contains('\\') {
        return Err(FilenameError::ContainsPathSeparator);
    }

    if trimmed == ".." {
        return Err(FilenameError::PathTraversal);
    }

    if trimmed.starts_with('.') {
        return Err(FilenameError::Hidden);
    }

    Ok(trimmed)
}

/// Extracts the directory and filename from a path.
pub fn split_dir_filename(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(pos) => (&path[..pos], &path[pos + 1..]),
        None => ("", path),
    }
}

/// Splits a filename into base name and extension.
///
/// Only the last dot counts, so `archive.tar.gz` is `("archive.tar", Some("gz"))`.
/// A trailing dot yields no extension.
pub fn split_name(name: &str) -> (&str, Option<&str>) {
    let (_, file) = split_dir_filename(name);
    let file = file.rsplit('\\').next().unwrap_or(file);
    match file.rsplit_once('.') {
        Some((base, ext)) if !ext.is_empty() => (base, Some(ext)),
        Some((base, _)) => (base, None),
        None => (file, None),
    }
}

/// Lowercase, transliterated, hyphen-separated rendering of `value`.
pub fn slugify(value: &str) -> String {
    slug::slugify(value)
}

/// `""` for the disk root, otherwise the trimmed directory plus a trailing `/`.
pub fn normalize_dir(dir: &str) -> String {
    let trimmed = dir.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

/// Random ASCII alphanumeric string.
pub fn random_string(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Keeps only ASCII alphanumerics of an extension, lowercased.
fn safe_extension(ext: &str) -> Option<String> {
    let cleaned: String = ext
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Derives a fresh storage path for a display name inside `dir`.
///
/// The result is `{dir}/{slug}-{random}.{ext}`. The display name itself is
/// never reused verbatim. `dir` is trusted: it is not checked for traversal.
pub fn generate_pathname(name: &str, dir: &str) -> String {
    let (base, ext) = split_name(name);
    let slug = slugify(base);
    let ext = ext
        .and_then(safe_extension)
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();

    format!(
        "{}{}-{}{}",
        normalize_dir(dir),
        slug,
        random_string(RANDOM_LENGTH),
        ext
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn validate_flat_filename_accepts_valid_names() {
        assert!(validate_flat_filename("report.pdf").is_ok());
        assert!(validate_flat_filename("Résumé final.docx").is_ok());
        assert!(validate_flat_filename("  padded.txt  ").is_ok());
        assert!(validate_flat_filename("foo..bar").is_ok());
    }

    #[test]
    fn validate_flat_filename_rejects_bad_names() {
        assert!(matches!(
            validate_flat_filename("   "),
            Err(FilenameError::Empty)
        ));
        assert!(matches!(
            validate_flat_filename("src/main.rs"),
            Err(FilenameError::ContainsPathSeparator)
        ));
        assert!(matches!(
            validate_flat_filename("src\\main.rs"),
            Err(FilenameError::ContainsPathSeparator)
        ));
        assert!(matches!(
            validate_flat_filename(".."),
            Err(FilenameError::PathTraversal)
        ));
        assert!(matches!(
            validate_flat_filename("foo\0bar"),
            Err(FilenameError::NullByte)
        ));
        assert!(matches!(
            validate_flat_filename("file\r\nname.txt"),
            Err(FilenameError::ControlCharacter)
        ));
        assert!(matches!(
            validate_flat_filename(".env"),
            Err(FilenameError::Hidden)
        ));
    }

    #[test]
    fn split_dir_filename_works() {
        assert_eq!(split_dir_filename("posts/1/a.png"), ("posts/1", "a.png"));
        assert_eq!(split_dir_filename("a.png"), ("", "a.png"));
    }

    #[test]
    fn split_name_follows_last_dot() {
        assert_eq!(split_name("report.pdf"), ("report", Some("pdf")));
        assert_eq!(split_name("archive.tar.gz"), ("archive.tar", Some("gz")));
        assert_eq!(split_name("README"), ("README", None));
        assert_eq!(split_name("trailing."), ("trailing", None));
        assert_eq!(split_name(".htaccess"), ("", Some("htaccess")));
        assert_eq!(split_name("dir/photo.JPG"), ("photo", Some("JPG")));
    }

    #[test]
    fn normalize_dir_trims_slashes() {
        assert_eq!(normalize_dir(""), "");
        assert_eq!(normalize_dir("/"), "");
        assert_eq!(normalize_dir("posts/1"), "posts/1/");
        assert_eq!(normalize_dir("/posts/1/"), "posts/1/");
    }

    #[test]
    fn slugify_transliterates() {
        assert_eq!(slugify("Quarterly Report (Final)"), "quarterly-report-final");
        assert_eq!(slugify("Résumé"), "resume");
        assert_eq!(slugify("a/../b"), "a-b");
    }

    #[test]
    fn slugify_is_idempotent() {
        for input in ["Hello World", "Ünïcödé_name", "already-a-slug", "x  y--z", ""] {
            let once = slugify(input);
            assert_eq!(slugify(&once), once);
        }
    }

    #[test]
    fn pathname_shape() {
        let pathname = generate_pathname("Quarterly Report.PDF", "posts/7");
        let rest = pathname.strip_prefix("posts/7/quarterly-report-").unwrap();
        let (random, ext) = rest.split_once('.').unwrap();
        assert_eq!(random.len(), RANDOM_LENGTH);
        assert!(random.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(ext, "pdf");
    }

    #[test]
    fn pathname_without_extension_or_dir() {
        let pathname = generate_pathname("notes", "");
        assert!(pathname.starts_with("notes-"));
        assert!(!pathname.contains('.'));
        assert!(!pathname.contains('/'));
        assert_eq!(pathname.len(), "notes-".len() + RANDOM_LENGTH);
    }

    #[test]
    fn pathname_is_url_safe() {
        let pathname = generate_pathname("../../etc/pa ss?wd.t#x t", "");
        assert!(
            pathname
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.'))
        );
        assert!(pathname.ends_with(".txt"));
    }

    #[test]
    fn pathnames_do_not_collide() {
        let generated: HashSet<String> = (0..10_000)
            .map(|_| generate_pathname("same.png", "posts/1"))
            .collect();
        assert_eq!(generated.len(), 10_000);
    }
}
