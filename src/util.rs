use std::env;
use std::ffi::OsStr;
use std::io;
use std::path::Path;

pub(crate) const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// A setting that must be present and non-blank.
pub(crate) fn require_setting(
    name: &str,
    raw: Option<String>,
) -> Result<String, Box<dyn std::error::Error>> {
    match raw {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(io::Error::new(io::ErrorKind::InvalidInput, format!("Missing {name}")).into()),
    }
}

pub(crate) fn env_optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Parse an optional setting, treating a present-but-invalid value as an error.
pub(crate) fn parse_setting<T: std::str::FromStr>(
    name: &str,
    raw: Option<String>,
) -> Result<Option<T>, Box<dyn std::error::Error>> {
    match raw {
        Some(value) => Ok(Some(value.trim().parse::<T>().map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("Invalid {name}"))
        })?)),
        None => Ok(None),
    }
}

pub(crate) fn is_extension_allowed(path: &Path, exts: &[&str]) -> bool {
    let ext = path.extension().and_then(OsStr::to_str).unwrap_or("");
    exts.iter().any(|allowed| ext.eq_ignore_ascii_case(allowed))
}

pub(crate) fn guess_image_media_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(OsStr::to_str)
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "image/jpeg",
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Models sometimes wrap JSON in a Markdown fence even when asked not to.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    text.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_setting_rejects_unset_and_blank() {
        let unset = require_setting("CARDSCAN_NEVER_SET", None).unwrap_err();
        assert_eq!(unset.to_string(), "Missing CARDSCAN_NEVER_SET");
        let blank = require_setting("CARDSCAN_BLANK", Some(" \t\n".to_string())).unwrap_err();
        assert_eq!(blank.to_string(), "Missing CARDSCAN_BLANK");
        assert_eq!(require_setting("K", Some("abc".to_string())).unwrap(), "abc");
    }

    #[test]
    fn optional_env_treats_unset_as_absent() {
        assert_eq!(env_optional("CARDSCAN_TEST_VARIABLE_NEVER_SET"), None);
    }

    #[test]
    fn extension_match_ignores_case() {
        assert!(is_extension_allowed(Path::new("a.png"), &IMAGE_EXTENSIONS));
        assert!(is_extension_allowed(Path::new("c.JPG"), &IMAGE_EXTENSIONS));
        assert!(is_extension_allowed(Path::new("d.Jpeg"), &IMAGE_EXTENSIONS));
        assert!(!is_extension_allowed(Path::new("b.txt"), &IMAGE_EXTENSIONS));
        assert!(!is_extension_allowed(Path::new("noext"), &IMAGE_EXTENSIONS));
    }

    #[test]
    fn media_type_from_extension() {
        assert_eq!(guess_image_media_type(Path::new("x.PNG")), "image/png");
        assert_eq!(guess_image_media_type(Path::new("x.jpeg")), "image/jpeg");
        assert_eq!(guess_image_media_type(Path::new("x.jpg")), "image/jpeg");
        assert_eq!(guess_image_media_type(Path::new("x")), "image/jpeg");
    }

    #[test]
    fn strip_code_fence_variants() {
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  ```\n{}\n```  "), "{}");
    }

    #[test]
    fn parse_setting_rejects_garbage() {
        let ok: Option<u32> = parse_setting("N", Some(" 5 ".to_string())).unwrap();
        assert_eq!(ok, Some(5));
        let none: Option<u32> = parse_setting("N", None).unwrap();
        assert_eq!(none, None);
        let err = parse_setting::<u32>("CARDSCAN_MAX_RETRIES", Some("many".to_string())).unwrap_err();
        assert!(err.to_string().contains("Invalid CARDSCAN_MAX_RETRIES"));
    }
}
