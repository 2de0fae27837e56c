//! Text normalization for client matching.
//!
//! Names typed in a chat rarely carry the accents stored in the registry
//! ("Jose Perez" vs "José Pérez"), so every name comparison goes through
//! [`normalize_text`] first.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

static DOTTED_QUAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})$").unwrap());

/// Case-fold, strip diacritics and trim.
///
/// Decomposes to NFD and drops the combining marks, so `"Ñandú"` becomes `"nandu"`.
/// Inner whitespace is left untouched.
///
/// # Examples
///
/// ```
/// use isp_chat_intake::normalize::normalize_text;
///
/// assert_eq!(normalize_text("  José PÉREZ "), "jose perez");
/// ```
pub fn normalize_text(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Whether `s` is exactly a dotted-quad IPv4 address (every octet at most 255).
pub fn is_dotted_quad(s: &str) -> bool {
    let Some(caps) = DOTTED_QUAD_RE.captures(s) else {
        return false;
    };

    caps.iter()
        .skip(1)
        .flatten()
        .all(|octet| octet.as_str().parse::<u16>().is_ok_and(|v| v <= 255))
}
