//! Lookup-key normalization for user names, emails and role names.

use unicode_normalization::UnicodeNormalization;

/// Canonical composition (NFC) followed by an invariant uppercase.
///
/// Stores compare normalized fields with plain equality, so callers must
/// normalize both the stored value and the lookup argument.
pub fn normalize(value: &str) -> String {
    value.nfc().collect::<String>().to_uppercase()
}
