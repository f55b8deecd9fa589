//! Short ids and object keys.

use rand::Rng;

const SHORT_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
pub const SHORT_ID_LEN: usize = 8;

/// Eight random characters from `[a-z0-9]`.
pub fn generate_short_id() -> String {
    let mut rng = rand::thread_rng();
    (0..SHORT_ID_LEN)
        .map(|_| SHORT_ID_ALPHABET[rng.gen_range(0..SHORT_ID_ALPHABET.len())] as char)
        .collect()
}

/// Extension after the last `.`, restricted to ASCII alphanumerics and
/// lowercased. Falls back to `bin`.
pub fn file_extension(file_name: &str) -> String {
    let ext = match file_name.rsplit_once('.') {
        Some((_, ext)) => ext,
        None => "",
    };
    let cleaned: String = ext
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(16)
        .collect::<String>()
        .to_ascii_lowercase();
    if cleaned.is_empty() {
        "bin".to_string()
    } else {
        cleaned
    }
}

/// `<owner>/<short_id>.<ext>`
pub fn object_key(owner: &str, short_id: &str, file_name: &str) -> String {
    format!("{}/{}.{}", owner, short_id, file_extension(file_name))
}
