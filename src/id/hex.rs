//! Random 128-bit identifiers rendered as hex.

use rand::RngCore;

/// Length of a generated identifier.
pub const HEX_ID_LEN: usize = 32;

/// Returns a random version-4 style identifier as 32 lowercase hex characters.
///
/// Bytes come from the thread-local CSPRNG; the version and variant nibbles
/// are fixed the same way an RFC 4122 v4 UUID fixes them.
pub fn random_hex_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    hex::encode(bytes)
}
