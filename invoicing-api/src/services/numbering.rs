use rand::{rngs::OsRng, RngCore};

/// Access tokens are this many random bytes, hex-encoded.
pub const ACCESS_TOKEN_BYTES: usize = 32;

/// Format an invoice number as `{prefix}-{counter}` with the counter
/// zero-padded to five digits. Counters past 99999 simply grow wider.
pub fn format_invoice_number(prefix: &str, number: u64) -> String {
    format!("{}-{:05}", prefix, number)
}

/// Generate an opaque hosted-invoice token from the OS random source.
pub fn generate_access_token() -> String {
    let mut bytes = [0u8; ACCESS_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
