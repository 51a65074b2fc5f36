use rand::Rng;

const OTP_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const OTP_LENGTH: usize = 6;
/// Codes are valid for three minutes.
pub const OTP_TTL_SECS: i64 = 180;

/// Generate a one-time password of upper-case letters and digits.
pub fn generate_otp() -> String {
    let mut rng = rand::rng();
    (0..OTP_LENGTH)
        .map(|_| OTP_ALPHABET[rng.random_range(0..OTP_ALPHABET.len())] as char)
        .collect()
}
