//! Password obfuscation shared between the router and the credential service.
//!
//! This is NOT a security mechanism. It is a fixed convention between exactly
//! two components: each letter rotates by 3 within its own case's alphabet,
//! each digit rotates by 3 mod 10, everything else passes through. The
//! credential service stores passwords already obfuscated, so authentication
//! compares obfuscated against obfuscated and never sees plaintext.

/// Applies the rotate-by-3 transform to a password.
pub fn obfuscate(password: &str) -> String {
    password
        .chars()
        .map(|c| match c {
            'a'..='z' => rotate(c, b'a', 26),
            'A'..='Z' => rotate(c, b'A', 26),
            '0'..='9' => rotate(c, b'0', 10),
            other => other,
        })
        .collect()
}

fn rotate(c: char, base: u8, modulus: u8) -> char {
    ((c as u8 - base + 3) % modulus + base) as char
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotates_letters_within_case() {
        assert_eq!(obfuscate("abc"), "def");
        assert_eq!(obfuscate("XYZ"), "ABC");
        assert_eq!(obfuscate("xyz"), "abc");
    }

    #[test]
    fn rotates_digits_mod_ten() {
        assert_eq!(obfuscate("0789"), "3012");
    }

    #[test]
    fn leaves_symbols_untouched() {
        assert_eq!(obfuscate("p@ss_w0rd!"), "s@vv_z3ug!");
    }

    #[test]
    fn shift_is_three_not_thirteen() {
        // Applying the transform twice must not return the input.
        let once = obfuscate("Secret123");
        assert_ne!(obfuscate(&once), "Secret123");
    }
}
