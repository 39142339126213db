//! Two-factor authentication codes
//!
//! RFC 6238 TOTP provisioning and verification, plus single-use recovery
//! codes generated alongside the secret.

use anyhow::Result;
use rand::Rng;
use totp_rs::{Algorithm, Secret, TOTP};

const DIGITS: usize = 6;
const SKEW: u8 = 1;
const STEP: u64 = 30;

/// Number of recovery codes issued per enrollment
pub const RECOVERY_CODE_COUNT: usize = 8;

// Unambiguous uppercase alphanumerics for recovery codes
const RECOVERY_CHARSET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Generate a fresh base32-encoded TOTP secret
pub fn generate_secret() -> String {
    Secret::generate_secret().to_encoded().to_string()
}

/// Build the otpauth:// URL the authenticator app enrolls from
pub fn provisioning_url(secret: &str, issuer: &str, account_email: &str) -> Result<String> {
    let totp = build(secret, Some(issuer.to_string()), account_email.to_string())?;
    Ok(totp.get_url())
}

/// Check a submitted code against the stored secret at the current time
pub fn verify_code(secret: &str, code: &str) -> bool {
    let Ok(totp) = build(secret, None, String::new()) else {
        return false;
    };
    totp.check_current(code).unwrap_or(false)
}

/// Generate a set of single-use recovery codes
pub fn generate_recovery_codes() -> Vec<String> {
    let mut rng = rand::thread_rng();
    (0..RECOVERY_CODE_COUNT)
        .map(|_| {
            let chunk = |rng: &mut rand::rngs::ThreadRng| -> String {
                (0..5)
                    .map(|_| RECOVERY_CHARSET[rng.gen_range(0..RECOVERY_CHARSET.len())] as char)
                    .collect()
            };
            format!("{}-{}", chunk(&mut rng), chunk(&mut rng))
        })
        .collect()
}

fn build(secret: &str, issuer: Option<String>, account: String) -> Result<TOTP> {
    let bytes = Secret::Encoded(secret.to_string())
        .to_bytes()
        .map_err(|e| anyhow::anyhow!("Invalid TOTP secret: {:?}", e))?;

    TOTP::new(Algorithm::SHA1, DIGITS, SKEW, STEP, bytes, issuer, account)
        .map_err(|e| anyhow::anyhow!("Failed to build TOTP: {:?}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP";

    #[test]
    fn test_generated_secret_round_trips() {
        let secret = generate_secret();
        let totp = build(&secret, None, String::new()).unwrap();
        let code = totp.generate(1_700_000_000);
        assert!(totp.check(&code, 1_700_000_000));
    }

    #[test]
    fn test_wrong_code_is_rejected_at_fixed_time() {
        let totp = build(SECRET, None, String::new()).unwrap();
        let code = totp.generate(1_700_000_000);
        // far outside the allowed skew window
        assert!(!totp.check(&code, 1_700_000_000 + 10 * STEP));
    }

    #[test]
    fn test_verify_code_with_invalid_secret() {
        assert!(!verify_code("not base32 !!!", "123456"));
    }

    #[test]
    fn test_provisioning_url_shape() {
        let url = provisioning_url(SECRET, "Forafix", "ada@example.com").unwrap();
        assert!(url.starts_with("otpauth://totp/"));
        assert!(url.contains("Forafix"));
    }

    #[test]
    fn test_recovery_codes_are_unique_and_formatted() {
        let codes = generate_recovery_codes();
        assert_eq!(codes.len(), RECOVERY_CODE_COUNT);

        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());

        for code in &codes {
            assert_eq!(code.len(), 11);
            assert_eq!(code.chars().nth(5), Some('-'));
        }
    }
}
