//! Credential protection.
//!
//! The symmetric primitive is supplied by the application through [`Cipher`],
//! this module only chains the calls the service expects.
use base64::{Engine, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};

use crate::{common::reason_error, envelope::LoginRequest};

/// Symmetric cipher used to protect credentials on the wire.
pub trait Cipher: Send + Sync + 'static {
    /// Encrypt `plaintext` using `key`, `context` is an additional key
    /// material such as salt or access group.
    fn encrypt(&self, plaintext: &str, key: &str, context: &str) -> Result<String, CryptoError>;

    /// Reverse of [`Cipher::encrypt`].
    fn decrypt(&self, ciphertext: &str, key: &str, context: &str) -> Result<String, CryptoError>;

    /// One way digest of a password.
    ///
    /// Default implementation returns base64 of the SHA-256 digest.
    fn hash(&self, password: &str) -> Result<String, CryptoError> {
        Ok(STANDARD.encode(Sha256::digest(password.as_bytes())))
    }
}

/// Build login credential.
///
/// The email is encrypted with the project token, then the password digest
/// is encrypted using the encrypted email as key. A different email always
/// yields a different password ciphertext.
pub fn login_credential<K: Cipher + ?Sized>(
    cipher: &K,
    email: &str,
    password: &str,
    project_token: &str,
    context: &str,
) -> Result<LoginRequest, CryptoError> {
    let email = cipher.encrypt(email, project_token, context)?;
    let digest = cipher.hash(password)?;
    let password = cipher.encrypt(&digest, &email, context)?;
    Ok(LoginRequest { email, password })
}

reason_error! {
    /// An error when encryption or decryption failed.
    pub struct CryptoError("crypto error");
}

impl CryptoError {
    /// Create error for custom [`Cipher`] implementation.
    pub fn custom(reason: impl Into<std::borrow::Cow<'static, str>>) -> CryptoError {
        Self::new(reason)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Deterministic keyed transform, enough to observe key dependency.
    struct Xor;

    impl Cipher for Xor {
        fn encrypt(&self, plaintext: &str, key: &str, context: &str) -> Result<String, CryptoError> {
            let key = Sha256::digest(format!("{key}:{context}").as_bytes());
            let bytes = plaintext.bytes().zip(key.iter().cycle()).map(|(b, k)| b ^ k).collect::<Vec<_>>();
            Ok(STANDARD.encode(bytes))
        }

        fn decrypt(&self, ciphertext: &str, key: &str, context: &str) -> Result<String, CryptoError> {
            let key = Sha256::digest(format!("{key}:{context}").as_bytes());
            let bytes = STANDARD.decode(ciphertext).map_err(|e| CryptoError::custom(e.to_string()))?;
            let plain = bytes.iter().zip(key.iter().cycle()).map(|(b, k)| b ^ k).collect::<Vec<_>>();
            String::from_utf8(plain).map_err(|e| CryptoError::custom(e.to_string()))
        }
    }

    #[test]
    fn default_hash_is_sha256_base64() {
        assert_eq!(Xor.hash("").unwrap(), "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=");
    }

    #[test]
    fn password_depends_on_email() {
        let a = login_credential(&Xor, "a@example.com", "secret", "project", "ctx").unwrap();
        let b = login_credential(&Xor, "b@example.com", "secret", "project", "ctx").unwrap();

        assert_ne!(a.email, b.email);
        assert_ne!(a.password, b.password);

        let digest = Xor.decrypt(&a.password, &a.email, "ctx").unwrap();
        assert_eq!(digest, Xor.hash("secret").unwrap());
        assert_eq!(Xor.decrypt(&a.email, "project", "ctx").unwrap(), "a@example.com");
    }
}
