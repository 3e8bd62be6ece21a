use std::future::Future;
use std::pin::Pin;

use ed25519_dalek::{Signer, SigningKey};

use crate::error::Result;

/// Signing function trait object type.
///
/// Receives the UTF-8 bytes of the login message and returns the raw
/// signature. A wallet that refuses to sign returns an error.
pub type SignFn = dyn Fn(&[u8]) -> SignFuture + Send + Sync;

/// Future returned by a [`SignFn`].
pub type SignFuture = Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send>>;

/// Sign a message directly with an ed25519 key (`signMessage` semantics).
pub async fn sign_message(message: &[u8], signing_key: &SigningKey) -> Result<Vec<u8>> {
    let signature = signing_key.sign(message);
    Ok(signature.to_bytes().to_vec())
}

/// Build a [`SignFn`] backed by a local keypair.
pub fn keypair_sign_fn(signing_key: SigningKey) -> Box<SignFn> {
    Box::new(move |message: &[u8]| -> SignFuture {
        let key = signing_key.clone();
        let message = message.to_vec();
        Box::pin(async move { sign_message(&message, &key).await })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::Verifier;

    fn test_signing_key() -> SigningKey {
        let secret: [u8; 32] = [
            0x9d, 0x61, 0xb1, 0x9d, 0xef, 0xfd, 0x5a, 0x60, 0xba, 0x84, 0x4a, 0xf4, 0x92, 0xec,
            0x2c, 0xc4, 0x44, 0x49, 0xc5, 0x69, 0x7b, 0x32, 0x69, 0x19, 0x70, 0x3b, 0xac, 0x03,
            0x1c, 0xae, 0x7f, 0x60,
        ];
        SigningKey::from_bytes(&secret)
    }

    #[tokio::test]
    async fn test_sign_message_deterministic_and_verifies() {
        let key = test_signing_key();
        let sig1 = sign_message(b"hello", &key).await.unwrap();
        let sig2 = sign_message(b"hello", &key).await.unwrap();
        assert_eq!(sig1, sig2);
        assert_eq!(sig1.len(), 64);

        let signature = ed25519_dalek::Signature::from_bytes(sig1.as_slice().try_into().unwrap());
        key.verifying_key()
            .verify(b"hello", &signature)
            .expect("signature should verify");
    }

    #[tokio::test]
    async fn test_keypair_sign_fn_matches_direct_signing() {
        let key = test_signing_key();
        let sign_fn = keypair_sign_fn(key.clone());
        let via_fn = sign_fn(b"login").await.unwrap();
        let direct = sign_message(b"login", &key).await.unwrap();
        assert_eq!(via_fn, direct);
    }
}
