//! Provides implementations of the RSA host key algorithms.
//!
//! `ssh-rsa`, `rsa-sha2-256` and `rsa-sha2-512` only differ in the hash used for the signature,
//! so they all import the same key from the key material.

use definitions::{
    algorithms::{HostKeyAlgorithm, HostKeyError, HostKeyMaterial},
    write, Reader,
};
use num_bigint::{BigInt, Sign};
use rsa::{
    pkcs1::DecodeRsaPrivateKey as _,
    pkcs1v15::{Signature, SigningKey, VerifyingKey},
    pkcs8::DecodePrivateKey as _,
    signature::{SignatureEncoding as _, Signer as _, Verifier as _},
    traits::PublicKeyParts as _,
    BigUint, RsaPrivateKey, RsaPublicKey,
};
use std::fmt;

/// The name of the key material that the RSA host key algorithms import.
pub const RSA_KEY_NAME: &str = "rsa";

/// The key type that starts every RSA public key blob, regardless of the signature hash.
const KEY_TYPE: &str = "ssh-rsa";

/// The panic message for writes into a `Vec`.
const VEC_WRITE: &str = "writes to a `Vec` cannot fail";

/// Decodes a PEM encoded private key in either PKCS#1 or PKCS#8 format.
fn decode_private_key(pem: &str) -> Result<RsaPrivateKey, HostKeyError> {
    RsaPrivateKey::from_pkcs1_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
        .map_err(|_| HostKeyError::InvalidKey(RSA_KEY_NAME))
}

/// Converts between the integer types of `rsa` and `num-bigint`.
fn to_bigint(value: &BigUint) -> BigInt {
    BigInt::from_bytes_be(Sign::Plus, &value.to_bytes_be())
}

/// Encodes the public key blob.
///
/// ```text,no_run
/// string "ssh-rsa"
/// mpint e
/// mpint n
/// ```
fn encode_public_key(key: &RsaPublicKey) -> Vec<u8> {
    let mut blob = Vec::new();

    write::string(KEY_TYPE.as_bytes(), &mut blob).expect(VEC_WRITE);
    write::mpint(&to_bigint(key.e()), &mut blob).expect(VEC_WRITE);
    write::mpint(&to_bigint(key.n()), &mut blob).expect(VEC_WRITE);

    blob
}

/// Decodes a public key blob, rejecting anything but a positive exponent and modulus.
fn decode_public_key(blob: &[u8]) -> Option<RsaPublicKey> {
    let mut reader = Reader::new(blob);

    if reader.utf8().ok()? != KEY_TYPE {
        return None;
    }

    let (Sign::Plus, e) = reader.mpint().ok()?.to_bytes_be() else {
        return None;
    };
    let (Sign::Plus, n) = reader.mpint().ok()?.to_bytes_be() else {
        return None;
    };

    RsaPublicKey::new(BigUint::from_bytes_be(&n), BigUint::from_bytes_be(&e)).ok()
}

/// Encodes a signature blob.
///
/// ```text,no_run
/// string algorithm_name
/// string signature
/// ```
fn encode_signature(name: &str, signature: &[u8]) -> Vec<u8> {
    let mut blob = Vec::new();

    write::string(name.as_bytes(), &mut blob).expect(VEC_WRITE);
    write::string(signature, &mut blob).expect(VEC_WRITE);

    blob
}

/// Returns the raw signature of a signature blob, if the blob names the algorithm `name`.
fn decode_signature<'blob>(name: &str, blob: &'blob [u8]) -> Option<&'blob [u8]> {
    let mut reader = Reader::new(blob);

    if reader.utf8().ok()? != name {
        return None;
    }

    reader.string().ok()
}

macro_rules! impl_rsa {
    ($name_str:expr, $name:ident, $hash:ty) => {
        #[doc = concat!("Implements the `", $name_str, "` host key algorithm.")]
        #[doc = ""]
        #[doc = concat!("The existence of this struct is controlled by the `", $name_str, "` feature.")]
        #[derive(Default)]
        pub struct $name {
            /// The key used to sign messages.
            ///
            /// This will be `None` as long as no key was imported.
            signing_key: Option<SigningKey<$hash>>,
            /// The encoded public key of the imported key.
            public_key: Vec<u8>,
        }

        impl $name {
            #[doc = concat!("Creates a new `", $name_str, "` host key algorithm without a key.")]
            pub fn new() -> Self {
                $name {
                    signing_key: None,
                    public_key: Vec::new(),
                }
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                // Hide the private key
                f.debug_struct(stringify!($name))
                    .field("loaded", &self.signing_key.is_some())
                    .finish_non_exhaustive()
            }
        }

        impl HostKeyAlgorithm for $name {
            const NAME: &'static str = $name_str;

            fn import_key(&mut self, material: &HostKeyMaterial) -> Result<(), HostKeyError> {
                let pem = material
                    .get(RSA_KEY_NAME)
                    .ok_or(HostKeyError::MissingKey(RSA_KEY_NAME))?;
                let private_key = decode_private_key(pem)?;

                self.public_key = encode_public_key(&private_key.to_public_key());
                self.signing_key = Some(SigningKey::<$hash>::new(private_key));

                Ok(())
            }

            fn public_key(&self) -> Result<Vec<u8>, HostKeyError> {
                match self.signing_key {
                    Some(_) => Ok(self.public_key.clone()),
                    None => Err(HostKeyError::KeyNotLoaded),
                }
            }

            fn sign(&self, message: &[u8]) -> Result<Vec<u8>, HostKeyError> {
                let signing_key = self
                    .signing_key
                    .as_ref()
                    .ok_or(HostKeyError::KeyNotLoaded)?;

                let signature = signing_key
                    .try_sign(message)
                    .map_err(|_| HostKeyError::SigningFailed)?;

                Ok(encode_signature(Self::NAME, &signature.to_bytes()))
            }

            fn verify(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
                let (Some(signature), Some(public_key)) = (
                    decode_signature(Self::NAME, signature),
                    decode_public_key(public_key),
                ) else {
                    return false;
                };

                let Ok(signature) = Signature::try_from(signature) else {
                    return false;
                };

                VerifyingKey::<$hash>::new(public_key)
                    .verify(message, &signature)
                    .is_ok()
            }
        }
    };
}

#[cfg(feature = "ssh-rsa")]
impl_rsa!("ssh-rsa", SshRsa, sha1::Sha1);

#[cfg(feature = "rsa-sha2-256")]
impl_rsa!("rsa-sha2-256", RsaSha2256, sha2::Sha256);

#[cfg(feature = "rsa-sha2-512")]
impl_rsa!("rsa-sha2-512", RsaSha2512, sha2::Sha512);

#[cfg(all(
    test,
    feature = "ssh-rsa",
    feature = "rsa-sha2-256",
    feature = "rsa-sha2-512"
))]
mod tests {
    use super::*;
    use rsa::traits::PublicKeyParts;

    const PKCS1_KEY: &str = include_str!("../../tests/data/host_rsa.pem");
    const PKCS8_KEY: &str = include_str!("../../tests/data/host_rsa_pkcs8.pem");

    fn material() -> HostKeyMaterial {
        HostKeyMaterial::new().with_key(RSA_KEY_NAME, PKCS1_KEY)
    }

    fn loaded<T: HostKeyAlgorithm + Default>() -> T {
        let mut alg = T::default();
        alg.import_key(&material()).unwrap();
        alg
    }

    fn check_round_trip<T: HostKeyAlgorithm + Default>() {
        let alg = loaded::<T>();
        let public_key = alg.public_key().unwrap();

        let signature = alg.sign(b"exchange hash").unwrap();

        assert_eq!(
            decode_signature(T::NAME, &signature).map(<[u8]>::len),
            Some(256)
        );
        assert!(alg.verify(b"exchange hash", &signature, &public_key));
        assert!(!alg.verify(b"exchange hasH", &signature, &public_key));

        let mut tampered = signature.clone();
        *tampered.last_mut().unwrap() ^= 1;
        assert!(!alg.verify(b"exchange hash", &tampered, &public_key));
    }

    #[test]
    fn sign_and_verify() {
        check_round_trip::<SshRsa>();
        check_round_trip::<RsaSha2256>();
        check_round_trip::<RsaSha2512>();
    }

    #[test]
    fn signatures_name_their_hash() {
        let sha1 = loaded::<SshRsa>();
        let sha256 = loaded::<RsaSha2256>();
        let public_key = sha1.public_key().unwrap();

        assert_eq!(sha256.public_key().unwrap(), public_key);

        let signature = sha256.sign(b"data").unwrap();
        assert!(signature.starts_with(b"\x00\x00\x00\x0crsa-sha2-256\x00\x00\x01\x00"));

        assert!(sha256.verify(b"data", &signature, &public_key));
        assert!(!sha1.verify(b"data", &signature, &public_key));
    }

    #[test]
    fn public_key_layout() {
        let public_key = loaded::<RsaSha2512>().public_key().unwrap();

        assert!(public_key.starts_with(b"\x00\x00\x00\x07ssh-rsa"));

        let decoded = decode_public_key(&public_key).unwrap();
        assert_eq!(decoded.n().bits(), 2048);
        assert_eq!(encode_public_key(&decoded), public_key);
    }

    #[test]
    fn pkcs8_keys_are_accepted() {
        let mut alg = RsaSha2256::new();
        alg.import_key(&HostKeyMaterial::new().with_key(RSA_KEY_NAME, PKCS8_KEY))
            .unwrap();

        assert_eq!(alg.public_key(), loaded::<RsaSha2256>().public_key());
    }

    #[test]
    fn import_errors() {
        let mut alg = SshRsa::new();

        assert_eq!(
            alg.import_key(&HostKeyMaterial::new()),
            Err(HostKeyError::MissingKey("rsa"))
        );
        assert_eq!(
            alg.import_key(&HostKeyMaterial::new().with_key("rsa", "not a key")),
            Err(HostKeyError::InvalidKey("rsa"))
        );
        assert_eq!(alg.public_key(), Err(HostKeyError::KeyNotLoaded));
        assert_eq!(alg.sign(b"data"), Err(HostKeyError::KeyNotLoaded));
    }

    #[test]
    fn malformed_blobs_do_not_verify() {
        let alg = loaded::<RsaSha2256>();
        let public_key = alg.public_key().unwrap();
        let signature = alg.sign(b"data").unwrap();

        assert!(!alg.verify(b"data", b"", &public_key));
        assert!(!alg.verify(b"data", &signature, b"\x00\x00\x00\x07ssh-dss"));
        assert!(!alg.verify(b"data", &signature, &public_key[..20]));
    }
}
