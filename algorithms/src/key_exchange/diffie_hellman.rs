//! Implements the finite field Diffie-Hellman key exchange algorithms.
//!
//! All groups use the generator 2. The primes are the MODP groups from
//! [RFC 3526](https://tools.ietf.org/html/rfc3526).

use definitions::{
    algorithms::{
        internal::HostKeyAlgorithmEntry, KeyExchangeAlgorithm, KeyExchangeAlgorithmError,
        KeyExchangeData, KeyExchangeHashFunction, KeyExchangeResponse,
    },
    write, CryptoRngCore,
};
use num_bigint::{BigInt, BigUint, RandBigInt as _};

/// The generator of all supported groups.
pub const GENERATOR: u32 = 2;

/// The minimum size of the private exponent in bits.
const MIN_EXPONENT_BITS: u64 = 1024;

/// The panic message for writes into a `Vec`.
const VEC_WRITE: &str = "writes to a `Vec` cannot fail";

/// The hex encoded prime of the 2048-bit MODP group 14.
pub const GROUP14_PRIME: &str = "\
    FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74\
    020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437\
    4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
    EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163BF05\
    98DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB\
    9ED529077096966D670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B\
    E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF695581718\
    3995497CEA956AE515D2261898FA051015728E5A8AACAA68FFFFFFFFFFFFFFFF";

/// The hex encoded prime of the 4096-bit MODP group 16.
pub const GROUP16_PRIME: &str = "\
    FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74\
    020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437\
    4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
    EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163BF05\
    98DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB\
    9ED529077096966D670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B\
    E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF695581718\
    3995497CEA956AE515D2261898FA051015728E5A8AAAC42DAD33170D04507A33\
    A85521ABDF1CBA64ECFB850458DBEF0A8AEA71575D060C7DB3970F85A6E1E4C7\
    ABF5AE8CDB0933D71E8C94E04A25619DCEE3D2261AD2EE6BF12FFA06D98A0864\
    D87602733EC86A64521F2B18177B200CBBE117577A615D6C770988C0BAD946E2\
    08E24FA074E5AB3143DB5BFCE0FD108E4B82D120A92108011A723C12A787E6D7\
    88719A10BDBA5B2699C327186AF4E23C1A946834B6150BDA2583E9CA2AD44CE8\
    DBBBC2DB04DE8EF92E8EFC141FBECAA6287C59474E6BC05D99B2964FA090C3A2\
    233BA186515BE7ED1F612970CEE2D7AFB81BDD762170481CD0069127D5B05AA9\
    93B4EA988D8FDDC186FFB7DC90A6C08F4DF435C934063199FFFFFFFFFFFFFFFF";

/// Parses one of the hex encoded primes.
fn prime(hex: &str) -> BigUint {
    BigUint::parse_bytes(hex.as_bytes(), 16).expect("the group primes are valid hex")
}

/// Computes the server side of a Diffie-Hellman exchange in the group of `prime_hex`.
///
/// The private exponent is twice as long as the hash output, but at least 1024 bits.
fn respond(
    prime_hex: &str,
    hash_bits: u64,
    hash: KeyExchangeHashFunction,
    client_public: &BigInt,
    data: &KeyExchangeData,
    host_key: &HostKeyAlgorithmEntry,
    rng: &mut dyn CryptoRngCore,
) -> Result<KeyExchangeResponse, KeyExchangeAlgorithmError> {
    let p = prime(prime_hex);
    let one = BigUint::from(1u32);
    let upper = &p - &one;

    // e must lie in [2, p - 2]
    let e = client_public
        .to_biguint()
        .filter(|e| *e > one && *e < upper)
        .ok_or(KeyExchangeAlgorithmError::InvalidPublicValue)?;

    let generator = BigUint::from(GENERATOR);
    let exponent_bits = MIN_EXPONENT_BITS.max(2 * hash_bits);
    let (y, f) = loop {
        let y = rng.gen_biguint(exponent_bits);
        let f = generator.modpow(&y, &p);

        if f > one && f < upper {
            break (y, f);
        }
    };

    let k = e.modpow(&y, &p);

    let server_public = BigInt::from(f);
    let shared_secret = BigInt::from(k);
    let host_key_blob = host_key.public_key()?;

    let mut hash_input = Vec::new();
    write::string(data.client_identification, &mut hash_input).expect(VEC_WRITE);
    write::string(data.server_identification, &mut hash_input).expect(VEC_WRITE);
    write::string(data.client_kexinit, &mut hash_input).expect(VEC_WRITE);
    write::string(data.server_kexinit, &mut hash_input).expect(VEC_WRITE);
    write::string(&host_key_blob, &mut hash_input).expect(VEC_WRITE);
    write::mpint(client_public, &mut hash_input).expect(VEC_WRITE);
    write::mpint(&server_public, &mut hash_input).expect(VEC_WRITE);
    write::mpint(&shared_secret, &mut hash_input).expect(VEC_WRITE);

    let exchange_hash = hash(&hash_input);
    let signature = host_key.sign(&exchange_hash)?;

    Ok(KeyExchangeResponse {
        server_public,
        host_key: host_key_blob,
        signature,
        shared_secret,
        exchange_hash,
    })
}

macro_rules! impl_diffie_hellman {
    ($name_str:expr, $name:ident, $prime:expr, $hash_bits:expr, $hash:ty, $digest:path) => {
        #[doc = concat!("Implements the `", $name_str, "` key exchange algorithm.")]
        #[doc = ""]
        #[doc = concat!("The existence of this struct is controlled by the `", $name_str, "` feature.")]
        #[derive(Debug, Default)]
        pub struct $name {}

        impl $name {
            #[doc = concat!("Creates a new `", $name_str, "` key exchange algorithm.")]
            pub fn new() -> $name {
                $name {}
            }
        }

        impl KeyExchangeAlgorithm for $name {
            const NAME: &'static str = $name_str;

            const HASH_FUNCTION: KeyExchangeHashFunction =
                |input| <$hash as $digest>::digest(input).to_vec();

            fn respond(
                &mut self,
                client_public: &BigInt,
                data: &KeyExchangeData,
                host_key: &HostKeyAlgorithmEntry,
                rng: &mut dyn CryptoRngCore,
            ) -> Result<KeyExchangeResponse, KeyExchangeAlgorithmError> {
                respond(
                    $prime,
                    $hash_bits,
                    Self::HASH_FUNCTION,
                    client_public,
                    data,
                    host_key,
                    rng,
                )
            }
        }
    };
}

#[cfg(feature = "diffie-hellman-group14-sha1")]
impl_diffie_hellman!(
    "diffie-hellman-group14-sha1",
    DiffieHellmanGroup14Sha1,
    GROUP14_PRIME,
    160,
    sha1::Sha1,
    sha1::Digest
);

#[cfg(feature = "diffie-hellman-group14-sha256")]
impl_diffie_hellman!(
    "diffie-hellman-group14-sha256",
    DiffieHellmanGroup14Sha256,
    GROUP14_PRIME,
    256,
    sha2::Sha256,
    sha2::Digest
);

#[cfg(feature = "diffie-hellman-group16-sha512")]
impl_diffie_hellman!(
    "diffie-hellman-group16-sha512",
    DiffieHellmanGroup16Sha512,
    GROUP16_PRIME,
    512,
    sha2::Sha512,
    sha2::Digest
);

#[cfg(all(
    test,
    feature = "diffie-hellman-group14-sha1",
    feature = "diffie-hellman-group14-sha256",
    feature = "diffie-hellman-group16-sha512"
))]
mod tests {
    use super::*;
    use definitions::algorithms::{HostKeyAlgorithm, HostKeyError, HostKeyMaterial};
    use num_bigint::{RandBigInt, Sign};
    use rand::SeedableRng as _;
    use rand_chacha::ChaCha20Rng;

    /// A host key that "signs" by prefixing the message.
    #[derive(Debug, Default)]
    struct PrefixKey;

    impl HostKeyAlgorithm for PrefixKey {
        const NAME: &'static str = "prefix";

        fn import_key(&mut self, _material: &HostKeyMaterial) -> Result<(), HostKeyError> {
            Ok(())
        }

        fn public_key(&self) -> Result<Vec<u8>, HostKeyError> {
            Ok(b"prefix key".to_vec())
        }

        fn sign(&self, message: &[u8]) -> Result<Vec<u8>, HostKeyError> {
            Ok([&b"signed:"[..], message].concat())
        }

        fn verify(&self, message: &[u8], signature: &[u8], _public_key: &[u8]) -> bool {
            signature.strip_prefix(&b"signed:"[..]) == Some(message)
        }
    }

    /// A host key without an imported key.
    #[derive(Debug, Default)]
    struct EmptyKey;

    impl HostKeyAlgorithm for EmptyKey {
        const NAME: &'static str = "empty";

        fn import_key(&mut self, _material: &HostKeyMaterial) -> Result<(), HostKeyError> {
            Ok(())
        }

        fn public_key(&self) -> Result<Vec<u8>, HostKeyError> {
            Err(HostKeyError::KeyNotLoaded)
        }

        fn sign(&self, _message: &[u8]) -> Result<Vec<u8>, HostKeyError> {
            Err(HostKeyError::KeyNotLoaded)
        }

        fn verify(&self, _message: &[u8], _signature: &[u8], _public_key: &[u8]) -> bool {
            false
        }
    }

    const DATA: KeyExchangeData = KeyExchangeData {
        client_identification: b"SSH-2.0-client",
        server_identification: b"SSH-2.0-server",
        client_kexinit: b"\x14client kexinit",
        server_kexinit: b"\x14server kexinit",
    };

    fn unsigned(value: &BigInt) -> BigUint {
        value.to_biguint().unwrap()
    }

    fn check_exchange<T: KeyExchangeAlgorithm + Default>(prime_hex: &str) {
        let mut rng = ChaCha20Rng::seed_from_u64(0x5eed);
        let host_key = HostKeyAlgorithmEntry::from(PrefixKey);
        let p = prime(prime_hex);

        let x = rng.gen_biguint(1024);
        let e = BigInt::from(BigUint::from(GENERATOR).modpow(&x, &p));

        let response = T::default()
            .respond(&e, &DATA, &host_key, &mut rng)
            .unwrap();

        assert_eq!(response.server_public.sign(), Sign::Plus);
        assert!(unsigned(&response.server_public) < p);
        assert_eq!(
            unsigned(&response.server_public).modpow(&x, &p),
            unsigned(&response.shared_secret)
        );
        assert_eq!(response.host_key, b"prefix key");

        let mut hash_input = Vec::new();
        for field in [
            &DATA.client_identification[..],
            DATA.server_identification,
            DATA.client_kexinit,
            DATA.server_kexinit,
            &b"prefix key"[..],
        ] {
            write::string(field, &mut hash_input).unwrap();
        }
        write::mpint(&e, &mut hash_input).unwrap();
        write::mpint(&response.server_public, &mut hash_input).unwrap();
        write::mpint(&response.shared_secret, &mut hash_input).unwrap();

        assert_eq!(response.exchange_hash, (T::HASH_FUNCTION)(&hash_input));
        assert!(PrefixKey.verify(&response.exchange_hash, &response.signature, b""));
    }

    #[test]
    fn group14_sha1() {
        check_exchange::<DiffieHellmanGroup14Sha1>(GROUP14_PRIME);
    }

    #[test]
    fn group14_sha256() {
        check_exchange::<DiffieHellmanGroup14Sha256>(GROUP14_PRIME);
    }

    #[test]
    fn group16_sha512() {
        check_exchange::<DiffieHellmanGroup16Sha512>(GROUP16_PRIME);
    }

    #[test]
    fn hash_sizes() {
        assert_eq!((DiffieHellmanGroup14Sha1::HASH_FUNCTION)(b"").len(), 20);
        assert_eq!((DiffieHellmanGroup14Sha256::HASH_FUNCTION)(b"").len(), 32);
        assert_eq!((DiffieHellmanGroup16Sha512::HASH_FUNCTION)(b"").len(), 64);
    }

    #[test]
    fn primes_have_the_expected_size() {
        assert_eq!(prime(GROUP14_PRIME).bits(), 2048);
        assert_eq!(prime(GROUP16_PRIME).bits(), 4096);
    }

    #[test]
    fn rejects_out_of_range_public_values() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let host_key = HostKeyAlgorithmEntry::from(PrefixKey);
        let p = BigInt::from(prime(GROUP14_PRIME));

        for e in [
            BigInt::from(-2),
            BigInt::from(0),
            BigInt::from(1),
            &p - 1,
            p.clone(),
            &p + 5,
        ] {
            assert_eq!(
                DiffieHellmanGroup14Sha256::new().respond(&e, &DATA, &host_key, &mut rng),
                Err(KeyExchangeAlgorithmError::InvalidPublicValue)
            );
        }

        assert!(DiffieHellmanGroup14Sha256::new()
            .respond(&BigInt::from(2), &DATA, &host_key, &mut rng)
            .is_ok());
    }

    #[test]
    fn host_key_errors_are_forwarded() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let host_key = HostKeyAlgorithmEntry::from(EmptyKey);

        assert_eq!(
            DiffieHellmanGroup14Sha256::new().respond(&BigInt::from(5), &DATA, &host_key, &mut rng),
            Err(KeyExchangeAlgorithmError::HostKey(HostKeyError::KeyNotLoaded))
        );
    }
}
