//! Writer functions for SSH primitives and a `Compose` trait to abstract over writable types.

use num_bigint::{BigInt, Sign};
use std::io::{self, Write};

/// Allows implementors to be written to an output [`std::io::Write`].
pub trait Compose {
    /// Writes `self` to `output`.
    fn compose(&self, output: &mut impl Write) -> io::Result<()>;

    /// Writes `self` to a new `Vec`.
    fn compose_to_vec(&self) -> Vec<u8> {
        let mut vec = Vec::new();

        self.compose(&mut vec)
            .expect("writes to a `Vec` cannot fail");

        vec
    }
}

/// Writes `input.len()` raw bytes to the output.
#[inline]
pub fn bytes(input: &[u8], output: &mut impl Write) -> io::Result<()> {
    output.write_all(input)
}

/// Writes a single byte to the output.
#[inline]
pub fn byte(input: u8, output: &mut impl Write) -> io::Result<()> {
    output.write_all(&[input])
}

/// Writes a boolean as a single `0` or `1` byte.
///
/// See [RFC 4251 page 9](https://tools.ietf.org/html/rfc4251#page-9).
#[inline]
pub fn boolean(input: bool, output: &mut impl Write) -> io::Result<()> {
    byte(input.into(), output)
}

/// Writes a big endian uint32 to the output.
///
/// See [RFC 4251 page 9](https://tools.ietf.org/html/rfc4251#page-9).
#[inline]
pub fn uint32(input: u32, output: &mut impl Write) -> io::Result<()> {
    output.write_all(&input.to_be_bytes())
}

/// Writes a length prefixed string to the output.
///
/// See [RFC 4251 page 9](https://tools.ietf.org/html/rfc4251#page-9).
///
/// # Errors
/// Fails with [`io::ErrorKind::InvalidInput`] for inputs longer than `u32::MAX`.
#[inline]
pub fn string(input: &[u8], output: &mut impl Write) -> io::Result<()> {
    use std::convert::TryInto as _;
    let len: u32 = input
        .len()
        .try_into()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "string too long"))?;

    uint32(len, output)?;
    bytes(input, output)
}

/// Writes an mpint to the output.
///
/// Zero is written as an empty string and positive numbers with their high bit set get a leading
/// zero byte.
///
/// See [RFC 4251 page 9](https://tools.ietf.org/html/rfc4251#page-9).
#[inline]
pub fn mpint(input: &BigInt, output: &mut impl Write) -> io::Result<()> {
    if input.sign() == Sign::NoSign {
        string(&[], output)
    } else {
        string(&input.to_signed_bytes_be(), output)
    }
}

/// Writes a name-list to the output.
///
/// See [RFC 4251 page 10](https://tools.ietf.org/html/rfc4251#page-10).
#[inline]
pub fn name_list<T: AsRef<str>>(input: &[T], output: &mut impl Write) -> io::Result<()> {
    let mut joined = String::new();

    for (i, name) in input.iter().enumerate() {
        debug_assert!(
            !name.as_ref().is_empty() && !name.as_ref().contains(','),
            "names in a name-list must be non-empty and comma free"
        );

        if i != 0 {
            joined.push(',');
        }
        joined.push_str(name.as_ref());
    }

    string(joined.as_bytes(), output)
}
