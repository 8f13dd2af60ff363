//! Parser functions for SSH primitives, a cursor to chain them and a `Parse` trait to abstract
//! over parsable types.

use num_bigint::BigInt;
use std::convert::TryInto as _;

// The primitive parsers are `#[inline]`, because they are tiny and mostly chained through a
// `Reader`.

/// Allows implementors to be parsed from the front of a [`Reader`].
pub trait Parse: Sized {
    /// Parses the `Self` type from `reader`, advancing it past the consumed bytes.
    fn parse(reader: &mut Reader<'_>) -> std::result::Result<Self, ParseError>;

    /// Parses the `Self` type from the start of `input`.
    ///
    /// Trailing bytes after the value are ignored.
    fn parse_from(input: &[u8]) -> std::result::Result<Self, ParseError> {
        Self::parse(&mut Reader::new(input))
    }
}

/// Holds the result of a successful parse.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct ParsedValue<'data, T> {
    /// The value that was parsed.
    pub value: T,
    /// The rest of the input that was not consumed during the parse.
    pub rest_input: &'data [u8],
}

/// Communicates the reason why parsing was not successful.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, thiserror::Error)]
pub enum ParseError {
    /// Not enough data was available to complete the parse.
    #[error("not enough data available to complete the parse")]
    Incomplete,
    /// The input cannot be validly parsed into the expected structure.
    #[error("the parser input did not contain a valid value")]
    Invalid,
}

/// The result type of a primitive parsing operation.
pub type Result<'data, T> = std::result::Result<ParsedValue<'data, T>, ParseError>;

/// A cursor over an input buffer that chains the primitive parsers.
///
/// The reader only ever moves forward. [`Reader::remaining`] allows detecting optional trailing
/// fields.
#[derive(Debug, Clone, Copy)]
pub struct Reader<'data> {
    /// The input that has not been consumed yet.
    input: &'data [u8],
}

impl<'data> Reader<'data> {
    /// Creates a new reader starting at the beginning of `input`.
    pub fn new(input: &'data [u8]) -> Reader<'data> {
        Reader { input }
    }

    /// Returns the number of bytes that have not been consumed yet.
    pub fn remaining(&self) -> usize {
        self.input.len()
    }

    /// Returns `true` if all input was consumed.
    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    /// Returns the unconsumed input without advancing.
    pub fn rest(&self) -> &'data [u8] {
        self.input
    }

    /// Runs `parser` on the unconsumed input and advances past what it consumed.
    fn take<T>(
        &mut self,
        parser: impl FnOnce(&'data [u8]) -> Result<'data, T>,
    ) -> std::result::Result<T, ParseError> {
        let ParsedValue { value, rest_input } = parser(self.input)?;
        self.input = rest_input;

        Ok(value)
    }

    /// Reads `n` raw bytes.
    pub fn bytes(&mut self, n: usize) -> std::result::Result<&'data [u8], ParseError> {
        self.take(|input| bytes(input, n))
    }

    /// Reads exactly `N` raw bytes into an array.
    pub fn bytes_const<const N: usize>(&mut self) -> std::result::Result<[u8; N], ParseError> {
        self.take(bytes_const::<N>)
    }

    /// Reads a single byte.
    pub fn byte(&mut self) -> std::result::Result<u8, ParseError> {
        self.take(byte)
    }

    /// Reads a single byte and fails with [`ParseError::Invalid`] if it is not `expected`.
    pub fn expect_byte(&mut self, expected: u8) -> std::result::Result<(), ParseError> {
        if self.byte()? == expected {
            Ok(())
        } else {
            Err(ParseError::Invalid)
        }
    }

    /// Reads a boolean.
    pub fn boolean(&mut self) -> std::result::Result<bool, ParseError> {
        self.take(boolean)
    }

    /// Reads a uint32.
    pub fn uint32(&mut self) -> std::result::Result<u32, ParseError> {
        self.take(uint32)
    }

    /// Reads a length prefixed binary string.
    pub fn string(&mut self) -> std::result::Result<&'data [u8], ParseError> {
        self.take(string)
    }

    /// Reads a length prefixed string that must be valid UTF-8.
    pub fn utf8(&mut self) -> std::result::Result<&'data str, ParseError> {
        self.take(utf8)
    }

    /// Reads an mpint.
    pub fn mpint(&mut self) -> std::result::Result<BigInt, ParseError> {
        self.take(mpint)
    }

    /// Reads a name-list.
    pub fn name_list(&mut self) -> std::result::Result<Vec<String>, ParseError> {
        self.take(name_list)
    }
}

/// Parses `N` bytes from the input.
///
/// See [RFC 4251 page 8](https://tools.ietf.org/html/rfc4251#page-8).
#[inline]
pub fn bytes_const<const N: usize>(input: &[u8]) -> Result<[u8; N]> {
    let ParsedValue { value, rest_input } = bytes(input, N)?;

    Ok(ParsedValue {
        value: value.try_into().map_err(|_| ParseError::Incomplete)?,
        rest_input,
    })
}

/// Parses `n` bytes from the input.
///
/// See [RFC 4251 page 8](https://tools.ietf.org/html/rfc4251#page-8).
#[inline]
pub fn bytes(input: &[u8], n: usize) -> Result<&[u8]> {
    if input.len() < n {
        Err(ParseError::Incomplete)
    } else {
        let (value, rest_input) = input.split_at(n);

        Ok(ParsedValue { value, rest_input })
    }
}

/// Parses a single byte from the input.
///
/// See [RFC 4251 page 8](https://tools.ietf.org/html/rfc4251#page-8).
#[inline]
pub fn byte(input: &[u8]) -> Result<u8> {
    match input.split_first() {
        Some((value, rest_input)) => Ok(ParsedValue {
            value: *value,
            rest_input,
        }),
        None => Err(ParseError::Incomplete),
    }
}

/// Parses a boolean from the input.
///
/// Any non-zero byte is interpreted as `true`.
///
/// See [RFC 4251 page 9](https://tools.ietf.org/html/rfc4251#page-9).
#[inline]
pub fn boolean(input: &[u8]) -> Result<bool> {
    let ParsedValue { value, rest_input } = byte(input)?;

    Ok(ParsedValue {
        value: value != 0,
        rest_input,
    })
}

/// Parses a big endian uint32 from the input.
///
/// See [RFC 4251 page 9](https://tools.ietf.org/html/rfc4251#page-9).
#[inline]
pub fn uint32(input: &[u8]) -> Result<u32> {
    let ParsedValue { value, rest_input } = bytes_const::<4>(input)?;

    Ok(ParsedValue {
        value: u32::from_be_bytes(value),
        rest_input,
    })
}

/// Parses a string from the input.
///
/// An SSH string is a uint32 length followed by that many bytes of arbitrary binary data.
///
/// See [RFC 4251 page 9](https://tools.ietf.org/html/rfc4251#page-9).
#[inline]
pub fn string(input: &[u8]) -> Result<&[u8]> {
    let ParsedValue {
        value: len,
        rest_input,
    } = uint32(input)?;

    bytes(rest_input, len as usize)
}

/// Parses a string from the input and checks that it is valid UTF-8.
#[inline]
pub fn utf8(input: &[u8]) -> Result<&str> {
    let ParsedValue { value, rest_input } = string(input)?;

    Ok(ParsedValue {
        value: std::str::from_utf8(value).map_err(|_| ParseError::Invalid)?,
        rest_input,
    })
}

/// Parses an mpint from the input.
///
/// Encodings with unnecessary leading `0x00` or `0xff` bytes are rejected.
///
/// See [RFC 4251 page 9](https://tools.ietf.org/html/rfc4251#page-9).
#[inline]
pub fn mpint(input: &[u8]) -> Result<BigInt> {
    let ParsedValue {
        value: string,
        rest_input,
    } = string(input)?;

    if let [first, second, ..] = string {
        let unnecessary_00_byte = *first == 0x00 && (second & 0x80) == 0;
        let unnecessary_ff_byte = *first == 0xff && (second & 0x80) != 0;
        if unnecessary_00_byte || unnecessary_ff_byte {
            return Err(ParseError::Invalid);
        }
    }

    Ok(ParsedValue {
        value: BigInt::from_signed_bytes_be(string),
        rest_input,
    })
}

/// Parses a name-list from the input.
///
/// The names keep the order in which they were sent. Empty names and non-ASCII characters are
/// rejected, an empty list is valid.
///
/// See [RFC 4251 page 10](https://tools.ietf.org/html/rfc4251#page-10).
#[inline]
pub fn name_list<'input, T>(input: &'input [u8]) -> Result<'input, Vec<T>>
where
    &'input str: Into<T>,
{
    let ParsedValue {
        value: string,
        rest_input,
    } = string(input)?;

    if string.is_empty() {
        return Ok(ParsedValue {
            value: Vec::new(),
            rest_input,
        });
    }

    if !string.is_ascii() {
        return Err(ParseError::Invalid);
    }
    let string = std::str::from_utf8(string).map_err(|_| ParseError::Invalid)?;

    if string.split(',').any(str::is_empty) {
        return Err(ParseError::Invalid);
    }

    Ok(ParsedValue {
        value: string.split(',').map(Into::into).collect(),
        rest_input,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte() {
        assert_eq!(
            byte(&[1, 2, 3]),
            Ok(ParsedValue {
                value: 1,
                rest_input: &[2, 3],
            })
        );

        assert_eq!(byte(&[]), Err(ParseError::Incomplete));
    }

    #[test]
    fn test_boolean() {
        assert_eq!(
            boolean(&[0, 2]),
            Ok(ParsedValue {
                value: false,
                rest_input: &[2],
            })
        );

        for i in 1..=255 {
            assert_eq!(
                boolean(&[i]),
                Ok(ParsedValue {
                    value: true,
                    rest_input: &[],
                })
            );
        }

        assert_eq!(boolean(&[]), Err(ParseError::Incomplete));
    }

    #[test]
    fn test_uint32() {
        assert_eq!(
            uint32(&[0x29, 0xb7, 0xf4, 0xaa, 5]),
            Ok(ParsedValue {
                value: 0x29b7f4aa,
                rest_input: &[5],
            })
        );

        assert_eq!(uint32(&[1, 2, 3]), Err(ParseError::Incomplete));
    }

    #[test]
    fn test_string() {
        assert_eq!(
            string(b"\x00\x00\x00\x07te\0ti\xffg1234"),
            Ok(ParsedValue {
                value: &b"te\0ti\xffg"[..],
                rest_input: &b"1234"[..],
            })
        );
        assert_eq!(
            string(&[0, 0, 0, 0, 1]),
            Ok(ParsedValue {
                value: &b""[..],
                rest_input: &[1],
            })
        );

        assert_eq!(
            string(b"\x00\x00\x00\x07testi"),
            Err(ParseError::Incomplete)
        );
    }

    #[test]
    fn test_utf8() {
        assert_eq!(
            utf8(b"\x00\x00\x00\x05C.UTF"),
            Ok(ParsedValue {
                value: "C.UTF",
                rest_input: &[],
            })
        );
        assert_eq!(utf8(b"\x00\x00\x00\x01\xff"), Err(ParseError::Invalid));
    }

    #[test]
    fn test_mpint() {
        assert_eq!(
            mpint(&[0, 0, 0, 0, 0]),
            Ok(ParsedValue {
                value: BigInt::from(0),
                rest_input: &[0],
            })
        );
        assert_eq!(
            mpint(&[0, 0, 0, 8, 0x09, 0xa3, 0x78, 0xf9, 0xb2, 0xe3, 0x32, 0xa7]),
            Ok(ParsedValue {
                value: BigInt::parse_bytes(b"9a378f9b2e332a7", 16).unwrap(),
                rest_input: &[],
            })
        );
        assert_eq!(
            mpint(&[0, 0, 0, 2, 0x00, 0x80]),
            Ok(ParsedValue {
                value: BigInt::from(0x80),
                rest_input: &[],
            })
        );
        assert_eq!(
            mpint(&[0, 0, 0, 2, 0xed, 0xcc]),
            Ok(ParsedValue {
                value: BigInt::from(-0x1234),
                rest_input: &[],
            })
        );

        assert_eq!(
            mpint(&[0, 0, 0, 5, 0xff, 0x81, 0x52, 0x41, 0x11]),
            Err(ParseError::Invalid)
        );
        assert_eq!(
            mpint(&[0, 0, 0, 5, 0x00, 0x21, 0x52, 0x41, 0x11]),
            Err(ParseError::Invalid)
        );
    }

    #[test]
    fn test_name_list() {
        assert_eq!(
            name_list::<&str>(b"\x00\x00\x00\x00"),
            Ok(ParsedValue {
                value: vec![],
                rest_input: &[],
            })
        );
        assert_eq!(
            name_list(b"\x00\x00\x00\x09b,a,c,d,e"),
            Ok(ParsedValue {
                value: vec!["b", "a", "c", "d", "e"],
                rest_input: &[],
            })
        );

        assert_eq!(
            name_list::<&str>(b"\x00\x00\x00\x05,zlib"),
            Err(ParseError::Invalid)
        );
        assert_eq!(
            name_list::<&str>(b"\x00\x00\x00\x05zlib,"),
            Err(ParseError::Invalid)
        );
        assert_eq!(
            name_list::<&str>(b"\x00\x00\x00\x05a,,bc"),
            Err(ParseError::Invalid)
        );
        assert_eq!(
            name_list::<&str>(b"\x00\x00\x00\x05a\xf0,bc"),
            Err(ParseError::Invalid)
        );
    }

    #[test]
    fn reader_tracks_remaining_input() {
        let input = b"\x05\x00\x00\x00\x02hi\x00\x00\x00\x2a";
        let mut reader = Reader::new(&input[..]);

        assert_eq!(reader.remaining(), input.len());
        assert_eq!(reader.byte(), Ok(5));
        assert_eq!(reader.utf8(), Ok("hi"));
        assert_eq!(reader.remaining(), 4);
        assert_eq!(reader.uint32(), Ok(42));
        assert!(reader.is_empty());
        assert_eq!(reader.uint32(), Err(ParseError::Incomplete));
    }

    #[test]
    fn reader_expect_byte() {
        let mut reader = Reader::new(&[20, 21]);

        assert_eq!(reader.expect_byte(20), Ok(()));
        assert_eq!(reader.expect_byte(20), Err(ParseError::Invalid));
    }
}
