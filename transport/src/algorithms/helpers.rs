//! Checks algorithm names against the naming rules of
//! [RFC 4251 section 6](https://tools.ietf.org/html/rfc4251#section-6).

use definitions::algorithms::AlgorithmCategory;

use crate::errors::{InvalidAlgorithmError, InvalidNameError};

/// Names longer than this are rejected.
const MAX_NAME_LEN: usize = 64;

fn check_character(c: char) -> Result<(), InvalidNameError> {
    match c {
        ',' => Err(InvalidNameError::CommaUsed),
        c if !c.is_ascii() => Err(InvalidNameError::NonAscii(c)),
        c if c.is_ascii_whitespace() => Err(InvalidNameError::Whitespace(c)),
        c if !c.is_ascii_graphic() => Err(InvalidNameError::NonPrintable(c)),
        _ => Ok(()),
    }
}

fn is_dns_label(label: &str) -> bool {
    let bytes = label.as_bytes();

    match (bytes.first(), bytes.last()) {
        (Some(b'-'), _) | (_, Some(b'-')) | (None, _) => false,
        _ => bytes.iter().all(|&b| b.is_ascii_alphanumeric() || b == b'-'),
    }
}

/// Names are printable ASCII without commas, optionally followed by `@` and a domain name.
fn check_name(name: &str) -> Result<(), InvalidNameError> {
    match name.len() {
        0 => return Err(InvalidNameError::EmptyName),
        len if len > MAX_NAME_LEN => return Err(InvalidNameError::TooLong),
        _ => {}
    }

    name.chars().try_for_each(check_character)?;

    match name.split_once('@') {
        None => Ok(()),
        Some((_, domain)) if domain.contains('@') => Err(InvalidNameError::TooManyAtSymbols),
        Some((_, domain)) if domain.split('.').all(is_dns_label) => Ok(()),
        Some(_) => Err(InvalidNameError::InvalidDomain),
    }
}

/// Checks that `name` can be registered for an algorithm of the given category.
pub(crate) fn validate_algorithm_name(
    name: &str,
    category: AlgorithmCategory,
) -> Result<(), InvalidAlgorithmError> {
    check_name(name).map_err(|name_error| InvalidAlgorithmError::InvalidName {
        algorithm_name: name.into(),
        algorithm_category: category,
        name_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_names_are_accepted() {
        for name in [
            "3des-cbc",
            "aes128-ctr",
            "diffie-hellman-group14-sha256",
            "ext-info-s",
            "some-algorithm@example123.com",
            "some-algorithm@com",
        ] {
            assert_eq!(check_name(name), Ok(()), "{}", name);
        }
    }

    #[test]
    fn malformed_names_are_rejected() {
        let too_long = "x".repeat(MAX_NAME_LEN + 1);

        let cases = [
            ("", InvalidNameError::EmptyName),
            (too_long.as_str(), InvalidNameError::TooLong),
            ("commas,are,not,allowed", InvalidNameError::CommaUsed),
            ("non\u{f4}ascii", InvalidNameError::NonAscii('\u{f4}')),
            ("control\x11char", InvalidNameError::NonPrintable('\x11')),
            ("white space", InvalidNameError::Whitespace(' ')),
            ("a@b.c@d.e", InvalidNameError::TooManyAtSymbols),
            ("test@-dash.prefix", InvalidNameError::InvalidDomain),
            ("test@trailing-.dash", InvalidNameError::InvalidDomain),
            ("test@empty..label", InvalidNameError::InvalidDomain),
            ("test@", InvalidNameError::InvalidDomain),
        ];

        for (name, err) in cases {
            assert_eq!(check_name(name), Err(err), "{:?}", name);
        }
    }

    #[test]
    fn category_is_reported() {
        assert_eq!(
            validate_algorithm_name("bad name", AlgorithmCategory::Mac),
            Err(InvalidAlgorithmError::InvalidName {
                algorithm_name: "bad name".into(),
                algorithm_category: AlgorithmCategory::Mac,
                name_error: InvalidNameError::Whitespace(' '),
            })
        );
    }
}
