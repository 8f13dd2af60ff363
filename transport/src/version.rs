//! The identification line both sides send before the binary protocol starts.
//!
//! See [RFC 4253 section 4.2](https://tools.ietf.org/html/rfc4253#section-4.2).

use std::{borrow::Cow, fmt};

use crate::{constants::PROTOCOL_VERSION, errors::IllegalVersionError};

/// The parts of an identification line `SSH-protoversion-softwareversion SP comments`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct VersionInformation {
    protocol_version: Cow<'static, str>,
    software_version: Cow<'static, str>,
    comments: Option<Cow<'static, str>>,
}

impl VersionInformation {
    /// Describes this implementation as `software_version` speaking protocol version 2.0.
    ///
    /// The software version must be non-empty printable ASCII without `'-'`.
    pub fn new(
        software_version: impl Into<Cow<'static, str>>,
    ) -> Result<VersionInformation, IllegalVersionError> {
        let software_version = software_version.into();
        check_software_version(&software_version)?;

        Ok(VersionInformation {
            protocol_version: Cow::Borrowed(PROTOCOL_VERSION),
            software_version,
            comments: None,
        })
    }

    /// Appends free form comments to the identification line.
    ///
    /// Unlike the software version, comments may contain spaces.
    pub fn with_comments(
        mut self,
        comments: impl Into<Cow<'static, str>>,
    ) -> Result<VersionInformation, IllegalVersionError> {
        let comments = comments.into();

        if let Some((index, c)) = comments
            .char_indices()
            .find(|&(_, c)| c != ' ' && !c.is_ascii_graphic())
        {
            return Err(if c.is_ascii() {
                IllegalVersionError::NonPrintable(index)
            } else {
                IllegalVersionError::NonAscii(index)
            });
        }

        self.comments = Some(comments).filter(|comments| !comments.is_empty());

        Ok(self)
    }

    /// Records the version announced by the peer.
    ///
    /// The version line parser already checked the form of the parts.
    pub(crate) fn announced(
        protocol_version: &str,
        software_version: &str,
        comments: Option<&str>,
    ) -> VersionInformation {
        VersionInformation {
            protocol_version: Cow::Owned(protocol_version.to_owned()),
            software_version: Cow::Owned(software_version.to_owned()),
            comments: comments.map(|comments| Cow::Owned(comments.to_owned())),
        }
    }

    /// Returns the version of the protocol.
    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }

    /// Returns the version of the software.
    pub fn software_version(&self) -> &str {
        &self.software_version
    }

    /// Returns the comments following the software version, if there are any.
    pub fn comments(&self) -> Option<&str> {
        self.comments.as_deref()
    }

    /// Returns `true` if the protocol version is one this crate speaks.
    pub fn is_supported(&self) -> bool {
        self.protocol_version == PROTOCOL_VERSION
    }
}

impl Default for VersionInformation {
    fn default() -> VersionInformation {
        let software_version = format!(
            "{name}_{version}",
            name = env!("CARGO_PKG_NAME"),
            version = env!("CARGO_PKG_VERSION")
        )
        .replace('-', "_");

        VersionInformation::new(software_version).expect("own software version should be legal")
    }
}

impl fmt::Display for VersionInformation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SSH-{}-{}", self.protocol_version, self.software_version)?;

        match &self.comments {
            Some(comments) => write!(f, " {}", comments),
            None => Ok(()),
        }
    }
}

fn check_software_version(version: &str) -> Result<(), IllegalVersionError> {
    if version.is_empty() {
        return Err(IllegalVersionError::Empty);
    }

    for (index, c) in version.char_indices() {
        let err = match c {
            '-' => IllegalVersionError::Minus(index),
            c if !c.is_ascii() => IllegalVersionError::NonAscii(index),
            c if c.is_ascii_whitespace() => IllegalVersionError::Whitespace(index),
            c if !c.is_ascii_graphic() => IllegalVersionError::NonPrintable(index),
            _ => continue,
        };

        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_version_is_legal() {
        let version = VersionInformation::default();

        assert_eq!(check_software_version(version.software_version()), Ok(()));
        assert!(version.software_version().starts_with("sshgate_transport_"));
        assert!(version.is_supported());
    }

    #[test]
    fn illegal_software_versions() {
        assert_eq!(
            VersionInformation::new(""),
            Err(IllegalVersionError::Empty)
        );
        assert_eq!(
            VersionInformation::new("gate-1.0"),
            Err(IllegalVersionError::Minus(4))
        );
        assert_eq!(
            VersionInformation::new("gate 1.0"),
            Err(IllegalVersionError::Whitespace(4))
        );
        assert_eq!(
            VersionInformation::new("g\u{e4}te"),
            Err(IllegalVersionError::NonAscii(1))
        );
        assert_eq!(
            VersionInformation::new("gate\u{7}"),
            Err(IllegalVersionError::NonPrintable(4))
        );
    }

    #[test]
    fn comments() {
        let version = VersionInformation::new("gate_1.0").unwrap();

        assert_eq!(
            version.clone().with_comments("built for tests"),
            Ok(VersionInformation {
                comments: Some("built for tests".into()),
                ..version.clone()
            })
        );
        assert_eq!(version.clone().with_comments(""), Ok(version.clone()));
        assert_eq!(
            version.with_comments("line\r\nbreak"),
            Err(IllegalVersionError::NonPrintable(4))
        );
    }

    #[test]
    fn display() {
        let version = VersionInformation::new("gate_1.0").unwrap();

        assert_eq!(version.to_string(), "SSH-2.0-gate_1.0");
        assert_eq!(
            version.with_comments("hello there").unwrap().to_string(),
            "SSH-2.0-gate_1.0 hello there"
        );
    }

    #[test]
    fn only_version_two_is_supported() {
        assert!(!VersionInformation::announced("1.5", "old", None).is_supported());
        assert!(VersionInformation::announced("2.0", "new", Some("x")).is_supported());
    }
}
