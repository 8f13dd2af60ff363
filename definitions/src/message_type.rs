//! Classifies message numbers into the ranges reserved by RFC 4250.

/// Describes the range a message number belongs to.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum MessageType {
    /// The message had `0` as the message number, which has no meaning.
    Zero,
    /// Generic transport layer messages such as "disconnect", "ignore" and "debug".
    TransportLayerGeneric,
    /// Messages used for algorithm negotiation.
    AlgorithmNegotiation,
    /// Messages whose meaning depends on the key exchange method.
    KeyExchangeMethodSpecific,
    /// Generic user authentication messages.
    UserAuthenticationGeneric,
    /// Messages whose meaning depends on the user authentication method.
    UserAuthenticationMethodSpecific,
    /// Generic connection protocol messages.
    ConnectionProtocolGeneric,
    /// Channel related messages.
    ChannelRelated,
    /// Reserved for client protocols.
    Reserved,
    /// Reserved for local extensions.
    LocalExtension,
}

impl MessageType {
    /// Returns the message type for the given message number.
    pub fn from_number(message_number: u8) -> MessageType {
        match message_number {
            0 => MessageType::Zero,
            1..=19 => MessageType::TransportLayerGeneric,
            20..=29 => MessageType::AlgorithmNegotiation,
            30..=49 => MessageType::KeyExchangeMethodSpecific,
            50..=59 => MessageType::UserAuthenticationGeneric,
            60..=79 => MessageType::UserAuthenticationMethodSpecific,
            80..=89 => MessageType::ConnectionProtocolGeneric,
            90..=127 => MessageType::ChannelRelated,
            128..=191 => MessageType::Reserved,
            192..=255 => MessageType::LocalExtension,
        }
    }

    /// Returns the message type of a payload, or `None` for an empty payload.
    pub fn from_payload(payload: &[u8]) -> Option<MessageType> {
        payload.first().map(|num| MessageType::from_number(*num))
    }

    /// Returns `true` for messages that belong to the transport layer itself.
    ///
    /// These are the only messages that may be sent while a key exchange is in progress.
    pub fn is_transport_layer(self) -> bool {
        matches!(
            self,
            MessageType::TransportLayerGeneric
                | MessageType::AlgorithmNegotiation
                | MessageType::KeyExchangeMethodSpecific
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::message_numbers;

    #[test]
    fn standard_message_numbers() {
        assert_eq!(
            MessageType::from_number(message_numbers::SSH_MSG_DISCONNECT),
            MessageType::TransportLayerGeneric
        );
        assert_eq!(
            MessageType::from_number(message_numbers::SSH_MSG_NEWKEYS),
            MessageType::AlgorithmNegotiation
        );
        assert_eq!(
            MessageType::from_number(message_numbers::SSH_MSG_KEXDH_REPLY),
            MessageType::KeyExchangeMethodSpecific
        );
        assert_eq!(
            MessageType::from_number(message_numbers::SSH_MSG_USERAUTH_PK_OK),
            MessageType::UserAuthenticationMethodSpecific
        );
        assert_eq!(
            MessageType::from_number(message_numbers::SSH_MSG_CHANNEL_DATA),
            MessageType::ChannelRelated
        );
    }

    #[test]
    fn transport_layer_messages() {
        assert!(MessageType::from_number(message_numbers::SSH_MSG_KEXINIT).is_transport_layer());
        assert!(MessageType::from_number(message_numbers::SSH_MSG_EXT_INFO).is_transport_layer());
        assert!(!MessageType::from_number(message_numbers::SSH_MSG_CHANNEL_DATA)
            .is_transport_layer());
        assert_eq!(MessageType::from_payload(&[]), None);
    }
}
