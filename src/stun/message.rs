// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! STUN message framing: the 20-byte header, attribute walk and
//! MESSAGE-INTEGRITY computation.

use std::convert::TryFrom;

use byteorder::{BigEndian, ByteOrder};

use crate::server::StunError;
use crate::stun::attribute::*;
use crate::stun::validator;

use hmac::{Hmac, Mac};

pub const MAGIC_COOKIE: u32 = 0x2112A442;

/// Length of the fixed message header in bytes.
pub const HEADER_LENGTH: usize = 20;

/// Wire size contributed by a MESSAGE-INTEGRITY attribute: a 4-byte
/// attribute header plus the 20-byte HMAC-SHA1 digest.
const MESSAGE_INTEGRITY_WIRE_LENGTH: u16 = 24;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MessageType {
    BindingRequest,
    BindingResponse,
    BindingErrorResponse,
    SharedSecretRequest,
    SharedSecretResponse,
    SharedSecretErrorResponse,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MessageType({:?} ({:#06x}))", self, self.to_u16())
    }
}

impl MessageType {
    pub fn is_request(self) -> bool {
        matches!(
            self,
            MessageType::BindingRequest | MessageType::SharedSecretRequest
        )
    }

    pub fn is_error_response(self) -> bool {
        matches!(
            self,
            MessageType::BindingErrorResponse | MessageType::SharedSecretErrorResponse
        )
    }

    /// The error-response type paired with this type's method.
    pub fn error_response(self) -> MessageType {
        match self {
            MessageType::SharedSecretRequest
            | MessageType::SharedSecretResponse
            | MessageType::SharedSecretErrorResponse => MessageType::SharedSecretErrorResponse,
            _ => MessageType::BindingErrorResponse,
        }
    }

    /// The success-response type paired with this type's method.
    pub fn success_response(self) -> MessageType {
        match self {
            MessageType::SharedSecretRequest
            | MessageType::SharedSecretResponse
            | MessageType::SharedSecretErrorResponse => MessageType::SharedSecretResponse,
            _ => MessageType::BindingResponse,
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            MessageType::BindingRequest => 0x0001,
            MessageType::BindingResponse => 0x0101,
            MessageType::BindingErrorResponse => 0x0111,
            MessageType::SharedSecretRequest => 0x0002,
            MessageType::SharedSecretResponse => 0x0102,
            MessageType::SharedSecretErrorResponse => 0x0112,
        }
    }

    pub fn from_u16(value: u16) -> Result<Self, StunError> {
        match value {
            0x0001 => Ok(MessageType::BindingRequest),
            0x0101 => Ok(MessageType::BindingResponse),
            0x0111 => Ok(MessageType::BindingErrorResponse),
            0x0002 => Ok(MessageType::SharedSecretRequest),
            0x0102 => Ok(MessageType::SharedSecretResponse),
            0x0112 => Ok(MessageType::SharedSecretErrorResponse),
            _ => {
                warn!("unknown message type {:#06x}", value);
                Err(StunError::UnknownMessageType(value))
            }
        }
    }

    pub fn to_bytes(self) -> Vec<u8> {
        let mut ret = vec![0; 2];
        BigEndian::write_u16(&mut ret[0..2], self.to_u16());
        ret
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, StunError> {
        if data.len() < 2 {
            return Err(StunError::NotEnoughData);
        }
        MessageType::from_u16(BigEndian::read_u16(data))
    }
}
impl From<MessageType> for Vec<u8> {
    fn from(f: MessageType) -> Self {
        f.to_bytes()
    }
}
impl TryFrom<&[u8]> for MessageType {
    type Error = StunError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        MessageType::from_bytes(value)
    }
}

/// One STUN datagram: a message type, the 128-bit transaction id and an
/// ordered list of attributes.  The advertised length field is never stored;
/// it is recomputed from the attribute list on every serialize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    msg_type: MessageType,
    transaction: u128,
    attributes: Vec<RawAttribute>,
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Message(type: {:?}, transaction: {:#x}, attributes: ",
            self.get_type(),
            self.transaction_id()
        )?;
        if self.attributes.is_empty() {
            write!(f, "[]")?;
        } else {
            write!(f, "[")?;
            for (i, a) in self.attributes.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", a)?;
            }
            write!(f, "]")?;
        }
        write!(f, ")")
    }
}

pub(crate) fn padded_attr_size(attr: &dyn Attribute) -> usize {
    if attr.get_length() % 4 == 0 {
        4 + attr.get_length() as usize
    } else {
        8 + attr.get_length() as usize - attr.get_length() as usize % 4
    }
}

impl Message {
    pub fn new(mtype: MessageType, transaction: u128) -> Self {
        Self {
            msg_type: mtype,
            transaction,
            attributes: vec![],
        }
    }

    pub fn new_request(mtype: MessageType) -> Self {
        Message::new(mtype, Message::generate_transaction())
    }

    pub fn new_success(orig: &Message) -> Self {
        Message::new(
            orig.get_type().success_response(),
            orig.transaction_id(),
        )
    }

    pub fn new_error(orig: &Message) -> Self {
        Message::new(orig.get_type().error_response(), orig.transaction_id())
    }

    pub fn get_type(&self) -> MessageType {
        self.msg_type
    }

    pub fn transaction_id(&self) -> u128 {
        self.transaction
    }

    pub fn generate_transaction() -> u128 {
        use rand::{thread_rng, Rng};
        let mut rng = thread_rng();
        rng.gen::<u128>()
    }

    /// The total encoded byte length of the attribute region, i.e. the value
    /// of the header's length field.
    pub fn attributes_length(&self) -> u16 {
        self.attributes
            .iter()
            .map(|attr| padded_attr_size(attr) as u16)
            .sum()
    }

    /// Serialize a `Message` to network bytes
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_relay::stun::attribute::{RawAttribute, Attribute};
    /// # use stun_relay::stun::message::{Message, MessageType};
    /// let mut message = Message::new(MessageType::BindingRequest, 1000);
    /// let attr = RawAttribute::new(1.into(), &[3]);
    /// assert!(message.add_attribute(attr).is_ok());
    /// assert_eq!(message.to_bytes(), vec![0, 1, 0, 8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 3, 232, 0, 1, 0, 1, 3, 0, 0, 0]);
    /// ```
    pub fn to_bytes(&self) -> Vec<u8> {
        let attr_size = self.attributes_length() as usize;
        let mut ret = Vec::with_capacity(HEADER_LENGTH + attr_size);
        ret.extend(self.msg_type.to_bytes());
        ret.resize(HEADER_LENGTH, 0);
        BigEndian::write_u16(&mut ret[2..4], attr_size as u16);
        BigEndian::write_u128(&mut ret[4..20], self.transaction);
        for attr in &self.attributes {
            ret.extend(attr.to_bytes());
        }
        ret
    }

    /// Deserialize a `Message` and validate it against the known attribute
    /// schemas.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_relay::stun::attribute::{RawAttribute, Attribute};
    /// # use stun_relay::stun::message::{Message, MessageType};
    /// let msg_data = vec![0, 1, 0, 8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 3, 232, 112, 0, 0, 1, 3, 0, 0, 0];
    /// let message = Message::from_bytes(&msg_data).unwrap();
    /// let attr = RawAttribute::new(0x7000.into(), &[3]);
    /// let msg_attr = message.get_attribute(0x7000.into()).unwrap();
    /// assert_eq!(msg_attr, &attr);
    /// assert_eq!(message.get_type(), MessageType::BindingRequest);
    /// assert_eq!(message.transaction_id(), 1000);
    /// ```
    pub fn from_bytes(data: &[u8]) -> Result<Self, StunError> {
        if data.len() < HEADER_LENGTH {
            // always at least 20 bytes long
            return Err(StunError::TooShort);
        }
        let mtype = MessageType::from_bytes(data)?;
        let mlength = BigEndian::read_u16(&data[2..]) as usize;
        if mlength != data.len() - HEADER_LENGTH {
            // advertised length must match the actual attribute region exactly
            warn!(
                "malformed advertised size {:?} does not match data size {:?}",
                mlength,
                data.len() - HEADER_LENGTH
            );
            return Err(StunError::LengthMismatch);
        }
        let tid = BigEndian::read_u128(&data[4..]);
        let mut ret = Self::new(mtype, tid);

        let mut data = &data[HEADER_LENGTH..];
        while !data.is_empty() {
            let attr = RawAttribute::from_bytes(data)?;
            let padded_len = padded_attr_size(&attr);
            // the last attribute's padding may be truncated by the end of
            // the message
            let advance = padded_len.min(data.len());
            ret.attributes.push(attr);
            data = &data[advance..];
        }

        validator::validate(&ret)?;
        Ok(ret)
    }

    /// Compute the HMAC-SHA1 message-integrity digest over this message with
    /// `key`.  The digest covers the serialized message without any
    /// MESSAGE-INTEGRITY attribute, but with the advertised length enlarged
    /// as if one were appended.
    pub fn message_integrity(&self, key: &[u8]) -> Result<[u8; 20], StunError> {
        let mut stripped = self.clone();
        stripped
            .attributes
            .retain(|attr| attr.get_type() != MESSAGE_INTEGRITY);
        let mut bytes = stripped.to_bytes();
        // rewrite the length as if the message-integrity attribute were present
        let existing_len = BigEndian::read_u16(&bytes[2..4]);
        BigEndian::write_u16(
            &mut bytes[2..4],
            existing_len + MESSAGE_INTEGRITY_WIRE_LENGTH,
        );
        let mut hmac =
            Hmac::<sha1::Sha1>::new_from_slice(key).map_err(|_| StunError::Malformed)?;
        hmac.update(&bytes);
        let digest = hmac.finalize().into_bytes();
        Ok(digest.into())
    }

    /// Append a MESSAGE-INTEGRITY attribute computed with `key`.  Must be the
    /// final attribute added to the message.
    pub fn add_message_integrity(&mut self, key: &[u8]) -> Result<(), StunError> {
        if self.has_attribute(MESSAGE_INTEGRITY) {
            return Err(StunError::AlreadyExists);
        }
        let integrity = self.message_integrity(key)?;
        self.attributes
            .push(MessageIntegrity::new(integrity).into());
        Ok(())
    }

    /// Check an inbound message's MESSAGE-INTEGRITY attribute against `key`.
    pub fn validate_integrity(&self, key: &[u8]) -> Result<(), StunError> {
        let raw = self
            .get_attribute(MESSAGE_INTEGRITY)
            .ok_or(StunError::ResourceNotFound)?;
        let integrity = MessageIntegrity::try_from(raw)?;
        let expected = self.message_integrity(key)?;
        if integrity.hmac() != &expected {
            return Err(StunError::IntegrityCheckFailed);
        }
        Ok(())
    }

    /// Add a `Attribute` to this `Message`.  Only one `Attribute` of each
    /// `AttributeType` may be present, and nothing may follow a
    /// MESSAGE-INTEGRITY attribute.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_relay::stun::attribute::RawAttribute;
    /// # use stun_relay::stun::message::{Message, MessageType};
    /// let mut message = Message::new(MessageType::BindingRequest, 0);
    /// let attr = RawAttribute::new(1.into(), &[3]);
    /// assert!(message.add_attribute(attr.clone()).is_ok());
    /// assert!(message.add_attribute(attr).is_err());
    /// ```
    pub fn add_attribute(&mut self, attr: impl Into<RawAttribute>) -> Result<(), StunError> {
        let attr = attr.into();
        if self.get_attribute(attr.get_type()).is_some() {
            return Err(StunError::AlreadyExists);
        }
        if self.has_attribute(MESSAGE_INTEGRITY) && attr.get_type() != MESSAGE_INTEGRITY {
            return Err(StunError::AlreadyExists);
        }
        self.attributes.push(attr);
        Ok(())
    }

    pub fn get_attribute(&self, atype: AttributeType) -> Option<&RawAttribute> {
        self.attributes.iter().find(|attr| attr.get_type() == atype)
    }

    pub fn iter_attributes(&self) -> impl Iterator<Item = &RawAttribute> {
        self.attributes.iter()
    }

    pub fn has_attribute(&self, atype: AttributeType) -> bool {
        self.get_attribute(atype).is_some()
    }
}
impl From<Message> for Vec<u8> {
    fn from(f: Message) -> Self {
        f.to_bytes()
    }
}
impl TryFrom<&[u8]> for Message {
    type Error = StunError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Message::from_bytes(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn msg_type_roundtrip() {
        init();
        let types = [
            MessageType::BindingRequest,
            MessageType::BindingResponse,
            MessageType::BindingErrorResponse,
            MessageType::SharedSecretRequest,
            MessageType::SharedSecretResponse,
            MessageType::SharedSecretErrorResponse,
        ];
        for mtype in types {
            assert_eq!(MessageType::from_u16(mtype.to_u16()).unwrap(), mtype);
        }
    }

    #[test]
    fn msg_type_unknown() {
        init();
        assert!(matches!(
            MessageType::from_u16(0x0003),
            Err(StunError::UnknownMessageType(0x0003))
        ));
    }

    #[test]
    fn msg_roundtrip() {
        init();
        let types = [
            MessageType::BindingRequest,
            MessageType::SharedSecretRequest,
            MessageType::BindingResponse,
        ];
        for mtype in types {
            for tid in (0x18..0xffff_ffff_ffff_ffff_ff).step_by(0xfedc_ba98_7654_3210) {
                let mut msg = Message::new(mtype, tid);
                let attr = RawAttribute::new(0x7000.into(), &[3]);
                assert!(msg.add_attribute(attr.clone()).is_ok());
                let data = msg.to_bytes();

                let parsed = Message::from_bytes(&data).unwrap();
                let msg_attr = parsed.get_attribute(0x7000.into()).unwrap();
                assert_eq!(msg_attr, &attr);
                assert_eq!(parsed.get_type(), mtype);
                assert_eq!(parsed.transaction_id(), tid);
                assert_eq!(parsed, msg);
            }
        }
    }

    #[test]
    fn msg_too_short() {
        init();
        for len in 0..20 {
            let data = vec![0; len];
            assert!(matches!(
                Message::from_bytes(&data),
                Err(StunError::TooShort)
            ));
        }
    }

    #[test]
    fn msg_length_mismatch() {
        init();
        let mut msg = Message::new(MessageType::BindingRequest, 42);
        msg.add_attribute(RawAttribute::new(0x7000.into(), &[1, 2, 3, 4]))
            .unwrap();
        let bytes = msg.to_bytes();
        for claimed in [0u16, 4, 7, 9, 12, 0xffff] {
            if claimed as usize == bytes.len() - HEADER_LENGTH {
                continue;
            }
            let mut mangled = bytes.clone();
            BigEndian::write_u16(&mut mangled[2..4], claimed);
            assert!(matches!(
                Message::from_bytes(&mangled),
                Err(StunError::LengthMismatch)
            ));
        }
    }

    #[test]
    fn attribute_overrun() {
        init();
        // 24-byte message with an attribute header claiming 9000 value bytes
        let mut data = vec![0; 24];
        BigEndian::write_u16(&mut data[0..2], MessageType::BindingRequest.to_u16());
        BigEndian::write_u16(&mut data[2..4], 4);
        BigEndian::write_u16(&mut data[20..22], 0x7000);
        BigEndian::write_u16(&mut data[22..24], 9000);
        assert!(matches!(
            Message::from_bytes(&data),
            Err(StunError::AttributeOverrun)
        ));
    }

    #[test]
    fn padding_invariant() {
        init();
        let mut msg = Message::new(MessageType::BindingRequest, 7);
        msg.add_attribute(RawAttribute::new(0x7001.into(), &[1])).unwrap();
        msg.add_attribute(RawAttribute::new(0x7002.into(), &[1, 2, 3])).unwrap();
        msg.add_attribute(RawAttribute::new(0x7003.into(), &[1, 2, 3, 4])).unwrap();
        let bytes = msg.to_bytes();
        assert_eq!(bytes.len() % 4, 0);
        // each attribute starts at the previous offset + 4 + padded length
        let mut offset = HEADER_LENGTH;
        for expected in [0x7001u16, 0x7002, 0x7003] {
            assert_eq!(BigEndian::read_u16(&bytes[offset..offset + 2]), expected);
            let length = BigEndian::read_u16(&bytes[offset + 2..offset + 4]) as usize;
            offset += 4 + length;
            offset += (4 - offset % 4) % 4;
        }
        assert_eq!(offset, bytes.len());
        let parsed = Message::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn integrity_roundtrip() {
        init();
        let mut msg = Message::new(MessageType::BindingResponse, 0xfeed);
        msg.add_attribute(Software::new("s").unwrap()).unwrap();
        msg.add_message_integrity(b"secret").unwrap();
        let bytes = msg.to_bytes();
        let parsed = Message::from_bytes(&bytes).unwrap();
        parsed.validate_integrity(b"secret").unwrap();
        assert!(matches!(
            parsed.validate_integrity(b"wrong"),
            Err(StunError::IntegrityCheckFailed)
        ));
    }

    #[test]
    fn integrity_covers_hypothetical_length() {
        init();
        let mut msg = Message::new(MessageType::BindingResponse, 0xfeed);
        msg.add_attribute(Software::new("s").unwrap()).unwrap();
        let digest = msg.message_integrity(b"secret").unwrap();

        // manual two-step construction: serialize without the attribute,
        // patch the length field, then hmac
        let mut bytes = msg.to_bytes();
        let len = BigEndian::read_u16(&bytes[2..4]);
        BigEndian::write_u16(&mut bytes[2..4], len + 24);
        let mut hmac = Hmac::<sha1::Sha1>::new_from_slice(b"secret").unwrap();
        hmac.update(&bytes);
        let expected: [u8; 20] = hmac.finalize().into_bytes().into();
        assert_eq!(digest, expected);

        // and the digest is stable across an existing integrity attribute
        let mut with_integrity = msg.clone();
        with_integrity.add_message_integrity(b"secret").unwrap();
        assert_eq!(
            with_integrity.message_integrity(b"secret").unwrap(),
            digest
        );
    }

    #[test]
    fn error_response_type_pairing() {
        init();
        let binding = Message::new_request(MessageType::BindingRequest);
        assert_eq!(
            Message::new_error(&binding).get_type(),
            MessageType::BindingErrorResponse
        );
        assert_eq!(
            Message::new_success(&binding).get_type(),
            MessageType::BindingResponse
        );
        let shared = Message::new_request(MessageType::SharedSecretRequest);
        assert_eq!(
            Message::new_error(&shared).get_type(),
            MessageType::SharedSecretErrorResponse
        );
        assert_eq!(
            Message::new_success(&shared).get_type(),
            MessageType::SharedSecretResponse
        );
        assert_eq!(shared.transaction_id(), Message::new_error(&shared).transaction_id());
    }
}
