// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! STUN attributes and their byte-level codecs.

use std::convert::TryFrom;
use std::convert::TryInto;

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::server::StunError;
use crate::stun::message::MAGIC_COOKIE;

use byteorder::{BigEndian, ByteOrder};

pub const MAPPED_ADDRESS: AttributeType = AttributeType(0x0001);
pub const RESPONSE_ADDRESS: AttributeType = AttributeType(0x0002);
pub const CHANGE_REQUEST: AttributeType = AttributeType(0x0003);
pub const SOURCE_ADDRESS: AttributeType = AttributeType(0x0004);
pub const CHANGED_ADDRESS: AttributeType = AttributeType(0x0005);
pub const USERNAME: AttributeType = AttributeType(0x0006);
pub const PASSWORD: AttributeType = AttributeType(0x0007);
pub const MESSAGE_INTEGRITY: AttributeType = AttributeType(0x0008);
pub const ERROR_CODE: AttributeType = AttributeType(0x0009);
pub const UNKNOWN_ATTRIBUTES: AttributeType = AttributeType(0x000A);
pub const REFLECTED_FROM: AttributeType = AttributeType(0x000B);
pub const REALM: AttributeType = AttributeType(0x0014);
pub const NONCE: AttributeType = AttributeType(0x0015);
pub const XOR_MAPPED_ADDRESS: AttributeType = AttributeType(0x0020);

pub const SOFTWARE: AttributeType = AttributeType(0x8022);
pub const ALTERNATE_SERVER: AttributeType = AttributeType(0x8023);
pub const FINGERPRINT: AttributeType = AttributeType(0x8028);

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct AttributeType(u16);

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({:#x}: {})", self.0, self.0, self.name())
    }
}

impl AttributeType {
    pub fn new(val: u16) -> Self {
        Self(val)
    }

    pub fn name(self) -> &'static str {
        match self {
            MAPPED_ADDRESS => "MAPPED-ADDRESS",
            RESPONSE_ADDRESS => "RESPONSE-ADDRESS",
            CHANGE_REQUEST => "CHANGE-REQUEST",
            SOURCE_ADDRESS => "SOURCE-ADDRESS",
            CHANGED_ADDRESS => "CHANGED-ADDRESS",
            USERNAME => "USERNAME",
            PASSWORD => "PASSWORD",
            MESSAGE_INTEGRITY => "MESSAGE-INTEGRITY",
            ERROR_CODE => "ERROR-CODE",
            UNKNOWN_ATTRIBUTES => "UNKNOWN-ATTRIBUTES",
            REFLECTED_FROM => "REFLECTED-FROM",
            REALM => "REALM",
            NONCE => "NONCE",
            XOR_MAPPED_ADDRESS => "XOR-MAPPED-ADDRESS",
            SOFTWARE => "SOFTWARE",
            ALTERNATE_SERVER => "ALTERNATE-SERVER",
            FINGERPRINT => "FINGERPRINT",
            _ => "unknown",
        }
    }
}
impl From<u16> for AttributeType {
    fn from(f: u16) -> Self {
        Self::new(f)
    }
}
impl From<AttributeType> for u16 {
    fn from(f: AttributeType) -> Self {
        f.0
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AttributeHeader {
    pub atype: AttributeType,
    pub length: u16,
}

impl AttributeHeader {
    fn parse(data: &[u8]) -> Result<Self, StunError> {
        if data.len() < 4 {
            return Err(StunError::NotEnoughData);
        }
        Ok(Self {
            atype: BigEndian::read_u16(&data[0..2]).into(),
            length: BigEndian::read_u16(&data[2..4]),
        })
    }

    fn to_bytes(self) -> Vec<u8> {
        let mut ret = vec![0; 4];
        BigEndian::write_u16(&mut ret[0..2], self.atype.into());
        BigEndian::write_u16(&mut ret[2..4], self.length);
        ret
    }
}
impl From<AttributeHeader> for Vec<u8> {
    fn from(f: AttributeHeader) -> Self {
        f.to_bytes()
    }
}
impl TryFrom<&[u8]> for AttributeHeader {
    type Error = StunError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        AttributeHeader::parse(value)
    }
}

pub trait Attribute: std::fmt::Debug + std::any::Any {
    /// Retrieve the `AttributeType` of an `Attribute`
    fn get_type(&self) -> AttributeType;

    /// Retrieve the length of an `Attribute`.  This is not the padded length as stored in a
    /// `Message`
    fn get_length(&self) -> u16;

    /// Convert an `Attribute` to a `RawAttribute`
    fn to_raw(&self) -> RawAttribute;

    /// Convert an `Attribute` from a `RawAttribute`
    fn from_raw(raw: &RawAttribute) -> Result<Self, StunError>
    where
        Self: Sized;
}

/// An attribute in its opaque on-wire form: a type, an unpadded length and the value bytes.
/// Unrecognized attribute types are carried through parsing unchanged in this form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute {
    pub header: AttributeHeader,
    pub value: Vec<u8>,
}

macro_rules! display_attr {
    ($this:ident, $CamelType:ty, $default:ident) => {{
        if let Ok(attr) = <$CamelType>::from_raw($this) {
            format!("{}", attr)
        } else {
            $default
        }
    }};
}

impl std::fmt::Display for RawAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // try to get a more specialised display
        let malformed_str = format!(
            "{}(Malformed): len: {}, data: {:?})",
            self.get_type(),
            self.header.length,
            self.value
        );
        let display_str = if self.get_type() == MAPPED_ADDRESS {
            display_attr!(self, MappedAddress, malformed_str)
        } else if self.get_type() == RESPONSE_ADDRESS {
            display_attr!(self, ResponseAddress, malformed_str)
        } else if self.get_type() == CHANGE_REQUEST {
            display_attr!(self, ChangeRequest, malformed_str)
        } else if self.get_type() == SOURCE_ADDRESS {
            display_attr!(self, SourceAddress, malformed_str)
        } else if self.get_type() == CHANGED_ADDRESS {
            display_attr!(self, ChangedAddress, malformed_str)
        } else if self.get_type() == USERNAME {
            display_attr!(self, Username, malformed_str)
        } else if self.get_type() == PASSWORD {
            display_attr!(self, Password, malformed_str)
        } else if self.get_type() == MESSAGE_INTEGRITY {
            display_attr!(self, MessageIntegrity, malformed_str)
        } else if self.get_type() == ERROR_CODE {
            display_attr!(self, ErrorCode, malformed_str)
        } else if self.get_type() == UNKNOWN_ATTRIBUTES {
            display_attr!(self, UnknownAttributes, malformed_str)
        } else if self.get_type() == REFLECTED_FROM {
            display_attr!(self, ReflectedFrom, malformed_str)
        } else if self.get_type() == REALM {
            display_attr!(self, Realm, malformed_str)
        } else if self.get_type() == NONCE {
            display_attr!(self, Nonce, malformed_str)
        } else if self.get_type() == XOR_MAPPED_ADDRESS {
            display_attr!(self, XorMappedAddress, malformed_str)
        } else if self.get_type() == SOFTWARE {
            display_attr!(self, Software, malformed_str)
        } else if self.get_type() == ALTERNATE_SERVER {
            display_attr!(self, AlternateServer, malformed_str)
        } else if self.get_type() == FINGERPRINT {
            display_attr!(self, Fingerprint, malformed_str)
        } else {
            format!(
                "RawAttribute (type: {:?}, len: {}, data: {:?})",
                self.header.atype, self.header.length, &self.value
            )
        };
        write!(f, "{}", display_str)
    }
}

impl Attribute for RawAttribute {
    fn get_length(&self) -> u16 {
        self.header.length
    }

    fn get_type(&self) -> AttributeType {
        self.header.atype
    }

    fn to_raw(&self) -> RawAttribute {
        self.clone()
    }

    fn from_raw(raw: &RawAttribute) -> Result<Self, StunError> {
        Ok(raw.clone())
    }
}

impl RawAttribute {
    pub fn new(atype: AttributeType, data: &[u8]) -> Self {
        Self {
            header: AttributeHeader {
                atype,
                length: data.len() as u16,
            },
            value: data.to_vec(),
        }
    }

    /// Deserialize a `RawAttribute` from bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_relay::stun::attribute::{RawAttribute, Attribute, AttributeType};
    /// let data = &[0, 1, 0, 2, 5, 6, 0, 0];
    /// let attr = RawAttribute::from_bytes(data).unwrap();
    /// assert_eq!(attr.get_type(), AttributeType::new(1));
    /// assert_eq!(attr.get_length(), 2);
    /// ```
    pub fn from_bytes(data: &[u8]) -> Result<Self, StunError> {
        let header = AttributeHeader::parse(data)?;
        // the advertised length extends past the actual data -> error
        if header.length as usize > data.len() - 4 {
            return Err(StunError::AttributeOverrun);
        }
        let mut data = data[4..].to_vec();
        data.truncate(header.length as usize);
        Ok(Self {
            header,
            value: data,
        })
    }

    /// Serialize a `RawAttribute` to bytes, padded to a 4-byte boundary.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_relay::stun::attribute::{RawAttribute, Attribute, AttributeType};
    /// let attr = RawAttribute::new(AttributeType::new(1), &[5, 6]);
    /// assert_eq!(attr.to_bytes(), &[0, 1, 0, 2, 5, 6, 0, 0]);
    /// ```
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut ret: Vec<u8> = self.header.into();
        ret.extend(&self.value);
        let len = ret.len();
        if len % 4 != 0 {
            // pad to 4 bytes
            ret.resize(len + 4 - (len % 4), 0);
        }
        ret
    }
}
impl From<RawAttribute> for Vec<u8> {
    fn from(f: RawAttribute) -> Self {
        f.to_bytes()
    }
}

impl TryFrom<&[u8]> for RawAttribute {
    type Error = StunError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        RawAttribute::from_bytes(value)
    }
}

pub(crate) const FAMILY_IPV4: u8 = 0x1;
pub(crate) const FAMILY_IPV6: u8 = 0x2;

fn write_address(addr: SocketAddr) -> Vec<u8> {
    match addr {
        SocketAddr::V4(addr) => {
            let mut buf = vec![0; 8];
            buf[1] = FAMILY_IPV4;
            BigEndian::write_u16(&mut buf[2..4], addr.port());
            buf[4..8].copy_from_slice(&addr.ip().octets());
            buf
        }
        SocketAddr::V6(addr) => {
            let mut buf = vec![0; 20];
            buf[1] = FAMILY_IPV6;
            BigEndian::write_u16(&mut buf[2..4], addr.port());
            buf[4..20].copy_from_slice(&addr.ip().octets());
            buf
        }
    }
}

fn read_address(data: &[u8]) -> Result<SocketAddr, StunError> {
    if data.len() < 4 {
        return Err(StunError::NotEnoughData);
    }
    let port = BigEndian::read_u16(&data[2..4]);
    let addr = match data[1] {
        FAMILY_IPV4 => {
            if data.len() < 8 {
                return Err(StunError::NotEnoughData);
            }
            if data.len() > 8 {
                return Err(StunError::TooBig);
            }
            IpAddr::V4(Ipv4Addr::from(BigEndian::read_u32(&data[4..8])))
        }
        FAMILY_IPV6 => {
            if data.len() < 20 {
                return Err(StunError::NotEnoughData);
            }
            if data.len() > 20 {
                return Err(StunError::TooBig);
            }
            let mut octets = [0; 16];
            octets.clone_from_slice(&data[4..]);
            IpAddr::V6(Ipv6Addr::from(octets))
        }
        _ => return Err(StunError::Malformed),
    };
    Ok(SocketAddr::new(addr, port))
}

macro_rules! address_attribute {
    ($CamelType:ident, $TYPE:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $CamelType {
            addr: SocketAddr,
        }

        impl Attribute for $CamelType {
            fn get_type(&self) -> AttributeType {
                $TYPE
            }

            fn get_length(&self) -> u16 {
                match self.addr {
                    SocketAddr::V4(_) => 8,
                    SocketAddr::V6(_) => 20,
                }
            }

            fn to_raw(&self) -> RawAttribute {
                RawAttribute::new(self.get_type(), &write_address(self.addr))
            }

            fn from_raw(raw: &RawAttribute) -> Result<Self, StunError> {
                if raw.header.atype != $TYPE {
                    return Err(StunError::WrongAttributeType);
                }
                Ok(Self {
                    addr: read_address(&raw.value)?,
                })
            }
        }

        impl $CamelType {
            pub fn new(addr: SocketAddr) -> Self {
                Self { addr }
            }

            pub fn addr(&self) -> SocketAddr {
                self.addr
            }
        }

        impl std::fmt::Display for $CamelType {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}: {:?}", self.get_type(), self.addr)
            }
        }

        impl TryFrom<&RawAttribute> for $CamelType {
            type Error = StunError;

            fn try_from(value: &RawAttribute) -> Result<Self, Self::Error> {
                $CamelType::from_raw(value)
            }
        }

        impl From<$CamelType> for RawAttribute {
            fn from(f: $CamelType) -> Self {
                f.to_raw()
            }
        }
    };
}

address_attribute!(MappedAddress, MAPPED_ADDRESS);
address_attribute!(ResponseAddress, RESPONSE_ADDRESS);
address_attribute!(SourceAddress, SOURCE_ADDRESS);
address_attribute!(ChangedAddress, CHANGED_ADDRESS);
address_attribute!(ReflectedFrom, REFLECTED_FROM);
address_attribute!(AlternateServer, ALTERNATE_SERVER);

macro_rules! bytewise_xor {
    ($size:literal, $a:expr, $b:expr, $default:literal) => {{
        let mut arr = [$default; $size];
        for (i, item) in arr.iter_mut().enumerate() {
            *item = $a[i] ^ $b[i];
        }
        arr
    }};
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XorMappedAddress {
    // stored XOR-ed as we need the transaction id to get the original value
    addr: SocketAddr,
}
impl Attribute for XorMappedAddress {
    fn get_type(&self) -> AttributeType {
        XOR_MAPPED_ADDRESS
    }

    fn get_length(&self) -> u16 {
        match self.addr {
            SocketAddr::V4(_) => 8,
            SocketAddr::V6(_) => 20,
        }
    }

    fn to_raw(&self) -> RawAttribute {
        RawAttribute::new(self.get_type(), &write_address(self.addr))
    }

    fn from_raw(raw: &RawAttribute) -> Result<Self, StunError> {
        if raw.header.atype != XOR_MAPPED_ADDRESS {
            return Err(StunError::WrongAttributeType);
        }
        Ok(Self {
            addr: read_address(&raw.value)?,
        })
    }
}

impl XorMappedAddress {
    pub fn new(addr: SocketAddr, transaction: u128) -> Self {
        Self {
            addr: XorMappedAddress::xor_addr(addr, transaction),
        }
    }

    fn xor_addr(addr: SocketAddr, transaction: u128) -> SocketAddr {
        match addr {
            SocketAddr::V4(addr) => {
                let port = addr.port() ^ (MAGIC_COOKIE >> 16) as u16;
                let const_octets = MAGIC_COOKIE.to_be_bytes();
                let addr_octets = addr.ip().octets();
                let octets = bytewise_xor!(4, const_octets, addr_octets, 0);
                SocketAddr::new(IpAddr::V4(Ipv4Addr::from(octets)), port)
            }
            SocketAddr::V6(addr) => {
                let port = addr.port() ^ (MAGIC_COOKIE >> 16) as u16;
                let const_octets =
                    ((MAGIC_COOKIE as u128) << 96 | (transaction & 0xffff_ffff_ffff_ffff_ffff_ffff))
                        .to_be_bytes();
                let addr_octets = addr.ip().octets();
                let octets = bytewise_xor!(16, const_octets, addr_octets, 0);
                SocketAddr::new(IpAddr::V6(Ipv6Addr::from(octets)), port)
            }
        }
    }

    /// The unobscured address.  The transaction id of the containing message is needed to undo
    /// the XOR transform for IPv6 addresses.
    pub fn addr(&self, transaction: u128) -> SocketAddr {
        XorMappedAddress::xor_addr(self.addr, transaction)
    }
}

impl std::fmt::Display for XorMappedAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.addr {
            SocketAddr::V4(_) => write!(f, "{}: {:?}", self.get_type(), self.addr(0x0)),
            SocketAddr::V6(addr) => write!(f, "{}: XOR({:?})", self.get_type(), addr),
        }
    }
}

impl TryFrom<&RawAttribute> for XorMappedAddress {
    type Error = StunError;

    fn try_from(value: &RawAttribute) -> Result<Self, Self::Error> {
        XorMappedAddress::from_raw(value)
    }
}

impl From<XorMappedAddress> for RawAttribute {
    fn from(f: XorMappedAddress) -> Self {
        f.to_raw()
    }
}

const CHANGE_IP_FLAG: u32 = 0x04;
const CHANGE_PORT_FLAG: u32 = 0x02;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeRequest {
    change_ip: bool,
    change_port: bool,
}

impl Attribute for ChangeRequest {
    fn get_type(&self) -> AttributeType {
        CHANGE_REQUEST
    }

    fn get_length(&self) -> u16 {
        4
    }

    fn to_raw(&self) -> RawAttribute {
        let mut flags = 0;
        if self.change_ip {
            flags |= CHANGE_IP_FLAG;
        }
        if self.change_port {
            flags |= CHANGE_PORT_FLAG;
        }
        let mut buf = [0; 4];
        BigEndian::write_u32(&mut buf[0..4], flags);
        RawAttribute::new(self.get_type(), &buf)
    }

    fn from_raw(raw: &RawAttribute) -> Result<Self, StunError> {
        if raw.header.atype != CHANGE_REQUEST {
            return Err(StunError::WrongAttributeType);
        }
        if raw.value.len() < 4 {
            return Err(StunError::NotEnoughData);
        }
        if raw.value.len() > 4 {
            return Err(StunError::TooBig);
        }
        let flags = BigEndian::read_u32(&raw.value[..4]);
        Ok(Self {
            change_ip: flags & CHANGE_IP_FLAG != 0,
            change_port: flags & CHANGE_PORT_FLAG != 0,
        })
    }
}

impl ChangeRequest {
    pub fn new(change_ip: bool, change_port: bool) -> Self {
        Self {
            change_ip,
            change_port,
        }
    }

    pub fn change_ip(&self) -> bool {
        self.change_ip
    }

    pub fn change_port(&self) -> bool {
        self.change_port
    }
}

impl std::fmt::Display for ChangeRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: ip: {}, port: {}",
            self.get_type(),
            self.change_ip,
            self.change_port
        )
    }
}

impl TryFrom<&RawAttribute> for ChangeRequest {
    type Error = StunError;

    fn try_from(value: &RawAttribute) -> Result<Self, Self::Error> {
        ChangeRequest::from_raw(value)
    }
}

impl From<ChangeRequest> for RawAttribute {
    fn from(f: ChangeRequest) -> Self {
        f.to_raw()
    }
}

macro_rules! string_attribute {
    ($CamelType:ident, $TYPE:ident, $accessor:ident, $max:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $CamelType {
            value: String,
        }

        impl Attribute for $CamelType {
            fn get_type(&self) -> AttributeType {
                $TYPE
            }

            fn get_length(&self) -> u16 {
                self.value.len() as u16
            }

            fn to_raw(&self) -> RawAttribute {
                RawAttribute::new(self.get_type(), self.value.as_bytes())
            }

            fn from_raw(raw: &RawAttribute) -> Result<Self, StunError> {
                if raw.header.atype != $TYPE {
                    return Err(StunError::WrongAttributeType);
                }
                if raw.value.len() > $max {
                    return Err(StunError::TooBig);
                }
                Ok(Self {
                    value: std::str::from_utf8(&raw.value)
                        .map_err(|_| StunError::Malformed)?
                        .to_owned(),
                })
            }
        }

        impl $CamelType {
            pub fn new(value: &str) -> Result<Self, StunError> {
                if value.len() > $max {
                    return Err(StunError::TooBig);
                }
                Ok(Self {
                    value: value.to_owned(),
                })
            }

            pub fn $accessor(&self) -> &str {
                &self.value
            }
        }

        impl std::fmt::Display for $CamelType {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}: '{}'", self.get_type(), self.value)
            }
        }

        impl TryFrom<&RawAttribute> for $CamelType {
            type Error = StunError;

            fn try_from(value: &RawAttribute) -> Result<Self, Self::Error> {
                $CamelType::from_raw(value)
            }
        }

        impl From<$CamelType> for RawAttribute {
            fn from(f: $CamelType) -> Self {
                f.to_raw()
            }
        }
    };
}

string_attribute!(Username, USERNAME, username, 513);
string_attribute!(Password, PASSWORD, password, 763);
string_attribute!(Realm, REALM, realm, 763);
string_attribute!(Nonce, NONCE, nonce, 763);
string_attribute!(Software, SOFTWARE, software, 763);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCode {
    code: u16,
    reason: String,
}
impl Attribute for ErrorCode {
    fn get_type(&self) -> AttributeType {
        ERROR_CODE
    }

    fn get_length(&self) -> u16 {
        self.reason.len() as u16 + 4
    }

    fn to_raw(&self) -> RawAttribute {
        let mut data = Vec::with_capacity(self.get_length() as usize);
        data.push(0u8);
        data.push(0u8);
        data.push((self.code / 100) as u8);
        data.push((self.code % 100) as u8);
        data.extend(self.reason.as_bytes());
        RawAttribute::new(self.get_type(), &data)
    }

    fn from_raw(raw: &RawAttribute) -> Result<Self, StunError> {
        if raw.header.atype != ERROR_CODE {
            return Err(StunError::WrongAttributeType);
        }
        if raw.value.len() < 4 {
            return Err(StunError::NotEnoughData);
        }
        if raw.value.len() > 763 + 4 {
            return Err(StunError::TooBig);
        }
        let code_class = raw.value[2] as u16;
        let code_tens = raw.value[3] as u16;
        if !(3..7).contains(&code_class) || code_tens > 99 {
            return Err(StunError::Malformed);
        }
        let code = code_class * 100 + code_tens;
        Ok(Self {
            code,
            reason: std::str::from_utf8(&raw.value[4..])
                .map_err(|_| StunError::Malformed)?
                .to_owned(),
        })
    }
}
impl ErrorCode {
    pub fn new(code: u16, reason: &str) -> Result<Self, StunError> {
        if !(300..700).contains(&code) {
            return Err(StunError::Malformed);
        }
        Ok(Self {
            code,
            reason: reason.to_owned(),
        })
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn error_class(&self) -> u8 {
        (self.code / 100) as u8
    }

    pub fn number(&self) -> u8 {
        (self.code % 100) as u8
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn default_reason_for_code(code: u16) -> &'static str {
        match code {
            301 => "Try Alternate",
            400 => "Bad Request",
            401 => "Unauthorized",
            420 => "Unknown Attribute",
            438 => "Stale Nonce",
            500 => "Server Error",
            _ => "Unknown",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} '{}'", self.get_type(), self.code, self.reason)
    }
}

impl TryFrom<&RawAttribute> for ErrorCode {
    type Error = StunError;

    fn try_from(value: &RawAttribute) -> Result<Self, Self::Error> {
        ErrorCode::from_raw(value)
    }
}

impl From<ErrorCode> for RawAttribute {
    fn from(f: ErrorCode) -> Self {
        f.to_raw()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAttributes {
    attributes: Vec<AttributeType>,
}
impl Attribute for UnknownAttributes {
    fn get_type(&self) -> AttributeType {
        UNKNOWN_ATTRIBUTES
    }

    fn get_length(&self) -> u16 {
        (self.attributes.len() as u16) * 2
    }

    fn to_raw(&self) -> RawAttribute {
        let mut data = Vec::with_capacity(self.get_length() as usize);
        for attr in &self.attributes {
            let mut encoded = vec![0; 2];
            BigEndian::write_u16(&mut encoded, (*attr).into());
            data.extend(encoded);
        }
        RawAttribute::new(self.get_type(), &data)
    }

    fn from_raw(raw: &RawAttribute) -> Result<Self, StunError> {
        if raw.header.atype != UNKNOWN_ATTRIBUTES {
            return Err(StunError::WrongAttributeType);
        }
        if raw.value.len() % 2 != 0 {
            /* all attributes are 16-bits */
            return Err(StunError::Malformed);
        }
        let mut attrs = vec![];
        for attr in raw.value.chunks_exact(2) {
            attrs.push(BigEndian::read_u16(attr).into());
        }
        Ok(Self { attributes: attrs })
    }
}
impl UnknownAttributes {
    pub fn new(attrs: &[AttributeType]) -> Self {
        Self {
            attributes: attrs.to_vec(),
        }
    }

    pub fn add_attribute(&mut self, attr: AttributeType) {
        if !self.has_attribute(attr) {
            self.attributes.push(attr);
        }
    }

    pub fn has_attribute(&self, attr: AttributeType) -> bool {
        self.attributes.iter().any(|&a| a == attr)
    }
}

impl std::fmt::Display for UnknownAttributes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {:?}", self.get_type(), self.attributes)
    }
}

impl TryFrom<&RawAttribute> for UnknownAttributes {
    type Error = StunError;

    fn try_from(value: &RawAttribute) -> Result<Self, Self::Error> {
        UnknownAttributes::from_raw(value)
    }
}

impl From<UnknownAttributes> for RawAttribute {
    fn from(f: UnknownAttributes) -> Self {
        f.to_raw()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageIntegrity {
    hmac: [u8; 20],
}

impl Attribute for MessageIntegrity {
    fn get_type(&self) -> AttributeType {
        MESSAGE_INTEGRITY
    }

    fn get_length(&self) -> u16 {
        20
    }

    fn to_raw(&self) -> RawAttribute {
        RawAttribute::new(self.get_type(), &self.hmac)
    }

    fn from_raw(raw: &RawAttribute) -> Result<Self, StunError> {
        if raw.header.atype != MESSAGE_INTEGRITY {
            return Err(StunError::WrongAttributeType);
        }
        if raw.value.len() < 20 {
            return Err(StunError::NotEnoughData);
        }
        if raw.value.len() > 20 {
            return Err(StunError::TooBig);
        }
        // sized checked earlier
        let boxed: Box<[u8; 20]> = raw.value.clone().into_boxed_slice().try_into().unwrap();
        Ok(Self { hmac: *boxed })
    }
}

impl MessageIntegrity {
    pub fn new(hmac: [u8; 20]) -> Self {
        Self { hmac }
    }

    pub fn hmac(&self) -> &[u8; 20] {
        &self.hmac
    }
}

impl TryFrom<&RawAttribute> for MessageIntegrity {
    type Error = StunError;

    fn try_from(value: &RawAttribute) -> Result<Self, Self::Error> {
        MessageIntegrity::from_raw(value)
    }
}
impl From<MessageIntegrity> for RawAttribute {
    fn from(f: MessageIntegrity) -> Self {
        f.to_raw()
    }
}

impl std::fmt::Display for MessageIntegrity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: 0x", self.get_type())?;
        for val in self.hmac.iter() {
            write!(f, "{:02x}", val)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    fingerprint: u32,
}

impl Attribute for Fingerprint {
    fn get_type(&self) -> AttributeType {
        FINGERPRINT
    }

    fn get_length(&self) -> u16 {
        4
    }

    fn to_raw(&self) -> RawAttribute {
        let mut buf = [0; 4];
        BigEndian::write_u32(&mut buf[0..4], self.fingerprint);
        RawAttribute::new(self.get_type(), &buf)
    }

    fn from_raw(raw: &RawAttribute) -> Result<Self, StunError> {
        if raw.header.atype != FINGERPRINT {
            return Err(StunError::WrongAttributeType);
        }
        if raw.value.len() < 4 {
            return Err(StunError::NotEnoughData);
        }
        if raw.value.len() > 4 {
            return Err(StunError::TooBig);
        }
        Ok(Self {
            fingerprint: BigEndian::read_u32(&raw.value[..4]),
        })
    }
}

impl Fingerprint {
    pub fn new(fingerprint: u32) -> Self {
        Self { fingerprint }
    }

    pub fn fingerprint(&self) -> u32 {
        self.fingerprint
    }
}

impl TryFrom<&RawAttribute> for Fingerprint {
    type Error = StunError;

    fn try_from(value: &RawAttribute) -> Result<Self, Self::Error> {
        Fingerprint::from_raw(value)
    }
}

impl From<Fingerprint> for RawAttribute {
    fn from(f: Fingerprint) -> Self {
        f.to_raw()
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {:#010x}", self.get_type(), self.fingerprint)
    }
}
