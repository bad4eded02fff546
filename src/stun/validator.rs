// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Structural validation of decoded messages against the known attribute
//! schemas.
//!
//! An attribute whose type is not in the known set is legal and passes
//! through untouched; a known type whose payload does not decode as its
//! schema is a hard rejection.  The specific mismatch is collapsed into a
//! single [`StunError::Validation`] outcome and only logged.

use crate::server::StunError;
use crate::stun::attribute::*;
use crate::stun::message::Message;

pub fn validate(msg: &Message) -> Result<(), StunError> {
    for raw in msg.iter_attributes() {
        check_attribute(raw).map_err(|e| {
            debug!("attribute {} failed its schema check: {:?}", raw.get_type(), e);
            StunError::Validation
        })?;
    }
    Ok(())
}

fn check_attribute(raw: &RawAttribute) -> Result<(), StunError> {
    match raw.get_type() {
        MAPPED_ADDRESS => MappedAddress::from_raw(raw).map(drop),
        RESPONSE_ADDRESS => ResponseAddress::from_raw(raw).map(drop),
        CHANGE_REQUEST => ChangeRequest::from_raw(raw).map(drop),
        SOURCE_ADDRESS => SourceAddress::from_raw(raw).map(drop),
        CHANGED_ADDRESS => ChangedAddress::from_raw(raw).map(drop),
        USERNAME => Username::from_raw(raw).map(drop),
        PASSWORD => Password::from_raw(raw).map(drop),
        MESSAGE_INTEGRITY => MessageIntegrity::from_raw(raw).map(drop),
        ERROR_CODE => ErrorCode::from_raw(raw).map(drop),
        UNKNOWN_ATTRIBUTES => UnknownAttributes::from_raw(raw).map(drop),
        REFLECTED_FROM => ReflectedFrom::from_raw(raw).map(drop),
        REALM => Realm::from_raw(raw).map(drop),
        NONCE => Nonce::from_raw(raw).map(drop),
        XOR_MAPPED_ADDRESS => XorMappedAddress::from_raw(raw).map(drop),
        SOFTWARE => Software::from_raw(raw).map(drop),
        ALTERNATE_SERVER => AlternateServer::from_raw(raw).map(drop),
        FINGERPRINT => Fingerprint::from_raw(raw).map(drop),
        _ => Ok(()),
    }
}
