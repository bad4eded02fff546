// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Request handling: one inbound datagram in, at most one response out.

use std::error::Error;
use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

use crate::store::SecretStore;
use crate::stun::attribute::*;
use crate::stun::message::{Message, MessageType, HEADER_LENGTH};

#[derive(Debug)]
pub enum StunError {
    TooShort,
    LengthMismatch,
    AttributeOverrun,
    Validation,
    UnknownMessageType(u16),
    UnknownAttribute(AttributeType),
    WrongAttributeType,
    NotEnoughData,
    TooBig,
    Malformed,
    AlreadyExists,
    ResourceNotFound,
    IntegrityCheckFailed,
    ServerError,
    IoError(std::io::Error),
}

impl Error for StunError {}

impl Display for StunError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl From<std::io::Error> for StunError {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e)
    }
}

impl StunError {
    /// The wire error code reported for this error.  Every variant maps to a
    /// code; the class and number bytes are derived from it on encode.
    pub fn error_code(&self) -> u16 {
        match self {
            StunError::UnknownAttribute(_) => 420,
            StunError::ServerError | StunError::IoError(_) => 500,
            _ => 400,
        }
    }
}

/// Server identity and alternate-address configuration.  Explicit and
/// immutable; the engine never consults process environment itself.
#[derive(Debug, Clone)]
pub struct StunConfig {
    pub software: String,
    pub alternate_ip: IpAddr,
    pub alternate_port: u16,
}

impl Default for StunConfig {
    fn default() -> Self {
        Self {
            software: String::from("stund - stun-relay v0.1"),
            alternate_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            alternate_port: 3479,
        }
    }
}

/// The request handler: parses, validates and answers binding and
/// shared-secret requests.  Stateless across datagrams apart from the
/// shared-secret store.
pub struct StunServer {
    config: StunConfig,
    store: Arc<dyn SecretStore>,
}

impl StunServer {
    pub fn new(config: StunConfig, store: Arc<dyn SecretStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &StunConfig {
        &self.config
    }

    /// Process one inbound datagram and produce the bytes to send back, if
    /// any.  Protocol errors become error-response datagrams; a failure to
    /// construct even the error response is logged and yields no reply.
    pub async fn handle_datagram(&self, data: &[u8], from: SocketAddr) -> Option<Vec<u8>> {
        match self.process(data, from).await {
            Ok(response) => {
                debug!("sending to {}: {}", from, response);
                Some(response.to_bytes())
            }
            Err(err) => {
                warn!("error processing datagram from {}: {}", from, err);
                let response = self.error_response(data, &err)?;
                debug!("sending to {}: {}", from, response);
                Some(response.to_bytes())
            }
        }
    }

    async fn process(&self, data: &[u8], from: SocketAddr) -> Result<Message, StunError> {
        let msg = Message::from_bytes(data)?;
        debug!("received from {}: {}", from, msg);
        match msg.get_type() {
            MessageType::BindingRequest => self.handle_binding_request(&msg, from).await,
            MessageType::SharedSecretRequest => self.handle_shared_secret_request(&msg).await,
            other => {
                warn!("not a request type: {}", other);
                Err(StunError::UnknownMessageType(other.to_u16()))
            }
        }
    }

    async fn handle_binding_request(
        &self,
        msg: &Message,
        from: SocketAddr,
    ) -> Result<Message, StunError> {
        let mut change_request = None;
        let mut username = None;
        let mut has_message_integrity = false;

        for attr in msg.iter_attributes() {
            match attr.get_type() {
                CHANGE_REQUEST => change_request = Some(ChangeRequest::from_raw(attr)?),
                USERNAME => username = Some(Username::from_raw(attr)?),
                MESSAGE_INTEGRITY => has_message_integrity = true,
                other => {
                    // anything else in a binding request is a hard failure
                    return Err(StunError::UnknownAttribute(other));
                }
            }
        }

        let mut source_ip = from.ip();
        let mut source_port = from.port();
        if let Some(change_request) = change_request {
            if change_request.change_ip() {
                source_ip = self.config.alternate_ip;
            }
            if change_request.change_port() {
                source_port = self.config.alternate_port;
            }
        }
        let changed = SocketAddr::new(self.config.alternate_ip, self.config.alternate_port);

        let mut response = Message::new_success(msg);
        response.add_attribute(XorMappedAddress::new(from, msg.transaction_id()))?;
        response.add_attribute(MappedAddress::new(from))?;
        response.add_attribute(SourceAddress::new(SocketAddr::new(source_ip, source_port)))?;
        response.add_attribute(ChangedAddress::new(changed))?;
        response.add_attribute(Software::new(&self.config.software)?)?;

        // integrity is opportunistic: only when the client both asked for it
        // and we hold a secret for the named user
        if has_message_integrity {
            if let Some(username) = username {
                if let Some(secret) = self.store.shared_secret(username.username()).await? {
                    response.add_message_integrity(secret.as_bytes())?;
                } else {
                    debug!("no shared secret for '{}'", username.username());
                }
            }
        }

        Ok(response)
    }

    async fn handle_shared_secret_request(&self, msg: &Message) -> Result<Message, StunError> {
        let secret = generate_token(32);
        let username = format!("user-{}", generate_token(10));

        self.store.set_shared_secret(&username, &secret).await?;
        info!("issued shared secret for '{}'", username);

        let mut response = Message::new_success(msg);
        response.add_attribute(Username::new(&username)?)?;
        response.add_attribute(Password::new(&secret)?)?;
        Ok(response)
    }

    /// Build a wire-format error response for `err`.  The transaction id and
    /// response type are recovered from the offending datagram when its
    /// header is intact; otherwise a fresh transaction id is used.
    fn error_response(&self, data: &[u8], err: &StunError) -> Option<Message> {
        let (mtype, transaction) = if data.len() >= HEADER_LENGTH {
            let mtype = MessageType::from_u16(BigEndian::read_u16(&data[0..2]))
                .map(MessageType::error_response)
                .unwrap_or(MessageType::BindingErrorResponse);
            (mtype, BigEndian::read_u128(&data[4..20]))
        } else {
            (
                MessageType::BindingErrorResponse,
                Message::generate_transaction(),
            )
        };

        let code = err.error_code();
        let mut response = Message::new(mtype, transaction);
        let build = Software::new(&self.config.software)
            .and_then(|software| response.add_attribute(software))
            .and_then(|_| ErrorCode::new(code, ErrorCode::default_reason_for_code(code)))
            .and_then(|error_code| response.add_attribute(error_code));
        if let Err(e) = build {
            // can't even build the error response; drop the datagram
            error!("failed to construct error response: {}", e);
            return None;
        }
        Some(response)
    }
}

fn generate_token(len: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySecretStore;
    use crate::tests::test_init_log;

    fn test_server() -> (StunServer, Arc<MemorySecretStore>) {
        let store = Arc::new(MemorySecretStore::new());
        let config = StunConfig {
            alternate_ip: "198.51.100.9".parse().unwrap(),
            alternate_port: 3479,
            ..Default::default()
        };
        (StunServer::new(config, store.clone()), store)
    }

    fn sender() -> SocketAddr {
        "203.0.113.5:4000".parse().unwrap()
    }

    async fn respond(server: &StunServer, request: &Message, from: SocketAddr) -> Message {
        let bytes = server
            .handle_datagram(&request.to_bytes(), from)
            .await
            .unwrap();
        Message::from_bytes(&bytes).unwrap()
    }

    fn xor_mapped_addr(msg: &Message) -> SocketAddr {
        XorMappedAddress::from_raw(msg.get_attribute(XOR_MAPPED_ADDRESS).unwrap())
            .unwrap()
            .addr(msg.transaction_id())
    }

    fn mapped_addr(msg: &Message) -> SocketAddr {
        MappedAddress::from_raw(msg.get_attribute(MAPPED_ADDRESS).unwrap())
            .unwrap()
            .addr()
    }

    fn source_addr(msg: &Message) -> SocketAddr {
        SourceAddress::from_raw(msg.get_attribute(SOURCE_ADDRESS).unwrap())
            .unwrap()
            .addr()
    }

    fn changed_addr(msg: &Message) -> SocketAddr {
        ChangedAddress::from_raw(msg.get_attribute(CHANGED_ADDRESS).unwrap())
            .unwrap()
            .addr()
    }

    #[test]
    fn binding_request_plain() {
        test_init_log();
        async_std::task::block_on(async move {
            let (server, _store) = test_server();
            let request = Message::new_request(MessageType::BindingRequest);
            let response = respond(&server, &request, sender()).await;

            assert_eq!(response.get_type(), MessageType::BindingResponse);
            assert_eq!(response.transaction_id(), request.transaction_id());
            assert_eq!(xor_mapped_addr(&response), sender());
            assert_eq!(mapped_addr(&response), sender());
            assert_eq!(source_addr(&response), sender());
            assert_eq!(
                changed_addr(&response),
                "198.51.100.9:3479".parse().unwrap()
            );
            assert!(response.has_attribute(SOFTWARE));
            assert!(!response.has_attribute(MESSAGE_INTEGRITY));
        });
    }

    #[test]
    fn binding_request_change_ip_and_port() {
        test_init_log();
        async_std::task::block_on(async move {
            let (server, _store) = test_server();
            let mut request = Message::new_request(MessageType::BindingRequest);
            request.add_attribute(ChangeRequest::new(true, true)).unwrap();
            let response = respond(&server, &request, sender()).await;

            assert_eq!(
                source_addr(&response),
                "198.51.100.9:3479".parse().unwrap()
            );
            // mapped addresses still report the true sender
            assert_eq!(mapped_addr(&response), sender());
        });
    }

    #[test]
    fn binding_request_change_port_only() {
        test_init_log();
        async_std::task::block_on(async move {
            let (server, _store) = test_server();
            let mut request = Message::new_request(MessageType::BindingRequest);
            request.add_attribute(ChangeRequest::new(false, true)).unwrap();
            let response = respond(&server, &request, sender()).await;

            let expected: SocketAddr = "203.0.113.5:3479".parse().unwrap();
            assert_eq!(source_addr(&response), expected);
        });
    }

    #[test]
    fn binding_request_integrity_without_stored_secret() {
        test_init_log();
        async_std::task::block_on(async move {
            let (server, _store) = test_server();
            let mut request = Message::new_request(MessageType::BindingRequest);
            request.add_attribute(Username::new("alice").unwrap()).unwrap();
            request
                .add_attribute(MessageIntegrity::new([0; 20]))
                .unwrap();
            let response = respond(&server, &request, sender()).await;

            assert_eq!(response.get_type(), MessageType::BindingResponse);
            assert!(!response.has_attribute(MESSAGE_INTEGRITY));
        });
    }

    #[test]
    fn binding_request_integrity_with_stored_secret() {
        test_init_log();
        async_std::task::block_on(async move {
            let (server, store) = test_server();
            store.set_shared_secret("alice", "sekrit").await.unwrap();
            let mut request = Message::new_request(MessageType::BindingRequest);
            request.add_attribute(Username::new("alice").unwrap()).unwrap();
            request
                .add_attribute(MessageIntegrity::new([0; 20]))
                .unwrap();
            let response = respond(&server, &request, sender()).await;

            assert!(response.has_attribute(MESSAGE_INTEGRITY));
            response.validate_integrity(b"sekrit").unwrap();
            // integrity is the final attribute
            assert_eq!(
                response.iter_attributes().last().unwrap().get_type(),
                MESSAGE_INTEGRITY
            );
        });
    }

    #[test]
    fn binding_request_unknown_attribute_rejected() {
        test_init_log();
        async_std::task::block_on(async move {
            let (server, _store) = test_server();
            let mut request = Message::new_request(MessageType::BindingRequest);
            request.add_attribute(Fingerprint::new(0xdead_beef)).unwrap();
            let response = respond(&server, &request, sender()).await;

            assert_eq!(response.get_type(), MessageType::BindingErrorResponse);
            assert_eq!(response.transaction_id(), request.transaction_id());
            let err = ErrorCode::from_raw(response.get_attribute(ERROR_CODE).unwrap()).unwrap();
            assert_eq!(err.code(), 420);
        });
    }

    #[test]
    fn shared_secret_request_issues_credentials() {
        test_init_log();
        async_std::task::block_on(async move {
            let (server, store) = test_server();
            let request = Message::new_request(MessageType::SharedSecretRequest);
            let response = respond(&server, &request, sender()).await;

            assert_eq!(response.get_type(), MessageType::SharedSecretResponse);
            assert_eq!(response.transaction_id(), request.transaction_id());
            let username =
                Username::from_raw(response.get_attribute(USERNAME).unwrap()).unwrap();
            let password =
                Password::from_raw(response.get_attribute(PASSWORD).unwrap()).unwrap();
            assert!(username.username().starts_with("user-"));
            assert_eq!(password.password().len(), 32);
            assert_eq!(
                store
                    .shared_secret(username.username())
                    .await
                    .unwrap()
                    .as_deref(),
                Some(password.password())
            );
        });
    }

    #[test]
    fn shared_secret_requests_issue_distinct_credentials() {
        test_init_log();
        async_std::task::block_on(async move {
            let (server, _store) = test_server();
            let first = respond(
                &server,
                &Message::new_request(MessageType::SharedSecretRequest),
                sender(),
            )
            .await;
            let second = respond(
                &server,
                &Message::new_request(MessageType::SharedSecretRequest),
                sender(),
            )
            .await;
            let user1 = Username::from_raw(first.get_attribute(USERNAME).unwrap()).unwrap();
            let user2 = Username::from_raw(second.get_attribute(USERNAME).unwrap()).unwrap();
            assert_ne!(user1.username(), user2.username());
        });
    }

    #[test]
    fn non_request_type_rejected() {
        test_init_log();
        async_std::task::block_on(async move {
            let (server, _store) = test_server();
            let request = Message::new_request(MessageType::BindingResponse);
            let response = respond(&server, &request, sender()).await;

            assert_eq!(response.get_type(), MessageType::BindingErrorResponse);
            let err = ErrorCode::from_raw(response.get_attribute(ERROR_CODE).unwrap()).unwrap();
            assert_eq!(err.code(), 400);
        });
    }

    #[test]
    fn short_datagram_rejected() {
        test_init_log();
        async_std::task::block_on(async move {
            let (server, _store) = test_server();
            let bytes = server.handle_datagram(&[0, 1, 0, 0], sender()).await.unwrap();
            let response = Message::from_bytes(&bytes).unwrap();
            assert_eq!(response.get_type(), MessageType::BindingErrorResponse);
            let err = ErrorCode::from_raw(response.get_attribute(ERROR_CODE).unwrap()).unwrap();
            assert_eq!(err.code(), 400);
        });
    }

    #[test]
    fn overrun_datagram_rejected() {
        test_init_log();
        async_std::task::block_on(async move {
            let (server, _store) = test_server();
            // 24-byte datagram whose single attribute claims 9000 value bytes
            let mut data = vec![0; 24];
            BigEndian::write_u16(&mut data[0..2], MessageType::BindingRequest.to_u16());
            BigEndian::write_u16(&mut data[2..4], 4);
            BigEndian::write_u128(&mut data[4..20], 0xabcd);
            BigEndian::write_u16(&mut data[20..22], 0x7000);
            BigEndian::write_u16(&mut data[22..24], 9000);
            let bytes = server.handle_datagram(&data, sender()).await.unwrap();
            let response = Message::from_bytes(&bytes).unwrap();
            assert_eq!(response.get_type(), MessageType::BindingErrorResponse);
            // transaction id recovered from the intact header
            assert_eq!(response.transaction_id(), 0xabcd);
            let err = ErrorCode::from_raw(response.get_attribute(ERROR_CODE).unwrap()).unwrap();
            assert_eq!(err.code(), 400);
        });
    }

    #[test]
    fn shared_secret_store_failure_yields_server_error() {
        test_init_log();

        struct FailingStore;

        #[async_trait::async_trait]
        impl SecretStore for FailingStore {
            async fn shared_secret(&self, _username: &str) -> Result<Option<String>, StunError> {
                Err(StunError::ServerError)
            }

            async fn set_shared_secret(
                &self,
                _username: &str,
                _secret: &str,
            ) -> Result<(), StunError> {
                Err(StunError::ServerError)
            }
        }

        async_std::task::block_on(async move {
            let server = StunServer::new(StunConfig::default(), Arc::new(FailingStore));
            let request = Message::new_request(MessageType::SharedSecretRequest);
            let response = respond(&server, &request, sender()).await;

            assert_eq!(response.get_type(), MessageType::SharedSecretErrorResponse);
            let err = ErrorCode::from_raw(response.get_attribute(ERROR_CODE).unwrap()).unwrap();
            assert_eq!(err.code(), 500);
        });
    }
}
