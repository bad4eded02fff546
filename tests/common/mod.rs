// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::sync::Arc;

use async_std::net::UdpSocket;

use stun_relay::server::{StunConfig, StunServer};
use stun_relay::socket::{serve, UdpSocketChannel};
use stun_relay::store::MemorySecretStore;

pub fn debug_init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn test_config() -> StunConfig {
    StunConfig {
        alternate_ip: "198.51.100.9".parse().unwrap(),
        alternate_port: 3479,
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn test_store() -> Arc<MemorySecretStore> {
    Arc::new(MemorySecretStore::new())
}

pub async fn stund_udp(socket: UdpSocket, store: Arc<MemorySecretStore>) -> std::io::Result<()> {
    let channel = Arc::new(UdpSocketChannel::new(socket));
    let server = Arc::new(StunServer::new(test_config(), store));
    serve(channel, server).await
}
