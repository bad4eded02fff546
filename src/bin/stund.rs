// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::net::IpAddr;
use std::sync::Arc;

use async_std::net::UdpSocket;
use async_std::task;

#[macro_use]
extern crate tracing;

use stun_relay::server::{StunConfig, StunServer};
use stun_relay::socket::{serve, UdpSocketChannel};
use stun_relay::store::MemorySecretStore;

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt::init();

    let udp4_port: u16 = env_or("STUN_PORT_UDP4", 3479);
    let udp6_port: u16 = env_or("STUN_PORT_UDP6", 3478);
    let config = StunConfig {
        alternate_ip: env_or("STUN_ALTERNATE_IP", IpAddr::from([0, 0, 0, 0])),
        alternate_port: env_or("STUN_ALTERNATE_PORT", 3479),
        ..Default::default()
    };

    let store = Arc::new(MemorySecretStore::new());
    let server = Arc::new(StunServer::new(config, store));

    task::block_on(async move {
        let udp4 = UdpSocket::bind(("0.0.0.0", udp4_port)).await?;
        let udp6 = UdpSocket::bind(("::", udp6_port)).await?;

        let udp4 = Arc::new(UdpSocketChannel::new(udp4));
        let udp6 = Arc::new(UdpSocketChannel::new(udp6));
        info!("listening on {:?} and {:?}", udp4.local_addr()?, udp6.local_addr()?);

        let v4 = task::spawn(serve(udp4, server.clone()));
        let v6 = task::spawn(serve(udp6, server));
        futures::try_join!(v4, v6)?;
        Ok(())
    })
}
