// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Classic STUN (RFC 3489) binding and shared-secret server.
//!
//! The [`stun`] module contains the wire codec and validator, [`server`] the
//! request handling, [`store`] the shared-secret persistence boundary and
//! [`socket`] the UDP transport.

#[macro_use]
extern crate tracing;

pub mod server;
pub mod socket;
pub mod store;
pub mod stun;

#[cfg(test)]
pub(crate) mod tests {
    use once_cell::sync::Lazy;
    use tracing_subscriber::EnvFilter;

    static TRACING: Lazy<()> = Lazy::new(|| {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    });

    pub fn test_init_log() {
        Lazy::force(&TRACING);
    }
}
