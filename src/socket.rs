// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! UDP transport: datagrams in, response bytes out.

use std::net::SocketAddr;
use std::sync::Arc;

use async_std::net::UdpSocket;
use async_std::task;

use futures::prelude::*;

use crate::server::StunServer;

/// A bound UDP socket exposed as a datagram stream plus a send half.
#[derive(Debug)]
pub struct UdpSocketChannel {
    socket: Arc<UdpSocket>,
}

impl UdpSocketChannel {
    pub fn new(socket: UdpSocket) -> Self {
        Self {
            socket: Arc::new(socket),
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.socket.local_addr()
    }

    pub async fn send_to(&self, data: &[u8], to: SocketAddr) -> std::io::Result<()> {
        trace!("sending {} bytes to {:?}", data.len(), to);
        self.socket.send_to(data, to).await?;
        Ok(())
    }

    /// A stream that continuously reads datagrams from the socket.
    pub fn receive_stream(&self) -> impl Stream<Item = (Vec<u8>, SocketAddr)> {
        let socket = self.socket.clone();
        info!("starting udp receive stream for {:?}", socket.local_addr());
        futures::stream::unfold(socket, |socket| async move {
            let mut data = vec![0; 1500];
            socket
                .recv_from(&mut data)
                .await
                .ok()
                .map(|(len, from)| {
                    data.truncate(len);
                    trace!("got {} bytes from {:?}", data.len(), from);
                    ((data, from), socket)
                })
        })
    }
}

/// Drive `server` over `channel` until the socket closes: one task per
/// inbound datagram, responses funnelled through a single send-queue task.
pub async fn serve(channel: Arc<UdpSocketChannel>, server: Arc<StunServer>) -> std::io::Result<()> {
    let (send_queue, send_receiver) = async_channel::bounded::<(Vec<u8>, SocketAddr)>(16);

    task::spawn({
        let channel = channel.clone();
        async move {
            while let Ok((data, to)) = send_receiver.recv().await {
                if let Err(e) = channel.send_to(&data, to).await {
                    warn!("send to {:?} failed: {:?}", to, e);
                }
            }
            debug!("send loop exited");
        }
    });

    let receive = channel.receive_stream();
    futures::pin_mut!(receive);
    while let Some((data, from)) = receive.next().await {
        let server = server.clone();
        let send_queue = send_queue.clone();
        task::spawn(async move {
            if let Some(response) = server.handle_datagram(&data, from).await {
                if send_queue.send((response, from)).await.is_err() {
                    warn!("send queue closed, dropping response for {:?}", from);
                }
            }
        });
    }
    Ok(())
}
