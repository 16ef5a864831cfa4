use crate::dns::error::HandleError;
use crate::dns::handler::{finalize, DnsHandler};
use clap::Args;
use norn_proto::buffer::BytePacketBuffer;
use norn_proto::packet::DnsPacket;
use std::sync::Arc;
use tokio::net::UdpSocket;

/// Starts the DNS server, the core of the machine
#[derive(Args, Debug)]
pub struct Command;

impl Command {
    pub async fn run(&self, config: crate::config::Config) {
        let dns_server = DnsServer::new(config)
            .await
            .expect("unable to create dns server");
        dns_server.run().await;
    }
}

pub struct DnsServer {
    handler: DnsHandler,
    socket: UdpSocket,
}

impl DnsServer {
    pub async fn new(config: crate::config::Config) -> Result<Self, HandleError> {
        tracing::info!("preparing dns server");
        let chain = Arc::new(config.chain.build()?);
        let handler = DnsHandler::new(chain, config.dns.public_address);

        let address = config.dns.address();
        tracing::info!("starting dns server on {address:?}");
        let socket = UdpSocket::bind(address).await?;

        Ok(Self { handler, socket })
    }

    async fn handle(&self) -> Result<(), HandleError> {
        // With a socket ready, we can go ahead and read a packet. This
        // will block until one is received.
        let mut req_buffer = BytePacketBuffer::default();

        let (size, src) = self.socket.recv_from(&mut req_buffer.buf).await?;
        tracing::debug!("received {size} bytes from {:?}", src.ip());

        let request = match DnsPacket::try_from(req_buffer) {
            Ok(request) => request,
            Err(error) => {
                tracing::debug!("unable to read packet: {error}");
                return Ok(());
            }
        };

        let response = self.handler.respond(&request).await;
        let res_buffer = finalize(&request, response)?;

        self.socket.send_to(res_buffer.filled(), src).await?;

        Ok(())
    }

    pub async fn run(&self) {
        tracing::info!("running dns server");
        loop {
            match self.handle().await {
                Ok(_) => {}
                Err(err) => tracing::error!("an error occured: {err}"),
            }
        }
    }
}
