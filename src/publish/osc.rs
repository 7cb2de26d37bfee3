// OSC 1.0 message encoding and UDP delivery
//
// A message is the null-terminated address, the null-terminated type tag
// string (",fi..."), then the big-endian arguments. Strings are padded with
// zeros to a multiple of 4 bytes.

use super::{PublishError, PublishResult, Publisher};
use crate::streaming::Value;
use byteorder::{BigEndian, WriteBytesExt};
use std::net::SocketAddr;
use tokio::net::UdpSocket;

pub const DEFAULT_OSC_HOST: &str = "127.0.0.1";
pub const DEFAULT_OSC_PORT: u16 = 12000;

fn write_padded_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
    while buf.len() % 4 != 0 {
        buf.push(0);
    }
}

/// Encode a single OSC message
pub fn encode_message(address: &str, values: &[Value]) -> PublishResult<Vec<u8>> {
    if !address.starts_with('/') || address.contains('\0') {
        return Err(PublishError::InvalidAddress(address.to_string()));
    }

    let mut type_tags = String::with_capacity(values.len() + 1);
    type_tags.push(',');
    for value in values {
        type_tags.push(match value {
            Value::Float(_) => 'f',
            Value::Int(_) => 'i',
        });
    }

    let mut buf = Vec::with_capacity(address.len() + type_tags.len() + values.len() * 4 + 8);
    write_padded_str(&mut buf, address);
    write_padded_str(&mut buf, &type_tags);
    for value in values {
        match *value {
            Value::Float(v) => buf.write_f32::<BigEndian>(v)?,
            Value::Int(v) => buf.write_i32::<BigEndian>(v)?,
        }
    }

    Ok(buf)
}

/// Publishes OSC messages to a fixed UDP target
pub struct OscPublisher {
    socket: UdpSocket,
    target: SocketAddr,
}

impl OscPublisher {
    pub async fn connect(host: &str, port: u16) -> PublishResult<Self> {
        let target = tokio::net::lookup_host((host, port))
            .await?
            .next()
            .ok_or_else(|| PublishError::Resolve(format!("{}:{}", host, port)))?;

        let bind_addr = if target.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(target).await?;

        log::info!("Publishing OSC messages to {}", target);

        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl Publisher for OscPublisher {
    fn publish(&self, address: &str, values: &[Value]) -> PublishResult<()> {
        let packet = encode_message(address, values)?;
        self.socket.try_send(&packet)?;
        Ok(())
    }
}
