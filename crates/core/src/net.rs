// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host identity discovery

use std::net::{Ipv4Addr, UdpSocket};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetError {
    #[error("cannot determine host address: {0}")]
    Address(#[source] std::io::Error),
    #[error("cannot determine hostname: {0}")]
    Hostname(#[source] nix::Error),
}

/// Find the host's primary outbound IPv4 address.
///
/// Opens a datagram socket toward an unreachable multicast address and
/// reads back the local endpoint the kernel selected. No packet is sent.
pub fn ip() -> Result<String, NetError> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).map_err(NetError::Address)?;
    socket
        .connect((Ipv4Addr::new(239, 255, 0, 0), 9))
        .map_err(NetError::Address)?;
    let addr = socket.local_addr().map_err(NetError::Address)?;
    Ok(addr.ip().to_string())
}

/// The host's name as reported by the kernel.
pub fn hostname() -> Result<String, NetError> {
    let name = nix::unistd::gethostname().map_err(NetError::Hostname)?;
    Ok(name.to_string_lossy().into_owned())
}

#[cfg(test)]
#[path = "net_tests.rs"]
mod tests;
