//! Local IPv4 broadcast addresses.

use std::net::Ipv4Addr;

/// Directed broadcast address of the network `ip`/`netmask`.
pub fn broadcast_address(ip: Ipv4Addr, netmask: Ipv4Addr) -> Ipv4Addr {
    Ipv4Addr::from(u32::from(ip) | !u32::from(netmask))
}

/// Broadcast addresses of every non-loopback IPv4 interface, without
/// duplicates.
///
/// Sending to `255.255.255.255` only reaches the default interface on Linux,
/// so discovery broadcasts to each interface's network instead.
#[cfg(unix)]
pub fn broadcast_addresses() -> std::io::Result<Vec<Ipv4Addr>> {
    let mut list: *mut libc::ifaddrs = std::ptr::null_mut();
    // SAFETY: `list` is a valid out-pointer; the returned list is released below.
    if unsafe { libc::getifaddrs(&mut list) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    let mut addresses = Vec::new();
    let mut cursor = list;
    while !cursor.is_null() {
        // SAFETY: `cursor` is a non-null node of the list returned by getifaddrs,
        // which stays alive until `freeifaddrs`.
        let entry = unsafe { &*cursor };
        cursor = entry.ifa_next;

        if entry.ifa_flags & libc::IFF_LOOPBACK as libc::c_uint != 0 {
            continue;
        }
        let (Some(ip), Some(netmask)) = (ipv4(entry.ifa_addr), ipv4(entry.ifa_netmask)) else {
            continue;
        };
        if ip.is_loopback() {
            continue;
        }
        let broadcast = broadcast_address(ip, netmask);
        if !addresses.contains(&broadcast) {
            addresses.push(broadcast);
        }
    }

    // SAFETY: `list` came from a successful getifaddrs call and is freed once.
    unsafe { libc::freeifaddrs(list) };
    Ok(addresses)
}

#[cfg(not(unix))]
pub fn broadcast_addresses() -> std::io::Result<Vec<Ipv4Addr>> {
    Ok(vec![Ipv4Addr::BROADCAST])
}

#[cfg(unix)]
fn ipv4(addr: *const libc::sockaddr) -> Option<Ipv4Addr> {
    if addr.is_null() {
        return None;
    }
    // SAFETY: `addr` is non-null and points at a sockaddr owned by the
    // getifaddrs list; `sa_family` tells us it is a `sockaddr_in`.
    unsafe {
        if i32::from((*addr).sa_family) != libc::AF_INET {
            return None;
        }
        let sin = &*addr.cast::<libc::sockaddr_in>();
        Some(Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr)))
    }
}
