//! Canonical public address lookup for the local node.
//!
//! The node's own hostname is resolved back to an address of the requested
//! family. Nothing is cached: every bind that needs a rewrite pays for a
//! fresh lookup, which may block on the resolver exactly like a native call.

use std::ffi::{CStr, CString};

use tracing::debug;

use crate::addr::Family;
use crate::error::{ShimError, errno, errno_to_str};

const HOSTNAME_MAX: usize = 255;

/// The IP payload of a resolved address.
///
/// Only the payload survives the lookup; port, flowinfo and scope belong to
/// the caller's original request and are filled in by the rewriter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedIp {
	V4([u8; 4]),
	V6([u8; 16]),
}

impl ResolvedIp {
	/// Returns the address family of the payload.
	#[inline]
	pub fn family(&self) -> Family {
		match self {
			ResolvedIp::V4(_) => Family::V4,
			ResolvedIp::V6(_) => Family::V6,
		}
	}
}

/// Produces one non-wildcard address for the local node in a given family.
pub trait Resolver {
	fn resolve(&self, family: Family) -> Result<ResolvedIp, ShimError>;
}

/// Resolver backed by gethostname() + getaddrinfo().
///
/// Known limitation: on a node with several addresses in the requested
/// family, the first record the resolver returns wins. There is no
/// preference between public, private or loopback ranges.
pub struct HostnameResolver;

impl Resolver for HostnameResolver {
	fn resolve(&self, family: Family) -> Result<ResolvedIp, ShimError> {
		let host = local_hostname()?;
		let ip = lookup_first(&host, family)?;
		debug!(
			host = %host.to_string_lossy(),
			family = family.name(),
			"resolved public address"
		);
		Ok(ip)
	}
}

/// Reads the node's hostname from the operating environment.
fn local_hostname() -> Result<CString, ShimError> {
	let mut buf = [0u8; HOSTNAME_MAX + 1];
	let rc = unsafe {
		libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, HOSTNAME_MAX)
	};
	if rc != 0 {
		return Err(ShimError::Hostname { errno: errno() });
	}
	// gethostname() may leave the name unterminated on truncation.
	buf[HOSTNAME_MAX] = 0;
	let name = unsafe { CStr::from_ptr(buf.as_ptr() as *const libc::c_char) };
	Ok(name.to_owned())
}

/// Looks the hostname up, restricted to `family`, and keeps the first match.
fn lookup_first(host: &CStr, family: Family) -> Result<ResolvedIp, ShimError> {
	let mut hints: libc::addrinfo = unsafe { std::mem::zeroed() };
	hints.ai_family = family.raw();
	hints.ai_flags = libc::AI_CANONNAME;

	let mut list: *mut libc::addrinfo = std::ptr::null_mut();
	let rc = unsafe {
		libc::getaddrinfo(host.as_ptr(), std::ptr::null(), &hints, &mut list)
	};
	if rc != 0 {
		return Err(resolution_error(host, rc));
	}
	let list = AddrInfoList(list);

	let mut node = list.0;
	while !node.is_null() {
		let info = unsafe { &*node };
		if info.ai_family == family.raw() && !info.ai_addr.is_null() {
			return Ok(extract_ip(info, family));
		}
		node = info.ai_next;
	}

	Err(ShimError::Resolution {
		host: host.to_string_lossy().into_owned(),
		detail: format!("no {} addresses returned", family.name()),
	})
}

/// Pulls the IP payload out of a lookup record, discarding everything else.
fn extract_ip(info: &libc::addrinfo, family: Family) -> ResolvedIp {
	match family {
		Family::V4 => {
			let raw = unsafe { &*(info.ai_addr as *const libc::sockaddr_in) };
			ResolvedIp::V4(raw.sin_addr.s_addr.to_ne_bytes())
		}
		Family::V6 => {
			let raw = unsafe { &*(info.ai_addr as *const libc::sockaddr_in6) };
			ResolvedIp::V6(raw.sin6_addr.s6_addr)
		}
	}
}

fn resolution_error(host: &CStr, code: libc::c_int) -> ShimError {
	let detail = if code == libc::EAI_SYSTEM {
		errno_to_str(errno())
	} else {
		let msg = unsafe { CStr::from_ptr(libc::gai_strerror(code)) };
		msg.to_string_lossy().into_owned()
	};
	ShimError::Resolution {
		host: host.to_string_lossy().into_owned(),
		detail,
	}
}

/// Owns a getaddrinfo() result list; frees it on drop.
struct AddrInfoList(*mut libc::addrinfo);

impl Drop for AddrInfoList {
	fn drop(&mut self) {
		if !self.0.is_null() {
			unsafe { libc::freeaddrinfo(self.0) };
		}
	}
}
