//! Socket address parsing and classification.
//!
//! The shim reasons about exactly two families:
//! - `V4` — Internet Protocol version 4
//! - `V6` — Internet Protocol version 6
//!
//! Anything else is never modelled; [`SockAddr::from_sockaddr`] refuses it
//! and the interception layer forwards the caller's bytes untouched.

mod ipv4;
mod ipv6;
pub use self::ipv4::SocketAddrV4;
pub use self::ipv6::SocketAddrV6;

use crate::error::ShimError;

/// Address family of a parsed socket address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
	V4,
	V6,
}

impl Family {
	/// Returns the libc constant for this address family.
	#[inline]
	pub fn raw(self) -> libc::c_int {
		match self {
			Family::V4 => libc::AF_INET,
			Family::V6 => libc::AF_INET6,
		}
	}

	pub(crate) fn name(self) -> &'static str {
		match self {
			Family::V4 => "inet",
			Family::V6 => "inet6",
		}
	}
}

/// Trait for address types that can be lent to a syscall as a raw sockaddr.
///
/// The closure runs while the stack-allocated raw struct is still alive;
/// the pointer must not escape it.
pub trait ToSockAddr {
	fn with_raw<F, R>(&self, f: F) -> R
	where
		F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R;
}

/// A parsed IPv4 or IPv6 socket address.
///
/// This is the only shape the rewriting engine operates on. Constructing one
/// from caller-supplied memory validates family and length up front, so the
/// pure layers below never see a malformed address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SockAddr {
	V4(SocketAddrV4),
	V6(SocketAddrV6),
}

impl SockAddr {
	/// Parses a caller-supplied sockaddr.
	///
	/// Fails with `UnsupportedFamily` for any family outside inet/inet6
	/// (never guessed from the length), and with `InvalidAddress` when the
	/// pointer is null or `len` is too short for the claimed family.
	///
	/// # Safety
	/// `addr` must either be null or point to at least `len` readable bytes.
	pub unsafe fn from_sockaddr(
		addr: *const libc::sockaddr,
		len: libc::socklen_t,
	) -> Result<Self, ShimError> {
		if addr.is_null() {
			return Err(ShimError::InvalidAddress { reason: "null sockaddr" });
		}
		if (len as usize) < std::mem::size_of::<libc::sa_family_t>() {
			return Err(ShimError::InvalidAddress { reason: "length shorter than family tag" });
		}

		let family = unsafe { (*addr).sa_family } as libc::c_int;
		match family {
			libc::AF_INET => {
				if (len as usize) < std::mem::size_of::<libc::sockaddr_in>() {
					return Err(ShimError::InvalidAddress { reason: "short sockaddr_in" });
				}
				let raw = unsafe { &*(addr as *const libc::sockaddr_in) };
				Ok(SockAddr::V4(SocketAddrV4::from_raw(raw)))
			}
			libc::AF_INET6 => {
				if (len as usize) < std::mem::size_of::<libc::sockaddr_in6>() {
					return Err(ShimError::InvalidAddress { reason: "short sockaddr_in6" });
				}
				let raw = unsafe { &*(addr as *const libc::sockaddr_in6) };
				Ok(SockAddr::V6(SocketAddrV6::from_raw(raw)))
			}
			other => Err(ShimError::UnsupportedFamily { family: other }),
		}
	}

	/// Returns the address family.
	#[inline]
	pub fn family(&self) -> Family {
		match self {
			SockAddr::V4(_) => Family::V4,
			SockAddr::V6(_) => Family::V6,
		}
	}

	/// Whether this is the family's all-interfaces "any" address.
	///
	/// Byte-for-byte comparison of the IP payload against all zeros;
	/// port, flowinfo and scope do not participate.
	pub fn is_wildcard(&self) -> bool {
		match self {
			SockAddr::V4(a) => a.is_wildcard(),
			SockAddr::V6(a) => a.is_wildcard(),
		}
	}

	/// Returns the port.
	pub fn port(&self) -> u16 {
		match self {
			SockAddr::V4(a) => a.port(),
			SockAddr::V6(a) => a.port(),
		}
	}
}

impl ToSockAddr for SockAddr {
	fn with_raw<F, R>(&self, f: F) -> R
	where
		F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R,
	{
		match self {
			SockAddr::V4(a) => a.with_raw(f),
			SockAddr::V6(a) => a.with_raw(f),
		}
	}
}

impl std::fmt::Display for SockAddr {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			SockAddr::V4(a) => write!(f, "{}", a),
			SockAddr::V6(a) => write!(f, "{}", a),
		}
	}
}
