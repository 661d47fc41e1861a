//! The interception boundary every bind call passes through.
//!
//! The real primitive and the resolver are injected as capabilities, so the
//! decision logic here has no global state and is exercised directly by the
//! tests with fakes.

use tracing::{debug, warn};

use crate::addr::{SockAddr, ToSockAddr};
use crate::error::{ShimError, set_errno};
use crate::resolve::Resolver;
use crate::rewrite::rewrite;

/// The real bind entry point, injected rather than held in global state.
pub trait BindPrimitive {
	/// Performs the actual bind.
	///
	/// # Safety
	/// `addr` must point to at least `len` readable bytes (or be null, in
	/// which case the primitive reports EFAULT itself).
	unsafe fn bind(
		&self,
		fd: libc::c_int,
		addr: *const libc::sockaddr,
		len: libc::socklen_t,
	) -> libc::c_int;
}

/// Decides what address, if any, should replace the caller's request.
///
/// Returns `None` when the request is not a wildcard and must pass through
/// unchanged. Resolution runs only for wildcard requests, and its failure
/// fails the whole bind; falling back to the wildcard would let the caller
/// listen somewhere other than where it believes it is listening.
pub fn rewritten_target<R: Resolver>(
	addr: &SockAddr,
	resolver: &R,
) -> Result<Option<SockAddr>, ShimError> {
	if !addr.is_wildcard() {
		return Ok(None);
	}
	let resolved = resolver.resolve(addr.family())?;
	Ok(Some(rewrite(addr, &resolved)?))
}

/// Intercepts one bind call.
///
/// Anything the engine cannot reason about — an unsupported family, a null
/// pointer, a length too short for the claimed family — is forwarded to the
/// primitive byte-identically. A preloaded shim sees every bind in the
/// process, unix and netlink sockets included, and must not break them.
///
/// On a rewrite the primitive receives the caller's original `len` together
/// with a copy of the caller's buffer in which only the leading sockaddr
/// struct is replaced; `len` may legitimately exceed the struct (callers
/// often pass a whole sockaddr_storage), so every byte it covers must stay
/// defined. Engine failures set errno from the error and return -1 without
/// touching the primitive.
///
/// # Safety
/// `addr` must either be null or point to at least `len` readable bytes.
pub unsafe fn bind_via<R, B>(
	fd: libc::c_int,
	addr: *const libc::sockaddr,
	len: libc::socklen_t,
	resolver: &R,
	primitive: &B,
) -> libc::c_int
where
	R: Resolver,
	B: BindPrimitive,
{
	let parsed = match unsafe { SockAddr::from_sockaddr(addr, len) } {
		Ok(parsed) => parsed,
		Err(err) => {
			debug!(error = %err, "address not classifiable, passing through");
			return unsafe { primitive.bind(fd, addr, len) };
		}
	};

	match rewritten_target(&parsed, resolver) {
		Ok(None) => unsafe { primitive.bind(fd, addr, len) },
		Ok(Some(target)) => {
			debug!(from = %parsed, to = %target, "rewriting wildcard bind");
			let storage = std::mem::size_of::<libc::sockaddr_storage>();
			let mut buf: Vec<libc::sockaddr_storage> =
				vec![unsafe { std::mem::zeroed() }; (len as usize).div_ceil(storage).max(1)];
			{
				let bytes = unsafe {
					std::slice::from_raw_parts_mut(buf.as_mut_ptr() as *mut u8, buf.len() * storage)
				};
				bytes[..len as usize].copy_from_slice(unsafe {
					std::slice::from_raw_parts(addr as *const u8, len as usize)
				});
				target.with_raw(|ptr, raw_len| {
					let raw = unsafe {
						std::slice::from_raw_parts(ptr as *const u8, raw_len as usize)
					};
					bytes[..raw.len()].copy_from_slice(raw);
				});
			}
			unsafe { primitive.bind(fd, buf.as_ptr() as *const libc::sockaddr, len) }
		}
		Err(err) => {
			warn!(addr = %parsed, error = %err, "failing bind, wildcard not rewritable");
			set_errno(err.errno());
			-1
		}
	}
}
