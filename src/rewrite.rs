//! Address substitution.
//!
//! Builds the address actually handed to the real bind: the caller's request
//! with only the IP payload swapped for the resolved one.

use crate::addr::SockAddr;
use crate::error::ShimError;
use crate::resolve::ResolvedIp;

/// Replaces the IP payload of `original` with `resolved`.
///
/// Every non-IP field is copied verbatim from `original`: family, port, and
/// for IPv6 flowinfo and scope_id. The result has the same family and raw
/// length as the input, so the caller's addrlen stays valid.
///
/// A family mismatch is a contract violation by the caller of this function
/// (resolution is family-scoped, so the shim never produces one) and fails
/// fast rather than building a partial address.
pub fn rewrite(original: &SockAddr, resolved: &ResolvedIp) -> Result<SockAddr, ShimError> {
	match (original, resolved) {
		(SockAddr::V4(addr), ResolvedIp::V4(ip)) => Ok(SockAddr::V4(addr.with_ip(*ip))),
		(SockAddr::V6(addr), ResolvedIp::V6(ip)) => Ok(SockAddr::V6(addr.with_ip(*ip))),
		_ => Err(ShimError::FamilyMismatch {
			request: original.family().name(),
			resolved: resolved.family().name(),
		}),
	}
}
