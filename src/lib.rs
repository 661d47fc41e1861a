//! publicbind — rewrite wildcard binds to the node's public address.
//!
//! Preloaded into an unmodified process, this library intercepts `bind(2)`.
//! A request for `0.0.0.0` or `::` is rewritten to the address the node's
//! hostname resolves to, so "listen on every interface" becomes "listen on
//! the externally reachable one". Everything else passes through untouched.

pub mod shim;
mod addr;
mod error;
pub mod hook;
mod resolve;
mod rewrite;

pub use self::addr::{Family, SockAddr, SocketAddrV4, SocketAddrV6, ToSockAddr};
pub use self::error::{ShimError, errno};
pub use self::resolve::{HostnameResolver, ResolvedIp, Resolver};
pub use self::rewrite::rewrite;
pub use self::shim::{BindPrimitive, bind_via, rewritten_target};
