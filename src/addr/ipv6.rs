use crate::addr::ToSockAddr;

/// IPv6 socket address (IP + port + flowinfo + scope).
///
/// flowinfo and scope_id are carried verbatim: the rewriting contract copies
/// every non-IP field of the caller's request into the substituted address
/// unchanged, so neither is ever normalised or zeroed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketAddrV6 {
	ip: [u8; 16],
	port: u16,
	flowinfo: u32,
	/// Scope ID for link-local addresses (identifies network interface).
	scope_id: u32,
}

impl SocketAddrV6 {
	/// Creates a new IPv6 address with zero flowinfo and scope.
	pub fn new(ip: [u8; 16], port: u16) -> Self {
		Self { ip, port, flowinfo: 0, scope_id: 0 }
	}

	/// Creates with explicit flowinfo and scope ID.
	pub fn with_scope(ip: [u8; 16], port: u16, flowinfo: u32, scope_id: u32) -> Self {
		Self { ip, port, flowinfo, scope_id }
	}

	/// Creates from raw sockaddr_in6.
	pub(crate) fn from_raw(raw: &libc::sockaddr_in6) -> Self {
		Self {
			ip: raw.sin6_addr.s6_addr,
			port: u16::from_be(raw.sin6_port),
			// Preserved as stored; no byte-order interpretation needed for
			// a field that is only ever copied back out.
			flowinfo: raw.sin6_flowinfo,
			scope_id: raw.sin6_scope_id,
		}
	}

	/// Returns the IP bytes.
	pub fn ip(&self) -> [u8; 16] {
		self.ip
	}

	/// Returns the port.
	pub fn port(&self) -> u16 {
		self.port
	}

	/// Returns the flow info field.
	pub fn flowinfo(&self) -> u32 {
		self.flowinfo
	}

	/// Returns the scope ID.
	pub fn scope_id(&self) -> u32 {
		self.scope_id
	}

	/// Whether this is ::, the "listen on every interface" address.
	#[inline]
	pub fn is_wildcard(&self) -> bool {
		self.ip == [0u8; 16]
	}

	/// Returns a copy with only the IP payload replaced.
	pub(crate) fn with_ip(&self, ip: [u8; 16]) -> Self {
		Self {
			ip,
			port: self.port,
			flowinfo: self.flowinfo,
			scope_id: self.scope_id,
		}
	}

	/// Converts to the raw sockaddr_in6 for syscalls.
	pub(crate) fn to_raw(&self) -> libc::sockaddr_in6 {
		libc::sockaddr_in6 {
			sin6_family: libc::AF_INET6 as libc::sa_family_t,
			sin6_port: self.port.to_be(),
			sin6_flowinfo: self.flowinfo,
			sin6_addr: libc::in6_addr {
				s6_addr: self.ip,
			},
			sin6_scope_id: self.scope_id,
		}
	}
}

impl ToSockAddr for SocketAddrV6 {
	fn with_raw<F, R>(&self, f: F) -> R
	where
		F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R,
	{
		let raw = self.to_raw();
		let ptr = &raw as *const _ as *const libc::sockaddr;
		let len = std::mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t;
		f(ptr, len)
	}
}

impl std::fmt::Display for SocketAddrV6 {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "[")?;
		for (i, pair) in self.ip.chunks(2).enumerate() {
			if i > 0 {
				write!(f, ":")?;
			}
			write!(f, "{:x}", u16::from_be_bytes([pair[0], pair[1]]))?;
		}
		write!(f, "]:{}", self.port)
	}
}
