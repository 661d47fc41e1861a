use std::cell::RefCell;

use publicbind::{
	BindPrimitive, Family, HostnameResolver, ResolvedIp, Resolver, ShimError, SockAddr,
	SocketAddrV4, SocketAddrV6, bind_via, errno, rewrite, rewritten_target,
};

/// Resolver that always hands back the same payload.
struct FixedResolver(ResolvedIp);

impl Resolver for FixedResolver {
	fn resolve(&self, _family: Family) -> Result<ResolvedIp, ShimError> {
		Ok(self.0)
	}
}

/// Resolver whose lookup mechanism always fails.
struct FailingResolver;

impl Resolver for FailingResolver {
	fn resolve(&self, family: Family) -> Result<ResolvedIp, ShimError> {
		Err(ShimError::Resolution {
			host: "testhost".into(),
			detail: format!("no {:?} addresses returned", family),
		})
	}
}

/// Fake bind primitive that records every call it receives.
struct RecordingBind {
	calls: RefCell<Vec<(libc::c_int, Vec<u8>)>>,
	rc: libc::c_int,
}

impl RecordingBind {
	fn new(rc: libc::c_int) -> Self {
		Self { calls: RefCell::new(Vec::new()), rc }
	}

	fn calls(&self) -> Vec<(libc::c_int, Vec<u8>)> {
		self.calls.borrow().clone()
	}
}

impl BindPrimitive for RecordingBind {
	unsafe fn bind(
		&self,
		fd: libc::c_int,
		addr: *const libc::sockaddr,
		len: libc::socklen_t,
	) -> libc::c_int {
		let bytes = if addr.is_null() {
			Vec::new()
		} else {
			unsafe { std::slice::from_raw_parts(addr as *const u8, len as usize) }.to_vec()
		};
		self.calls.borrow_mut().push((fd, bytes));
		self.rc
	}
}

fn raw_v4(ip: [u8; 4], port: u16) -> Vec<u8> {
	let mut raw: libc::sockaddr_in = unsafe { std::mem::zeroed() };
	raw.sin_family = libc::AF_INET as libc::sa_family_t;
	raw.sin_port = port.to_be();
	raw.sin_addr.s_addr = u32::from_ne_bytes(ip);
	let ptr = &raw as *const _ as *const u8;
	unsafe { std::slice::from_raw_parts(ptr, std::mem::size_of::<libc::sockaddr_in>()) }.to_vec()
}

fn raw_v6(ip: [u8; 16], port: u16, flowinfo: u32, scope_id: u32) -> Vec<u8> {
	let mut raw: libc::sockaddr_in6 = unsafe { std::mem::zeroed() };
	raw.sin6_family = libc::AF_INET6 as libc::sa_family_t;
	raw.sin6_port = port.to_be();
	raw.sin6_flowinfo = flowinfo;
	raw.sin6_addr.s6_addr = ip;
	raw.sin6_scope_id = scope_id;
	let ptr = &raw as *const _ as *const u8;
	unsafe { std::slice::from_raw_parts(ptr, std::mem::size_of::<libc::sockaddr_in6>()) }.to_vec()
}

fn parse(bytes: &[u8]) -> SockAddr {
	unsafe {
		SockAddr::from_sockaddr(
			bytes.as_ptr() as *const libc::sockaddr,
			bytes.len() as libc::socklen_t,
		)
	}
	.expect("recorded sockaddr should parse")
}

#[test]
fn wildcard_is_all_zero_payload_only() {
	assert!(SocketAddrV4::new([0; 4], 8080).is_wildcard());
	assert!(!SocketAddrV4::new([0, 0, 0, 1], 8080).is_wildcard());
	assert!(!SocketAddrV4::new([192, 168, 1, 10], 0).is_wildcard());

	assert!(SocketAddrV6::new([0; 16], 9000).is_wildcard());
	let mut almost = [0u8; 16];
	almost[15] = 1; // ::1 is loopback, not wildcard
	assert!(!SocketAddrV6::new(almost, 9000).is_wildcard());

	// Port, flowinfo and scope never influence classification.
	assert!(SocketAddrV6::with_scope([0; 16], 0, 7, 3).is_wildcard());
}

#[test]
fn rewrite_replaces_only_the_ip_payload() {
	let original = SockAddr::V6(SocketAddrV6::with_scope([0; 16], 9000, 0x1234, 5));
	let mut public = [0u8; 16];
	public[0] = 0x20;
	public[1] = 0x01;
	public[15] = 0x42;

	let out = rewrite(&original, &ResolvedIp::V6(public)).unwrap();
	let SockAddr::V6(out) = out else {
		panic!("family changed by rewrite")
	};
	assert_eq!(out.ip(), public);
	assert_eq!(out.port(), 9000);
	assert_eq!(out.flowinfo(), 0x1234);
	assert_eq!(out.scope_id(), 5);

	// Deterministic: same inputs, same output.
	let again = rewrite(&original, &ResolvedIp::V6(public)).unwrap();
	assert_eq!(again, SockAddr::V6(out));
}

#[test]
fn rewrite_rejects_family_mismatch() {
	let original = SockAddr::V4(SocketAddrV4::new([0; 4], 80));
	let err = rewrite(&original, &ResolvedIp::V6([0; 16])).unwrap_err();
	assert!(matches!(err, ShimError::FamilyMismatch { .. }));
	assert_eq!(err.errno(), libc::EINVAL);
}

#[test]
fn rewritten_target_skips_non_wildcard_without_resolving() {
	struct PanickingResolver;
	impl Resolver for PanickingResolver {
		fn resolve(&self, _family: Family) -> Result<ResolvedIp, ShimError> {
			panic!("resolver must not run for non-wildcard requests")
		}
	}

	let addr = SockAddr::V4(SocketAddrV4::new([192, 168, 1, 10], 80));
	assert_eq!(rewritten_target(&addr, &PanickingResolver).unwrap(), None);
}

#[test]
fn wildcard_v4_bind_reaches_primitive_rewritten() {
	let request = raw_v4([0, 0, 0, 0], 8080);
	let resolver = FixedResolver(ResolvedIp::V4([203, 0, 113, 5]));
	let primitive = RecordingBind::new(0);

	let rc = unsafe {
		bind_via(
			7,
			request.as_ptr() as *const libc::sockaddr,
			request.len() as libc::socklen_t,
			&resolver,
			&primitive,
		)
	};

	assert_eq!(rc, 0);
	let calls = primitive.calls();
	assert_eq!(calls.len(), 1);
	assert_eq!(calls[0].0, 7);
	let seen = parse(&calls[0].1);
	assert_eq!(seen.port(), 8080);
	let SockAddr::V4(seen) = seen else {
		panic!("primitive saw a non-v4 address")
	};
	assert_eq!(seen.ip(), [203, 0, 113, 5]);
}

#[test]
fn storage_sized_addrlen_stays_fully_defined_after_rewrite() {
	// Callers routinely hand bind() a zeroed sockaddr_storage with
	// addrlen = 128. The rewritten buffer must cover every one of those
	// bytes: the leading struct replaced, the caller's trailing zeros kept.
	let struct_len = std::mem::size_of::<libc::sockaddr_in>();
	let mut request = vec![0u8; std::mem::size_of::<libc::sockaddr_storage>()];
	request[..struct_len].copy_from_slice(&raw_v4([0, 0, 0, 0], 8080));
	let resolver = FixedResolver(ResolvedIp::V4([203, 0, 113, 5]));
	let primitive = RecordingBind::new(0);

	let rc = unsafe {
		bind_via(
			11,
			request.as_ptr() as *const libc::sockaddr,
			request.len() as libc::socklen_t,
			&resolver,
			&primitive,
		)
	};

	assert_eq!(rc, 0);
	let calls = primitive.calls();
	assert_eq!(calls.len(), 1);
	assert_eq!(calls[0].1.len(), request.len(), "original addrlen must be honoured");
	let seen = parse(&calls[0].1);
	assert_eq!(seen.port(), 8080);
	let SockAddr::V4(seen) = seen else {
		panic!("primitive saw a non-v4 address")
	};
	assert_eq!(seen.ip(), [203, 0, 113, 5]);
	assert!(
		calls[0].1[struct_len..].iter().all(|b| *b == 0),
		"bytes past the sockaddr_in must stay the caller's zeros"
	);
}

#[test]
fn wildcard_v6_bind_preserves_flowinfo_and_scope() {
	let request = raw_v6([0; 16], 9000, 0xbeef, 4);
	let mut public = [0u8; 16];
	public[0] = 0x20;
	public[1] = 0x01;
	public[15] = 0x99;
	let resolver = FixedResolver(ResolvedIp::V6(public));
	let primitive = RecordingBind::new(0);

	let rc = unsafe {
		bind_via(
			3,
			request.as_ptr() as *const libc::sockaddr,
			request.len() as libc::socklen_t,
			&resolver,
			&primitive,
		)
	};

	assert_eq!(rc, 0);
	let calls = primitive.calls();
	assert_eq!(calls.len(), 1);
	let seen = parse(&calls[0].1);
	assert_eq!(seen.port(), 9000);
	let SockAddr::V6(seen) = seen else {
		panic!("primitive saw a non-v6 address")
	};
	assert_eq!(seen.ip(), public);
	assert_eq!(seen.flowinfo(), 0xbeef);
	assert_eq!(seen.scope_id(), 4);
}

#[test]
fn non_wildcard_bind_passes_through_byte_identical() {
	let request = raw_v4([192, 168, 1, 10], 80);
	let resolver = FixedResolver(ResolvedIp::V4([203, 0, 113, 5]));
	let primitive = RecordingBind::new(0);

	let rc = unsafe {
		bind_via(
			5,
			request.as_ptr() as *const libc::sockaddr,
			request.len() as libc::socklen_t,
			&resolver,
			&primitive,
		)
	};

	assert_eq!(rc, 0);
	let calls = primitive.calls();
	assert_eq!(calls.len(), 1);
	assert_eq!(calls[0].1, request);
}

#[test]
fn resolution_failure_fails_bind_without_delegation() {
	let request = raw_v4([0, 0, 0, 0], 8080);
	let primitive = RecordingBind::new(0);

	let rc = unsafe {
		bind_via(
			9,
			request.as_ptr() as *const libc::sockaddr,
			request.len() as libc::socklen_t,
			&FailingResolver,
			&primitive,
		)
	};

	assert_eq!(rc, -1);
	assert_eq!(errno(), libc::EINVAL);
	assert!(primitive.calls().is_empty(), "real bind must not run after a failed resolution");
}

#[test]
fn unsupported_family_passes_through_unchanged() {
	// Shaped like the start of a sockaddr_un; the shim cannot classify it
	// and must forward the caller's bytes untouched.
	let mut request = vec![0u8; 32];
	request[..2].copy_from_slice(&(libc::AF_UNIX as libc::sa_family_t).to_ne_bytes());
	request[2..12].copy_from_slice(&b"/tmp/x.sock"[..10]);
	let primitive = RecordingBind::new(0);

	let rc = unsafe {
		bind_via(
			4,
			request.as_ptr() as *const libc::sockaddr,
			request.len() as libc::socklen_t,
			&FixedResolver(ResolvedIp::V4([203, 0, 113, 5])),
			&primitive,
		)
	};

	assert_eq!(rc, 0);
	let calls = primitive.calls();
	assert_eq!(calls.len(), 1);
	assert_eq!(calls[0].1, request);
}

#[test]
fn primitive_failure_returns_verbatim() {
	let request = raw_v4([192, 168, 1, 10], 80);
	let primitive = RecordingBind::new(-1);

	let rc = unsafe {
		bind_via(
			5,
			request.as_ptr() as *const libc::sockaddr,
			request.len() as libc::socklen_t,
			&FixedResolver(ResolvedIp::V4([203, 0, 113, 5])),
			&primitive,
		)
	};

	assert_eq!(rc, -1);
	assert_eq!(primitive.calls().len(), 1);
}

#[test]
fn hostname_resolver_smoke() {
	// Sandboxed runners may have an unresolvable hostname; either outcome
	// is acceptable, but a success must carry a v4 payload.
	match HostnameResolver.resolve(Family::V4) {
		Ok(ip) => assert_eq!(ip.family(), Family::V4),
		Err(err) => assert!(matches!(
			err,
			ShimError::Resolution { .. } | ShimError::Hostname { .. }
		)),
	}
}
