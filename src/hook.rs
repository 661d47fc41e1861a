//! The preload hook: the exported `bind` symbol and the lookup of the real
//! one behind it.
//!
//! Loaded via `LD_PRELOAD`, the dynamic linker resolves callers' `bind`
//! references to the function below. The genuine libc entry point is found
//! with `dlsym(RTLD_NEXT)` on every call; re-resolution is idempotent and
//! keeps the hook free of process-wide mutable state.

use std::sync::Once;

use crate::error::set_errno;
use crate::resolve::HostnameResolver;
use crate::shim::{BindPrimitive, bind_via};

type BindFn = unsafe extern "C" fn(
	libc::c_int,
	*const libc::sockaddr,
	libc::socklen_t,
) -> libc::c_int;

/// The next `bind` in dynamic-linker resolution order.
pub struct RealBind(BindFn);

impl RealBind {
	/// Locates the real primitive.
	///
	/// Failure is fatal for the current call only; the next call retries.
	pub fn locate() -> Result<Self, crate::ShimError> {
		let sym = unsafe { libc::dlsym(libc::RTLD_NEXT, c"bind".as_ptr()) };
		if sym.is_null() {
			return Err(crate::ShimError::HookInit { symbol: "bind" });
		}
		Ok(Self(unsafe { std::mem::transmute::<*mut libc::c_void, BindFn>(sym) }))
	}
}

impl BindPrimitive for RealBind {
	unsafe fn bind(
		&self,
		fd: libc::c_int,
		addr: *const libc::sockaddr,
		len: libc::socklen_t,
	) -> libc::c_int {
		unsafe { (self.0)(fd, addr, len) }
	}
}

/// Installs a stderr subscriber once per process, only on request.
///
/// A preloaded library shares stdout/stderr with whatever it was injected
/// into, so diagnostics stay off unless PUBLICBIND_LOG is set.
fn init_diagnostics() {
	static INIT: Once = Once::new();
	INIT.call_once(|| {
		if std::env::var_os("PUBLICBIND_LOG").is_some() {
			let filter = tracing_subscriber::EnvFilter::try_from_env("PUBLICBIND_LOG")
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"));
			let _ = tracing_subscriber::fmt()
				.with_env_filter(filter)
				.with_writer(std::io::stderr)
				.try_init();
		}
	});
}

/// The intercepted entry point.
///
/// Same signature and error convention as the libc function it shadows:
/// 0 on success, -1 with errno set on failure.
///
/// # Safety
/// Called through the C ABI; `addr` must either be null or point to at
/// least `len` readable bytes, as the kernel interface already requires.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bind(
	fd: libc::c_int,
	addr: *const libc::sockaddr,
	len: libc::socklen_t,
) -> libc::c_int {
	init_diagnostics();

	let real = match RealBind::locate() {
		Ok(real) => real,
		Err(err) => {
			set_errno(err.errno());
			return -1;
		}
	};

	unsafe { bind_via(fd, addr, len, &HostnameResolver, &real) }
}
