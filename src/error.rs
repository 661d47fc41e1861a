/// Errors raised by the wildcard-rewriting engine.
///
/// A failure of the delegated `bind()` itself is deliberately not represented
/// here: the real primitive's return value and errno pass through verbatim.
#[derive(Debug, thiserror::Error)]
pub enum ShimError {
    #[error("unsupported address family {family}")]
    UnsupportedFamily { family: i32 },

    #[error("address family mismatch: request is {request}, resolved address is {resolved}")]
    FamilyMismatch { request: &'static str, resolved: &'static str },

    #[error("invalid address: {reason}")]
    InvalidAddress { reason: &'static str },

    #[error("gethostname() failed: {}", errno_to_str(*.errno))]
    Hostname { errno: i32 },

    #[error("resolving public address for {host} failed: {detail}")]
    Resolution { host: String, detail: String },

    #[error("unable to locate the real {symbol} entry point")]
    HookInit { symbol: &'static str },
}

impl ShimError {
    /// The errno reported to the intercepted caller for this failure.
    ///
    /// Resolution failures map to EINVAL, the same value the original
    /// caller would see from a native bind() given an unusable address.
    pub fn errno(&self) -> i32 {
        match self {
            ShimError::UnsupportedFamily { .. } => libc::EAFNOSUPPORT,
            ShimError::FamilyMismatch { .. } => libc::EINVAL,
            ShimError::InvalidAddress { .. } => libc::EINVAL,
            ShimError::Hostname { errno } => *errno,
            ShimError::Resolution { .. } => libc::EINVAL,
            ShimError::HookInit { .. } => libc::ENOSYS,
        }
    }
}

/// Returns current errno value.
#[inline]
pub fn errno() -> i32 {
    unsafe { *libc::__errno_location() }
}

/// Sets errno for the calling thread.
#[inline]
pub(crate) fn set_errno(value: i32) {
    unsafe { *libc::__errno_location() = value };
}

/// Converts errno to human-readable string.
pub(crate) fn errno_to_str(errno: i32) -> String {
    match errno {
        libc::EACCES => "permission denied".into(),
        libc::EADDRINUSE => "address already in use".into(),
        libc::EADDRNOTAVAIL => "address not available".into(),
        libc::EAFNOSUPPORT => "address family not supported".into(),
        libc::EAGAIN => "resource temporarily unavailable".into(),
        libc::EBADF => "bad file descriptor".into(),
        libc::EFAULT => "bad address".into(),
        libc::EINVAL => "invalid argument".into(),
        libc::ENAMETOOLONG => "name too long".into(),
        libc::ENOSYS => "function not implemented".into(),
        _ => format!("errno {}", errno),
    }
}
