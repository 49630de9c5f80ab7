//! Token lifecycle capability and its client-credentials implementation.

pub mod client_credentials;
pub mod token;

pub use client_credentials::*;
pub use token::*;

// self
use crate::_prelude::*;

/// Boxed future returned by [`TokenProvider`] implementations.
pub type AuthFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a + Send>>;

/// Capability contract every carrier token source implements.
///
/// Carriers share no implementation coupling: anything that can produce a valid
/// bearer token and discard its cache satisfies the executor. The trait is
/// object safe so the executor can hold `Arc<dyn TokenProvider>`.
pub trait TokenProvider
where
	Self: Send + Sync,
{
	/// Returns a currently valid bearer token, authenticating against the
	/// carrier when the cache is absent or expired.
	fn access_token(&self) -> AuthFuture<'_, Result<BearerToken>>;

	/// Unconditionally discards the cached token so the next
	/// [`access_token`](Self::access_token) call re-authenticates, regardless
	/// of remaining nominal validity. Never fails and performs no network call.
	fn clear_token(&self) -> AuthFuture<'_, ()>;
}
