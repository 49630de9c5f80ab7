//! Token value objects and the redacting secret wrapper.

// self
use crate::_prelude::*;

/// Redacting wrapper keeping credential material out of logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);
impl Secret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for Secret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Secret").field(&"<redacted>").finish()
	}
}
impl Display for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Bearer credential handed to the executor for the `Authorization` header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BearerToken(Secret);
impl BearerToken {
	/// Wraps a bearer token value.
	pub fn new(value: impl Into<String>) -> Self {
		Self(Secret::new(value))
	}

	/// Returns the opaque token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		self.0.expose()
	}

	/// Formats the `Authorization` header value for this token.
	pub fn header_value(&self) -> String {
		format!("Bearer {}", self.expose())
	}
}

/// Cached token state owned by a token provider instance.
///
/// The expiry instant is computed at issue time as
/// `issued_at + expires_in − safety buffer`, so validity is a pure clock
/// comparison with no network involvement.
#[derive(Clone, Debug)]
pub struct CachedToken {
	value: BearerToken,
	expires_at: OffsetDateTime,
}
impl CachedToken {
	/// Builds a cache entry expiring at `expires_at`.
	pub fn new(value: BearerToken, expires_at: OffsetDateTime) -> Self {
		Self { value, expires_at }
	}

	/// Returns `true` while `now` is strictly before the expiry instant.
	pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
		now < self.expires_at
	}

	/// Returns the bearer credential.
	pub fn bearer(&self) -> BearerToken {
		self.value.clone()
	}

	/// Returns the effective expiry instant.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.expires_at
	}
}
