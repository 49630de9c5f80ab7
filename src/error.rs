//! Gateway-wide error taxonomy shared by every component.
//!
//! Every failure crossing the executor or token provider boundary is exactly one
//! [`Error`] variant; raw transport errors never escape those components. The
//! taxonomy is closed on purpose so callers can branch on [`ErrorKind`] without
//! string matching.

// self
use crate::_prelude::*;

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Boxed underlying cause retained for diagnostics.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Status substitute used when no carrier response was received at all.
///
/// Real carrier statuses are never 0, so callers can distinguish network-level
/// failures (timeouts, connection resets, local errors) from any carrier-assigned
/// status.
pub const NO_RESPONSE_STATUS: u16 = 0;

/// Closed classification labels mirroring the [`Error`] variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// Input failed pre-flight checks and never reached the transport.
	Validation,
	/// Carrier rejected the credentials, even after a token refresh.
	Authentication,
	/// Generic carrier or transport failure.
	CarrierApi,
	/// Carrier throttled the request (HTTP 429).
	RateLimit,
	/// Registry lookup missed.
	OperationNotFound,
}
impl ErrorKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ErrorKind::Validation => "validation",
			ErrorKind::Authentication => "authentication",
			ErrorKind::CarrierApi => "carrier_api",
			ErrorKind::RateLimit => "rate_limit",
			ErrorKind::OperationNotFound => "operation_not_found",
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Canonical gateway error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Domain input failed structural checks before any network activity.
	#[error("{message}")]
	Validation {
		/// Human-readable reason for the rejection.
		message: String,
	},
	/// Carrier rejected the credentials; for request execution this is only
	/// reported after the bounded single retry has been exhausted.
	#[error("{message}")]
	Authentication {
		/// Human-readable reason for the rejection.
		message: String,
		/// HTTP status code assigned by the carrier, when one was received.
		status: Option<u16>,
		/// Carrier-supplied error code, when one was parsed.
		carrier_code: Option<String>,
		/// Underlying failure retained for diagnostics.
		#[source]
		source: Option<BoxError>,
	},
	/// Generic carrier or transport failure; status is [`NO_RESPONSE_STATUS`]
	/// when no carrier response was received.
	#[error("{message}")]
	CarrierApi {
		/// Human-readable summary of the failure.
		message: String,
		/// HTTP status code, or [`NO_RESPONSE_STATUS`] when absent.
		status: u16,
		/// Carrier-supplied error code, when one was parsed.
		carrier_code: Option<String>,
		/// Underlying failure retained for diagnostics.
		#[source]
		source: Option<BoxError>,
	},
	/// Carrier throttled the request; split from [`Error::CarrierApi`] so
	/// callers can apply their own backoff.
	#[error("{message}")]
	RateLimit {
		/// Human-readable summary of the failure.
		message: String,
		/// HTTP status code (429).
		status: u16,
		/// Carrier-supplied error code, when one was parsed.
		carrier_code: Option<String>,
		/// Underlying failure retained for diagnostics.
		#[source]
		source: Option<BoxError>,
	},
	/// No capability is registered under the requested key.
	#[error("No operation is registered under `{key}`.")]
	OperationNotFound {
		/// Registry key that missed.
		key: String,
	},
}
impl Error {
	/// Builds a [`Error::Validation`] failure.
	pub fn validation(message: impl Into<String>) -> Self {
		Self::Validation { message: message.into() }
	}

	/// Builds a [`Error::Authentication`] failure.
	pub fn authentication(
		message: impl Into<String>,
		status: Option<u16>,
		carrier_code: Option<String>,
		source: Option<BoxError>,
	) -> Self {
		Self::Authentication { message: message.into(), status, carrier_code, source }
	}

	/// Builds a [`Error::CarrierApi`] failure carrying `status` as-is.
	pub fn carrier_api(
		status: u16,
		message: impl Into<String>,
		carrier_code: Option<String>,
		source: Option<BoxError>,
	) -> Self {
		Self::CarrierApi { message: message.into(), status, carrier_code, source }
	}

	/// Builds a [`Error::CarrierApi`] failure with [`NO_RESPONSE_STATUS`], used
	/// when the failure carries no carrier-assigned status (network failures and
	/// unexpected local errors).
	pub fn no_response(message: impl Into<String>, source: Option<BoxError>) -> Self {
		Self::carrier_api(NO_RESPONSE_STATUS, message, None, source)
	}

	/// Builds a [`Error::CarrierApi`] failure with [`NO_RESPONSE_STATUS`] for a
	/// reply that was received but could not be used (undecodable body, missing
	/// fields). Shares the zero status with [`Error::no_response`] so callers
	/// can treat both as "no carrier-assigned status".
	pub fn malformed_reply(message: impl Into<String>, source: Option<BoxError>) -> Self {
		Self::carrier_api(NO_RESPONSE_STATUS, message, None, source)
	}

	/// Builds a [`Error::OperationNotFound`] failure for `key`.
	pub fn operation_not_found(key: impl Into<String>) -> Self {
		Self::OperationNotFound { key: key.into() }
	}

	/// Classifies a carrier-assigned failure status: 429 becomes
	/// [`Error::RateLimit`], anything else [`Error::CarrierApi`] carrying that
	/// exact status.
	pub fn classify_status(
		status: u16,
		message: impl Into<String>,
		carrier_code: Option<String>,
		source: Option<BoxError>,
	) -> Self {
		if status == 429 {
			Self::RateLimit { message: message.into(), status, carrier_code, source }
		} else {
			Self::carrier_api(status, message, carrier_code, source)
		}
	}

	/// Returns the closed classification label for this error.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Validation { .. } => ErrorKind::Validation,
			Self::Authentication { .. } => ErrorKind::Authentication,
			Self::CarrierApi { .. } => ErrorKind::CarrierApi,
			Self::RateLimit { .. } => ErrorKind::RateLimit,
			Self::OperationNotFound { .. } => ErrorKind::OperationNotFound,
		}
	}

	/// Returns the transport status attached to this error, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Authentication { status, .. } => *status,
			Self::CarrierApi { status, .. } | Self::RateLimit { status, .. } => Some(*status),
			Self::Validation { .. } | Self::OperationNotFound { .. } => None,
		}
	}

	/// Returns the carrier-supplied error code attached to this error, if any.
	pub fn carrier_code(&self) -> Option<&str> {
		match self {
			Self::Authentication { carrier_code, .. }
			| Self::CarrierApi { carrier_code, .. }
			| Self::RateLimit { carrier_code, .. } => carrier_code.as_deref(),
			Self::Validation { .. } | Self::OperationNotFound { .. } => None,
		}
	}
}

/// Carrier error body shape consumed for message extraction only.
#[derive(Clone, Debug, Deserialize)]
pub struct CarrierErrorBody {
	/// Wrapper object carrying the error list.
	pub response: CarrierErrorList,
}
impl CarrierErrorBody {
	/// Parses a carrier error body, returning `None` when the bytes do not
	/// match the expected shape.
	pub fn parse(bytes: &[u8]) -> Option<Self> {
		serde_json::from_slice(bytes).ok()
	}

	/// Returns the first (most significant) carrier error record.
	pub fn first(&self) -> Option<&CarrierErrorDetail> {
		self.response.errors.first()
	}
}

/// Error list wrapper inside a carrier error body.
#[derive(Clone, Debug, Deserialize)]
pub struct CarrierErrorList {
	/// Carrier-supplied error records, most significant first.
	#[serde(default)]
	pub errors: Vec<CarrierErrorDetail>,
}

/// One carrier-supplied error record.
#[derive(Clone, Debug, Deserialize)]
pub struct CarrierErrorDetail {
	/// Carrier-specific error code.
	pub code: String,
	/// Carrier-supplied message.
	pub message: String,
}

/// Transport-level failure with no carrier response attached.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the carrier endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request construction failed before anything was sent.
	#[error("Carrier request could not be constructed.")]
	Request {
		/// Underlying construction failure.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a request construction failure.
	pub fn request(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Request { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for TransportError {
	fn from(e: reqwest::Error) -> Self {
		Self::network(e)
	}
}

/// Extracts the carrier message/code pair from a failure reply body.
fn extract_detail(status: u16, body: &[u8]) -> (String, Option<String>) {
	let parsed = CarrierErrorBody::parse(body);
	let detail = parsed.as_ref().and_then(CarrierErrorBody::first);
	let message = detail
		.map(|detail| detail.message.clone())
		.unwrap_or_else(|| format!("Carrier request failed (HTTP {status})."));
	let code = detail.map(|detail| detail.code.clone());

	(message, code)
}

/// Classifies a carrier failure reply under the request-execution policy:
/// 429 maps to rate limiting, any other status stays a generic carrier failure.
pub(crate) fn classify_reply(status: u16, body: &[u8]) -> Error {
	let (message, code) = extract_detail(status, body);

	Error::classify_status(status, message, code, None)
}

/// Classifies a carrier failure reply under the token-endpoint policy: 401 and
/// 403 are credential rejections, the rest follows the request-execution policy.
pub(crate) fn classify_auth_reply(status: u16, body: &[u8]) -> Error {
	match status {
		401 | 403 => {
			let (message, code) = extract_detail(status, body);

			Error::authentication(message, Some(status), code, None)
		},
		_ => classify_reply(status, body),
	}
}
