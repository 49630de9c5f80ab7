//! Transport primitives for carrier API calls.
//!
//! The module exposes [`CarrierTransport`] as the gateway's only dependency on an
//! HTTP stack. Every status the carrier assigns comes back as a
//! [`TransportReply`]; [`TransportError`] is reserved for failures with no carrier
//! response at all. Classification into the gateway error taxonomy happens in the
//! token provider and the executor, never in the transport.

// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`CarrierTransport`] implementations.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a + Send>>;

/// HTTP method subset used by carrier operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
	/// HTTP GET.
	Get,
	/// HTTP POST.
	Post,
	/// HTTP PUT.
	Put,
	/// HTTP DELETE.
	Delete,
}
impl Method {
	/// Returns the canonical wire spelling.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
#[cfg(feature = "reqwest")]
impl From<Method> for reqwest::Method {
	fn from(method: Method) -> Self {
		match method {
			Method::Get => Self::GET,
			Method::Post => Self::POST,
			Method::Put => Self::PUT,
			Method::Delete => Self::DELETE,
		}
	}
}

/// Request payload encodings supported by the transport.
#[derive(Clone, Debug)]
pub enum RequestBody {
	/// JSON document sent as `application/json`.
	Json(serde_json::Value),
	/// Key/value pairs sent as `application/x-www-form-urlencoded`.
	Form(Vec<(String, String)>),
}

/// Transient per-call request description handed to the transport.
///
/// Envelopes are not retained beyond the call. The executor merges its
/// `Authorization` header into [`headers`](Self::headers); caller-supplied
/// entries are never dropped.
#[derive(Clone, Debug)]
pub struct RequestEnvelope {
	/// HTTP method for the call.
	pub method: Method,
	/// Path joined onto the carrier base URL.
	pub path: String,
	/// Caller-supplied headers.
	pub headers: BTreeMap<String, String>,
	/// Optional request payload.
	pub body: Option<RequestBody>,
}
impl RequestEnvelope {
	/// Creates an envelope with no headers and no body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), headers: BTreeMap::new(), body: None }
	}

	/// Creates a GET envelope for `path`.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// Creates a POST envelope for `path`.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// Adds or replaces a header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}

	/// Attaches a JSON payload.
	pub fn json(mut self, body: serde_json::Value) -> Self {
		self.body = Some(RequestBody::Json(body));

		self
	}

	/// Attaches a url-encoded form payload.
	pub fn form<I, K, V>(mut self, pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.body = Some(RequestBody::Form(
			pairs.into_iter().map(|(key, value)| (key.into(), value.into())).collect(),
		));

		self
	}
}

/// Raw carrier reply surfaced by the transport: any status, undecoded bytes.
#[derive(Clone, Debug)]
pub struct TransportReply {
	/// HTTP status code assigned by the carrier.
	pub status: u16,
	/// Undecoded response body.
	pub body: Vec<u8>,
}
impl TransportReply {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Abstraction over HTTP transports capable of executing carrier calls.
///
/// Implementations must be `Send + Sync + 'static` so they can be shared between
/// the token provider and the executor behind `Arc<T>` without additional
/// wrappers. Each call owns its envelope, so request futures remain `Send` for
/// the lifetime of the in-flight operation.
pub trait CarrierTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes one carrier call described by `envelope`.
	fn execute<'a>(
		&'a self,
		envelope: RequestEnvelope,
	) -> TransportFuture<'a, Result<TransportReply, TransportError>>;
}

#[cfg(feature = "reqwest")]
/// Reqwest-backed [`CarrierTransport`] bound to one carrier base URL.
///
/// Every call runs under a fixed per-call timeout (default
/// [`DEFAULT_TIMEOUT`](Self::DEFAULT_TIMEOUT)); there is no deadline propagation
/// across the executor's retry boundary, so a retried attempt gets a fresh full
/// timeout budget.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
	client: ReqwestClient,
	base_url: Url,
	timeout: std::time::Duration,
}
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Fixed per-call timeout applied unless overridden at construction.
	pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

	/// Creates a transport with a default reqwest client.
	pub fn new(base_url: Url) -> Self {
		Self::with_client(ReqwestClient::default(), base_url)
	}

	/// Creates a transport over an existing reqwest client.
	pub fn with_client(client: ReqwestClient, base_url: Url) -> Self {
		Self { client, base_url, timeout: Self::DEFAULT_TIMEOUT }
	}

	/// Overrides the fixed per-call timeout.
	pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Returns the carrier base URL this transport is bound to.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
		let joined = format!(
			"{}/{}",
			self.base_url.as_str().trim_end_matches('/'),
			path.trim_start_matches('/'),
		);

		Url::parse(&joined).map_err(TransportError::request)
	}
}
#[cfg(feature = "reqwest")]
impl CarrierTransport for ReqwestTransport {
	fn execute<'a>(
		&'a self,
		envelope: RequestEnvelope,
	) -> TransportFuture<'a, Result<TransportReply, TransportError>> {
		Box::pin(async move {
			let url = self.endpoint(&envelope.path)?;
			let mut request = self.client.request(envelope.method.into(), url).timeout(self.timeout);

			for (name, value) in &envelope.headers {
				request = request.header(name, value);
			}

			match &envelope.body {
				Some(RequestBody::Json(body)) => request = request.json(body),
				Some(RequestBody::Form(pairs)) => request = request.form(pairs),
				None => {},
			}

			let response = request.send().await?;
			let status = response.status().as_u16();
			let body = response.bytes().await?.to_vec();

			Ok(TransportReply { status, body })
		})
	}
}
