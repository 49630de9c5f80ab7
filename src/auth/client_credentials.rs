//! Client-credentials token provider for carrier OAuth endpoints.
//!
//! Cache hits return without any network activity; misses perform the
//! credential grant against the carrier token endpoint and cache the result
//! with a safety buffer subtracted from the server TTL, so the executor never
//! presents a token that expires mid-request.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
// self
use crate::{
	_prelude::*,
	auth::{AuthFuture, BearerToken, CachedToken, Secret, TokenProvider},
	error,
	http::{CarrierTransport, RequestEnvelope},
	obs::{self, CallKind, CallOutcome, CallSpan},
};

/// Path of the carrier token endpoint relative to the base URL.
pub const TOKEN_ENDPOINT_PATH: &str = "/security/v1/oauth/token";
/// Seconds subtracted from the server TTL so tokens never expire mid-request.
pub const SAFETY_BUFFER_SECONDS: i64 = 60;

/// Immutable client credentials for one carrier account.
#[derive(Clone)]
pub struct Credentials {
	client_id: String,
	client_secret: Secret,
}
impl Credentials {
	/// Creates credentials from a client identifier/secret pair.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self { client_id: client_id.into(), client_secret: Secret::new(client_secret) }
	}

	/// Returns the client identifier.
	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	/// Formats the `Authorization: Basic` header value for the token endpoint.
	pub fn basic_header(&self) -> String {
		let pair = format!("{}:{}", self.client_id, self.client_secret.expose());

		format!("Basic {}", BASE64.encode(pair))
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret)
			.finish()
	}
}

/// Carrier token response fields consumed by the gateway. Other returned fields
/// (`token_type`, `scope`, `status`, ...) are accepted but unused.
#[derive(Debug, Deserialize)]
struct TokenResponse {
	access_token: String,
	#[serde(deserialize_with = "deserialize_expires_in")]
	expires_in: i64,
}

/// Carriers return `expires_in` as either a JSON number or a numeric string;
/// both coerce to positive whole seconds, anything else is rejected.
fn deserialize_expires_in<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
	D: serde::Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Raw {
		Number(i64),
		Text(String),
	}

	let seconds = match Raw::deserialize(deserializer)? {
		Raw::Number(seconds) => seconds,
		Raw::Text(text) =>
			text.trim().parse::<i64>().map_err(serde::de::Error::custom)?,
	};

	if seconds <= 0 {
		return Err(serde::de::Error::custom("expires_in must be positive"));
	}

	Ok(seconds)
}

/// [`TokenProvider`] implementing the client-credentials grant for one carrier.
///
/// The cached token lives behind an async mutex held across the whole acquire,
/// so overlapping cache misses serialize onto a single authentication round
/// trip instead of stampeding the token endpoint; the second caller observes
/// the first caller's fresh token.
pub struct ClientCredentialsProvider<T>
where
	T: ?Sized + CarrierTransport,
{
	credentials: Credentials,
	transport: Arc<T>,
	cache: AsyncMutex<Option<CachedToken>>,
}
impl<T> ClientCredentialsProvider<T>
where
	T: ?Sized + CarrierTransport,
{
	/// Creates a provider over the given transport and credentials.
	pub fn new(transport: impl Into<Arc<T>>, credentials: Credentials) -> Self {
		Self { credentials, transport: transport.into(), cache: AsyncMutex::new(None) }
	}

	async fn acquire(&self) -> Result<BearerToken> {
		const KIND: CallKind = CallKind::TokenExchange;

		let span = CallSpan::new(KIND, "access_token");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span.instrument(self.acquire_inner()).await;

		match &result {
			Ok(_) => obs::record_call_outcome(KIND, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(KIND, CallOutcome::Failure),
		}

		result
	}

	async fn acquire_inner(&self) -> Result<BearerToken> {
		let mut cache = self.cache.lock().await;
		let now = OffsetDateTime::now_utc();

		if let Some(cached) = cache.as_ref().filter(|cached| cached.is_valid_at(now)) {
			return Ok(cached.bearer());
		}

		let fresh = self.authenticate().await?;
		let bearer = fresh.bearer();

		*cache = Some(fresh);

		Ok(bearer)
	}

	async fn authenticate(&self) -> Result<CachedToken> {
		let envelope = RequestEnvelope::post(TOKEN_ENDPOINT_PATH)
			.header("Authorization", self.credentials.basic_header())
			.form([("grant_type", "client_credentials")]);
		let reply = self.transport.execute(envelope).await.map_err(|err| {
			Error::no_response("Carrier token endpoint was unreachable.", Some(Box::new(err)))
		})?;

		if !reply.is_success() {
			return Err(error::classify_auth_reply(reply.status, &reply.body));
		}

		let issued_at = OffsetDateTime::now_utc();
		let mut deserializer = serde_json::Deserializer::from_slice(&reply.body);
		// Fail fast on malformed success bodies instead of caching a partial token.
		let response: TokenResponse =
			serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
				Error::carrier_api(
					reply.status,
					"Carrier token response was malformed.",
					None,
					Some(Box::new(err)),
				)
			})?;
		// A huge expires_in would overflow the date range; that is as malformed
		// as a missing field and must not panic past this boundary.
		let expires_at = issued_at
			.checked_add(Duration::seconds(response.expires_in - SAFETY_BUFFER_SECONDS))
			.ok_or_else(|| {
				Error::carrier_api(
					reply.status,
					"Carrier token TTL is out of range.",
					None,
					None,
				)
			})?;

		Ok(CachedToken::new(BearerToken::new(response.access_token), expires_at))
	}
}
impl<T> TokenProvider for ClientCredentialsProvider<T>
where
	T: ?Sized + CarrierTransport,
{
	fn access_token(&self) -> AuthFuture<'_, Result<BearerToken>> {
		Box::pin(self.acquire())
	}

	fn clear_token(&self) -> AuthFuture<'_, ()> {
		Box::pin(async move {
			*self.cache.lock().await = None;
		})
	}
}
impl<T> Debug for ClientCredentialsProvider<T>
where
	T: ?Sized + CarrierTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentialsProvider")
			.field("credentials", &self.credentials)
			.finish()
	}
}
