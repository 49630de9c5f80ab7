//! Authenticated request executor with the bounded 401 retry protocol.
//!
//! Every outbound call carries a bearer token from the [`TokenProvider`]
//! capability. A 401 on the first attempt triggers exactly one token clear +
//! re-acquire + retried transport call; a second 401 surfaces as an
//! authentication failure, so intermediate 401s stay invisible to callers. The
//! retry budget is exactly one, never more.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{BearerToken, TokenProvider},
	error::{self, TransportError},
	http::{CarrierTransport, RequestEnvelope, TransportReply},
	obs::{self, CallKind, CallOutcome, CallSpan},
};

/// Typed outcome of one transport attempt. Kept explicit so the retry budget is
/// a visible state transition instead of nested handlers.
#[derive(Debug)]
enum AttemptFailure {
	/// Carrier answered with a non-success status.
	Status(TransportReply),
	/// No carrier response was received.
	NoResponse(TransportError),
}

/// Generic transport wrapper guaranteeing a valid bearer token on every call.
///
/// The executor holds no authentication state itself, only a reference to the
/// capability that provides it; the retried attempt runs through the same
/// transport and therefore gets a fresh full timeout budget.
pub struct AuthenticatedExecutor<T>
where
	T: ?Sized + CarrierTransport,
{
	transport: Arc<T>,
	token_provider: Arc<dyn TokenProvider>,
}
impl<T> AuthenticatedExecutor<T>
where
	T: ?Sized + CarrierTransport,
{
	/// Creates an executor over the transport and token capability.
	pub fn new(transport: impl Into<Arc<T>>, token_provider: Arc<dyn TokenProvider>) -> Self {
		Self { transport: transport.into(), token_provider }
	}

	/// Executes `envelope` with a valid bearer token and decodes the JSON
	/// response body, retrying exactly once on HTTP 401.
	///
	/// Shape validation of the decoded body beyond JSON well-formedness is the
	/// caller's responsibility.
	pub async fn request<R>(&self, envelope: RequestEnvelope) -> Result<R>
	where
		R: DeserializeOwned,
	{
		const KIND: CallKind = CallKind::CarrierRequest;

		let span = CallSpan::new(KIND, "request");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span.instrument(self.request_inner(envelope)).await;

		match &result {
			Ok(_) => obs::record_call_outcome(KIND, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(KIND, CallOutcome::Failure),
		}

		result
	}

	async fn request_inner<R>(&self, envelope: RequestEnvelope) -> Result<R>
	where
		R: DeserializeOwned,
	{
		let token = self.token_provider.access_token().await?;

		match self.attempt(&envelope, &token).await {
			Ok(reply) => decode(reply),
			Err(AttemptFailure::Status(reply)) if reply.status == 401 =>
				self.retry(envelope).await,
			Err(failure) => Err(classify_failure(failure)),
		}
	}

	/// Second and final attempt after an initial 401: clear the cached token,
	/// force re-authentication, and run the call exactly once more.
	async fn retry<R>(&self, envelope: RequestEnvelope) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.token_provider.clear_token().await;

		let token = self.token_provider.access_token().await?;

		match self.attempt(&envelope, &token).await {
			Ok(reply) => decode(reply),
			Err(AttemptFailure::Status(reply)) if reply.status == 401 => Err(Error::authentication(
				"Authentication failed after token refresh.",
				Some(reply.status),
				None,
				Some(Box::new(error::classify_reply(reply.status, &reply.body))),
			)),
			Err(failure) => Err(classify_failure(failure)),
		}
	}

	async fn attempt(
		&self,
		envelope: &RequestEnvelope,
		token: &BearerToken,
	) -> Result<TransportReply, AttemptFailure> {
		// Caller-supplied headers survive the merge; only Authorization is owned here.
		let authorized = envelope.clone().header("Authorization", token.header_value());

		match self.transport.execute(authorized).await {
			Ok(reply) if reply.is_success() => Ok(reply),
			Ok(reply) => Err(AttemptFailure::Status(reply)),
			Err(err) => Err(AttemptFailure::NoResponse(err)),
		}
	}
}
impl<T> Debug for AuthenticatedExecutor<T>
where
	T: ?Sized + CarrierTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("AuthenticatedExecutor(..)")
	}
}

fn classify_failure(failure: AttemptFailure) -> Error {
	match failure {
		AttemptFailure::Status(reply) => error::classify_reply(reply.status, &reply.body),
		AttemptFailure::NoResponse(err) =>
			Error::no_response("Carrier endpoint was unreachable.", Some(Box::new(err))),
	}
}

fn decode<R>(reply: TransportReply) -> Result<R>
where
	R: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(&reply.body);

	serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
		Error::malformed_reply("Carrier response body could not be decoded.", Some(Box::new(err)))
	})
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::VecDeque;
	// crates.io
	use parking_lot::Mutex;
	use serde_json::{Value, json};
	// self
	use super::*;
	use crate::{
		auth::AuthFuture,
		error::{ErrorKind, NO_RESPONSE_STATUS},
		http::TransportFuture,
	};

	#[derive(Default)]
	struct ScriptedTransport {
		replies: Mutex<VecDeque<Result<TransportReply, TransportError>>>,
		seen: Mutex<Vec<RequestEnvelope>>,
	}
	impl ScriptedTransport {
		fn push_status(&self, status: u16, body: &str) {
			self.replies
				.lock()
				.push_back(Ok(TransportReply { status, body: body.as_bytes().to_vec() }));
		}

		fn push_no_response(&self) {
			self.replies.lock().push_back(Err(TransportError::network(std::io::Error::new(
				std::io::ErrorKind::ConnectionReset,
				"connection reset",
			))));
		}

		fn seen(&self) -> Vec<RequestEnvelope> {
			self.seen.lock().clone()
		}
	}
	impl CarrierTransport for ScriptedTransport {
		fn execute<'a>(
			&'a self,
			envelope: RequestEnvelope,
		) -> TransportFuture<'a, Result<TransportReply, TransportError>> {
			self.seen.lock().push(envelope);

			let reply = self
				.replies
				.lock()
				.pop_front()
				.expect("Scripted transport should not run out of replies.");

			Box::pin(async move { reply })
		}
	}

	#[derive(Default)]
	struct ScriptedProvider {
		tokens: Mutex<VecDeque<Result<BearerToken>>>,
		cleared: Mutex<usize>,
	}
	impl ScriptedProvider {
		fn push_token(&self, value: &str) {
			self.tokens.lock().push_back(Ok(BearerToken::new(value)));
		}

		fn push_error(&self, error: Error) {
			self.tokens.lock().push_back(Err(error));
		}

		fn cleared(&self) -> usize {
			*self.cleared.lock()
		}
	}
	impl TokenProvider for ScriptedProvider {
		fn access_token(&self) -> AuthFuture<'_, Result<BearerToken>> {
			let token = self
				.tokens
				.lock()
				.pop_front()
				.expect("Scripted provider should not run out of tokens.");

			Box::pin(async move { token })
		}

		fn clear_token(&self) -> AuthFuture<'_, ()> {
			*self.cleared.lock() += 1;

			Box::pin(async {})
		}
	}

	fn build_executor() -> (
		AuthenticatedExecutor<ScriptedTransport>,
		Arc<ScriptedTransport>,
		Arc<ScriptedProvider>,
	) {
		let transport = Arc::new(ScriptedTransport::default());
		let provider = Arc::new(ScriptedProvider::default());
		let token_provider: Arc<dyn TokenProvider> = provider.clone();
		let executor = AuthenticatedExecutor::new(transport.clone(), token_provider);

		(executor, transport, provider)
	}

	#[tokio::test]
	async fn retries_once_on_401_with_fresh_token() {
		let (executor, transport, provider) = build_executor();

		provider.push_token("tok_stale");
		provider.push_token("tok_fresh");
		transport.push_status(401, "");
		transport.push_status(200, r#"{"payload":"retry"}"#);

		let envelope = RequestEnvelope::post("/api/data").header("X-Trace", "abc");
		let value: Value = executor
			.request(envelope)
			.await
			.expect("Retry with a fresh token should succeed.");

		assert_eq!(value, json!({ "payload": "retry" }));
		assert_eq!(provider.cleared(), 1);

		let seen = transport.seen();

		assert_eq!(seen.len(), 2);
		assert_eq!(
			seen[1].headers.get("Authorization").map(String::as_str),
			Some("Bearer tok_fresh"),
		);
		// Envelope headers survive the Authorization merge on both attempts.
		assert_eq!(seen[0].headers.get("X-Trace").map(String::as_str), Some("abc"));
		assert_eq!(seen[1].headers.get("X-Trace").map(String::as_str), Some("abc"));
	}

	#[tokio::test]
	async fn two_consecutive_401s_surface_authentication_without_a_third_attempt() {
		let (executor, transport, provider) = build_executor();

		provider.push_token("tok_a");
		provider.push_token("tok_b");
		transport.push_status(401, "");
		transport.push_status(401, "");

		let err = executor
			.request::<Value>(RequestEnvelope::get("/api/data"))
			.await
			.expect_err("Double 401 should fail.");

		assert_eq!(err.kind(), ErrorKind::Authentication);
		assert_eq!(err.status(), Some(401));
		assert!(std::error::Error::source(&err).is_some());
		assert_eq!(transport.seen().len(), 2);
		assert_eq!(provider.cleared(), 1);
	}

	#[tokio::test]
	async fn retry_failure_with_another_status_is_classified() {
		let (executor, transport, provider) = build_executor();

		provider.push_token("tok_a");
		provider.push_token("tok_b");
		transport.push_status(401, "");
		transport.push_status(503, "");

		let err = executor
			.request::<Value>(RequestEnvelope::get("/api/data"))
			.await
			.expect_err("Retry 503 should fail.");

		assert_eq!(err.kind(), ErrorKind::CarrierApi);
		assert_eq!(err.status(), Some(503));
		assert_eq!(transport.seen().len(), 2);
	}

	#[tokio::test]
	async fn maps_429_to_rate_limit() {
		let (executor, transport, provider) = build_executor();

		provider.push_token("tok");
		transport.push_status(429, r#"{"response":{"errors":[{"code":"429","message":"Too many requests"}]}}"#);

		let err = executor
			.request::<Value>(RequestEnvelope::get("/api/data"))
			.await
			.expect_err("429 should fail.");

		assert_eq!(err.kind(), ErrorKind::RateLimit);
		assert_eq!(err.status(), Some(429));
		assert_eq!(err.to_string(), "Too many requests");
	}

	#[tokio::test]
	async fn maps_other_statuses_to_carrier_api() {
		let (executor, transport, provider) = build_executor();

		provider.push_token("tok");
		transport.push_status(500, "");

		let err = executor
			.request::<Value>(RequestEnvelope::get("/api/data"))
			.await
			.expect_err("500 should fail.");

		assert_eq!(err.kind(), ErrorKind::CarrierApi);
		assert_eq!(err.status(), Some(500));
	}

	#[tokio::test]
	async fn maps_missing_response_to_status_zero() {
		let (executor, transport, provider) = build_executor();

		provider.push_token("tok");
		transport.push_no_response();

		let err = executor
			.request::<Value>(RequestEnvelope::get("/api/data"))
			.await
			.expect_err("Network failure should fail.");

		assert_eq!(err.kind(), ErrorKind::CarrierApi);
		assert_eq!(err.status(), Some(NO_RESPONSE_STATUS));
		assert!(std::error::Error::source(&err).is_some());
	}

	#[tokio::test]
	async fn propagates_token_provider_errors_without_a_transport_call() {
		let (executor, transport, provider) = build_executor();

		provider.push_error(Error::authentication("Bad credentials.", Some(401), None, None));

		let err = executor
			.request::<Value>(RequestEnvelope::get("/api/data"))
			.await
			.expect_err("Provider failure should propagate.");

		assert_eq!(err.kind(), ErrorKind::Authentication);
		assert!(transport.seen().is_empty());
	}

	#[tokio::test]
	async fn undecodable_success_body_maps_to_status_zero() {
		let (executor, transport, provider) = build_executor();

		provider.push_token("tok");
		transport.push_status(200, "not-json");

		let err = executor
			.request::<Value>(RequestEnvelope::get("/api/data"))
			.await
			.expect_err("Undecodable body should fail.");

		assert_eq!(err.kind(), ErrorKind::CarrierApi);
		assert_eq!(err.status(), Some(NO_RESPONSE_STATUS));
	}
}
