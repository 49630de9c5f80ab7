//! UPS rating capability: domain validation, wire mapping, response parsing.
//!
//! The capability validates its domain input before any network activity, builds
//! the carrier wire request, executes it through the authenticated executor, and
//! parses the carrier response into domain rate quotes. Field-level mapping is
//! deliberately thin; the carrier wire format stays behind this module.

// self
use crate::{
	_prelude::*,
	executor::AuthenticatedExecutor,
	http::{CarrierTransport, RequestEnvelope},
	obs::{self, CallKind, CallOutcome, CallSpan},
	ops::{Operation, OperationFuture},
};

/// Rating API version segment in the carrier path.
pub const RATING_VERSION: &str = "v2409";

/// Rating request options supported by the carrier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestOption {
	/// Rates one specific service.
	Rate,
	/// Rates all applicable services.
	#[default]
	Shop,
	/// Rates one service with time-in-transit data.
	Ratetimeintransit,
	/// Rates all services with time-in-transit data.
	Shoptimeintransit,
}
impl RequestOption {
	/// Returns the carrier path segment for this option.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestOption::Rate => "Rate",
			RequestOption::Shop => "Shop",
			RequestOption::Ratetimeintransit => "Ratetimeintransit",
			RequestOption::Shoptimeintransit => "Shoptimeintransit",
		}
	}
}
impl Display for RequestOption {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Domain rate lookup input.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateRequest {
	/// Origin postal code.
	pub shipper_postal_code: String,
	/// Destination postal code.
	pub recipient_postal_code: String,
	/// Package weight in the carrier's default unit.
	pub weight: f64,
	/// Rating mode; defaults to shopping all services.
	#[serde(default)]
	pub request_option: RequestOption,
}
impl RateRequest {
	/// Structural pre-flight checks; failures never reach the transport.
	pub fn validate(&self) -> Result<()> {
		if self.shipper_postal_code.trim().is_empty() {
			return Err(Error::validation("Shipper postal code must not be empty."));
		}
		if self.recipient_postal_code.trim().is_empty() {
			return Err(Error::validation("Recipient postal code must not be empty."));
		}
		if !self.weight.is_finite() || self.weight <= 0.0 {
			return Err(Error::validation("Package weight must be a positive number."));
		}

		Ok(())
	}

	fn wire_body(&self) -> serde_json::Value {
		serde_json::json!({
			"RateRequest": {
				"Shipment": {
					"Shipper": { "Address": { "PostalCode": self.shipper_postal_code } },
					"ShipTo": { "Address": { "PostalCode": self.recipient_postal_code } },
					"Package": {
						"PackagingType": { "Code": "02" },
						"PackageWeight": { "Weight": self.weight.to_string() },
					},
				},
			},
		})
	}
}

/// One rated service returned by the carrier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateQuote {
	/// Carrier service code.
	pub service_code: String,
	/// Total charge amount as reported by the carrier.
	pub total_charges: String,
	/// Currency of the total charge.
	pub currency: String,
}

/// Rating capability for one carrier account, executing through the
/// authenticated executor.
pub struct RatingOperation<T>
where
	T: ?Sized + CarrierTransport,
{
	executor: AuthenticatedExecutor<T>,
}
impl<T> RatingOperation<T>
where
	T: ?Sized + CarrierTransport,
{
	/// Registry key conventionally used for this capability.
	pub const REGISTRY_KEY: &'static str = "ups:rating";

	/// Creates the capability over an authenticated executor.
	pub fn new(executor: AuthenticatedExecutor<T>) -> Self {
		Self { executor }
	}

	/// Validates `request`, calls the carrier rating endpoint, and parses the
	/// returned quotes.
	pub async fn fetch_rates(&self, request: &RateRequest) -> Result<Vec<RateQuote>> {
		const KIND: CallKind = CallKind::Rating;

		request.validate()?;

		let span = CallSpan::new(KIND, "fetch_rates");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span.instrument(self.fetch_rates_inner(request)).await;

		match &result {
			Ok(_) => obs::record_call_outcome(KIND, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(KIND, CallOutcome::Failure),
		}

		result
	}

	async fn fetch_rates_inner(&self, request: &RateRequest) -> Result<Vec<RateQuote>> {
		let path = format!("/api/rating/{RATING_VERSION}/{}", request.request_option);
		let envelope = RequestEnvelope::post(path).json(request.wire_body());
		let response: serde_json::Value = self.executor.request(envelope).await?;

		parse_quotes(&response)
	}
}
impl<T> Operation for RatingOperation<T>
where
	T: ?Sized + CarrierTransport,
{
	fn execute<'a>(
		&'a self,
		input: serde_json::Value,
	) -> OperationFuture<'a, Result<serde_json::Value>> {
		Box::pin(async move {
			let request: RateRequest = serde_json::from_value(input)
				.map_err(|err| Error::validation(format!("Malformed rate request: {err}.")))?;
			let quotes = self.fetch_rates(&request).await?;

			serde_json::to_value(quotes).map_err(|err| {
				Error::malformed_reply("Rate quotes could not be serialized.", Some(Box::new(err)))
			})
		})
	}
}
impl<T> Debug for RatingOperation<T>
where
	T: ?Sized + CarrierTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("RatingOperation(..)")
	}
}

fn parse_quotes(response: &serde_json::Value) -> Result<Vec<RateQuote>> {
	let rated = response.pointer("/RateResponse/RatedShipment").ok_or_else(|| {
		Error::malformed_reply("Carrier rating response is missing RatedShipment.", None)
	})?;
	// Single-service responses arrive as an object, shopped responses as a list.
	let shipments: Vec<&serde_json::Value> = match rated {
		serde_json::Value::Array(items) => items.iter().collect(),
		other => vec![other],
	};

	shipments.into_iter().map(parse_quote).collect()
}

fn parse_quote(shipment: &serde_json::Value) -> Result<RateQuote> {
	Ok(RateQuote {
		service_code: field_at(shipment, "/Service/Code")?,
		total_charges: field_at(shipment, "/TotalCharges/MonetaryValue")?,
		currency: field_at(shipment, "/TotalCharges/CurrencyCode")?,
	})
}

fn field_at(value: &serde_json::Value, pointer: &str) -> Result<String> {
	value
		.pointer(pointer)
		.and_then(serde_json::Value::as_str)
		.map(str::to_owned)
		.ok_or_else(|| {
			Error::malformed_reply(format!("Carrier rating response is missing {pointer}."), None)
		})
}
