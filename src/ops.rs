//! Operation capabilities and the carrier:operation registry.

pub mod rating;

pub use rating::*;

// self
use crate::_prelude::*;

/// Boxed future returned by [`Operation`] implementations.
pub type OperationFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a + Send>>;

/// Capability contract for one carrier+function pair.
///
/// Implementations validate their domain input before any network activity and
/// fail with [`crate::error::ErrorKind::Validation`] on malformed input, so
/// invalid calls have zero transport side effects. The trait is object safe so
/// heterogeneous capabilities can share one registry.
pub trait Operation
where
	Self: Send + Sync,
{
	/// Executes the operation over its JSON domain input, returning the JSON
	/// domain output.
	fn execute<'a>(
		&'a self,
		input: serde_json::Value,
	) -> OperationFuture<'a, Result<serde_json::Value>>;
}
impl Debug for dyn Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("dyn Operation")
	}
}

/// Key-to-capability lookup table, keyed `"{carrier}:{operation}"`.
#[derive(Clone, Default)]
pub struct OperationRegistry(Arc<RwLock<HashMap<String, Arc<dyn Operation>>>>);
impl OperationRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `operation` under `key`, silently overwriting any previous
	/// entry.
	pub fn register(&self, key: impl Into<String>, operation: Arc<dyn Operation>) {
		self.0.write().insert(key.into(), operation);
	}

	/// Resolves the capability registered under `key`.
	pub fn resolve(&self, key: &str) -> Result<Arc<dyn Operation>> {
		self.0.read().get(key).cloned().ok_or_else(|| Error::operation_not_found(key))
	}
}
impl Debug for OperationRegistry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let keys: Vec<String> = self.0.read().keys().cloned().collect();

		f.debug_tuple("OperationRegistry").field(&keys).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::ErrorKind;

	struct EchoOperation(&'static str);
	impl Operation for EchoOperation {
		fn execute<'a>(
			&'a self,
			input: serde_json::Value,
		) -> OperationFuture<'a, Result<serde_json::Value>> {
			let tag = self.0;

			Box::pin(async move { Ok(serde_json::json!({ "tag": tag, "input": input })) })
		}
	}

	#[tokio::test]
	async fn registry_resolves_registered_operations() {
		let registry = OperationRegistry::new();

		registry.register("ups:rating", Arc::new(EchoOperation("first")));

		let output = registry
			.resolve("ups:rating")
			.expect("Registered key should resolve.")
			.execute(serde_json::json!({ "x": 1 }))
			.await
			.expect("Echo operation should succeed.");

		assert_eq!(output["tag"], "first");
	}

	#[tokio::test]
	async fn register_overwrites_silently() {
		let registry = OperationRegistry::new();

		registry.register("ups:rating", Arc::new(EchoOperation("first")));
		registry.register("ups:rating", Arc::new(EchoOperation("second")));

		let output = registry
			.resolve("ups:rating")
			.expect("Overwritten key should resolve.")
			.execute(serde_json::Value::Null)
			.await
			.expect("Echo operation should succeed.");

		assert_eq!(output["tag"], "second");
	}

	#[test]
	fn resolve_miss_maps_operation_not_found() {
		let err = OperationRegistry::new()
			.resolve("ups:tracking")
			.expect_err("Unregistered key should miss.");

		assert_eq!(err.kind(), ErrorKind::OperationNotFound);
		assert_eq!(err.to_string(), "No operation is registered under `ups:tracking`.");
	}
}
