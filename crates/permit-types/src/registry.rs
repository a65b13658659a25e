//! Registry trait for named, configurable implementations.

/// Ties an implementation to the name it is selected by in configuration.
///
/// Key providers and endpoint selectors each expose a `Registry` type
/// implementing this trait, for example:
/// - "local" for `[account.erc20] implementation = "local"`
/// - "latency" for `[rpc] selector = "latency"`
pub trait ImplementationRegistry {
	/// The configuration name of the implementation.
	const NAME: &'static str;

	/// The factory function type the owning crate defines.
	type Factory;

	/// Returns the factory that builds the implementation from its config block.
	fn factory() -> Self::Factory;
}
