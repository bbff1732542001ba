//! Model-service implementations: the Anthropic Messages API client used in
//! production and a scripted mock used by tests.

pub mod anthropic;
pub mod mock;

pub use anthropic::AnthropicClient;
pub use mock::MockModelService;
