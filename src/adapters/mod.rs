// Adapters layer: concrete implementations for external systems.

pub mod http;
pub mod storage;

pub use http::ChatCompletionsClient;
pub use storage::LocalStorage;
