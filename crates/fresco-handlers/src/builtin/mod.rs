mod condition;
mod http;
mod iterate;
mod transform;

pub use condition::ConditionHandler;
pub use http::HttpHandler;
pub use iterate::LoopHandler;
pub use transform::TransformHandler;
