//! Boundary contracts: records, the HTTP capability and the notification sink.

mod cache;
pub mod http;
pub mod notify;
pub mod types;

pub use http::{ApiRequest, HttpClient, Method, RestClient};
pub use notify::{Notifier, NotifyKind, SilentNotifier, TracingNotifier};
