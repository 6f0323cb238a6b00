//! Outgoing calls: HTTP transport, the API gateway and the domain services.

pub mod data_source;
pub mod fixtures;
pub mod gateway;
pub mod services;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;

pub use data_source::{DataSource, Resolved, SourceResolver};
pub use gateway::{ApiCall, ApiGateway, TokenSource, UnauthorizedHandler};
pub use services::Services;
pub use transport::{HttpTransport, OfflineTransport, ReqwestTransport};
