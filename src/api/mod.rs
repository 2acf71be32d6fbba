//! REST client for the care backend.
//!
//! Transport seam, envelope decoding, the error taxonomy and the typed
//! client built on top of them.

pub mod client;
pub mod envelope;
pub mod error;
pub mod transport;

pub use client::CareApiClient;
pub use envelope::Ack;
pub use error::{ApiError, FailureKind};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, MockTransport, RecordedRequest, ReqwestTransport};
