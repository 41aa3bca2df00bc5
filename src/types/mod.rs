//! Request and response types passed between the client and its transport.

mod payload;
mod request;
mod response;

pub use payload::{FormPart, FormPayload, Payload};
pub use request::ApiRequest;
pub use response::{ApiResponse, ResponseBody, ResponseType};
