//! HTTP API for the tax engine.
//!
//! A thin JSON surface over the orchestrator and the compensation engine:
//!
//! - `POST /calculate` - one item
//! - `POST /calculate/batch` - many items, aborting on the first failure
//! - `POST /compensation` - cross-system credit compensation
//! - `GET /engines/:date` - the engine and tax period of a date

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{BatchRequest, CompensationRequest};
pub use response::{ApiError, ApiErrorResponse, EngineInfo};
pub use state::AppState;
