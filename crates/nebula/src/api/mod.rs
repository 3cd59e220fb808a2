//! HTTP API for the topology daemon
//!
//! # API Endpoints
//!
//! - `GET /api/topology` - current snapshot with `isLoading` and version
//! - `POST /api/topology/refresh` - run one fetch cycle now
//! - `GET /api/graph` - latest layout frame (503 before the first graph)
//! - `POST /api/graph/drag` - drag gesture, e.g. `{"phase":"move","id":"hermes","x":10,"y":20}`
//! - `GET /api/graph/nodes/:id` - backing record of a node
//! - `POST /api/graph/nodes/:id/select` - activate a node and return its backing record

pub mod errors;
pub mod handlers;
pub mod server;

pub use errors::ApiError;
pub use server::ApiServer;
