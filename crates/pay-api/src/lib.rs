//! # pay-api
//!
//! HTTP API for hosted checkout and payment webhooks.
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/` | Greeting |
//! | GET | `/health` | Health check |
//! | GET | `/api/hello` | JSON greeting |
//! | POST | `/api/create-checkout-session` | Create checkout session |
//! | POST | `/api/webhook` | Stripe webhook |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
