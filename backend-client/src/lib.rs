//! HTTP client for the FinSight reporting backend.
//!
//! Splits into the auth session (token lifecycle, refresh-and-retry) and
//! the typed endpoint surface (filter options, P&L pages, KPI summary,
//! hierarchy rollups). Token persistence sits behind [`TokenStore`]; the
//! engine never touches storage directly.

mod auth;
mod client;
mod error;
mod query;

pub use auth::AuthLifecycle;
pub use auth::AuthSession;
pub use auth::AuthTokens;
pub use auth::FileTokenStore;
pub use auth::MemoryTokenStore;
pub use auth::TokenStore;
pub use client::ApiClient;
pub use client::RESOURCE_PAGE_SIZE;
pub use error::ApiError;
pub use query::PnlQuery;
