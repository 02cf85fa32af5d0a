// Back office core for a home-cleaning business: price estimation, cached API reads and mutations

pub mod api;
pub mod booking;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod disbursement;
pub mod models;
pub mod mutation;
pub mod overview;
pub mod pricing;
pub mod query_cache;
pub mod query_key;
pub mod screen;
pub mod session;

// Re-export key types for convenience
pub use api::{ApiError, ApiRequest, ApiResponse, ClientConfig, ClientError, HttpTransport, Transport};
pub use booking::{BookingDraft, BookingValidationError, CreateBookingPayload};
pub use client::AdminClient;
pub use config::AppConfig;
pub use dashboard::{Dashboard, SubmitError};
pub use disbursement::{PayoutReport, ReportError};
pub use mutation::{MutationScope, MutationTracker};
pub use pricing::{
    derive_room_tier, BookingConfiguration, PriceBreakdown, RecurrencePlan, RoomTier, ServiceType,
};
pub use query_cache::{CacheConfig, CacheEntry, CacheStatsReport, QueryCache, QueryStatus, ReadOptions};
pub use query_key::{QueryKey, StatKind};
pub use screen::{DetailGate, ScreenScope};
pub use session::{Session, SessionState};
