//! Facebook page and Instagram publishing over the Graph API.

pub mod api;
pub mod publisher;
pub mod rate_limiter;

#[cfg(test)]
mod tests;

pub use api::{GraphApiClient, PhotoNode};
pub use publisher::{resolve_image_path, Publisher, SocialPublisher};
pub use rate_limiter::{RateLimitConfig, RateLimiter};
