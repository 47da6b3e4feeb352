//! Supporting services: token signing, geocoding, email delivery.

pub mod email;
pub mod geocoder;
pub mod token;

pub use email::EmailService;
pub use geocoder::{GeoLocation, Geocoder};
pub use token::TokenService;
