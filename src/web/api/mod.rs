pub mod error;
pub mod flight;
pub mod live;
pub mod pass;
pub mod tle;
