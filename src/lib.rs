//! Satellite pass prediction: when a satellite next rises over an observer,
//! where it is now, and the ground track of a past flight.

pub mod config;
pub mod predict;
pub mod web;
