//! Vehicle picker and trip CO₂ estimator.
//!
//! A [`data::model::VehicleTable`] is loaded once, a [`session::Session`]
//! walks a [`profile::DatasetProfile`]'s cascading field order over it, and
//! [`estimate::estimate`] turns the resolved record into trip figures.

pub mod data;
pub mod estimate;
pub mod profile;
pub mod session;
