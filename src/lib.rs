//! Reconciles municipal parcel and building-permit records and counts
//! housing units against RHNA housing-element cycles.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
