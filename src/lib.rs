//! Client for models published on Datature Hub.
//!
//! A [`HubModel`] resolves a model key against the hub registry, then
//! downloads, verifies and unpacks the artifact into `<hub root>/<model key>`.
//! A failed download never leaves a partially populated directory behind.

pub mod config;
pub mod error;
pub mod hub;

pub use config::HubConfig;
pub use error::{HubError, Result};
pub use hub::{
    HubModel, InputDimensions, Label, LabelMap, ModelType, Population, RegistryClient,
    ResolvedSource,
};
