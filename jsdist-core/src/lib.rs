#![doc = "jsdist-core: core pipeline library for jsdist."]

//! This crate contains the build and release logic for the distributable
//! variants of a client-side JavaScript library: version resolution, variant
//! assembly, the compressor and documentation-generator contracts, docs
//! copying, zip archiving and the release orchestration that ties them together.
//!
//! # Usage
//! The `jsdist` CLI crate loads a [`config::ReleaseConfig`] and hands it, along
//! with concrete [`contract::Compressor`] and [`contract::DocGenerator`]
//! implementations, to [`release::release`] or [`release::build`].

pub mod archive;
pub mod assemble;
pub mod compress;
pub mod config;
pub mod contract;
pub mod docs;
pub mod error;
pub mod release;
pub mod version;

pub use error::{ReleaseError, Step};
