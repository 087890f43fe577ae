//! Core library modules for facility-matrix
//!
//! This module contains the internal implementation details of the facility-matrix library.

pub mod boundary;
pub mod builder;
pub mod checkpoint;
pub mod classifier;
pub mod client;
pub mod config;
pub mod coords;
pub mod error;
pub mod grid;
pub mod matrix;
pub mod plants;

