//! Availarr - streaming-availability tags for Radarr
//!
//! Reconciles a Radarr library against TMDB watch-provider data, keeping a
//! managed tag on each movie for every tracked streaming service that
//! currently carries it. This library crate exposes the core functionality
//! for integration testing.

pub mod config;
pub mod engine;
pub mod error;
pub mod radarr;
pub mod tags;
pub mod tmdb;
