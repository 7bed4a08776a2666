//! hlsforge - On-the-fly HLS packaging of MP4 sources
//!
//! Serves master playlists, variant playlists and MPEG-TS segments for MP4
//! files on disk or behind an HTTP origin without preprocessing them. The
//! media work itself lives in `hlsforge-media`; this crate adds the source
//! readers, configuration, metadata cache and HTTP server.

pub mod cache;
pub mod config;
pub mod discovery;
pub mod server;
pub mod service;
pub mod source;
pub mod urls;
