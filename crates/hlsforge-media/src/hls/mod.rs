//! HLS playlist generation.
//!
//! This module generates M3U8 playlists and the file names they reference.

mod naming;
mod playlist;

pub use naming::{SegmentName, VariantName};
pub use playlist::{MasterPlaylist, MediaPlaylist, SegmentEntry, StreamInfo, HLS_VERSION};
