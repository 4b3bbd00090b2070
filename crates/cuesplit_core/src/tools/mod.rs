//! External tool adapter.
//!
//! Every piece of audio work is delegated to a subprocess: ffmpeg cuts and
//! encodes, ffprobe inspects the source image, rsgain computes ReplayGain.
//! Commands are typed [`ToolCommand`] values run through a [`ToolRunner`],
//! so the pipeline can be driven by a fake runner in tests.

mod command;
pub mod ffmpeg;
pub mod probe;
pub mod rsgain;
mod runner;

pub use command::ToolCommand;
pub use probe::{probe_media, MediaInfo, ProbeError};
pub use runner::{ProcessRunner, ToolError, ToolOutput, ToolRunner};
