//! Pipeline step implementations.
//!
//! Each step handles one stage of a track job: Extract, Tag, Analyze.

mod analyze;
mod extract;
mod tag;

pub use analyze::AnalyzeStep;
pub use extract::ExtractStep;
pub use tag::TagStep;
