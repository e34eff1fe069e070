pub mod plots;
pub mod report;
pub mod writer;

pub use writer::{ArtifactWriter, FsArtifactWriter};
