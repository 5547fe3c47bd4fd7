//! Command implementations for gia.

pub mod closest;
pub mod complement;
pub mod coverage;
pub mod intersect;
pub mod jaccard;
pub mod map;
pub mod merge;
pub mod random;
pub mod subtract;
pub mod window;

pub use closest::ClosestCommand;
pub use complement::ComplementCommand;
pub use coverage::CoverageCommand;
pub use intersect::IntersectCommand;
pub use jaccard::{JaccardCommand, JaccardStats};
pub use map::MapCommand;
pub use merge::MergeCommand;
pub use random::{RandomCommand, ShuffleCommand};
pub use subtract::SubtractCommand;
pub use window::WindowCommand;
