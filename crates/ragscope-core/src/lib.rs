pub mod format;
pub mod partition;
pub mod transcript;
pub mod types;
pub mod view;

pub use partition::{
    compute_interactions, compute_setup_range, slice, Block, EventRange, Interaction, Partition,
};
pub use transcript::{Transcript, Turn};
pub use types::*;
