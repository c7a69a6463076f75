pub mod dedupe;
pub mod normalize;

pub use dedupe::dedupe;
pub use normalize::{normalize, normalize_label, Collapse};
