//! One aggregation cycle: fetch → normalize → aggregate → persist → notify.

mod cycle;

pub use cycle::{run_cycle, CycleOptions, CycleOutcome};
