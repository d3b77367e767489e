mod amp_compare;
mod scan;

pub use amp_compare::run_amp_compare;
pub use scan::run_scan;
