pub mod core;
pub mod grading;
pub mod marks;
pub mod params;
pub mod reports;
pub mod setup;
