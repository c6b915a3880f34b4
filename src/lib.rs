pub mod aggregate;
pub mod charts;
pub mod dashboard;
pub mod datasets;
pub mod fetch;
pub mod load;
pub mod records;
pub mod reports;
