pub mod config;
pub mod decompose;
pub mod error;
pub mod io;
pub mod metab_day;
pub mod metabolism;
pub mod organize;
pub mod parameters;
pub mod physics;
pub mod solar;
pub mod station;
pub mod table;

pub use config::ProcessingOptions;
pub use error::{ConfigurationError, SwmpError, ValidationError};
pub use metabolism::{ecometab, MetabolismFlag, MetabolismRecord, MetabolismTable};
pub use station::StationDescriptor;
pub use table::{Column, ObservationTable};
