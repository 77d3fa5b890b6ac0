use chrono::{DateTime, FixedOffset, NaiveDate};

/// Invalid option or option combination. Always fatal to the call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Timestep must be positive, got {0} minutes")]
    ZeroTimestep(u32),

    #[error("Tolerance of {tolerance} minutes exceeds half of the {timestep} minute timestep")]
    ToleranceTooLarge { tolerance: u32, timestep: u32 },

    #[error("Completeness threshold must be within [0, 1], got {0}")]
    CompletenessThreshold(f64),

    #[error("Anemometer height must be positive, got {0} m")]
    AnemometerHeight(f64),

    #[error("Depth must be positive, got {0} m")]
    Depth(f64),

    #[error("Unsupported combine mode: {0}")]
    CombineMode(String),

    #[error("Unsupported decomposition type: {0}")]
    DecompositionType(String),

    #[error("Unsupported centering: {0}")]
    Centering(String),

    #[error("Invalid value for {var}: {value}")]
    EnvValue { var: &'static str, value: String },
}

/// Input does not satisfy the contract of the operation. Fatal to the call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Table has no rows")]
    EmptyTable,

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Column {column} has {actual} values, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Timestamps not strictly increasing at row {row}")]
    UnorderedTimestamps { row: usize },

    #[error("Table has not been placed on a regular time grid")]
    NotRegularized,

    #[error("Invalid station code: {0}")]
    StationCode(String),

    #[error("Unknown reserve for station code: {0}")]
    UnknownReserve(String),

    #[error("Station {station} is on UTC{expected:+} standard time, not UTC{actual:+}")]
    OffsetMismatch {
        station: String,
        expected: i32,
        actual: i32,
    },

    #[error("Anchor table is on a {actual} minute grid, expected {expected}")]
    GridStepMismatch { expected: u32, actual: u32 },

    #[error("Anchor station {0} is not among the combined tables")]
    AnchorAbsent(String),

    #[error("At least two tables are required to combine, got {0}")]
    TooFewTables(usize),

    #[error("Tables do not overlap: latest start {start} is after earliest end {end}")]
    EmptyIntersection {
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    },

    #[error("Category {0} appears more than once among the combined tables")]
    DuplicateCategory(String),

    #[error("Parameter column {0} appears in more than one table")]
    ColumnCollision(String),

    #[error("Timestamp {0} lies outside the solar boundary range")]
    OutsideSolarRange(DateTime<FixedOffset>),

    #[error("No {event} on {date} at latitude {latitude}")]
    NoSunEvent {
        event: &'static str,
        date: NaiveDate,
        latitude: f64,
    },

    #[error("Series is not monthly: {0}")]
    NotMonthly(String),

    #[error("Multiplicative decomposition needs positive values, got {value} for {date}")]
    NonPositive { date: NaiveDate, value: f64 },
}

/// Crate-level error returned by the pipeline entry points and the binary.
#[derive(Debug, thiserror::Error)]
pub enum SwmpError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
