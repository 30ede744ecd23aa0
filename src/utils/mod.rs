pub mod formatting;

pub use formatting::{
    file_name_component, format_series_date, format_series_time, round_to, PRECISION,
};
