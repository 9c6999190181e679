pub mod countrymap;
pub mod log;
pub mod utils;
