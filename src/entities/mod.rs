pub mod daily_counter;
pub mod sale;
pub mod timbrado;
