// Core services
pub mod printing;
pub mod sales;
pub mod sequence;
pub mod taxes;
pub mod timbrados;
