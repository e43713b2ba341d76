// Domain value types shared by entities, services and handlers
pub mod sale;
