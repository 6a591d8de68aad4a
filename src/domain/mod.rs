pub mod categories;
pub mod models;
pub mod ordering;
pub mod survey;
