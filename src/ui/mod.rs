pub mod charts;
pub mod panels;
pub mod pie;
pub mod table;
