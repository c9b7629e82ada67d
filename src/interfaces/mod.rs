pub mod csv;
pub mod plugin;
pub mod script;
