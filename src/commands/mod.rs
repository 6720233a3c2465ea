pub mod context;
pub mod flag;
pub mod history;
pub mod once;
pub mod plan;
pub mod run;
pub mod single;
pub mod status;

// Re-export command functions for convenience
pub use flag::set_flag;
pub use history::history;
pub use once::once;
pub use plan::plan;
pub use run::run;
pub use single::single;
pub use status::status;
