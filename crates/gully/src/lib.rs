pub mod agent;
pub mod capabilities;
pub mod errors;
pub mod models;
pub mod prompt_template;
pub mod providers;
