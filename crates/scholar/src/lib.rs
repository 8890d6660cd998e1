pub mod display;
pub mod errors;
pub mod models;
pub mod pipeline;
pub mod prompt_template;
pub mod protocol;
pub mod providers;
