pub mod app;
pub mod contexts;
pub mod env;
pub mod participants;
pub mod runtime;
pub mod telemetry;

pub use app::run;
pub use env::CliArgs;
