//! Interactive terminal board

mod app;
mod view;

pub use app::run;
