pub mod app;
pub mod draw;
pub mod photo;
pub mod pointer;
