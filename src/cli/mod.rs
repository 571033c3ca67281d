pub mod check;
pub mod ctl;
pub mod log;
pub mod serve;
