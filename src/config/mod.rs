pub mod parser;
pub mod types;

pub use parser::{load_config, parse_config_file, parse_config_str};
pub use types::*;
