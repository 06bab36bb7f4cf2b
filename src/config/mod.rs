pub mod loader;
pub mod resolved;
pub mod schema;

pub use loader::{load_config_from_path, load_from_path, load_from_str, ConfigError};
pub use resolved::Config;
pub use schema::{
    DirMapping, NameMapping, Profile, RewriteSpec, ValidationError, ValidationIssue,
};
