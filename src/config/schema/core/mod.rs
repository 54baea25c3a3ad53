mod env_overrides;
mod loader;
mod locale;
#[cfg(test)]
pub(super) mod test_env;
mod types;

pub use types::Config;
