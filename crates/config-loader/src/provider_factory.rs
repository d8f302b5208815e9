use crate::tokens::{CommandTokenProvider, EnvTokenProvider, FileTokenProvider, TokenProvider};
use crate::TokenSource;
use std::sync::Arc;

pub struct TokenProviderFactory;

impl TokenProviderFactory {
    /// Build the provider described by a config `token` section.
    pub fn create(source: &TokenSource) -> Arc<dyn TokenProvider> {
        match source {
            TokenSource::Env { var } => Arc::new(EnvTokenProvider::new(var.clone())),
            TokenSource::File { path } => Arc::new(FileTokenProvider::new(path.clone())),
            TokenSource::Command { program, args } => {
                Arc::new(CommandTokenProvider::new(program.clone(), args.clone()))
            }
        }
    }

    /// Provider used when no config is present: `POLICY_CONSOLE_TOKEN`.
    pub fn create_default() -> Arc<dyn TokenProvider> {
        Self::create(&TokenSource::default())
    }
}
