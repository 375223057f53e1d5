use tracing::{Instrument, trace_span};
use tracing_subscriber::{
    EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use tabwire::{
    Client, ClientConfig, Result,
    crypto::{Cipher, CryptoError},
};

mod execute;
mod auth;

/// Stand in for the service's symmetric cipher.
///
/// Returns the plaintext unchanged, only usable against a development service.
pub struct PlainCipher;

impl Cipher for PlainCipher {
    fn encrypt(&self, plaintext: &str, _: &str, _: &str) -> Result<String, CryptoError> {
        Ok(plaintext.to_owned())
    }

    fn decrypt(&self, ciphertext: &str, _: &str, _: &str) -> Result<String, CryptoError> {
        Ok(ciphertext.to_owned())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::Registry::default()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let client = Client::new(PlainCipher, ClientConfig::from_env());

    auth::main(&client).instrument(trace_span!("auth")).await?;
    execute::main(&client).instrument(trace_span!("execute")).await?;

    Ok(())
}
