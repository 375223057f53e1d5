use tabwire::{Client, Result, transport::HttpTransport};

use crate::PlainCipher;

pub async fn main(client: &Client<HttpTransport, PlainCipher>) -> Result<()> {
    let email = std::env::var("SERVICE_EMAIL").unwrap_or_else(|_| "admin@localhost".into());
    let password = std::env::var("SERVICE_PASSWORD").unwrap_or_default();

    let user = client.login(&email, &password).await?;
    tracing::info!(status = ?user.status, has_token = user.token.is_some(), "login");

    let code = client.join_access_code(&email).await?;
    tracing::info!(len = code.len(), "join access code");

    Ok(())
}
