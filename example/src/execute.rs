use serde::{Deserialize, Serialize};
use tabwire::{
    Client, Command, FromRow, ParamBinding, Result, ServiceRequest, ValueKind,
    transport::HttpTransport, types::Json,
};

use crate::PlainCipher;

#[derive(Debug, Serialize, Deserialize)]
struct Settings {
    theme: String,
}

#[derive(Debug, FromRow)]
struct User {
    id: i32,
    name: String,
    settings: Option<Json<Settings>>,
}

pub async fn main(client: &Client<HttpTransport, PlainCipher>) -> Result<()> {
    let token = std::env::var("SERVICE_USER_TOKEN").unwrap_or_default();

    // master insert feeds its generated id into every detail row
    let insert = Command::procedure("main", "usp_insert_user")
        .param("id", ParamBinding::new(ValueKind::Int32).chain_to("settings", "user_id"))
        .param("name", ParamBinding::new(ValueKind::String).size(50))
        .values([("name", "foo")]);

    let settings = Command::procedure("main", "usp_insert_settings")
        .param("user_id", ParamBinding::new(ValueKind::Int32))
        .param("settings", ParamBinding::new(ValueKind::Json))
        .values([("settings", Json(Settings { theme: "dark".into() }))])
        .values([("settings", Json(Settings { theme: "light".into() }))]);

    let request = ServiceRequest::new("UserService")
        .transaction("insert-user")
        .token(&token)
        .command("insert", insert)
        .command("settings", settings);

    client.execute(&request).await?;

    let select = ServiceRequest::new("UserService")
        .token(&token)
        .command("users", Command::new("main", "select id, name, settings from users"));

    let Some(mut data) = client.execute(&select).await? else {
        tracing::info!("no user");
        return Ok(());
    };

    if let Some(table) = data.take_table("users") {
        for user in table.decode_rows::<User>()? {
            tracing::info!(?user);
        }
    }

    Ok(())
}
