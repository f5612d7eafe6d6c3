use anyhow::{Context, Result};

use flashdeck_lib::server::{self, generate_token};

use crate::app::App;

pub async fn run(app: &App, bind: Option<&str>) -> Result<()> {
    let bind = bind.unwrap_or(&app.config().server.bind).to_string();

    let mut state = app.state.server_state()?;
    if state.tokens.is_empty() {
        let token = generate_token();
        println!(
            "No users configured; accepting token {} for user {}",
            token, app.user_id
        );
        state.tokens.insert(token, app.user_id);
    }

    let server = server::start_server(&bind, state)
        .await
        .with_context(|| format!("Failed to start server on {}", bind))?;
    println!("Serving cards on port {} (Ctrl-C to stop)", server.port);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    server.shutdown().await?;
    Ok(())
}
