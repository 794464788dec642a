mod main_lib;

use main_lib::{apply_command, build_app, describe_state, init_tracing, parse_command};
use stockdash_core::AppConfig;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before the subscriber reads RUST_LOG
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env();
    let mut app = build_app(config)?;
    tracing::info!("Theme: {}", app.theme.theme());

    app.orchestrator.start().await;

    let mut updates = app.orchestrator.subscribe();
    tracing::info!("{}", describe_state(&updates.borrow_and_update()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let summary = describe_state(&updates.borrow_and_update());
                tracing::info!("{}", summary);
            }
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line? else {
                    // stdin closed; keep syncing until Ctrl-C
                    stdin_open = false;
                    continue;
                };
                match parse_command(&line) {
                    Ok(Some(command)) => {
                        if !apply_command(&mut app, command).await {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!("{}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    tracing::info!("Shutting down");
    app.orchestrator.shutdown().await;
    Ok(())
}
