use std::sync::Arc;

use anyhow::{anyhow, bail};
use rust_decimal::Decimal;
use stockdash_core::{
    AppConfig, DashboardState, FileStore, KeyValueStore, StreamStatus, SyncOrchestrator, Theme,
    ThemeStore,
};
use stockdash_market_data::ChartRange;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_FORMAT_ENV: &str = "STOCKDASH_LOG_FORMAT";
pub const SYSTEM_THEME_ENV: &str = "STOCKDASH_SYSTEM_THEME";

pub fn init_tracing() {
    let log_format = std::env::var(LOG_FORMAT_ENV).unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub struct App {
    pub orchestrator: SyncOrchestrator,
    pub theme: ThemeStore,
}

pub fn build_app(config: AppConfig) -> anyhow::Result<App> {
    let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(config.storage_path.clone()));
    tracing::info!("Preferences file: {}", config.storage_path.display());

    let system_theme = std::env::var(SYSTEM_THEME_ENV)
        .ok()
        .and_then(|v| Theme::from_stored(v.trim()))
        .unwrap_or_default();
    let theme = ThemeStore::load(storage.clone(), system_theme);

    let registry = Arc::new(config.build_registry());
    let providers: Vec<&str> = registry.providers().iter().map(|p| p.id()).collect();
    tracing::info!("Provider chain: {}", providers.join(" -> "));

    let orchestrator = SyncOrchestrator::new(config, registry, storage)?;
    Ok(App {
        orchestrator,
        theme,
    })
}

/// One line typed on stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Select(String),
    Range(ChartRange),
    Search(String),
    Toggle(String),
    Theme,
    Refresh,
    Quit,
}

/// Parses a stdin line. Blank lines are `Ok(None)`.
pub fn parse_command(line: &str) -> anyhow::Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, arg) = match line.split_once(char::is_whitespace) {
        Some((verb, arg)) => (verb, arg.trim()),
        None => (line, ""),
    };

    let required = |what: &str| -> anyhow::Result<String> {
        if arg.is_empty() {
            bail!("`{}` needs {}", verb, what);
        }
        Ok(arg.to_string())
    };

    let command = match verb.to_lowercase().as_str() {
        "select" | "s" => Command::Select(required("a symbol")?),
        "range" | "r" => Command::Range(arg.parse().map_err(|e| anyhow!("{}", e))?),
        // An empty search clears the results.
        "search" | "/" => Command::Search(arg.to_string()),
        "toggle" | "t" => Command::Toggle(required("a symbol")?),
        "theme" => Command::Theme,
        "refresh" => Command::Refresh,
        "quit" | "q" | "exit" => Command::Quit,
        other => bail!("Unknown command `{}`", other),
    };
    Ok(Some(command))
}

/// Applies `command`. Returns `false` when the app should stop.
pub async fn apply_command(app: &mut App, command: Command) -> bool {
    match command {
        Command::Select(symbol) => app.orchestrator.select_symbol(&symbol).await,
        Command::Range(range) => app.orchestrator.set_range(range).await,
        Command::Search(query) => app.orchestrator.set_query(&query),
        Command::Toggle(symbol) => {
            app.orchestrator.toggle_watchlist(&symbol).await;
        }
        Command::Theme => {
            let theme = app.theme.toggle();
            tracing::info!("Theme is now {}", theme);
        }
        Command::Refresh => {
            tokio::join!(
                app.orchestrator.refresh_primary(),
                app.orchestrator.refresh_candles(),
                app.orchestrator.refresh_watchlist(),
            );
        }
        Command::Quit => return false,
    }
    true
}

fn signed(value: Decimal) -> String {
    if value.is_sign_negative() {
        value.to_string()
    } else {
        format!("+{}", value)
    }
}

/// One-line summary of the active symbol.
pub fn describe_state(state: &DashboardState) -> String {
    let mut line = format!("{} [{}]", state.symbol, state.range);

    if let Some(name) = state.profile.as_ref().and_then(|p| p.name.as_deref()) {
        line.push_str(&format!(" {}", name));
    }
    match (&state.quote, state.primary_status) {
        (_, StreamStatus::Loading) => line.push_str(" | quote loading"),
        (Some(quote), _) => {
            line.push_str(&format!(
                " | {} ({}",
                quote.current.round_dp(2).normalize(),
                signed(quote.change().round_dp(2).normalize())
            ));
            if let Some(pct) = quote.change_percent() {
                line.push_str(&format!(", {}%", signed(pct.round_dp(2).normalize())));
            }
            line.push(')');
        }
        (None, _) => line.push_str(" | no quote"),
    }
    match state.candle_status {
        StreamStatus::Loading => line.push_str(" | chart loading"),
        _ => line.push_str(&format!(" | {} points", state.chart_points().len())),
    }
    line.push_str(&format!(
        " | watchlist {}/{} quoted",
        state.watchlist_quotes.len(),
        state.watchlist.len()
    ));
    if !state.search_results.is_empty() {
        let hits: Vec<&str> = state
            .search_results
            .iter()
            .map(|r| r.symbol.as_str())
            .collect();
        line.push_str(&format!(" | search: {}", hits.join(", ")));
    }
    if let Some(error) = &state.error {
        line.push_str(&format!(" | error: {}", error));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use stockdash_market_data::{Quote, SearchResult, Symbol};

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_command("select msft").unwrap(),
            Some(Command::Select("msft".to_string()))
        );
        assert_eq!(
            parse_command("  r 1y ").unwrap(),
            Some(Command::Range(ChartRange::OneYear))
        );
        assert_eq!(
            parse_command("search").unwrap(),
            Some(Command::Search(String::new()))
        );
        assert_eq!(parse_command("QUIT").unwrap(), Some(Command::Quit));
        assert_eq!(parse_command("   ").unwrap(), None);
    }

    #[test]
    fn test_parse_command_errors() {
        assert!(parse_command("select").is_err());
        assert!(parse_command("range 5Y").is_err());
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn test_describe_state() {
        let mut state = DashboardState::new(
            Symbol::parse("AAPL").unwrap(),
            ChartRange::OneMonth,
            vec![Symbol::parse("AAPL").unwrap()],
        );
        state.primary_status = StreamStatus::Ready;
        state.quote = Some(Quote {
            current: dec!(110),
            open: dec!(100),
            high: dec!(111),
            low: dec!(99),
            previous_close: dec!(100),
            as_of: 1_700_000_000,
        });
        state.search_results = vec![SearchResult::new("AAPL", "Apple Inc")];
        state.error = Some("Boom".to_string());

        assert_eq!(
            describe_state(&state),
            "AAPL [1M] | 110 (+10, +10%) | 0 points | watchlist 0/1 quoted | search: AAPL | error: Boom"
        );
    }
}
