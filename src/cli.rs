//! CLI definition and dispatch.

use chrono::{Days, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::trade_csv_adapter::TradeCsvAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestResult, DayStatus};
use crate::domain::config::{build_strategy_config, StrategyConfig};
use crate::domain::error::OrbtraderError;
use crate::domain::trade::ExitReason;
use crate::domain::universe::{load_universe, parse_symbols};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "orbtrader", about = "Intraday opening-range breakout backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Run a single symbol instead of the configured list
        #[arg(long)]
        symbol: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the position the strategy would currently hold
    Active {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
    },
    /// List symbols with candle files in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            symbol,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, symbol.as_deref())
            } else {
                run_backtest(&config, symbol.as_deref(), output.as_deref())
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::Active { config, symbol } => run_active(&config, &symbol),
        Command::ListSymbols { config } => run_list_symbols(&config),
    }
}

fn fail(err: &OrbtraderError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

/// The `[backtest]` section: what to run and over which dates.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSettings {
    pub symbols: Vec<String>,
    pub mode: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub data_dir: PathBuf,
}

fn parse_date(config: &dyn ConfigPort, key: &str) -> Result<NaiveDate, OrbtraderError> {
    let raw = config
        .get_string("backtest", key)
        .ok_or_else(|| OrbtraderError::missing("backtest", key))?;
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        OrbtraderError::invalid("backtest", key, "invalid date format (expected YYYY-MM-DD)")
    })
}

pub fn resolve_symbols(
    symbol_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, OrbtraderError> {
    if let Some(symbol) = symbol_override {
        return Ok(parse_symbols(symbol)?);
    }
    match config
        .get_string("backtest", "symbols")
        .or_else(|| config.get_string("backtest", "symbol"))
    {
        Some(list) => Ok(parse_symbols(&list)?),
        None => Err(OrbtraderError::missing("backtest", "symbols")),
    }
}

pub fn build_backtest_settings(
    config: &dyn ConfigPort,
    symbol_override: Option<&str>,
) -> Result<BacktestSettings, OrbtraderError> {
    let start_date = parse_date(config, "start_date")?;
    let end_date = parse_date(config, "end_date")?;
    if start_date > end_date {
        return Err(OrbtraderError::invalid(
            "backtest",
            "end_date",
            format!("{end_date} is before start_date {start_date}"),
        ));
    }

    Ok(BacktestSettings {
        symbols: resolve_symbols(symbol_override, config)?,
        mode: config.get_string("backtest", "mode"),
        start_date,
        end_date,
        data_dir: config
            .get_string("backtest", "data_dir")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data")),
    })
}

/// Dates to load so that days at the edges of the range have trend history
/// before them and room for exits after them.
pub fn fetch_window(settings: &BacktestSettings, strategy: &StrategyConfig) -> (NaiveDate, NaiveDate) {
    let lookback = if strategy.use_daily_trend_filter {
        strategy.trend_ma_period as u64 + 2
    } else {
        1
    };
    let lookahead = strategy.max_holding_hours.max(0) as u64 / 24 + 2;
    let start = settings
        .start_date
        .checked_sub_days(Days::new(lookback))
        .unwrap_or(settings.start_date);
    let end = settings
        .end_date
        .checked_add_days(Days::new(lookahead))
        .unwrap_or(settings.end_date);
    (start, end)
}

/// `trades.csv` for one symbol, `trades_BTCUSDT.csv` when running several.
pub fn output_path_for(output: &Path, symbol: &str, multi: bool) -> PathBuf {
    if !multi {
        return output.to_path_buf();
    }
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "trades".to_string());
    let ext = output
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "csv".to_string());
    output.with_file_name(format!("{stem}_{symbol}.{ext}"))
}

fn load_strategy(adapter: &FileConfigAdapter) -> Result<StrategyConfig, ExitCode> {
    build_strategy_config(adapter).map_err(|e| fail(&e))
}

fn run_backtest(config_path: &Path, symbol: Option<&str>, output: Option<&Path>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let strategy = match load_strategy(&adapter) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let settings = match build_backtest_settings(&adapter, symbol) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    let data_port = CsvAdapter::new(settings.data_dir.clone());
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("trades.csv"));
    run_backtest_pipeline(&data_port, &TradeCsvAdapter::new(), &strategy, &settings, &output)
}

pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    strategy: &StrategyConfig,
    settings: &BacktestSettings,
    output: &Path,
) -> ExitCode {
    let (fetch_start, fetch_end) = fetch_window(settings, strategy);
    let universe = match load_universe(
        data_port,
        &settings.symbols,
        fetch_start,
        fetch_end,
        strategy.use_daily_trend_filter,
    ) {
        Ok(u) => u,
        Err(e) => return fail(&e),
    };
    for skipped in &universe.skipped {
        eprintln!("warning: skipping {} ({:?})", skipped.symbol, skipped.reason);
    }

    let mode = settings
        .mode
        .clone()
        .unwrap_or_else(|| strategy.default_mode().to_string());
    eprintln!(
        "Running backtest: {} symbols, {} to {}, mode {}",
        universe.loaded.len(),
        settings.start_date,
        settings.end_date,
        mode
    );

    let results = match backtest_engine::run_symbols(
        &universe.loaded,
        strategy,
        &mode,
        settings.start_date,
        settings.end_date,
    ) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    let multi = results.len() > 1;
    for result in &results {
        print_summary(result);
        let path = output_path_for(output, &result.symbol, multi);
        if let Err(e) = report_port.write_result(result, &path) {
            return fail(&e);
        }
        eprintln!("Trades written to: {}", path.display());
    }

    ExitCode::SUCCESS
}

fn print_summary(result: &BacktestResult) {
    let m = result.metrics();
    eprintln!("\n=== {} ===", result.symbol);
    eprintln!(
        "Days:             {} ({} traded, {} no signal, {} skipped)",
        result.daily_log.len(),
        result.days_with(DayStatus::Traded),
        result.days_with(DayStatus::NoSignal),
        result.days_with(DayStatus::NoOrbCandles)
            + result.days_with(DayStatus::NoEntryCandles)
            + result.days_with(DayStatus::DegenerateRisk),
    );
    eprintln!("Total Trades:     {}", m.total_trades);
    eprintln!("Win Rate:         {:.1}%", m.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", m.profit_factor);
    eprintln!("Net PnL:          {:.2}", m.total_pnl);
    eprintln!("Avg R:            {:.2}", m.avg_r);
    eprintln!("Max Drawdown:     {:.2}", m.max_drawdown);
    eprintln!("Fallback Trades:  {}", m.fallback_trades);
    for reason in ExitReason::ALL {
        let count = m.exit_count(reason);
        if count > 0 {
            eprintln!("  {reason}: {count}");
        }
    }
    for active in &result.active {
        eprintln!(
            "Open position:    {} from {} at {}",
            active.side, active.entry_time, active.entry_price
        );
    }
}

pub fn run_dry_run(config_path: &Path, symbol: Option<&str>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let strategy = match load_strategy(&adapter) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let settings = match build_backtest_settings(&adapter, symbol) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    eprintln!("Config validated successfully");

    print_strategy(&strategy);
    eprintln!("\nBacktest:");
    eprintln!("  symbols:  {}", settings.symbols.join(", "));
    eprintln!("  range:    {} to {}", settings.start_date, settings.end_date);
    eprintln!(
        "  mode:     {}",
        settings.mode.as_deref().unwrap_or(strategy.default_mode())
    );
    eprintln!("  data dir: {}", settings.data_dir.display());

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn print_strategy(strategy: &StrategyConfig) {
    eprintln!("\nStrategy:");
    eprintln!("  timezone:         {}", strategy.session_timezone);
    eprintln!(
        "  windows:          orb {} entry {} exit {}",
        strategy.orb_window, strategy.entry_window, strategy.exit_window
    );
    eprintln!(
        "  risk/trade:       {} (stop x{}, target x{})",
        strategy.risk_per_trade, strategy.orb_multiplier, strategy.take_profit_multiplier
    );
    eprintln!(
        "  trades/day:       {} (reentry {}, force {})",
        strategy.max_daily_trades, strategy.allow_reentry_on_trend_change, strategy.force_one_trade
    );
    eprintln!(
        "  trend filter:     {} (ma {}, min strength {})",
        strategy.use_daily_trend_filter, strategy.trend_ma_period, strategy.min_trend_strength
    );
    eprintln!(
        "  costs:            commission {} slippage {}",
        strategy.commission_rate, strategy.slippage_rate
    );
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let strategy = match load_strategy(&adapter) {
        Ok(s) => s,
        Err(code) => return code,
    };
    print_strategy(&strategy);
    eprintln!("\nStrategy configuration is valid.");
    ExitCode::SUCCESS
}

pub fn run_active_pipeline(
    data_port: &dyn DataPort,
    strategy: &StrategyConfig,
    settings: &BacktestSettings,
    symbol: &str,
) -> ExitCode {
    let (fetch_start, fetch_end) = fetch_window(settings, strategy);
    let candles = match data_port.fetch_candles(symbol, fetch_start, fetch_end) {
        Ok(c) if c.is_empty() => {
            return fail(&OrbtraderError::NoData {
                symbol: symbol.to_string(),
            });
        }
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    match backtest_engine::detect_or_update_active_trade(&candles, strategy) {
        Some(pos) => {
            println!(
                "{}: {} since {} entry {} stop {} target {} size {:.6}{}",
                symbol,
                pos.side,
                strategy.clock().local(pos.entry_time).to_rfc3339(),
                pos.entry_price,
                pos.stop_loss,
                pos.take_profit,
                pos.size,
                if pos.used_fallback { " (fallback)" } else { "" }
            );
        }
        None => println!("{symbol}: no active position"),
    }
    ExitCode::SUCCESS
}

fn run_active(config_path: &Path, symbol: &str) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let strategy = match load_strategy(&adapter) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let settings = match build_backtest_settings(&adapter, Some(symbol)) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let Some(symbol) = settings.symbols.first() else {
        return fail(&OrbtraderError::missing("backtest", "symbols"));
    };
    let data_port = CsvAdapter::new(settings.data_dir.clone());
    run_active_pipeline(&data_port, &strategy, &settings, symbol)
}

fn run_list_symbols(config_path: &Path) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let data_dir = config
        .get_string("backtest", "data_dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"));

    match CsvAdapter::new(data_dir).list_symbols() {
        Ok(symbols) => {
            for symbol in &symbols {
                println!("{symbol}");
            }
            eprintln!("{} symbols", symbols.len());
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}
