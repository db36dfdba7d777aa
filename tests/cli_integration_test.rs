//! CLI integration tests for the backtest command orchestration.
//!
//! Tests cover:
//! - `[backtest]` parsing (build_backtest_settings, resolve_symbols)
//! - Fetch window padding and per-symbol output paths
//! - Dry-run and validate with real INI files on disk
//! - Full pipeline with MockDataPort and the trade CSV writer
//! - Active-position lookup
//! - End-to-end run over candle CSV files

mod common;

use clap::Parser;
use common::*;
use orbtrader::adapters::file_config_adapter::FileConfigAdapter;
use orbtrader::adapters::trade_csv_adapter::TradeCsvAdapter;
use orbtrader::cli::{self, Cli};
use orbtrader::domain::config::build_strategy_config;
use orbtrader::domain::error::OrbtraderError;
use orbtrader::domain::trade::TRADE_COLUMNS;
use std::io::Write;
use std::path::{Path, PathBuf};

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const VALID_INI: &str = r#"
[backtest]
symbols = BTCUSDT, ethusdt
mode = session
start_date = 2024-05-06
end_date = 2024-05-07
data_dir = /tmp/candles

[strategy]
risk_per_trade = 100
orb_multiplier = 1.0
take_profit_multiplier = 2.0
max_daily_trades = 1
force_one_trade = false

[session]
timezone = UTC
orb_window = 0-1
entry_window = 1-20
exit_window = 20-24
full_day_trading = false
session_trading = true

[costs]
commission_rate = 0
slippage_rate = 0
"#;

fn breakout_day(day: u32) -> Vec<orbtrader::domain::candle::Candle> {
    vec![
        make_candle(utc(2024, 5, day, 0, 0), 100.0, 105.0, 95.0, 100.0),
        make_candle(utc(2024, 5, day, 1, 0), 100.0, 107.0, 99.0, 106.0),
        make_candle(utc(2024, 5, day, 20, 0), 106.0, 109.0, 105.0, 108.0),
    ]
}

fn read_rows(path: &Path) -> (Vec<String>, Vec<csv::StringRecord>) {
    let mut rdr = csv::Reader::from_path(path).unwrap();
    let headers = rdr.headers().unwrap().iter().map(String::from).collect();
    let rows = rdr.records().map(|r| r.unwrap()).collect();
    (headers, rows)
}

mod settings {
    use super::*;

    #[test]
    fn build_backtest_settings_valid_full() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let settings = cli::build_backtest_settings(&adapter, None).unwrap();

        assert_eq!(settings.symbols, vec!["BTCUSDT", "ETHUSDT"]);
        assert_eq!(settings.mode.as_deref(), Some("session"));
        assert_eq!(settings.start_date, date(2024, 5, 6));
        assert_eq!(settings.end_date, date(2024, 5, 7));
        assert_eq!(settings.data_dir, PathBuf::from("/tmp/candles"));
    }

    #[test]
    fn build_backtest_settings_defaults() {
        let ini = "[backtest]\nsymbol = solusdt\nstart_date = 2024-01-01\nend_date = 2024-01-31\n";
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let settings = cli::build_backtest_settings(&adapter, None).unwrap();

        assert_eq!(settings.symbols, vec!["SOLUSDT"]);
        assert_eq!(settings.mode, None);
        assert_eq!(settings.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn symbol_override_replaces_list() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let settings = cli::build_backtest_settings(&adapter, Some("xrpusdt")).unwrap();
        assert_eq!(settings.symbols, vec!["XRPUSDT"]);
    }

    #[test]
    fn missing_start_date() {
        let ini = "[backtest]\nsymbols = BTCUSDT\nend_date = 2024-12-31\n";
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let err = cli::build_backtest_settings(&adapter, None).unwrap_err();
        assert!(matches!(err, OrbtraderError::ConfigMissing { key, .. } if key == "start_date"));
    }

    #[test]
    fn invalid_date_format() {
        let ini = "[backtest]\nsymbols = BTCUSDT\nstart_date = 2024/01/01\nend_date = 2024-12-31\n";
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let err = cli::build_backtest_settings(&adapter, None).unwrap_err();
        assert!(matches!(err, OrbtraderError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn reversed_dates_rejected() {
        let ini = "[backtest]\nsymbols = BTCUSDT\nstart_date = 2024-02-01\nend_date = 2024-01-01\n";
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let err = cli::build_backtest_settings(&adapter, None).unwrap_err();
        assert!(matches!(err, OrbtraderError::ConfigInvalid { key, .. } if key == "end_date"));
    }

    #[test]
    fn missing_symbols() {
        let ini = "[backtest]\nstart_date = 2024-01-01\nend_date = 2024-01-31\n";
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        let err = cli::build_backtest_settings(&adapter, None).unwrap_err();
        assert!(matches!(err, OrbtraderError::ConfigMissing { key, .. } if key == "symbols"));
    }

    #[test]
    fn duplicate_symbols_rejected() {
        let adapter = FileConfigAdapter::from_string("[backtest]\nsymbols = BTCUSDT,btcusdt\n").unwrap();
        let err = cli::resolve_symbols(None, &adapter).unwrap_err();
        assert!(matches!(err, OrbtraderError::Universe(_)));
    }

    #[test]
    fn fetch_window_pads_for_trend_and_exits() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let settings = cli::build_backtest_settings(&adapter, None).unwrap();
        let mut strategy = build_strategy_config(&adapter).unwrap();

        assert_eq!(
            cli::fetch_window(&settings, &strategy),
            (date(2024, 5, 5), date(2024, 5, 10))
        );

        strategy.use_daily_trend_filter = true;
        strategy.trend_ma_period = 5;
        let (start, _) = cli::fetch_window(&settings, &strategy);
        assert_eq!(start, date(2024, 4, 29));
    }

    #[test]
    fn output_path_per_symbol() {
        let out = Path::new("results/trades.csv");
        assert_eq!(cli::output_path_for(out, "BTCUSDT", false), PathBuf::from("results/trades.csv"));
        assert_eq!(
            cli::output_path_for(out, "BTCUSDT", true),
            PathBuf::from("results/trades_BTCUSDT.csv")
        );
        assert_eq!(
            cli::output_path_for(Path::new("out"), "ETHUSDT", true),
            PathBuf::from("out_ETHUSDT.csv")
        );
    }
}

mod dry_run {
    use super::*;

    #[test]
    fn dry_run_valid_config_succeeds() {
        let file = write_temp_ini(VALID_INI);
        let exit_code = cli::run_dry_run(file.path(), None);
        assert!(exit_code_is(exit_code, 0));
    }

    #[test]
    fn dry_run_missing_file_is_config_error() {
        let exit_code = cli::run_dry_run(Path::new("/nonexistent/path/config.ini"), None);
        assert!(exit_code_is(exit_code, 2));
    }

    #[test]
    fn dry_run_invalid_strategy_fails() {
        let ini = VALID_INI.replace("max_daily_trades = 1", "max_daily_trades = 0");
        let file = write_temp_ini(&ini);
        let exit_code = cli::run_dry_run(file.path(), None);
        assert!(exit_code_is(exit_code, 2));
    }

    #[test]
    fn dry_run_bad_timezone_fails() {
        let ini = VALID_INI.replace("timezone = UTC", "timezone = Mars/Olympus");
        let file = write_temp_ini(&ini);
        assert!(exit_code_is(cli::run_dry_run(file.path(), None), 2));
    }
}

mod commands {
    use super::*;

    #[test]
    fn parses_backtest_arguments() {
        let parsed = Cli::try_parse_from([
            "orbtrader",
            "backtest",
            "--config",
            "orb.ini",
            "--symbol",
            "BTCUSDT",
            "--output",
            "out.csv",
            "--dry-run",
        ])
        .unwrap();
        match parsed.command {
            cli::Command::Backtest {
                config,
                symbol,
                output,
                dry_run,
            } => {
                assert_eq!(config, PathBuf::from("orb.ini"));
                assert_eq!(symbol.as_deref(), Some("BTCUSDT"));
                assert_eq!(output, Some(PathBuf::from("out.csv")));
                assert!(dry_run);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn active_requires_symbol() {
        assert!(Cli::try_parse_from(["orbtrader", "active", "--config", "orb.ini"]).is_err());
    }

    #[test]
    fn validate_command_runs() {
        let file = write_temp_ini(VALID_INI);
        let path = file.path().to_string_lossy().into_owned();
        let parsed = Cli::try_parse_from(["orbtrader", "validate", "--config", path.as_str()]).unwrap();
        assert!(exit_code_is(cli::run(parsed), 0));
    }
}

mod pipeline {
    use super::*;

    fn settings(symbols: &[&str]) -> cli::BacktestSettings {
        cli::BacktestSettings {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            mode: Some("session".into()),
            start_date: date(2024, 5, 6),
            end_date: date(2024, 5, 7),
            data_dir: PathBuf::from("unused"),
        }
    }

    #[test]
    fn writes_trade_csv_for_single_symbol() {
        let mut candles = breakout_day(6);
        candles.extend(breakout_day(7));
        let port = MockDataPort::new().with_candles("BTCUSDT", candles);
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("trades.csv");

        let exit_code = cli::run_backtest_pipeline(
            &port,
            &TradeCsvAdapter::new(),
            &session_config(),
            &settings(&["BTCUSDT"]),
            &out,
        );
        assert!(exit_code_is(exit_code, 0));

        let (headers, rows) = read_rows(&out);
        assert_eq!(headers, TRADE_COLUMNS.to_vec());
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "2024-05-06");
        assert_eq!(&rows[0][2], "long");
        assert_eq!(&rows[0][8], "session_close");
        assert_eq!(&rows[0][9], "20");
        assert_eq!(&rows[0][11], "false");
        assert_eq!(&rows[0][12], "session");
    }

    #[test]
    fn symbol_without_trades_still_gets_header() {
        let quiet = vec![
            make_candle(utc(2024, 5, 6, 0, 0), 100.0, 105.0, 95.0, 100.0),
            make_candle(utc(2024, 5, 6, 1, 0), 100.0, 101.0, 99.0, 100.0),
        ];
        let port = MockDataPort::new()
            .with_candles("BTCUSDT", breakout_day(6))
            .with_candles("ETHUSDT", quiet);
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("trades.csv");

        let exit_code = cli::run_backtest_pipeline(
            &port,
            &TradeCsvAdapter::new(),
            &session_config(),
            &settings(&["BTCUSDT", "ETHUSDT"]),
            &out,
        );
        assert!(exit_code_is(exit_code, 0));

        let (_, btc_rows) = read_rows(&dir.path().join("trades_BTCUSDT.csv"));
        assert_eq!(btc_rows.len(), 1);
        let (eth_headers, eth_rows) = read_rows(&dir.path().join("trades_ETHUSDT.csv"));
        assert_eq!(eth_headers.len(), 13);
        assert!(eth_rows.is_empty());
    }

    #[test]
    fn no_loadable_symbols_fails() {
        let port = MockDataPort::new().with_error("BTCUSDT", "offline");
        let dir = tempfile::TempDir::new().unwrap();
        let exit_code = cli::run_backtest_pipeline(
            &port,
            &TradeCsvAdapter::new(),
            &session_config(),
            &settings(&["BTCUSDT"]),
            &dir.path().join("trades.csv"),
        );
        assert!(exit_code_is(exit_code, 2));
        assert!(!dir.path().join("trades.csv").exists());
    }

    #[test]
    fn active_without_data_is_no_data() {
        let port = MockDataPort::new();
        let exit_code = cli::run_active_pipeline(&port, &session_config(), &settings(&["BTCUSDT"]), "BTCUSDT");
        assert!(exit_code_is(exit_code, 5));
    }

    #[test]
    fn active_with_open_position_succeeds() {
        let open = breakout_day(7)[..2].to_vec();
        let port = MockDataPort::new().with_candles("BTCUSDT", open);
        let exit_code = cli::run_active_pipeline(&port, &session_config(), &settings(&["BTCUSDT"]), "BTCUSDT");
        assert!(exit_code_is(exit_code, 0));
    }
}

mod end_to_end {
    use super::*;

    #[test]
    fn backtest_over_csv_files() {
        let data = tempfile::TempDir::new().unwrap();
        std::fs::write(
            data.path().join("BTCUSDT.csv"),
            "timestamp,open,high,low,close,volume\n\
             2024-05-06T00:00:00Z,100,105,95,100,10\n\
             2024-05-06T01:00:00Z,100,107,99,106,12\n\
             2024-05-06T20:00:00Z,106,109,105,108,9\n",
        )
        .unwrap();

        let ini = VALID_INI
            .replace("symbols = BTCUSDT, ethusdt", "symbols = BTCUSDT")
            .replace("data_dir = /tmp/candles", &format!("data_dir = {}", data.path().display()));
        let config = write_temp_ini(&ini);
        let out = data.path().join("report").join("trades.csv");

        let config_arg = config.path().to_string_lossy().into_owned();
        let out_arg = out.to_string_lossy().into_owned();
        let parsed = Cli::try_parse_from([
            "orbtrader",
            "backtest",
            "--config",
            config_arg.as_str(),
            "--output",
            out_arg.as_str(),
        ])
        .unwrap();
        eprintln!("running {parsed:?}");
        assert!(exit_code_is(cli::run(parsed), 0));

        let (headers, rows) = read_rows(&out);
        assert_eq!(headers, TRADE_COLUMNS.to_vec());
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][1], "2024-05-06T01:00:00+00:00");
        assert_eq!(&rows[0][7], "108");
        assert_eq!(&rows[0][10], "0.2");
    }
}
