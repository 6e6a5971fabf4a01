use clap::Parser;
use subwatch_cli::commands::init::{self, starter_config};
use subwatch_cli::{Cli, Commands, OutputFormat};
use subwatch_core::SubwatchConfig;

#[test]
fn global_flags_parse_after_subcommand() {
    let cli = Cli::try_parse_from(["subwatch", "status", "--sandbox", "--format", "json"]).unwrap();
    assert!(cli.sandbox);
    assert_eq!(cli.output_format(), OutputFormat::Json);
    assert!(matches!(cli.command, Commands::Status { at: None }));
}

#[test]
fn format_defaults_to_terminal() {
    let cli = Cli::try_parse_from(["subwatch", "products"]).unwrap();
    assert_eq!(cli.output_format(), OutputFormat::Terminal);
}

#[test]
fn status_at_parses_rfc3339() {
    let cli = Cli::try_parse_from(["subwatch", "status", "--at", "2025-06-01T12:00:00Z"]).unwrap();
    match cli.command {
        Commands::Status { at: Some(at) } => {
            assert_eq!(at.to_rfc3339(), "2025-06-01T12:00:00+00:00")
        }
        _ => panic!("expected status with --at"),
    }
}

#[test]
fn status_at_rejects_garbage() {
    assert!(Cli::try_parse_from(["subwatch", "status", "--at", "yesterday"]).is_err());
}

#[test]
fn watch_no_file_watch_flag() {
    let cli = Cli::try_parse_from(["subwatch", "watch", "--no-file-watch"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Watch {
            no_file_watch: true
        }
    ));
}

#[test]
fn subcommand_is_required() {
    assert!(Cli::try_parse_from(["subwatch"]).is_err());
}

#[test]
fn explicit_config_path_is_loaded() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("custom.toml");
    std::fs::write(&path, "[monitor]\nrefresh_interval_secs = 120\n").unwrap();

    let cli = Cli::try_parse_from([
        "subwatch",
        "--config",
        path.to_str().unwrap(),
        "products",
    ])
    .unwrap();
    let config = cli.load_config(tmp.path()).unwrap();
    assert_eq!(config.monitor.refresh_interval_secs, 120);
}

#[test]
fn init_writes_starter_and_refuses_overwrite() {
    let tmp = tempfile::tempdir().unwrap();
    init::run(Some(tmp.path())).unwrap();

    let path = tmp.path().join(".subwatch.toml");
    let written = SubwatchConfig::from_file(&path).unwrap();
    assert_eq!(written.groups.len(), 1);
    assert!(written.catalog().is_ok());

    std::fs::write(&path, "# mine\n").unwrap();
    init::run(Some(tmp.path())).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine\n");
}

#[test]
fn starter_config_has_a_free_tier() {
    let config = starter_config();
    let catalog = config.catalog().unwrap();
    let plan = catalog.group("plan").unwrap();
    assert_eq!(plan.always_active_products().count(), 1);
}
