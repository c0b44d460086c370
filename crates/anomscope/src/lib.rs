pub mod cli;
pub mod report;

use std::io::Write;
use std::path::Path;

use anomscope_config::{
    ScopeConfig, config_path, ensure_workspace_config, load_workspace_config, validate_config,
};
use anomscope_source::{LoadOptions, source_from_location};
use anomscope_view::{
    AliasTable, AnomalyView, FilterState, LoadState, Pipeline, TopLimit, ViewState,
};
use anyhow::{Context, Result, anyhow, bail};

use crate::cli::{Cli, Commands, OutputFormat, ViewArgs};

pub fn run(cli: Cli) -> Result<()> {
    let mut out = std::io::stdout().lock();
    run_with_output(cli, &mut out)
}

pub fn run_with_output(cli: Cli, out: &mut dyn Write) -> Result<()> {
    if matches!(cli.command, Commands::Init) {
        ensure_workspace_config(&cli.workspace).with_context(|| {
            format!(
                "failed to create workspace config at {}",
                config_path(&cli.workspace).display()
            )
        })?;
        writeln!(out, "wrote {}", config_path(&cli.workspace).display())?;
        return Ok(());
    }

    let config = load_config(&cli.workspace)?;
    let location = cli
        .source
        .clone()
        .or_else(|| config.source.location.clone())
        .ok_or_else(|| {
            anyhow!("no data source given; pass --source or set [source].location in the config")
        })?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let mut pipeline = Pipeline::new(AliasTable::with_config(&config.schema));
    runtime.block_on(async {
        let source = source_from_location(&location, &config.source)?;
        pipeline
            .load(source.as_ref(), LoadOptions::from(&config.source))
            .await;
        Ok::<_, anyhow::Error>(())
    })?;

    if let LoadState::Failed(err) = pipeline.state() {
        bail!("{err}");
    }
    let view = pipeline
        .view_mut()
        .ok_or_else(|| anyhow!("dataset load did not complete"))?;

    dispatch(&cli.command, &config, view, out)
}

fn load_config(workspace: &Path) -> Result<ScopeConfig> {
    let config = load_workspace_config(workspace).with_context(|| {
        format!(
            "failed to load workspace config at {}",
            config_path(workspace).display()
        )
    })?;
    for warning in validate_config(&config) {
        tracing::warn!(code = warning.code, "{}", warning.message);
    }
    Ok(config)
}

fn dispatch(
    command: &Commands,
    config: &ScopeConfig,
    view: &mut AnomalyView,
    out: &mut dyn Write,
) -> Result<()> {
    match command {
        Commands::View(args) => {
            let state = view_state(args, config);
            let snapshot = view.derive(&state)?;
            match args.output {
                OutputFormat::Table => report::write_view(&snapshot, out)?,
                OutputFormat::Json => write_json(&snapshot, out)?,
            }
        }
        Commands::Options(args) => {
            let schema = view.schema();
            let options = view.options();
            match args.output {
                OutputFormat::Table => report::write_options(&schema, &options, out)?,
                OutputFormat::Json => write_json(&*options, out)?,
            }
        }
        Commands::Kpis(args) => {
            let kpis = view.kpis();
            match args.output {
                OutputFormat::Table => report::write_kpis(&kpis, out)?,
                OutputFormat::Json => write_json(&*kpis, out)?,
            }
        }
        Commands::Groups => report::write_groups(view.dataset().groups(), out)?,
        Commands::Init => {}
    }

    let stats = view.cache_stats();
    tracing::debug!(
        schema_misses = stats.schema.misses,
        ordered_misses = stats.ordered.misses,
        focused_misses = stats.focused.misses,
        "derived view cache"
    );
    Ok(())
}

fn view_state(args: &ViewArgs, config: &ScopeConfig) -> ViewState {
    let [state, provider_type, place_of_service] = args.selections();
    let limit = args.limit.unwrap_or_else(|| {
        TopLimit::new(config.view.default_limit).unwrap_or_default()
    });

    ViewState {
        filters: FilterState {
            method: args.method,
            state,
            provider_type,
            place_of_service,
        },
        limit,
        focus: args.focus,
    }
}

fn write_json<T: serde::Serialize + ?Sized>(value: &T, out: &mut dyn Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use clap::Parser;
    use tempfile::tempdir;

    use super::*;

    fn write_export(dir: &Path) {
        fs::write(
            dir.join("summary.json"),
            r#"{"rows": 4, "cost_mean": 40, "IQR anomalies count": 2, "Z-score anomalies count": 2}"#,
        )
        .expect("write summary");
        fs::write(
            dir.join("anomalies.json"),
            r#"[
                {"price_amt": 10, "anomaly_method": "IQR", "state": "CA"},
                {"price_amt": 100, "anomaly_method": "Z", "state": "NV"},
                {"price_amt": 50, "anomaly_method": "IQR", "state": "CA"},
                {"price_amt": 70, "anomaly_method": "Z", "state": "CA"}
            ]"#,
        )
        .expect("write anomalies");
    }

    fn run_args(args: &[&str]) -> Result<String> {
        let cli = Cli::try_parse_from(args)?;
        let mut out = Vec::new();
        run_with_output(cli, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn view_command_prints_filtered_ranking() {
        let temp = tempdir().expect("tempdir");
        write_export(temp.path());
        let source = temp.path().to_string_lossy().into_owned();
        let workspace = temp.path().join("ws").to_string_lossy().into_owned();

        let rendered = run_args(&[
            "anomscope",
            "--workspace",
            &workspace,
            "--source",
            &source,
            "view",
            "--method",
            "iqr",
            "--state",
            "CA",
        ])
        .expect("view should run");

        let rows: Vec<&str> = rendered
            .lines()
            .skip_while(|line| !line.starts_with('#'))
            .skip(1)
            .collect();
        assert_eq!(rows, vec!["1\tCA\t50\tIQR", "2\tCA\t10\tIQR"]);
    }

    #[test]
    fn view_command_rejects_unknown_option() {
        let temp = tempdir().expect("tempdir");
        write_export(temp.path());
        let source = temp.path().to_string_lossy().into_owned();
        let workspace = temp.path().join("ws").to_string_lossy().into_owned();

        let err = run_args(&[
            "anomscope",
            "--workspace",
            &workspace,
            "--source",
            &source,
            "view",
            "--state",
            "TX",
        ])
        .expect_err("unknown state should fail");
        assert!(err.to_string().contains("'TX'"));
    }

    #[test]
    fn groups_command_reports_missing_export() {
        let temp = tempdir().expect("tempdir");
        write_export(temp.path());
        let source = temp.path().to_string_lossy().into_owned();
        let workspace = temp.path().join("ws").to_string_lossy().into_owned();

        let rendered = run_args(&[
            "anomscope",
            "--workspace",
            &workspace,
            "--source",
            &source,
            "groups",
        ])
        .expect("groups should run");
        assert_eq!(rendered, "top_groups.json not found.\n");
    }

    #[test]
    fn missing_required_resource_fails_with_load_message() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().to_string_lossy().into_owned();
        let workspace = temp.path().join("ws").to_string_lossy().into_owned();

        let err = run_args(&["anomscope", "--workspace", &workspace, "--source", &source, "kpis"])
            .expect_err("empty directory should fail");
        assert!(err.to_string().contains("summary.json") || err.to_string().contains("anomalies.json"));
    }

    #[test]
    fn missing_source_is_reported() {
        let temp = tempdir().expect("tempdir");
        let workspace = temp.path().to_string_lossy().into_owned();

        let err = run_args(&["anomscope", "--workspace", &workspace, "kpis"])
            .expect_err("no source should fail");
        assert!(err.to_string().contains("--source"));
    }

    #[test]
    fn init_then_config_location_is_used() {
        let temp = tempdir().expect("tempdir");
        write_export(temp.path());
        let workspace = temp.path().to_string_lossy().into_owned();

        run_args(&["anomscope", "--workspace", &workspace, "init"]).expect("init should run");
        let path = config_path(temp.path());
        let raw = fs::read_to_string(&path).expect("read config");
        let updated = raw.replacen(
            "[source]",
            &format!("[source]\nlocation = {:?}", workspace),
            1,
        );
        fs::write(&path, updated).expect("write config");

        let rendered = run_args(&["anomscope", "--workspace", &workspace, "kpis", "--output", "json"])
            .expect("kpis should run");
        let parsed: serde_json::Value = serde_json::from_str(&rendered).expect("json output");
        assert_eq!(parsed["rows"], serde_json::json!(4));
        assert_eq!(parsed["iqr_count"], serde_json::json!(2));
    }
}
