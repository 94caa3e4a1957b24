use anyhow::Result;

use invest_core::Settings;
use invest_search::SearchGrid;

fn main() -> Result<()> {
    invest_core::logging::setup_minimal_logging(std::env::var("VERBOSE").is_ok())?;

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_help();
        return Ok(());
    }
    match args[1].as_str() {
        "load" => cmd_load(&args[2..]),
        "evaluate" => cmd_evaluate(&args[2..]),
        "optimize" => cmd_optimize(&args[2..]),
        "expected-value" => cmd_expected_value(&args[2..]),
        _ => {
            print_help();
            Ok(())
        }
    }
}

fn cmd_load(args: &[String]) -> Result<()> {
    let settings = Settings::load_with_env()?;
    let data = parse_flag(args, "--data")
        .unwrap_or_else(|| settings.analysis.data_path.display().to_string());
    let store = invest_data::ObservationStore::load(&data)?;
    println!(
        "Loaded {}: {} observations ({} flagged)",
        data,
        store.len(),
        store.flagged_count()
    );
    Ok(())
}

fn cmd_evaluate(args: &[String]) -> Result<()> {
    let settings = Settings::load_with_env()?;
    let data = parse_flag(args, "--data")
        .unwrap_or_else(|| settings.analysis.data_path.display().to_string());
    let x: f64 = parse_flag(args, "--x")
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| anyhow::anyhow!("missing or invalid --x"))?;
    let y: f64 = parse_flag(args, "--y")
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| anyhow::anyhow!("missing or invalid --y"))?;
    let stop_loss: f64 = parse_flag(args, "--stop-loss")
        .and_then(|v| v.parse().ok())
        .unwrap_or(settings.analysis.stop_loss);
    let include_flagged =
        args.iter().any(|a| a == "--include-flagged") || settings.analysis.include_flagged;

    let store = invest_data::ObservationStore::load(&data)?;
    let score = invest_search::evaluate(&store, x, y, stop_loss, include_flagged)?;
    println!(
        "Evaluate x={} y={}: value={:.4} x_count={} y_count={}",
        x, y, score.expected_value, score.x_count, score.y_count
    );
    Ok(())
}

fn cmd_optimize(args: &[String]) -> Result<()> {
    let settings = Settings::load_with_env()?;
    let data = parse_flag(args, "--data")
        .unwrap_or_else(|| settings.analysis.data_path.display().to_string());
    let stop_loss: f64 = parse_flag(args, "--stop-loss")
        .and_then(|v| v.parse().ok())
        .unwrap_or(settings.analysis.stop_loss);
    let include_flagged =
        args.iter().any(|a| a == "--include-flagged") || settings.analysis.include_flagged;

    let mut grid = SearchGrid::from_config(&settings.search);
    if let Some(v) = parse_flag(args, "--x-min").and_then(|v| v.parse().ok()) {
        grid.x_range.0 = v;
    }
    if let Some(v) = parse_flag(args, "--x-max").and_then(|v| v.parse().ok()) {
        grid.x_range.1 = v;
    }
    if let Some(v) = parse_flag(args, "--y-min").and_then(|v| v.parse().ok()) {
        grid.y_range.0 = v;
    }
    if let Some(v) = parse_flag(args, "--y-max").and_then(|v| v.parse().ok()) {
        grid.y_range.1 = v;
    }
    if let Some(v) = parse_flag(args, "--step").and_then(|v| v.parse().ok()) {
        grid.step = v;
    }

    let store = invest_data::ObservationStore::load(&data)?;
    let result = invest_search::optimize(&store, &grid, stop_loss, include_flagged)?;
    println!(
        "Optimize: x={} y={} value={:.4} x_count={} y_count={}",
        result.best_x, result.best_y, result.best_value, result.x_count, result.y_count
    );

    if let Some(out) = parse_flag(args, "--out") {
        if let Some(parent) = std::path::Path::new(&out).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        invest_search::save_results_json(&out, &result)?;
        println!("Results written to {}", out);
    }
    Ok(())
}

fn cmd_expected_value(args: &[String]) -> Result<()> {
    let stop_loss: f64 = parse_flag(args, "--stop-loss")
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| anyhow::anyhow!("missing or invalid --stop-loss"))?;
    let multiplier: f64 = parse_flag(args, "--multiplier")
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| anyhow::anyhow!("missing or invalid --multiplier"))?;
    let rate: f64 = parse_flag(args, "--rate")
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| anyhow::anyhow!("missing or invalid --rate"))?;
    println!(
        "Expected value: {:.4}",
        invest_search::expected_value(stop_loss, multiplier, rate)
    );
    Ok(())
}

fn parse_flag(args: &[String], name: &str) -> Option<String> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == name {
            return iter.next().cloned();
        }
    }
    None
}

fn print_help() {
    println!("invest-cli");
    println!("  load --data observations.csv");
    println!("  evaluate --data observations.csv --x 150000 --y 250000 --stop-loss 0.3 [--include-flagged]");
    println!("  optimize --data observations.csv --x-min 20000 --x-max 1000000 --y-min 20000 --y-max 1000000 --step 10000 --stop-loss 0.3 [--include-flagged] [--out results.json]");
    println!("  expected-value --stop-loss 0.3 --multiplier 2.0 --rate 0.6667");
}
