mod config;
mod controller;
mod logging;
mod models;
mod scheduler;
mod simulation;

use clap::{Arg, ArgAction, Command};
use tracing::info;

use config::AgentConfig;
use logging::{init_logging, level_for_verbosity, parse_log_level, LogConfig, LogOutput};
use simulation::SimulationEngine;

fn main() {
    let matches = Command::new("archerbot")
        .version("0.1.0")
        .about("弓術決闘ボット (Archer duel bot)")
        .long_about("チャットで決闘を受け付け、相手の周囲を移動しながら見越し照準で弓を射るボットです。\n\
                     オフラインのアリーナ上で仮想時計を進めて挙動を確認します。")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("設定ファイル(.yaml)のパスを指定")
                .long_help("エージェント設定ファイル(.yaml)のパスを指定します。\n\
                           指定しない場合、既定値で実行されます。")
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(ArgAction::SetTrue)
                .help("設定の概要のみ表示して終了")
        )
        .arg(
            Arg::new("realtime")
                .long("realtime")
                .action(ArgAction::SetTrue)
                .help("壁時計に合わせてステップを進める")
                .conflicts_with("info")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("詳細出力レベル (-v: 基本, -vv: 詳細, -vvv: デバッグ)")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("ログレベル (trace, debug, info, warn, error)")
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("TARGET")
                .default_value("console")
                .value_parser(|s: &str| s.parse::<LogOutput>())
                .help("ログ出力先 (console, file, both)")
        )
        .get_matches();

    println!("弓術決闘ボット (Archer duel bot) - archerbot v0.1.0");
    println!();

    let verbose_level = matches.get_count("verbose");
    let log_config = LogConfig {
        level: matches
            .get_one::<String>("log-level")
            .map(|s| parse_log_level(s))
            .unwrap_or_else(|| level_for_verbosity(verbose_level)),
        output: matches
            .get_one::<LogOutput>("log-output")
            .copied()
            .unwrap_or(LogOutput::Console),
        ..LogConfig::default()
    };

    // ファイル出力の非同期ライターはmain終了まで保持
    let _log_guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("エラー: ログ初期化に失敗しました: {}", e);
            std::process::exit(1);
        }
    };

    let config = match matches.get_one::<String>("config") {
        Some(path) => match AgentConfig::from_file(path) {
            Ok(config) => {
                info!("設定ファイル読み込み完了: {}", path);
                config
            }
            Err(e) => {
                eprintln!("エラー: {}", e);
                std::process::exit(1);
            }
        },
        None => AgentConfig::default(),
    };

    if matches.get_flag("info") {
        config.print_summary();
        return;
    }

    if let Err(e) = run(&config, matches.get_flag("realtime"), verbose_level) {
        eprintln!("エラー: {}", e);
        std::process::exit(1);
    }
}

/// アリーナ上で決闘エージェントを実行
fn run(config: &AgentConfig, realtime: bool, verbose_level: u8) -> Result<(), Box<dyn std::error::Error>> {
    config.print_summary();
    println!();

    if verbose_level > 0 {
        println!("シミュレーション設定:");
        println!("  時間刻み: {}ms", config.demo.dt_ms);
        println!("  最大時間: {:.1}秒", config.demo.duration_s);
        println!("  シード値: {}", config.seed);
        println!("  実時間モード: {}", if realtime { "有効" } else { "無効" });
        println!();
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    let mut engine = SimulationEngine::new(config, verbose_level);
    engine.initialize();
    let report = runtime.block_on(engine.run(realtime));

    println!();
    report.print_summary();
    Ok(())
}
