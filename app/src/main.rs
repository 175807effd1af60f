mod cli;
mod config;

use anyhow::{bail, Context, Result};
use clap::Parser;
use pagemask_core::{PageBundle, PostProcessor, PrecomputedMerge, RedactionPostProcessor};
use std::fs;
use std::path::Path;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = cli::Cli::parse();
    let bundles = run(&cli)?;
    let json = serde_json::to_string_pretty(&bundles)?;

    match &cli.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("写入 {} 失败", path.display()))?;
            log::info!("[Main] {} 个输出包已写入 {}", bundles.len(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn run(cli: &cli::Cli) -> Result<Vec<PageBundle>> {
    // 显式指定的配置必须存在，否则可能在不脱敏的情况下输出
    let mut app_config = match &cli.config {
        Some(path) => config::load_config(path)
            .with_context(|| format!("无法加载配置 {}", path.display()))?,
        None => {
            let path = Path::new(config::DEFAULT_CONFIG_FILE);
            config::load_config_or_default(path)
                .with_context(|| format!("无法加载配置 {}", path.display()))?
        }
    };
    if let Some(dir) = &cli.resource_dir {
        app_config.resource_dir = Some(dir.clone());
    }
    if let Some(ext) = &cli.image_extension {
        app_config.image_extension = Some(ext.clone());
    }

    // 正则在处理任何文档之前编译
    let processor = RedactionPostProcessor::from_config(
        app_config.processor(),
        &app_config.criteria(),
        PrecomputedMerge,
    )
    .context("脱敏条件无效")?;
    log::info!(
        "[Main] 资源目录: {}, 参考 DPI: {}",
        processor.config().resource_dir.display(),
        processor.resolve_reference_dpi()
    );

    let raw = fs::read_to_string(&cli.predictions)
        .with_context(|| format!("无法读取预测文件 {}", cli.predictions.display()))?;
    let rows = PrecomputedMerge::rows_from_json(&raw)
        .with_context(|| format!("预测文件格式错误 {}", cli.predictions.display()))?;

    let doc_id = match &cli.doc_id {
        Some(id) => id.clone(),
        None => cli
            .predictions
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };

    let reports = processor.process(&rows, &doc_id)?;

    if cli.verify {
        let options = app_config.verify_options();
        for report in &reports {
            let result = pagemask_verify::verify_report(report, &options);
            if !result.ok {
                bail!("脱敏校验失败: {}", result.warnings.join("; "));
            }
        }
        log::info!("[Main] 校验通过");
    }

    Ok(reports.into_iter().flat_map(|report| report.bundles).collect())
}
