// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bin/label_images.rs - 颜色键控图像批量标注
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::{path::PathBuf, thread, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use url::Url;

use shanan_label::{
  FromUrl,
  input::{ClassManifest, ImageDirectoryInput, ImageFileDecoder},
  model::{ColorKeySegmenter, DEFAULT_STRIDE, DEFAULT_TOLERANCE, SegmentConfig, SegmentMode},
  output::LabelDirectoryOutput,
  task::{BatchTask, CancelToken, Task},
};

/// 颜色键控图像标注参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 颜色键控图像目录，例如 folder:///data/black?ext=png
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 标注输出目录，例如 folder:///data/labels
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 类别清单文件（每行一个类别）
  #[arg(long, value_name = "FILE")]
  pub classes: PathBuf,
  /// 工作线程数
  #[arg(long, default_value = "10", value_name = "COUNT")]
  pub workers: usize,
  /// 采样步长（像素）
  #[arg(long, default_value_t = DEFAULT_STRIDE, value_name = "PIXELS")]
  pub stride: u32,
  /// 红色通道容差
  #[arg(long, default_value_t = DEFAULT_TOLERANCE, value_name = "INTENSITY")]
  pub tolerance: f64,
  /// 同一类别的分离区域分别输出包围框
  #[arg(long)]
  pub split_instances: bool,
  /// 真实感图像目录，用于检查配对，例如 folder:///data/images?ext=jpg
  #[arg(long, value_name = "SOURCE")]
  pub realistic: Option<Url>,
  /// 将批处理报告以 JSON 写入该文件
  #[arg(long, value_name = "FILE")]
  pub report: Option<PathBuf>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);
  info!("类别清单: {}", args.classes.display());

  let manifest = ClassManifest::load(&args.classes)?;
  let mode = if args.split_instances {
    SegmentMode::Components
  } else {
    SegmentMode::Merged
  };
  let config = SegmentConfig::default()
    .with_stride(args.stride)
    .with_tolerance(args.tolerance)
    .with_mode(mode);
  let segmenter = ColorKeySegmenter::new(manifest.color_map()?, config)?;
  info!(
    "{} 个类别, 步长 {}, 容差 {}, 模式 {:?}",
    manifest.len(),
    config.stride,
    config.tolerance,
    config.mode
  );

  let input = ImageDirectoryInput::from_url(&args.input)?;
  let output = LabelDirectoryOutput::from_url(&args.output)?;
  output.prepare()?;
  let realistic = args
    .realistic
    .as_ref()
    .map(ImageDirectoryInput::from_url)
    .transpose()?;

  let cancel = CancelToken::default();
  let handler_token = cancel.clone();
  ctrlc::set_handler(move || {
    info!("收到中断信号，处理完当前图像后退出...");
    handler_token.cancel();
    thread::spawn(|| {
      thread::sleep(Duration::from_secs(30));
      warn!("强制退出程序");
      std::process::exit(1);
    });
  })
  .context("无法设置 Ctrl-C 处理函数")?;

  let summary = BatchTask::new(ImageFileDecoder)
    .with_workers(args.workers)
    .with_cancel_token(cancel)
    .with_realistic_pairs(realistic)
    .run_task(&input, &segmenter, &output)?;

  if let Some(report) = &args.report {
    summary.write_report(report)?;
  }

  println!(
    "处理完成: 共 {} 个图像, 标注 {} 个, 跳过 {} 个",
    summary.total,
    summary.labeled,
    summary.skipped.len()
  );
  for skipped in &summary.skipped {
    println!("  跳过 {}: {}", skipped.path.display(), skipped.reason);
  }
  if summary.is_cancelled() {
    println!("已取消: {} 个图像未处理", summary.cancelled);
  }

  Ok(())
}
