// 该文件是 Shanan （山南西风） 项目的一部分。
// src/task.rs - 批量标注任务
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

use std::{
  collections::HashMap,
  ffi::OsString,
  path::{Path, PathBuf},
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  time::Instant,
};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  frame::RgbNhwcFrame,
  input::{ClassManifestError, FrameDecoder, ImageDirectoryInput, ImageDirectoryInputError},
  model::{DetectResult, Model, SegmentConfigError},
  output::{LabelDirectoryOutputError, Render},
};

pub trait Task<I, M, O>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error>;
}

#[derive(Error, Debug)]
pub enum BatchError {
  #[error("类别清单错误: {0}")]
  Manifest(#[from] ClassManifestError),
  #[error("输入目录错误: {0}")]
  Input(#[from] ImageDirectoryInputError),
  #[error("输出目录错误: {0}")]
  Output(#[from] LabelDirectoryOutputError),
  #[error("标注写入失败: {0}")]
  Render(#[source] Box<dyn std::error::Error + Send + Sync>),
  #[error("分割配置错误: {0}")]
  Config(#[from] SegmentConfigError),
  #[error("工作线程数必须大于 0")]
  NoWorkers,
  #[error("线程池创建失败: {0}")]
  ThreadPool(#[from] rayon::ThreadPoolBuildError),
  #[error("报告编码失败: {0}")]
  ReportEncode(#[from] serde_json::Error),
  #[error("无法写入报告 {path}: {source}")]
  ReportWrite {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// 在文件之间检查的协作式取消信号
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
  pub fn cancel(&self) {
    self.0.store(true, Ordering::SeqCst);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::SeqCst)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
  pub path: PathBuf,
  pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
  pub total: usize,
  /// 写出标注文件的图像数（含无检测结果的空文件）
  pub labeled: usize,
  /// 其中没有任何检测结果的图像数
  pub empty: usize,
  pub detections: usize,
  pub skipped: Vec<SkippedFile>,
  /// 在真实感图像目录中找不到同名图像的文件
  pub unpaired: Vec<PathBuf>,
  pub cancelled: usize,
  pub workers: usize,
  pub elapsed_ms: u64,
  pub finished_at: Option<DateTime<Utc>>,
}

impl BatchSummary {
  pub fn is_cancelled(&self) -> bool {
    self.cancelled > 0
  }

  pub fn write_report(&self, path: impl AsRef<Path>) -> Result<(), BatchError> {
    let path = path.as_ref();
    let text = serde_json::to_string_pretty(self)?;
    std::fs::write(path, text).map_err(|source| BatchError::ReportWrite {
      path: path.to_path_buf(),
      source,
    })?;
    info!("批处理报告已写入 {}", path.display());
    Ok(())
  }
}

/// 文件名主干相同的图像会写到同一个标注文件，只保留排序后的第一个
fn split_stem_collisions(files: Vec<PathBuf>) -> (Vec<PathBuf>, Vec<SkippedFile>) {
  let mut owners: HashMap<OsString, PathBuf> = HashMap::new();
  let mut unique = Vec::with_capacity(files.len());
  let mut collided = Vec::new();

  for path in files {
    let Some(stem) = path.file_stem().map(|stem| stem.to_os_string()) else {
      unique.push(path);
      continue;
    };
    match owners.get(&stem) {
      Some(owner) => {
        warn!(
          "{} 与 {} 的标注文件同名，已跳过",
          path.display(),
          owner.display()
        );
        collided.push(SkippedFile {
          reason: format!("标注文件与 {} 同名", owner.display()),
          path,
        });
      }
      None => {
        owners.insert(stem, path.clone());
        unique.push(path);
      }
    }
  }

  (unique, collided)
}

#[derive(Debug)]
enum FileOutcome {
  Labeled { detections: usize },
  Skipped(SkippedFile),
  Cancelled,
}

/// 在固定大小的线程池上逐文件标注一个目录。
///
/// 每个文件由一个工作线程从解码到写出一次完成；解码失败只跳过该文件，
/// 写入失败则终止整个批次。
pub struct BatchTask<D> {
  decoder: D,
  workers: usize,
  cancel: CancelToken,
  realistic: Option<ImageDirectoryInput>,
}

impl<D> BatchTask<D> {
  pub fn new(decoder: D) -> Self {
    Self {
      decoder,
      workers: 1,
      cancel: CancelToken::default(),
      realistic: None,
    }
  }

  pub fn with_workers(mut self, workers: usize) -> Self {
    self.workers = workers;
    self
  }

  pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
    self.cancel = cancel;
    self
  }

  /// 检查每张颜色键控图像在真实感图像目录中是否有同名图像
  pub fn with_realistic_pairs(mut self, realistic: Option<ImageDirectoryInput>) -> Self {
    self.realistic = realistic;
    self
  }

  fn unpaired(&self, files: &[PathBuf]) -> Result<Vec<PathBuf>, BatchError> {
    let Some(realistic) = &self.realistic else {
      return Ok(Vec::new());
    };

    let stems = realistic.stems()?;
    let unpaired: Vec<PathBuf> = files
      .iter()
      .filter(|path| {
        path
          .file_stem()
          .map(|stem| !stems.contains(stem))
          .unwrap_or(true)
      })
      .cloned()
      .collect();

    for path in &unpaired {
      warn!(
        "{} 在 {} 中没有对应的真实感图像",
        path.display(),
        realistic.directory().display()
      );
    }
    Ok(unpaired)
  }
}

impl<D: FrameDecoder> BatchTask<D> {
  fn process_file<M, O>(&self, path: &Path, model: &M, output: &O) -> Result<FileOutcome, BatchError>
  where
    M: Model<Input = RgbNhwcFrame, Output = DetectResult>,
    M::Error: std::fmt::Display,
    O: Render<Path, DetectResult>,
    O::Error: std::error::Error + Send + Sync + 'static,
  {
    if self.cancel.is_cancelled() {
      return Ok(FileOutcome::Cancelled);
    }

    let frame = match self.decoder.decode(path) {
      Ok(frame) => frame,
      Err(e) => {
        warn!("跳过无法解码的图像 {}: {}", path.display(), e);
        return Ok(FileOutcome::Skipped(SkippedFile {
          path: path.to_path_buf(),
          reason: e.to_string(),
        }));
      }
    };

    let now = Instant::now();
    let result = match model.infer(&frame) {
      Ok(result) => result,
      Err(e) => {
        warn!("跳过分割失败的图像 {}: {}", path.display(), e);
        return Ok(FileOutcome::Skipped(SkippedFile {
          path: path.to_path_buf(),
          reason: e.to_string(),
        }));
      }
    };
    drop(frame);

    output
      .render_result(path, &result)
      .map_err(|e| BatchError::Render(Box::new(e)))?;
    debug!(
      "{}: {} 个目标，耗时 {:.2?}",
      path.display(),
      result.len(),
      now.elapsed()
    );

    Ok(FileOutcome::Labeled {
      detections: result.len(),
    })
  }
}

impl<'a, D, M, O> Task<&'a ImageDirectoryInput, &'a M, &'a O> for BatchTask<D>
where
  D: FrameDecoder + Sync,
  M: Model<Input = RgbNhwcFrame, Output = DetectResult> + Sync,
  M::Error: std::fmt::Display,
  O: Render<Path, DetectResult> + Sync,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Output = BatchSummary;
  type Error = BatchError;

  fn run_task(
    self,
    input: &'a ImageDirectoryInput,
    model: &'a M,
    output: &'a O,
  ) -> Result<Self::Output, Self::Error> {
    if self.workers == 0 {
      return Err(BatchError::NoWorkers);
    }

    let start = Instant::now();
    let files = input.list()?;
    info!(
      "开始任务: {} 中共 {} 个图像, {} 个工作线程",
      input.directory().display(),
      files.len(),
      self.workers
    );

    let total = files.len();
    let unpaired = self.unpaired(&files)?;
    let (files, collided) = split_stem_collisions(files);

    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(self.workers)
      .thread_name(|index| format!("label-worker-{}", index))
      .build()?;

    let outcomes: Vec<FileOutcome> = pool.install(|| {
      files
        .par_iter()
        .map(|path| self.process_file(path, model, output))
        .collect::<Result<Vec<_>, _>>()
    })?;

    let mut summary = BatchSummary {
      total,
      skipped: collided,
      unpaired,
      workers: self.workers,
      ..Default::default()
    };
    for outcome in outcomes {
      match outcome {
        FileOutcome::Labeled { detections } => {
          summary.labeled += 1;
          summary.detections += detections;
          if detections == 0 {
            summary.empty += 1;
          }
        }
        FileOutcome::Skipped(skipped) => summary.skipped.push(skipped),
        FileOutcome::Cancelled => summary.cancelled += 1,
      }
    }
    summary.elapsed_ms = start.elapsed().as_millis() as u64;
    summary.finished_at = Some(Utc::now());

    if summary.is_cancelled() {
      warn!("任务被取消，{} 个图像未处理", summary.cancelled);
    }
    for skipped in &summary.skipped {
      warn!("已跳过: {} ({})", skipped.path.display(), skipped.reason);
    }
    info!(
      "任务完成: 标注 {} 个 (其中 {} 个无目标), 跳过 {} 个, 共 {} 个目标, 耗时 {} ms",
      summary.labeled,
      summary.empty,
      summary.skipped.len(),
      summary.detections,
      summary.elapsed_ms
    );

    Ok(summary)
  }
}

/// 用默认分割参数标注 `source_dir` 中的 PNG 图像，标注写到 `dest_dir`
#[cfg(feature = "read_image_file")]
pub fn run(
  source_dir: impl Into<PathBuf>,
  dest_dir: impl Into<PathBuf>,
  class_list_path: impl AsRef<Path>,
  concurrency: usize,
) -> Result<BatchSummary, BatchError> {
  use crate::{
    input::{ClassManifest, ImageFileDecoder},
    model::{ColorKeySegmenter, SegmentConfig},
    output::LabelDirectoryOutput,
  };

  let manifest = ClassManifest::load(class_list_path)?;
  let segmenter = ColorKeySegmenter::new(manifest.color_map()?, SegmentConfig::default())?;
  let input = ImageDirectoryInput::new(source_dir);
  let output = LabelDirectoryOutput::new(dest_dir);
  output.prepare()?;

  BatchTask::new(ImageFileDecoder)
    .with_workers(concurrency)
    .run_task(&input, &segmenter, &output)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn first_file_owns_a_shared_stem() {
    let files = vec![
      PathBuf::from("/black/render0.PNG"),
      PathBuf::from("/black/render0.png"),
      PathBuf::from("/black/render1.png"),
      PathBuf::from("/black/render1.jpg"),
    ];
    let (unique, collided) = split_stem_collisions(files);
    assert_eq!(
      unique,
      vec![
        PathBuf::from("/black/render0.PNG"),
        PathBuf::from("/black/render1.png")
      ]
    );
    let skipped: Vec<&Path> = collided.iter().map(|file| file.path.as_path()).collect();
    assert_eq!(
      skipped,
      vec![Path::new("/black/render0.png"), Path::new("/black/render1.jpg")]
    );
  }
}
