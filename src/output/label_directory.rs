// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/label_directory.rs - 标注目录输出
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

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::DetectResult,
  output::{Render, encode, serialize},
};

const LABEL_EXTENSION: &str = "txt";

#[derive(Error, Debug)]
pub enum LabelDirectoryOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("目录路径不是合法的 UTF-8: {0}")]
  InvalidPath(String),
  #[error("无法创建标注目录 {path}: {source}")]
  CreateDirError {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("无法写入标注文件 {path}: {source}")]
  WriteError {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("源文件没有文件名: {0}")]
  MissingFileName(PathBuf),
}

/// 把每张图像的标注写到 `<目录>/<文件名主干>.txt`
#[derive(Debug, Clone)]
pub struct LabelDirectoryOutput {
  directory: PathBuf,
}

impl FromUrlWithScheme for LabelDirectoryOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for LabelDirectoryOutput {
  type Error = LabelDirectoryOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(LabelDirectoryOutputError::SchemeMismatch);
    }

    let path = urlencoding::decode(uri.path())
      .map_err(|_| LabelDirectoryOutputError::InvalidPath(uri.path().to_string()))?;
    Ok(Self::new(path.as_ref()))
  }
}

impl LabelDirectoryOutput {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    Self {
      directory: directory.into(),
    }
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }

  /// 目录不存在时创建
  pub fn prepare(&self) -> Result<(), LabelDirectoryOutputError> {
    std::fs::create_dir_all(&self.directory).map_err(|source| {
      LabelDirectoryOutputError::CreateDirError {
        path: self.directory.clone(),
        source,
      }
    })
  }

  pub fn label_path(&self, source: &Path) -> Result<PathBuf, LabelDirectoryOutputError> {
    let stem = source
      .file_stem()
      .ok_or_else(|| LabelDirectoryOutputError::MissingFileName(source.to_path_buf()))?;
    // 主干本身可能含有 '.'，不能用 with_extension
    let mut file_name = stem.to_os_string();
    file_name.push(".");
    file_name.push(LABEL_EXTENSION);
    Ok(self.directory.join(file_name))
  }
}

impl Render<Path, DetectResult> for LabelDirectoryOutput {
  type Error = LabelDirectoryOutputError;

  /// 没有检测结果时同样写出空文件
  fn render_result(&self, source: &Path, result: &DetectResult) -> Result<(), Self::Error> {
    let path = self.label_path(source)?;
    let text = serialize(&encode(result));
    std::fs::write(&path, text).map_err(|source| LabelDirectoryOutputError::WriteError {
      path: path.clone(),
      source,
    })?;
    debug!("写入标注 {} ({} 条)", path.display(), result.len());
    Ok(())
  }
}
