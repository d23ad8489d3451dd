// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input/image_directory.rs - 图像目录输入
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
  collections::HashSet,
  ffi::OsString,
  path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

pub const DEFAULT_EXTENSIONS: &[&str] = &["png"];

#[derive(Error, Debug)]
pub enum ImageDirectoryInputError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{actual}'")]
  SchemeMismatch {
    expected: &'static str,
    actual: String,
  },
  #[error("目录路径不是合法的 UTF-8: {0}")]
  InvalidPath(String),
  #[error("无法读取图像目录 {path}: {source}")]
  IoError {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// 一个目录中按扩展名筛选出的图像文件
#[derive(Debug, Clone)]
pub struct ImageDirectoryInput {
  directory: PathBuf,
  extensions: Vec<String>,
}

impl FromUrlWithScheme for ImageDirectoryInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for ImageDirectoryInput {
  type Error = ImageDirectoryInputError;

  /// `folder:///path/to/black?ext=png,jpg`
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageDirectoryInputError::SchemeMismatch {
        expected: Self::SCHEME,
        actual: url.scheme().to_string(),
      });
    }

    let extensions: Vec<String> = url
      .query_pairs()
      .filter(|(k, _)| k == "ext")
      .flat_map(|(_, v)| {
        v.split(',')
          .map(|ext| ext.trim().to_string())
          .collect::<Vec<_>>()
      })
      .filter(|ext| !ext.is_empty())
      .collect();

    let path = urlencoding::decode(url.path())
      .map_err(|_| ImageDirectoryInputError::InvalidPath(url.path().to_string()))?;
    let input = Self::new(path.as_ref());
    Ok(if extensions.is_empty() {
      input
    } else {
      input.with_extensions(extensions)
    })
  }
}

impl ImageDirectoryInput {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    Self {
      directory: directory.into(),
      extensions: DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
    }
  }

  pub fn with_extensions<S: AsRef<str>>(mut self, extensions: impl IntoIterator<Item = S>) -> Self {
    self.extensions = extensions
      .into_iter()
      .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
      .collect();
    self
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }

  pub fn extensions(&self) -> &[String] {
    &self.extensions
  }

  /// 扩展名忽略大小写
  pub fn accepts(&self, path: &Path) -> bool {
    path
      .extension()
      .and_then(|ext| ext.to_str())
      .map(|ext| {
        let ext = ext.to_ascii_lowercase();
        self.extensions.iter().any(|allowed| *allowed == ext)
      })
      .unwrap_or(false)
  }

  /// 列出目录中的图像文件，按文件名排序
  pub fn list(&self) -> Result<Vec<PathBuf>, ImageDirectoryInputError> {
    let io_error = |source| ImageDirectoryInputError::IoError {
      path: self.directory.clone(),
      source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(&self.directory).map_err(io_error)? {
      let entry = entry.map_err(io_error)?;
      let path = entry.path();
      if !path.is_file() {
        continue;
      }
      if is_hidden(&path) {
        debug!("跳过隐藏文件: {}", path.display());
        continue;
      }
      if self.accepts(&path) {
        files.push(path);
      } else {
        debug!("跳过非图像文件: {}", path.display());
      }
    }

    files.sort();
    Ok(files)
  }

  /// 目录中所有图像的文件名主干，用于配对检查
  pub fn stems(&self) -> Result<HashSet<OsString>, ImageDirectoryInputError> {
    Ok(
      self
        .list()?
        .into_iter()
        .filter_map(|path| path.file_stem().map(|stem| stem.to_os_string()))
        .collect(),
    )
  }
}

/// 以 '.' 开头的文件名，例如 `._render0.png`
fn is_hidden(path: &Path) -> bool {
  path
    .file_name()
    .and_then(|name| name.to_str())
    .map(|name| name.starts_with('.'))
    .unwrap_or(false)
}
