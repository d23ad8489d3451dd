// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input/class_manifest.rs - 类别清单
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
use tracing::{debug, info, warn};

use crate::model::ColorClassMap;

#[derive(Error, Debug)]
pub enum ClassManifestError {
  #[error("无法读取类别清单 {path}: {source}")]
  IoError {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("类别清单 {0} 为空")]
  Empty(PathBuf),
  #[error("类别清单中没有类别")]
  NoClasses,
  #[error("类别数量超出范围: {0}")]
  TooManyClasses(usize),
}

/// 每行一个类别名的清单。行数即类别总数，名字只出现在加载日志中。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassManifest {
  names: Vec<String>,
}

impl ClassManifest {
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ClassManifestError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ClassManifestError::IoError {
      path: path.to_path_buf(),
      source,
    })?;

    let manifest = Self::parse(&text);
    if manifest.is_empty() {
      return Err(ClassManifestError::Empty(path.to_path_buf()));
    }

    info!("类别清单 {} 共 {} 个类别", path.display(), manifest.len());
    for (class_id, name) in manifest.names().iter().enumerate() {
      debug!("类别 {}: {}", class_id, name);
    }
    Ok(manifest)
  }

  /// 空行同样计入类别数，与渲染端的物体计数保持一致
  pub fn parse(text: &str) -> Self {
    let names: Vec<String> = text.lines().map(|line| line.trim().to_string()).collect();

    for (index, name) in names.iter().enumerate() {
      if name.is_empty() {
        warn!("类别清单第 {} 行为空，仍作为类别 {} 计数", index + 1, index);
      }
    }

    Self { names }
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn names(&self) -> &[String] {
    &self.names
  }

  pub fn name(&self, class_id: u32) -> Option<&str> {
    self.names.get(class_id as usize).map(String::as_str)
  }

  pub fn color_map(&self) -> Result<ColorClassMap, ClassManifestError> {
    let total =
      u32::try_from(self.len()).map_err(|_| ClassManifestError::TooManyClasses(self.len()))?;
    ColorClassMap::new(total).map_err(|_| ClassManifestError::NoClasses)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn counts_lines_not_content() {
    let manifest = ClassManifest::parse("cup\n  plate \nfork\n");
    assert_eq!(manifest.len(), 3);
    assert_eq!(manifest.name(1), Some("plate"));
    assert_eq!(manifest.name(3), None);
    assert_eq!(manifest.color_map().unwrap().total_classes(), 3);
  }

  #[test]
  fn names_keep_file_order() {
    let manifest = ClassManifest::parse("cup\nplate\nfork");
    assert_eq!(manifest.names(), &["cup", "plate", "fork"]);
  }

  #[test]
  fn blank_lines_still_count() {
    let manifest = ClassManifest::parse("cup\n\nfork");
    assert_eq!(manifest.len(), 3);
    assert_eq!(manifest.name(1), Some(""));
  }

  #[test]
  fn missing_file_is_reported_with_path() {
    let err = ClassManifest::load("/definitely/not/here/classes.txt").unwrap_err();
    match err {
      ClassManifestError::IoError { path, .. } => {
        assert_eq!(path, PathBuf::from("/definitely/not/here/classes.txt"))
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn empty_text_has_no_classes() {
    let manifest = ClassManifest::parse("");
    assert!(manifest.is_empty());
    assert!(matches!(
      manifest.color_map(),
      Err(ClassManifestError::NoClasses)
    ));
  }
}
