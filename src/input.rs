// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input.rs - 图像输入
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

use std::path::Path;

use crate::frame::RgbNhwcFrame;

/// 把一个图像文件解码为帧
pub trait FrameDecoder {
  type Error: std::error::Error + Send + Sync + 'static;

  fn decode(&self, path: &Path) -> Result<RgbNhwcFrame, Self::Error>;
}

mod class_manifest;
pub use self::class_manifest::{ClassManifest, ClassManifestError};

mod image_directory;
pub use self::image_directory::{
  DEFAULT_EXTENSIONS, ImageDirectoryInput, ImageDirectoryInputError,
};

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{ImageFileDecoder, ImageFileInputError};
