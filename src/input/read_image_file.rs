// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input/read_image_file.rs - 图像文件解码
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

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::trace;

use crate::{
  frame::{ChannelOrder, FrameError, RgbNhwcFrame},
  input::FrameDecoder,
};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("I/O error: {0}")]
  IoError(std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(image::ImageError),
  #[error("帧构造错误: {0}")]
  FrameError(#[from] FrameError),
}

impl From<std::io::Error> for ImageFileInputError {
  fn from(err: std::io::Error) -> Self {
    ImageFileInputError::IoError(err)
  }
}

impl From<image::ImageError> for ImageFileInputError {
  fn from(err: image::ImageError) -> Self {
    ImageFileInputError::ImageLoadError(err)
  }
}

/// 基于 `image` 的解码器。格式按文件内容识别，任何位深与通道布局都转为 8 位 RGB。
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageFileDecoder;

impl FrameDecoder for ImageFileDecoder {
  type Error = ImageFileInputError;

  fn decode(&self, path: &Path) -> Result<RgbNhwcFrame, Self::Error> {
    let image = ImageReader::open(path)?
      .with_guessed_format()?
      .decode()?
      .to_rgb8();
    trace!("解码 {}: {}x{}", path.display(), image.width(), image.height());
    Ok(RgbNhwcFrame::try_from(image)?)
  }
}

impl TryFrom<RgbImage> for RgbNhwcFrame {
  type Error = FrameError;

  fn try_from(image: RgbImage) -> Result<Self, Self::Error> {
    let (width, height) = image.dimensions();
    RgbNhwcFrame::from_raw(
      width as usize,
      height as usize,
      ChannelOrder::Rgb,
      image.into_raw(),
    )
  }
}
