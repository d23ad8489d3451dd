// 该文件是 Shanan （山南西风） 项目的一部分。
// src/frame.rs - NHWC 帧定义
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

use thiserror::Error;

const RGB_CHANNELS: usize = 3;

/// 像素内三个通道的排列顺序
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChannelOrder {
  #[default]
  Rgb,
  Bgr,
}

impl ChannelOrder {
  /// 红色通道在像素三元组中的下标
  pub const fn red_index(self) -> usize {
    match self {
      ChannelOrder::Rgb => 0,
      ChannelOrder::Bgr => 2,
    }
  }
}

#[derive(Error, Debug)]
pub enum FrameError {
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
}

/// 已解码的 8 位三通道交错帧
#[derive(Debug, Clone)]
pub struct RgbNhwcFrame {
  data: Box<[u8]>,
  width: usize,
  height: usize,
  order: ChannelOrder,
}

impl RgbNhwcFrame {
  pub fn with_shape(height: usize, width: usize) -> Self {
    let size = RGB_CHANNELS * width * height;
    Self {
      data: vec![0u8; size].into_boxed_slice(),
      width,
      height,
      order: ChannelOrder::Rgb,
    }
  }

  pub fn from_raw(
    width: usize,
    height: usize,
    order: ChannelOrder,
    data: Vec<u8>,
  ) -> Result<Self, FrameError> {
    let expected = RGB_CHANNELS * width * height;
    if data.len() != expected {
      return Err(FrameError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      data: data.into_boxed_slice(),
      width,
      height,
      order,
    })
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn channel_order(&self) -> ChannelOrder {
    self.order
  }

  /// 第 `y` 行的交错像素数据
  pub fn row(&self, y: usize) -> &[u8] {
    let stride = self.width * RGB_CHANNELS;
    &self.data[y * stride..(y + 1) * stride]
  }

  /// 读取 (x, y) 处的红色通道强度
  pub fn red_at(&self, x: usize, y: usize) -> u8 {
    self.row(y)[x * RGB_CHANNELS + self.order.red_index()]
  }

  pub fn put_pixel(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
    let offset = (y * self.width + x) * RGB_CHANNELS;
    let pixel = match self.order {
      ChannelOrder::Rgb => rgb,
      ChannelOrder::Bgr => [rgb[2], rgb[1], rgb[0]],
    };
    self.data[offset..offset + RGB_CHANNELS].copy_from_slice(&pixel);
  }
}

impl AsRef<[u8]> for RgbNhwcFrame {
  fn as_ref(&self) -> &[u8] {
    &self.data
  }
}
