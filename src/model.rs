// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model.rs - 模型
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

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 像素坐标下的包围框，四条边均为命中像素的坐标（闭区间）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
  pub class_id: u32,
  pub x_min: u32,
  pub x_max: u32,
  pub y_min: u32,
  pub y_max: u32,
}

impl BoundingBox {
  /// 以单个命中像素开始一个包围框
  pub fn seed(class_id: u32, x: u32, y: u32) -> Self {
    Self {
      class_id,
      x_min: x,
      x_max: x,
      y_min: y,
      y_max: y,
    }
  }

  pub fn extend(&mut self, x: u32, y: u32) {
    self.x_min = self.x_min.min(x);
    self.x_max = self.x_max.max(x);
    self.y_min = self.y_min.min(y);
    self.y_max = self.y_max.max(y);
  }
}

/// 单帧的检测结果，附带用于归一化的图像尺寸
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectResult {
  pub width: u32,
  pub height: u32,
  pub items: Box<[BoundingBox]>,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }
}

mod color_key;
pub use self::color_key::{ColorClassMap, ColorKeyError, emission_rgba, ref_red};

mod components;

mod segmenter;
pub use self::segmenter::{
  ColorKeySegmenter, DEFAULT_STRIDE, DEFAULT_TOLERANCE, SegmentConfig, SegmentConfigError,
  SegmentMode,
};
