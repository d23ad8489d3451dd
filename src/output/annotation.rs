// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/annotation.rs - YOLO 标注编码
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

//! 标注行格式：`<类别> <中心x> <中心y> <宽> <高> \n`，几何量按图像宽高归一化，
//! 行尾空格是下游训练工具依赖的既有格式。

use std::fmt;

use crate::model::{BoundingBox, DetectResult};

/// 归一化后的一条标注
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotationRecord {
  pub class_id: u32,
  pub center_x: f64,
  pub center_y: f64,
  pub width: f64,
  pub height: f64,
}

impl AnnotationRecord {
  pub fn from_box(bbox: &BoundingBox, image_width: u32, image_height: u32) -> Self {
    let (left, right) = (bbox.x_min as f64, bbox.x_max as f64);
    let (top, bottom) = (bbox.y_min as f64, bbox.y_max as f64);
    let (image_width, image_height) = (image_width as f64, image_height as f64);

    Self {
      class_id: bbox.class_id,
      center_x: (right + left) / 2.0 / image_width,
      center_y: (top + bottom) / 2.0 / image_height,
      width: (right - left) / image_width,
      height: (bottom - top) / image_height,
    }
  }

  /// 还原为像素坐标 `[x_min, y_min, x_max, y_max]`
  pub fn to_pixels(&self, image_width: u32, image_height: u32) -> [f64; 4] {
    let (w, h) = (image_width as f64, image_height as f64);
    let (cx, cy) = (self.center_x * w, self.center_y * h);
    let (half_w, half_h) = (self.width * w / 2.0, self.height * h / 2.0);
    [cx - half_w, cy - half_h, cx + half_w, cy + half_h]
  }
}

impl fmt::Display for AnnotationRecord {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(
      f,
      "{} {} {} {} {} ",
      self.class_id,
      Decimal(self.center_x),
      Decimal(self.center_y),
      Decimal(self.width),
      Decimal(self.height)
    )
  }
}

/// 最短可往返的十进制表示：整数值保留 `.0`，小于 1e-4 的值用两位指数的科学计数法
struct Decimal(f64);

impl fmt::Display for Decimal {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let value = self.0;
    if !value.is_finite() {
      return write!(f, "{}", value);
    }
    if value != 0.0 && value.abs() < 1e-4 {
      let text = format!("{:e}", value);
      let (mantissa, exponent) = text.split_once('e').unwrap_or((text.as_str(), "0"));
      let (sign, digits) = match exponent.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exponent),
      };
      return write!(f, "{}e{}{:0>2}", mantissa, sign, digits);
    }
    if value.fract() == 0.0 {
      write!(f, "{:.1}", value)
    } else {
      write!(f, "{}", value)
    }
  }
}

/// 按结果中包围框的顺序生成标注
pub fn encode(result: &DetectResult) -> Vec<AnnotationRecord> {
  result
    .items
    .iter()
    .map(|bbox| AnnotationRecord::from_box(bbox, result.width, result.height))
    .collect()
}

/// 每条标注一行；没有标注时返回空串
pub fn serialize(records: &[AnnotationRecord]) -> String {
  records.iter().map(|record| record.to_string()).collect()
}
