// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/color_key.rs - 类别颜色映射
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

//! 渲染端与标注端共享的颜色协议。
//!
//! 第 `i` 个物体（共 `N` 个）的自发光材质红色通道为
//! `(i + 1) * (255 / N)`。两端必须以完全相同的浮点运算顺序计算该值，
//! 否则 ±1 的容差窗口会在边界处产生偏差。

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ColorKeyError {
  #[error("类别总数必须至少为 1")]
  NoClasses,
}

/// 第 `class_index` 个类别的参考红色强度
pub fn ref_red(class_index: u32, total_classes: u32) -> f64 {
  let delta_red = 255.0 / total_classes as f64;
  (class_index as f64 + 1.0) * delta_red
}

/// 渲染端自发光材质颜色（线性 RGBA，0..1）
pub fn emission_rgba(class_index: u32, total_classes: u32) -> [f32; 4] {
  let r = ref_red(class_index, total_classes) / 255.0;
  [r as f32, 0.0, 0.0, 1.0]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorClassMap {
  total_classes: u32,
}

impl ColorClassMap {
  pub fn new(total_classes: u32) -> Result<Self, ColorKeyError> {
    if total_classes == 0 {
      return Err(ColorKeyError::NoClasses);
    }
    Ok(Self { total_classes })
  }

  pub fn total_classes(&self) -> u32 {
    self.total_classes
  }

  pub fn reference(&self, class_index: u32) -> f64 {
    ref_red(class_index, self.total_classes)
  }

  /// `target - tolerance <= intensity <= target + tolerance`，两端闭区间
  pub fn matches(&self, class_index: u32, intensity: f64, tolerance: f64) -> bool {
    let target = self.reference(class_index);
    target - tolerance <= intensity && intensity <= target + tolerance
  }

  pub fn emission_rgba(&self, class_index: u32) -> [f32; 4] {
    emission_rgba(class_index, self.total_classes)
  }

  /// 按类别顺序给出 (类别, 参考强度)
  pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
    (0..self.total_classes).map(|c| (c, self.reference(c)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reference_is_monotonic_and_in_range() {
    for total in 1..=300u32 {
      let map = ColorClassMap::new(total).unwrap();
      let mut last = 0.0;
      for (class, red) in map.iter() {
        assert!(red > last, "total {total} class {class}: {red} <= {last}");
        // 最后一个类别可能因浮点舍入比 255 多一个 ulp
        assert!(red <= 255.0 + 1e-9, "total {total} class {class}: {red}");
        last = red;
      }
    }
  }

  #[test]
  fn reference_matches_known_values() {
    assert_eq!(ref_red(0, 1), 255.0);
    assert_eq!(ref_red(0, 3), 85.0);
    assert_eq!(ref_red(2, 3), 255.0);
    assert_eq!(ref_red(0, 2), 127.5);
  }

  #[test]
  fn tolerance_window_is_inclusive() {
    let map = ColorClassMap::new(3).unwrap();
    let target = map.reference(0);

    assert!(map.matches(0, target + 1.0, 1.0));
    assert!(map.matches(0, target - 1.0, 1.0));
    assert!(!map.matches(0, target + 1.001, 1.0));
    assert!(!map.matches(0, target - 1.001, 1.0));
  }

  #[test]
  fn rejects_zero_classes() {
    assert_eq!(ColorClassMap::new(0), Err(ColorKeyError::NoClasses));
  }

  #[test]
  fn emission_color_is_pure_red() {
    let map = ColorClassMap::new(5).unwrap();
    let [r, g, b, a] = map.emission_rgba(4);
    assert!((r - 1.0).abs() < 1e-6);
    assert_eq!((g, b, a), (0.0, 0.0, 1.0));
    let [r0, ..] = map.emission_rgba(0);
    assert!((r0 - 0.2).abs() < 1e-6);
  }
}
