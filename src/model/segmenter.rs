// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/segmenter.rs - 颜色键控分割
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

use std::convert::Infallible;

use thiserror::Error;
use tracing::debug;

use crate::{
  frame::RgbNhwcFrame,
  model::{BoundingBox, ColorClassMap, DetectResult, Model, components},
};

/// 默认隔行隔列采样
pub const DEFAULT_STRIDE: u32 = 2;
/// 默认红色通道容差
pub const DEFAULT_TOLERANCE: f64 = 1.0;

const RED_LEVELS: usize = 256;

#[derive(Error, Debug, PartialEq)]
pub enum SegmentConfigError {
  #[error("采样步长必须大于 0")]
  ZeroStride,
  #[error("容差必须是非负有限数: {0}")]
  InvalidTolerance(f64),
}

/// 同一类别的多个区域如何输出
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SegmentMode {
  /// 每个类别一个外接框，不区分分离的区域
  #[default]
  Merged,
  /// 采样网格上的连通区域各自一个框
  Components,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentConfig {
  pub stride: u32,
  pub tolerance: f64,
  pub mode: SegmentMode,
}

impl Default for SegmentConfig {
  fn default() -> Self {
    Self {
      stride: DEFAULT_STRIDE,
      tolerance: DEFAULT_TOLERANCE,
      mode: SegmentMode::Merged,
    }
  }
}

impl SegmentConfig {
  pub fn with_stride(mut self, stride: u32) -> Self {
    self.stride = stride;
    self
  }

  pub fn with_tolerance(mut self, tolerance: f64) -> Self {
    self.tolerance = tolerance;
    self
  }

  pub fn with_mode(mut self, mode: SegmentMode) -> Self {
    self.mode = mode;
    self
  }

  pub fn validate(&self) -> Result<(), SegmentConfigError> {
    if self.stride == 0 {
      return Err(SegmentConfigError::ZeroStride);
    }
    if !self.tolerance.is_finite() || self.tolerance < 0.0 {
      return Err(SegmentConfigError::InvalidTolerance(self.tolerance));
    }
    Ok(())
  }
}

/// 按红色通道强度把像素归入类别，并求出每个类别的包围框。
///
/// 构造时为 256 个红色强度预先计算命中的类别列表，
/// 扫描时只需一次遍历采样网格；结果与逐类别扫描逐位一致。
#[derive(Debug, Clone)]
pub struct ColorKeySegmenter {
  map: ColorClassMap,
  config: SegmentConfig,
  lookup: Box<[Box<[u32]>]>,
}

impl ColorKeySegmenter {
  pub fn new(map: ColorClassMap, config: SegmentConfig) -> Result<Self, SegmentConfigError> {
    config.validate()?;

    let lookup: Box<[Box<[u32]>]> = (0..RED_LEVELS)
      .map(|red| {
        (0..map.total_classes())
          .filter(|&class| map.matches(class, red as f64, config.tolerance))
          .collect()
      })
      .collect();

    let ambiguous = lookup.iter().filter(|classes| classes.len() > 1).count();
    if ambiguous > 0 {
      debug!(
        "{} 个红色强度同时命中多个类别（类别数 {}, 容差 {}）",
        ambiguous,
        map.total_classes(),
        config.tolerance
      );
    }

    Ok(Self {
      map,
      config,
      lookup,
    })
  }

  pub fn config(&self) -> &SegmentConfig {
    &self.config
  }

  pub(crate) fn classes_for(&self, red: u8) -> &[u32] {
    &self.lookup[red as usize]
  }

  /// 分割一帧，按类别升序返回包围框
  pub fn segment(&self, frame: &RgbNhwcFrame) -> DetectResult {
    let merged = self.scan_merged(frame);

    let items = match self.config.mode {
      SegmentMode::Merged => merged,
      SegmentMode::Components => merged
        .iter()
        .flat_map(|bbox| components::split_class(self, frame, bbox))
        .collect(),
    };

    DetectResult {
      width: frame.width() as u32,
      height: frame.height() as u32,
      items: items.into_boxed_slice(),
    }
  }

  fn scan_merged(&self, frame: &RgbNhwcFrame) -> Vec<BoundingBox> {
    let stride = self.config.stride as usize;
    let red_index = frame.channel_order().red_index();
    let mut boxes: Vec<Option<BoundingBox>> = vec![None; self.map.total_classes() as usize];

    for y in (0..frame.height()).step_by(stride) {
      let row = frame.row(y);
      for (x, pixel) in row.chunks_exact(frame.channels()).enumerate().step_by(stride) {
        for &class in self.classes_for(pixel[red_index]) {
          match &mut boxes[class as usize] {
            Some(bbox) => bbox.extend(x as u32, y as u32),
            slot @ None => *slot = Some(BoundingBox::seed(class, x as u32, y as u32)),
          }
        }
      }
    }

    boxes.into_iter().flatten().collect()
  }
}

impl Model for ColorKeySegmenter {
  type Input = RgbNhwcFrame;
  type Output = DetectResult;
  type Error = Infallible;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    Ok(self.segment(input))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::ChannelOrder;

  /// 逐类别扫描的直接实现，用于对照
  fn segment_per_class(frame: &RgbNhwcFrame, total: u32) -> Vec<BoundingBox> {
    let map = ColorClassMap::new(total).unwrap();
    let mut result = Vec::new();
    for class in 0..total {
      let (mut top, mut bottom, mut left, mut right) = (frame.height(), 0, frame.width(), 0);
      let mut found = false;
      for y in (0..frame.height()).step_by(2) {
        for x in (0..frame.width()).step_by(2) {
          let r = frame.red_at(x, y) as f64;
          if map.matches(class, r, 1.0) {
            found = true;
            top = top.min(y);
            bottom = bottom.max(y);
            left = left.min(x);
            right = right.max(x);
          }
        }
      }
      if found {
        result.push(BoundingBox {
          class_id: class,
          x_min: left as u32,
          x_max: right as u32,
          y_min: top as u32,
          y_max: bottom as u32,
        });
      }
    }
    result
  }

  fn fill(frame: &mut RgbNhwcFrame, x0: usize, y0: usize, x1: usize, y1: usize, red: u8) {
    for y in y0..=y1 {
      for x in x0..=x1 {
        frame.put_pixel(x, y, [red, 0, 0]);
      }
    }
  }

  fn segmenter(total: u32) -> ColorKeySegmenter {
    ColorKeySegmenter::new(ColorClassMap::new(total).unwrap(), SegmentConfig::default()).unwrap()
  }

  #[test]
  fn single_rectangle_yields_one_box() {
    let total = 5;
    let red = ref_red_u8(2, total);
    let mut frame = RgbNhwcFrame::with_shape(60, 80);
    fill(&mut frame, 10, 20, 30, 40, red);

    let result = segmenter(total).segment(&frame);

    assert_eq!(result.width, 80);
    assert_eq!(result.height, 60);
    assert_eq!(
      &*result.items,
      &[BoundingBox {
        class_id: 2,
        x_min: 10,
        x_max: 30,
        y_min: 20,
        y_max: 40,
      }]
    );
  }

  #[test]
  fn odd_edges_snap_to_sampling_grid() {
    let total = 1;
    let mut frame = RgbNhwcFrame::with_shape(20, 20);
    fill(&mut frame, 3, 5, 9, 11, 255);

    let result = segmenter(total).segment(&frame);
    let bbox = result.items[0];
    assert_eq!((bbox.x_min, bbox.x_max), (4, 8));
    assert_eq!((bbox.y_min, bbox.y_max), (6, 10));
  }

  #[test]
  fn blank_frame_yields_nothing() {
    let frame = RgbNhwcFrame::with_shape(32, 32);
    let result = segmenter(4).segment(&frame);
    assert!(result.is_empty());
  }

  #[test]
  fn disjoint_regions_merge_by_default() {
    let total = 2;
    let red = ref_red_u8(0, total);
    let mut frame = RgbNhwcFrame::with_shape(40, 40);
    fill(&mut frame, 0, 0, 4, 4, red);
    fill(&mut frame, 30, 30, 36, 36, red);

    let result = segmenter(total).segment(&frame);
    assert_eq!(result.len(), 1);
    let bbox = result.items[0];
    assert_eq!((bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max), (0, 0, 36, 36));
  }

  #[test]
  fn lookup_scan_matches_per_class_scan() {
    // 类别足够多时相邻类别的容差窗口会重叠
    for total in [1u32, 3, 7, 60, 200, 300] {
      let mut frame = RgbNhwcFrame::with_shape(37, 41);
      for y in 0..37 {
        for x in 0..41 {
          let red = ((x * 7 + y * 13) % 256) as u8;
          frame.put_pixel(x, y, [red, 0, 0]);
        }
      }
      let expected = segment_per_class(&frame, total);
      let result = segmenter(total).segment(&frame);
      assert_eq!(&*result.items, expected.as_slice(), "total {total}");
    }
  }

  #[test]
  fn bgr_frames_read_red_from_last_channel() {
    let total = 3;
    let red = ref_red_u8(1, total);
    let mut data = vec![0u8; 8 * 8 * 3];
    // 蓝色通道写入目标值不应被识别
    for pixel in data.chunks_exact_mut(3) {
      pixel[0] = red;
    }
    let frame = RgbNhwcFrame::from_raw(8, 8, ChannelOrder::Bgr, data).unwrap();
    assert!(segmenter(total).segment(&frame).is_empty());

    let mut frame = RgbNhwcFrame::from_raw(8, 8, ChannelOrder::Bgr, vec![0; 8 * 8 * 3]).unwrap();
    frame.put_pixel(2, 4, [red, 0, 0]);
    let result = segmenter(total).segment(&frame);
    assert_eq!(&*result.items, &[BoundingBox::seed(1, 2, 4)]);
  }

  #[test]
  fn stride_one_sees_every_pixel() {
    let total = 1;
    let mut frame = RgbNhwcFrame::with_shape(10, 10);
    frame.put_pixel(3, 7, [255, 0, 0]);

    let coarse = segmenter(total).segment(&frame);
    assert!(coarse.is_empty());

    let fine = ColorKeySegmenter::new(
      ColorClassMap::new(total).unwrap(),
      SegmentConfig::default().with_stride(1),
    )
    .unwrap()
    .segment(&frame);
    assert_eq!(&*fine.items, &[BoundingBox::seed(0, 3, 7)]);
  }

  #[test]
  fn zero_tolerance_requires_exact_reference() {
    let map = ColorClassMap::new(2).unwrap();
    let segmenter =
      ColorKeySegmenter::new(map, SegmentConfig::default().with_tolerance(0.0)).unwrap();
    // 第一个类别的参考值是 127.5，任何整数强度都不会命中
    assert!(segmenter.classes_for(127).is_empty());
    assert!(segmenter.classes_for(128).is_empty());
    assert_eq!(segmenter.classes_for(255), &[1]);
  }

  #[test]
  fn rejects_invalid_config() {
    let map = ColorClassMap::new(2).unwrap();
    assert_eq!(
      ColorKeySegmenter::new(map, SegmentConfig::default().with_stride(0)).unwrap_err(),
      SegmentConfigError::ZeroStride
    );
    assert!(matches!(
      ColorKeySegmenter::new(map, SegmentConfig::default().with_tolerance(-1.0)).unwrap_err(),
      SegmentConfigError::InvalidTolerance(_)
    ));
    assert!(ColorKeySegmenter::new(map, SegmentConfig::default().with_tolerance(f64::NAN)).is_err());
  }

  fn ref_red_u8(class: u32, total: u32) -> u8 {
    crate::model::ref_red(class, total).round() as u8
  }
}
