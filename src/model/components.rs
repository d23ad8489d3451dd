// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/components.rs - 采样网格上的连通区域
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

use crate::{
  frame::RgbNhwcFrame,
  model::{BoundingBox, ColorKeySegmenter},
};

/// 把一个类别的外接框拆成若干连通区域的框。
///
/// 只在 `merged` 覆盖的采样格上建立掩码，相邻采样格（含对角）视为连通。
/// 输出按区域在光栅顺序中首次出现的位置排列。
pub(crate) fn split_class(
  segmenter: &ColorKeySegmenter,
  frame: &RgbNhwcFrame,
  merged: &BoundingBox,
) -> Vec<BoundingBox> {
  let stride = segmenter.config().stride;
  let class = merged.class_id;
  let red_index = frame.channel_order().red_index();

  // 外接框的边必然落在采样格上
  let gx0 = merged.x_min / stride;
  let gy0 = merged.y_min / stride;
  let grid_w = (merged.x_max / stride - gx0 + 1) as usize;
  let grid_h = (merged.y_max / stride - gy0 + 1) as usize;

  let to_pixel = |gx: usize, gy: usize| {
    (
      (gx0 + gx as u32) * stride,
      (gy0 + gy as u32) * stride,
    )
  };

  let mut mask = vec![false; grid_w * grid_h];
  for gy in 0..grid_h {
    for gx in 0..grid_w {
      let (x, y) = to_pixel(gx, gy);
      let red = frame.row(y as usize)[x as usize * frame.channels() + red_index];
      mask[gy * grid_w + gx] = segmenter.classes_for(red).contains(&class);
    }
  }

  let mut visited = vec![false; grid_w * grid_h];
  let mut boxes = Vec::new();
  let mut stack = Vec::new();

  for seed in 0..mask.len() {
    if !mask[seed] || visited[seed] {
      continue;
    }

    visited[seed] = true;
    stack.push(seed);
    let (x, y) = to_pixel(seed % grid_w, seed / grid_w);
    let mut bbox = BoundingBox::seed(class, x, y);

    while let Some(current) = stack.pop() {
      let (cx, cy) = (current % grid_w, current / grid_w);
      let (x, y) = to_pixel(cx, cy);
      bbox.extend(x, y);

      for dy in -1i64..=1 {
        for dx in -1i64..=1 {
          if dx == 0 && dy == 0 {
            continue;
          }
          let nx = cx as i64 + dx;
          let ny = cy as i64 + dy;
          if nx < 0 || ny < 0 || nx >= grid_w as i64 || ny >= grid_h as i64 {
            continue;
          }
          let next = ny as usize * grid_w + nx as usize;
          if mask[next] && !visited[next] {
            visited[next] = true;
            stack.push(next);
          }
        }
      }
    }

    boxes.push(bbox);
  }

  boxes
}
