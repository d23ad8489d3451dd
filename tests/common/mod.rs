// 该文件是 Shanan （山南西风） 项目的一部分。
// tests/common/mod.rs - 测试辅助函数
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

#![allow(dead_code)]

use std::{
  path::{Path, PathBuf},
  sync::atomic::{AtomicUsize, Ordering},
};

use image::{Rgb, RgbImage};
use shanan_label::model::ref_red;

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// 每个测试独占的临时目录，析构时删除
pub struct Scratch {
  root: PathBuf,
}

impl Scratch {
  pub fn new(name: &str) -> Self {
    let root = std::env::temp_dir().join(format!(
      "shanan-label-{}-{}-{}",
      name,
      std::process::id(),
      COUNTER.fetch_add(1, Ordering::SeqCst)
    ));
    if root.exists() {
      std::fs::remove_dir_all(&root).unwrap();
    }
    std::fs::create_dir_all(&root).unwrap();
    Self { root }
  }

  pub fn path(&self) -> &Path {
    &self.root
  }

  pub fn dir(&self, name: &str) -> PathBuf {
    let dir = self.root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    dir
  }

  pub fn classes(&self, names: &[&str]) -> PathBuf {
    let path = self.root.join("classes.txt");
    let mut text = names.join("\n");
    text.push('\n');
    std::fs::write(&path, text).unwrap();
    path
  }
}

impl Drop for Scratch {
  fn drop(&mut self) {
    let _ = std::fs::remove_dir_all(&self.root);
  }
}

/// 最接近参考强度的 8 位值
pub fn key_red(class: u32, total: u32) -> u8 {
  ref_red(class, total).round() as u8
}

/// 背景为黑色，按 (类别, x0, y0, x1, y1) 填充闭区间矩形
pub fn keyed_image(
  width: u32,
  height: u32,
  total: u32,
  rects: &[(u32, u32, u32, u32, u32)],
) -> RgbImage {
  let mut image = RgbImage::new(width, height);
  for &(class, x0, y0, x1, y1) in rects {
    let red = key_red(class, total);
    for y in y0..=y1 {
      for x in x0..=x1 {
        image.put_pixel(x, y, Rgb([red, 0, 0]));
      }
    }
  }
  image
}

pub fn save_png(image: &RgbImage, path: &Path) {
  image.save(path).unwrap();
}
