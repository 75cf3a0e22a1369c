// 该文件是 Tianqi （天气识别） 项目的一部分。
// src/gate.rs - 非天气图像过滤
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

use image::RgbImage;
use tracing::debug;

use crate::config::GateConfig;

/// 基于近白色像素比例的粗略过滤器，在推理前拒绝空白、过曝等非照片输入。
#[derive(Debug, Clone, Copy, Default)]
pub struct WeatherGate {
  config: GateConfig,
}

impl WeatherGate {
  pub fn new(config: GateConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &GateConfig {
    &self.config
  }

  /// 三个通道都严格大于阈值的像素所占比例。空图像返回 1.0。
  pub fn white_fraction(&self, image: &RgbImage) -> f32 {
    let total = image.width() as u64 * image.height() as u64;
    if total == 0 {
      return 1.0;
    }

    let cutoff = self.config.channel_cutoff();
    let white = image
      .pixels()
      .filter(|pixel| pixel.0.iter().all(|&channel| channel > cutoff))
      .count() as u64;

    (white as f64 / total as f64) as f32
  }

  pub fn is_likely_non_weather(&self, image: &RgbImage) -> bool {
    self.reject(image).is_some()
  }

  /// 判定为非天气图像时返回近白色像素比例。
  pub fn reject(&self, image: &RgbImage) -> Option<f32> {
    let fraction = self.white_fraction(image);
    let rejected = fraction > self.config.max_white_fraction();
    debug!(
      "近白色像素比例: {:.3}, 上限: {:.3}, 判定为非天气图像: {}",
      fraction,
      self.config.max_white_fraction(),
      rejected
    );
    rejected.then_some(fraction)
  }
}
