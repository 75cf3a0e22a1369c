// 该文件是 Tianqi （天气识别） 项目的一部分。
// src/preprocess.rs - 图像预处理
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

use image::{
  RgbImage,
  imageops::{self, FilterType},
};
use tracing::debug;

use crate::frame::{ModelInput, RgbNhwcTensor};

/// 最近邻缩放，按像素中心取样，不做平滑。空图像得到全黑图像。
///
/// 必须与训练时的采样方式一致。
pub fn resize_nearest(image: &RgbImage, width: u32, height: u32) -> RgbImage {
  imageops::resize(image, width, height, FilterType::Nearest)
}

/// 把任意尺寸的 RGB 图像转换成模型输入张量。
#[derive(Debug, Clone, Copy, Default)]
pub struct Preprocessor;

impl Preprocessor {
  pub fn prepare(&self, image: &RgbImage) -> ModelInput {
    prepare_nhwc(image)
  }
}

/// 缩放到 `W×H` 后逐像素写入 R/255, G/255, B/255，不做均值方差归一化。
///
/// 空图像得到全零张量。
pub fn prepare_nhwc<const W: u32, const H: u32>(image: &RgbImage) -> RgbNhwcTensor<W, H> {
  debug!(
    "预处理图像: {}x{} -> {}x{}",
    image.width(),
    image.height(),
    W,
    H
  );
  let resized = resize_nearest(image, W, H);

  let mut tensor = RgbNhwcTensor::<W, H>::default();
  let slice = tensor.as_mut();
  for (dst, &value) in slice.iter_mut().zip(resized.as_raw().iter()) {
    *dst = value as f32 / 255.0;
  }
  tensor
}
