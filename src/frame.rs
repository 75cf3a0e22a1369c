// 该文件是 Tianqi （天气识别） 项目的一部分。
// src/frame.rs - NHWC 浮点张量定义
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

pub const RGB_CHANNELS: usize = 3;

pub const MODEL_INPUT_W: u32 = 224;
pub const MODEL_INPUT_H: u32 = 224;

/// 模型输入：1×224×224×3 的 f32 张量。
pub type ModelInput = RgbNhwcTensor<MODEL_INPUT_W, MODEL_INPUT_H>;

/// 按行优先、通道交错（R,G,B）排列的归一化浮点张量，批大小固定为 1。
#[derive(Debug, Clone, PartialEq)]
pub struct RgbNhwcTensor<const W: u32, const H: u32> {
  data: Box<[f32]>,
}

impl<const W: u32, const H: u32> RgbNhwcTensor<W, H> {
  pub const LEN: usize = RGB_CHANNELS * W as usize * H as usize;

  /// 张量形状 `[N, H, W, C]`。
  pub fn shape() -> [usize; 4] {
    [1, H as usize, W as usize, RGB_CHANNELS]
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  /// 读取 `(x, y)` 处像素的三个通道值。
  pub fn pixel(&self, x: usize, y: usize) -> [f32; RGB_CHANNELS] {
    let base = (y * W as usize + x) * RGB_CHANNELS;
    [self.data[base], self.data[base + 1], self.data[base + 2]]
  }
}

impl<const W: u32, const H: u32> TryFrom<Vec<f32>> for RgbNhwcTensor<W, H> {
  type Error = Vec<f32>;

  /// 长度不符时原样退回数据。
  fn try_from(data: Vec<f32>) -> Result<Self, Self::Error> {
    if data.len() != Self::LEN {
      return Err(data);
    }

    Ok(Self {
      data: data.into_boxed_slice(),
    })
  }
}

impl<const W: u32, const H: u32> Default for RgbNhwcTensor<W, H> {
  fn default() -> Self {
    let data = vec![0.0f32; Self::LEN].into_boxed_slice();
    Self { data }
  }
}

impl<const W: u32, const H: u32> AsMut<[f32]> for RgbNhwcTensor<W, H> {
  fn as_mut(&mut self) -> &mut [f32] {
    &mut self.data
  }
}

impl<const W: u32, const H: u32> AsRef<[f32]> for RgbNhwcTensor<W, H> {
  fn as_ref(&self) -> &[f32] {
    &self.data
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn model_input_has_expected_length_and_shape() {
    assert_eq!(ModelInput::LEN, 150_528);
    assert_eq!(ModelInput::shape(), [1, 224, 224, 3]);
    assert_eq!(ModelInput::default().len(), 150_528);
  }

  #[test]
  fn try_from_rejects_wrong_length() {
    let short = vec![0.0f32; 10];
    let returned = RgbNhwcTensor::<2, 2>::try_from(short).unwrap_err();
    assert_eq!(returned.len(), 10);
  }

  #[test]
  fn pixel_reads_interleaved_channels() {
    let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
    let tensor = RgbNhwcTensor::<2, 2>::try_from(data).unwrap();
    assert_eq!(tensor.pixel(0, 0), [0.0, 1.0, 2.0]);
    assert_eq!(tensor.pixel(1, 0), [3.0, 4.0, 5.0]);
    assert_eq!(tensor.pixel(0, 1), [6.0, 7.0, 8.0]);
  }
}
