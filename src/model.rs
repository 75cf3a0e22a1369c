// 该文件是 Tianqi （天气识别） 项目的一部分。
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

use std::{fmt, time::Duration};

pub trait WithLabel: Sized + fmt::Debug {
  fn to_label_str(&self) -> &'static str;
  fn from_label_id(id: usize) -> Option<Self>;
}

/// 天气类别。判别值即模型输出向量中的下标，顺序固定，不从模型元数据推断。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeatherLabel {
  Cloudy = 0,
  Rain = 1,
  Shine = 2,
  Sunrise = 3,
}

impl WeatherLabel {
  pub const COUNT: usize = 4;

  /// 规范顺序。
  pub const ALL: [WeatherLabel; Self::COUNT] = [
    WeatherLabel::Cloudy,
    WeatherLabel::Rain,
    WeatherLabel::Shine,
    WeatherLabel::Sunrise,
  ];

  pub fn index(self) -> usize {
    self as usize
  }
}

impl WithLabel for WeatherLabel {
  fn to_label_str(&self) -> &'static str {
    match self {
      WeatherLabel::Cloudy => "cloudy",
      WeatherLabel::Rain => "rain",
      WeatherLabel::Shine => "shine",
      WeatherLabel::Sunrise => "sunrise",
    }
  }

  fn from_label_id(id: usize) -> Option<Self> {
    Self::ALL.get(id).copied()
  }
}

impl fmt::Display for WeatherLabel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.to_label_str())
  }
}

/// 模型原始输出，按规范顺序排列的四个置信度。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreVector(pub [f32; WeatherLabel::COUNT]);

impl ScoreVector {
  pub fn get(&self, label: WeatherLabel) -> f32 {
    self.0[label.index()]
  }

  /// 与标签配对后的迭代器，保持规范顺序。
  pub fn labeled(&self) -> impl Iterator<Item = (WeatherLabel, f32)> + '_ {
    WeatherLabel::ALL.into_iter().zip(self.0.iter().copied())
  }
}

impl TryFrom<&[f32]> for ScoreVector {
  type Error = usize;

  /// 长度不为 4 时返回实际长度。
  fn try_from(values: &[f32]) -> Result<Self, Self::Error> {
    <[f32; WeatherLabel::COUNT]>::try_from(values)
      .map(ScoreVector)
      .map_err(|_| values.len())
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
  pub label: WeatherLabel,
  pub score: f32,
}

impl Classification {
  pub fn label_str(&self) -> &'static str {
    self.label.to_label_str()
  }
}

/// 一次分类的最终结果：按置信度降序，已过滤、已截断。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassificationResult {
  pub items: Box<[Classification]>,
  /// 推理耗时，仅由流水线填写。
  pub inference_time: Duration,
}

impl ClassificationResult {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Classification> {
    self.items.iter()
  }

  /// 置信度最高的结果。
  pub fn top(&self) -> Option<&Classification> {
    self.items.first()
  }

  pub fn with_inference_time(mut self, inference_time: Duration) -> Self {
    self.inference_time = inference_time;
    self
  }
}

impl<'a> IntoIterator for &'a ClassificationResult {
  type Item = &'a Classification;
  type IntoIter = std::slice::Iter<'a, Classification>;

  fn into_iter(self) -> Self::IntoIter {
    self.items.iter()
  }
}

mod runtime;
mod source;
#[cfg(feature = "tract")]
mod tract;

pub use self::runtime::{
  ElementType, InferenceBackend, InferenceError, InferenceSession, ModelLoadError, ModelRuntime,
  RuntimeError, TensorRole, TensorSpec,
};
pub use self::source::{DEFAULT_MODEL_FILE, ModelSource};
#[cfg(feature = "tract")]
pub use self::tract::{TractBackend, TractSession};
