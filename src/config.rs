// 该文件是 Tianqi （天气识别） 项目的一部分。
// src/config.rs - 分类器与过滤器配置
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

use thiserror::Error;

use crate::model::WeatherLabel;

pub const DEFAULT_THRESHOLD: f32 = 0.5;
pub const DEFAULT_MAX_RESULTS: usize = WeatherLabel::COUNT;

pub const DEFAULT_CHANNEL_CUTOFF: u8 = 200;
pub const DEFAULT_MAX_WHITE_FRACTION: f32 = 0.8;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
  #[error("置信度阈值必须位于 [0, 1] 区间, 实际为 {0}")]
  Threshold(f32),
  #[error("白色像素比例上限必须位于 [0, 1] 区间, 实际为 {0}")]
  WhiteFraction(f32),
}

fn is_unit_interval(value: f32) -> bool {
  value.is_finite() && (0.0..=1.0).contains(&value)
}

/// 后处理配置：置信度阈值与最大结果数。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierConfig {
  threshold: f32,
  max_results: usize,
}

impl ClassifierConfig {
  pub fn new(threshold: f32, max_results: usize) -> Result<Self, ConfigError> {
    if !is_unit_interval(threshold) {
      return Err(ConfigError::Threshold(threshold));
    }
    Ok(Self {
      threshold,
      max_results,
    })
  }

  pub fn threshold(&self) -> f32 {
    self.threshold
  }

  pub fn max_results(&self) -> usize {
    self.max_results
  }
}

impl Default for ClassifierConfig {
  fn default() -> Self {
    Self {
      threshold: DEFAULT_THRESHOLD,
      max_results: DEFAULT_MAX_RESULTS,
    }
  }
}

/// 非天气图像过滤参数。
///
/// 两个常量都是经验值：通道值严格大于 `channel_cutoff` 的像素记为“近白色”，
/// 近白色像素比例严格大于 `max_white_fraction` 时判定为非天气图像。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateConfig {
  channel_cutoff: u8,
  max_white_fraction: f32,
}

impl GateConfig {
  pub fn new(channel_cutoff: u8, max_white_fraction: f32) -> Result<Self, ConfigError> {
    if !is_unit_interval(max_white_fraction) {
      return Err(ConfigError::WhiteFraction(max_white_fraction));
    }
    Ok(Self {
      channel_cutoff,
      max_white_fraction,
    })
  }

  pub fn channel_cutoff(&self) -> u8 {
    self.channel_cutoff
  }

  pub fn max_white_fraction(&self) -> f32 {
    self.max_white_fraction
  }
}

impl Default for GateConfig {
  fn default() -> Self {
    Self {
      channel_cutoff: DEFAULT_CHANNEL_CUTOFF,
      max_white_fraction: DEFAULT_MAX_WHITE_FRACTION,
    }
  }
}
