// 该文件是 Tianqi （天气识别） 项目的一部分。
// tests/support/mod.rs - 测试用推理后端
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

use std::{cell::Cell, rc::Rc};

use image::{Rgb, RgbImage};
use tianqi::model::{InferenceBackend, InferenceSession, ModelSource, TensorSpec};

/// 调用计数，在测试与后端之间共享。
#[derive(Debug, Default, Clone)]
pub struct Counters {
  pub loads: Rc<Cell<usize>>,
  pub runs: Rc<Cell<usize>>,
  /// 接下来还有多少次加载会失败。
  pub failing_loads: Rc<Cell<usize>>,
}

pub struct FakeSession {
  input: TensorSpec,
  output: TensorSpec,
  scores: Vec<f32>,
  runs: Rc<Cell<usize>>,
}

impl InferenceSession for FakeSession {
  fn input_spec(&self) -> &TensorSpec {
    &self.input
  }

  fn output_spec(&self) -> &TensorSpec {
    &self.output
  }

  fn run(&mut self, input: &[f32]) -> anyhow::Result<Vec<f32>> {
    self.runs.set(self.runs.get() + 1);
    anyhow::ensure!(input.len() == 224 * 224 * 3, "bad input length");
    Ok(self.scores.clone())
  }
}

pub struct FakeBackend {
  pub input_shape: Vec<usize>,
  pub output_shape: Vec<usize>,
  pub scores: Vec<f32>,
  pub counters: Counters,
}

impl FakeBackend {
  pub fn new(scores: &[f32]) -> Self {
    Self {
      input_shape: vec![1, 224, 224, 3],
      output_shape: vec![1, 4],
      scores: scores.to_vec(),
      counters: Counters::default(),
    }
  }

  pub fn with_output_shape(mut self, shape: &[usize]) -> Self {
    self.output_shape = shape.to_vec();
    self
  }

  pub fn with_input_shape(mut self, shape: &[usize]) -> Self {
    self.input_shape = shape.to_vec();
    self
  }

  pub fn counters(&self) -> Counters {
    self.counters.clone()
  }
}

impl InferenceBackend for FakeBackend {
  type Session = FakeSession;

  fn load(&self, _model: &[u8]) -> anyhow::Result<FakeSession> {
    self.counters.loads.set(self.counters.loads.get() + 1);
    let failing = self.counters.failing_loads.get();
    if failing > 0 {
      self.counters.failing_loads.set(failing - 1);
      anyhow::bail!("simulated load failure");
    }

    Ok(FakeSession {
      input: TensorSpec::f32(&self.input_shape),
      output: TensorSpec::f32(&self.output_shape),
      scores: self.scores.clone(),
      runs: self.counters.runs.clone(),
    })
  }
}

pub fn model_bytes() -> ModelSource {
  ModelSource::from(b"fake-model".to_vec())
}

/// 天空蓝色渐变，近白色像素为零。
pub fn sky(width: u32, height: u32) -> RgbImage {
  RgbImage::from_fn(width, height, |_, y| {
    Rgb([40, 90 + (y % 100) as u8, 200])
  })
}

/// 前 `white_percent`% 的行为纯白色。
pub fn partly_white(white_percent: u32) -> RgbImage {
  RgbImage::from_fn(10, 100, |_, y| {
    if y < white_percent {
      Rgb([255, 255, 255])
    } else {
      Rgb([20, 20, 20])
    }
  })
}
