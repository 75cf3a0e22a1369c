// 该文件是 Tianqi （天气识别） 项目的一部分。
// src/model/tract.rs - tract ONNX 推理后端
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

use anyhow::Context as _;
use tracing::debug;
use tract_onnx::prelude::*;

use crate::model::{ElementType, InferenceBackend, InferenceSession, TensorSpec};

const TRACT_NUM_INPUTS: usize = 1;
const TRACT_NUM_OUTPUTS: usize = 1;

/// 基于 tract-onnx 的纯 Rust 推理后端。
#[derive(Debug, Clone, Default)]
pub struct TractBackend;

pub struct TractSession {
  plan: TypedRunnableModel<TypedModel>,
  input: TensorSpec,
  output: TensorSpec,
}

// 符号化的批维度按 1 处理，其他符号维度记为 0，交给形状校验拒绝。
fn spec_of(fact: &TypedFact) -> TensorSpec {
  let shape = fact
    .shape
    .iter()
    .enumerate()
    .map(|(axis, dim)| match dim.to_i64() {
      Ok(value) if value >= 0 => value as usize,
      _ if axis == 0 => 1,
      _ => 0,
    })
    .collect();

  let element = match fact.datum_type {
    DatumType::F32 => ElementType::Float32,
    DatumType::U8 => ElementType::UInt8,
    other => ElementType::Other(format!("{:?}", other)),
  };

  TensorSpec { shape, element }
}

// 声明形状完整时固定输入形状，便于优化；否则保留符号维度
fn is_pinnable(input: &TensorSpec) -> bool {
  input.element == ElementType::Float32 && input.shape.iter().all(|&dim| dim > 0)
}

impl InferenceBackend for TractBackend {
  type Session = TractSession;

  fn load(&self, model: &[u8]) -> anyhow::Result<TractSession> {
    let mut reader = model;
    let model = tract_onnx::onnx()
      .model_for_read(&mut reader)
      .context("无法解析 ONNX 模型")?;

    let declared = model
      .clone()
      .into_typed()
      .context("无法推断模型张量形状")?;

    anyhow::ensure!(
      declared.inputs.len() == TRACT_NUM_INPUTS,
      "预期模型输入数量为 {}, 实际为 {}",
      TRACT_NUM_INPUTS,
      declared.inputs.len()
    );
    anyhow::ensure!(
      declared.outputs.len() == TRACT_NUM_OUTPUTS,
      "预期模型输出数量为 {}, 实际为 {}",
      TRACT_NUM_OUTPUTS,
      declared.outputs.len()
    );

    let input = spec_of(declared.input_fact(0)?);
    let output = spec_of(declared.output_fact(0)?);
    debug!("模型声明输入: {}", input);
    debug!("模型声明输出: {}", output);

    let typed = if is_pinnable(&input) {
      model
        .with_input_fact(0, f32::fact(input.shape.to_vec()).into())?
        .into_typed()?
    } else {
      declared
    };

    let plan = typed
      .into_optimized()
      .context("模型优化失败")?
      .into_runnable()
      .context("无法生成执行计划")?;

    Ok(TractSession {
      plan,
      input,
      output,
    })
  }
}

impl InferenceSession for TractSession {
  fn input_spec(&self) -> &TensorSpec {
    &self.input
  }

  fn output_spec(&self) -> &TensorSpec {
    &self.output
  }

  fn run(&mut self, input: &[f32]) -> anyhow::Result<Vec<f32>> {
    let tensor = Tensor::from_shape(&self.input.shape, input)?;
    let outputs = self.plan.run(tvec!(tensor.into()))?;
    let output = outputs.first().context("模型没有输出")?;
    Ok(output.as_slice::<f32>()?.to_vec())
  }
}
