// 该文件是 Tianqi （天气识别） 项目的一部分。
// src/model/runtime.rs - 推理运行时
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

use std::fmt;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
  frame::{MODEL_INPUT_H, MODEL_INPUT_W, ModelInput, RGB_CHANNELS},
  model::{ModelSource, ScoreVector, WeatherLabel},
};

pub const MODEL_INPUT_SHAPE: [usize; 4] = [
  1,
  MODEL_INPUT_H as usize,
  MODEL_INPUT_W as usize,
  RGB_CHANNELS,
];
pub const MODEL_OUTPUT_SHAPE: [usize; 2] = [1, WeatherLabel::COUNT];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementType {
  Float32,
  UInt8,
  Other(String),
}

impl fmt::Display for ElementType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ElementType::Float32 => f.write_str("f32"),
      ElementType::UInt8 => f.write_str("u8"),
      ElementType::Other(name) => f.write_str(name),
    }
  }
}

/// 模型声明的张量形状与元素类型。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorSpec {
  pub shape: Box<[usize]>,
  pub element: ElementType,
}

impl TensorSpec {
  pub fn f32(shape: &[usize]) -> Self {
    Self {
      shape: shape.into(),
      element: ElementType::Float32,
    }
  }
}

impl fmt::Display for TensorSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:?} {}", self.shape, self.element)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorRole {
  Input,
  Output,
}

impl fmt::Display for TensorRole {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TensorRole::Input => f.write_str("输入"),
      TensorRole::Output => f.write_str("输出"),
    }
  }
}

/// 推理库适配层。`load` 只负责把字节解析成会话，形状校验由 [`ModelRuntime`] 完成。
pub trait InferenceBackend {
  type Session: InferenceSession;

  fn load(&self, model: &[u8]) -> anyhow::Result<Self::Session>;
}

/// 已加载的推理会话。会话不支持并发调用，`run` 需要独占借用。
pub trait InferenceSession {
  fn input_spec(&self) -> &TensorSpec;
  fn output_spec(&self) -> &TensorSpec;
  fn run(&mut self, input: &[f32]) -> anyhow::Result<Vec<f32>>;
}

#[derive(Error, Debug)]
pub enum ModelLoadError {
  #[error("模型读取错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("模型解析失败: {0}")]
  Backend(anyhow::Error),
  #[error("模型{role}张量不符: 期望 {expected}, 实际 {actual}")]
  ShapeMismatch {
    role: TensorRole,
    expected: TensorSpec,
    actual: TensorSpec,
  },
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
}

#[derive(Error, Debug)]
pub enum InferenceError {
  #[error("推理失败: {0}")]
  Backend(anyhow::Error),
  #[error("模型输出长度不符: 期望 {expected}, 实际 {actual}")]
  OutputLength { expected: usize, actual: usize },
}

#[derive(Error, Debug)]
pub enum RuntimeError {
  #[error("模型未就绪: {0}")]
  ModelNotReady(#[source] ModelLoadError),
  #[error(transparent)]
  Inference(#[from] InferenceError),
}

fn check_spec(
  role: TensorRole,
  expected: &[usize],
  actual: &TensorSpec,
) -> Result<(), ModelLoadError> {
  let expected = TensorSpec::f32(expected);
  if *actual != expected {
    error!("模型{}张量不符: 期望 {}, 实际 {}", role, expected, actual);
    return Err(ModelLoadError::ShapeMismatch {
      role,
      expected,
      actual: actual.clone(),
    });
  }
  Ok(())
}

fn open_session<B: InferenceBackend>(
  backend: &B,
  source: &ModelSource,
) -> Result<B::Session, ModelLoadError> {
  let data = source.read()?;

  info!("创建推理会话");
  let session = backend.load(&data).map_err(|e| {
    error!("推理会话创建失败: {:#}", e);
    ModelLoadError::Backend(e)
  })?;

  check_spec(TensorRole::Input, &MODEL_INPUT_SHAPE, session.input_spec())?;
  check_spec(TensorRole::Output, &MODEL_OUTPUT_SHAPE, session.output_spec())?;
  debug!("模型输入: {}", session.input_spec());
  debug!("模型输出: {}", session.output_spec());

  info!("模型加载完成");
  Ok(session)
}

/// 持有推理会话，首次使用时加载，显式释放。
pub struct ModelRuntime<B: InferenceBackend> {
  backend: B,
  source: ModelSource,
  session: Option<B::Session>,
}

impl<B: InferenceBackend> ModelRuntime<B> {
  /// 创建运行时，不立即加载模型。
  pub fn new(backend: B, source: ModelSource) -> Self {
    Self {
      backend,
      source,
      session: None,
    }
  }

  pub fn is_loaded(&self) -> bool {
    self.session.is_some()
  }

  /// 读取模型并创建会话。已有会话时会被替换。
  pub fn load(&mut self) -> Result<(), ModelLoadError> {
    let session = open_session(&self.backend, &self.source)?;
    self.session = Some(session);
    Ok(())
  }

  /// 未加载时先尝试加载一次，失败则返回 [`RuntimeError::ModelNotReady`]。
  pub fn ensure_loaded(&mut self) -> Result<&mut B::Session, RuntimeError> {
    let session = match self.session.take() {
      Some(session) => session,
      None => {
        warn!("模型尚未加载，尝试加载");
        open_session(&self.backend, &self.source).map_err(RuntimeError::ModelNotReady)?
      }
    };
    Ok(self.session.insert(session))
  }

  /// 执行一次前向推理。失败不会使会话失效，也不会重试。
  pub fn run(&mut self, input: &ModelInput) -> Result<ScoreVector, RuntimeError> {
    let session = self.ensure_loaded()?;

    debug!("执行模型推理");
    let output = session.run(input.as_slice()).map_err(|e| {
      error!("推理失败: {:#}", e);
      InferenceError::Backend(e)
    })?;
    debug!("模型推理结果：{:?}", output);

    let scores = ScoreVector::try_from(output.as_slice()).map_err(|actual| {
      error!(
        "模型输出长度不符: 期望 {}, 实际 {}",
        WeatherLabel::COUNT,
        actual
      );
      InferenceError::OutputLength {
        expected: WeatherLabel::COUNT,
        actual,
      }
    })?;
    Ok(scores)
  }

  /// 释放会话，返回此前是否持有会话。
  pub fn release(&mut self) -> bool {
    let released = self.session.take().is_some();
    if released {
      info!("推理会话已释放");
    }
    released
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::Cell, rc::Rc};

  use super::*;

  struct StubSession {
    input: TensorSpec,
    output: TensorSpec,
    reply: Vec<f32>,
    fail_next: bool,
  }

  impl InferenceSession for StubSession {
    fn input_spec(&self) -> &TensorSpec {
      &self.input
    }

    fn output_spec(&self) -> &TensorSpec {
      &self.output
    }

    fn run(&mut self, input: &[f32]) -> anyhow::Result<Vec<f32>> {
      assert_eq!(input.len(), ModelInput::LEN);
      if std::mem::take(&mut self.fail_next) {
        anyhow::bail!("native failure");
      }
      Ok(self.reply.clone())
    }
  }

  struct StubBackend {
    input: TensorSpec,
    output_shape: Vec<usize>,
    reply: Vec<f32>,
    fail_first_run: bool,
    loads: Rc<Cell<usize>>,
  }

  impl StubBackend {
    fn new(reply: Vec<f32>) -> Self {
      Self {
        input: TensorSpec::f32(&MODEL_INPUT_SHAPE),
        output_shape: MODEL_OUTPUT_SHAPE.to_vec(),
        reply,
        fail_first_run: false,
        loads: Rc::new(Cell::new(0)),
      }
    }
  }

  impl InferenceBackend for StubBackend {
    type Session = StubSession;

    fn load(&self, model: &[u8]) -> anyhow::Result<StubSession> {
      self.loads.set(self.loads.get() + 1);
      if model.is_empty() {
        anyhow::bail!("empty model");
      }
      Ok(StubSession {
        input: self.input.clone(),
        output: TensorSpec::f32(&self.output_shape),
        reply: self.reply.clone(),
        fail_next: self.fail_first_run,
      })
    }
  }

  fn memory() -> ModelSource {
    ModelSource::from(vec![0u8; 8])
  }

  #[test]
  fn run_loads_lazily_once() {
    let backend = StubBackend::new(vec![0.1, 0.2, 0.3, 0.4]);
    let loads = backend.loads.clone();
    let mut runtime = ModelRuntime::new(backend, memory());
    assert!(!runtime.is_loaded());

    let scores = runtime.run(&ModelInput::default()).unwrap();
    assert_eq!(scores, ScoreVector([0.1, 0.2, 0.3, 0.4]));
    runtime.run(&ModelInput::default()).unwrap();
    assert_eq!(loads.get(), 1);
  }

  #[test]
  fn failed_lazy_load_is_model_not_ready() {
    let backend = StubBackend::new(vec![0.0; 4]);
    let loads = backend.loads.clone();
    let mut runtime = ModelRuntime::new(backend, ModelSource::from(Vec::new()));

    let err = runtime.run(&ModelInput::default()).unwrap_err();
    assert!(matches!(
      err,
      RuntimeError::ModelNotReady(ModelLoadError::Backend(_))
    ));
    assert_eq!(loads.get(), 1);
  }

  #[test]
  fn output_shape_mismatch_fails_load() {
    let mut backend = StubBackend::new(vec![0.0; 5]);
    backend.output_shape = vec![1, 5];
    let mut runtime = ModelRuntime::new(backend, memory());

    match runtime.load() {
      Err(ModelLoadError::ShapeMismatch { role, actual, .. }) => {
        assert_eq!(role, TensorRole::Output);
        assert_eq!(&*actual.shape, &[1, 5]);
      }
      other => panic!("unexpected: {other:?}"),
    }
    assert!(!runtime.is_loaded());
  }

  #[test]
  fn quantized_input_fails_load() {
    let mut backend = StubBackend::new(vec![0.0; 4]);
    backend.input = TensorSpec {
      shape: MODEL_INPUT_SHAPE.into(),
      element: ElementType::UInt8,
    };
    let mut runtime = ModelRuntime::new(backend, memory());

    match runtime.load() {
      Err(ModelLoadError::ShapeMismatch { role, actual, .. }) => {
        assert_eq!(role, TensorRole::Input);
        assert_eq!(actual.element, ElementType::UInt8);
      }
      other => panic!("unexpected: {other:?}"),
    }
  }

  #[test]
  fn inference_failure_keeps_session_usable() {
    let mut backend = StubBackend::new(vec![0.4, 0.3, 0.2, 0.1]);
    backend.fail_first_run = true;
    let mut runtime = ModelRuntime::new(backend, memory());

    let err = runtime.run(&ModelInput::default()).unwrap_err();
    assert!(matches!(
      err,
      RuntimeError::Inference(InferenceError::Backend(_))
    ));
    assert!(runtime.is_loaded());
    assert!(runtime.run(&ModelInput::default()).is_ok());
  }

  #[test]
  fn short_output_is_inference_error() {
    let backend = StubBackend::new(vec![0.5, 0.5]);
    let mut runtime = ModelRuntime::new(backend, memory());
    let err = runtime.run(&ModelInput::default()).unwrap_err();
    assert!(matches!(
      err,
      RuntimeError::Inference(InferenceError::OutputLength {
        expected: 4,
        actual: 2
      })
    ));
  }

  #[test]
  fn release_is_idempotent() {
    let mut runtime = ModelRuntime::new(StubBackend::new(vec![0.0; 4]), memory());
    runtime.load().unwrap();
    assert!(runtime.release());
    assert!(!runtime.release());
    assert!(!runtime.is_loaded());
  }
}
