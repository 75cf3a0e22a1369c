// 该文件是 Tianqi （天气识别） 项目的一部分。
// src/pipeline.rs - 分类流水线
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
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
  config::{ClassifierConfig, ConfigError, GateConfig},
  gate::WeatherGate,
  model::{
    ClassificationResult, InferenceBackend, InferenceError, ModelLoadError, ModelRuntime,
    ModelSource, RuntimeError,
  },
  postprocess::interpret,
  preprocess::Preprocessor,
};

#[derive(Error, Debug)]
pub enum ClassifyError {
  #[error("模型未就绪: {0}")]
  ModelNotReady(#[source] ModelLoadError),
  #[error("输入不是天气相关图像 (近白色像素比例 {white_fraction:.3})")]
  NonWeatherInput { white_fraction: f32 },
  #[error(transparent)]
  Inference(#[from] InferenceError),
}

impl From<RuntimeError> for ClassifyError {
  fn from(err: RuntimeError) -> Self {
    match err {
      RuntimeError::ModelNotReady(e) => ClassifyError::ModelNotReady(e),
      RuntimeError::Inference(e) => ClassifyError::Inference(e),
    }
  }
}

/// 天气分类器：过滤 → 预处理 → 推理 → 后处理。
///
/// 所有操作都在调用方线程上同步完成。`classify` 与 `close` 需要 `&mut self`，
/// 同一实例上的调用由借用规则串行化；跨线程共享时由调用方自行加锁。
pub struct WeatherClassifier<B: InferenceBackend> {
  config: ClassifierConfig,
  gate: WeatherGate,
  preprocessor: Preprocessor,
  runtime: ModelRuntime<B>,
}

impl<B: InferenceBackend> WeatherClassifier<B> {
  /// 创建分类器并立即尝试加载模型。加载失败只记录日志，下次 `classify` 时重试。
  pub fn new(
    config: ClassifierConfig,
    gate: GateConfig,
    backend: B,
    source: ModelSource,
  ) -> Self {
    let mut classifier = Self {
      config,
      gate: WeatherGate::new(gate),
      preprocessor: Preprocessor,
      runtime: ModelRuntime::new(backend, source),
    };

    if let Err(e) = classifier.runtime.load() {
      error!("模型加载失败，将在分类时重试: {}", e);
    }
    classifier
  }

  pub fn config(&self) -> &ClassifierConfig {
    &self.config
  }

  pub fn set_config(&mut self, config: ClassifierConfig) {
    self.config = config;
  }

  pub fn gate(&self) -> &WeatherGate {
    &self.gate
  }

  pub fn is_loaded(&self) -> bool {
    self.runtime.is_loaded()
  }

  /// 显式加载（或重新加载）模型。
  pub fn load(&mut self) -> Result<(), ModelLoadError> {
    self.runtime.load()
  }

  pub fn classify(&mut self, image: &RgbImage) -> Result<ClassificationResult, ClassifyError> {
    self.runtime.ensure_loaded()?;

    if let Some(white_fraction) = self.gate.reject(image) {
      warn!(
        "输入图像近白色像素比例 {:.3} 超过上限，判定为非天气图像",
        white_fraction
      );
      return Err(ClassifyError::NonWeatherInput { white_fraction });
    }

    info!("输入图像 {}x{}，开始推理...", image.width(), image.height());
    let tensor = self.preprocessor.prepare(image);

    let now = std::time::Instant::now();
    let scores = self.runtime.run(&tensor)?;
    let elapsed = now.elapsed();
    info!("推理完成，耗时: {:.2?}", elapsed);

    let result = interpret(&scores, &self.config).with_inference_time(elapsed);
    Ok(result)
  }

  /// 释放推理会话。可重复调用；之后的 `classify` 会重新加载模型。
  pub fn close(&mut self) {
    if !self.runtime.release() {
      info!("推理会话已关闭，无需释放");
    }
  }
}

/// 分类器构建器。
#[derive(Debug, Clone, Default)]
pub struct ClassifierBuilder {
  source: ModelSource,
  threshold: Option<f32>,
  max_results: Option<usize>,
  gate: GateConfig,
}

impl ClassifierBuilder {
  pub fn new(source: ModelSource) -> Self {
    Self {
      source,
      ..Default::default()
    }
  }

  pub fn threshold(mut self, threshold: f32) -> Self {
    self.threshold = Some(threshold);
    self
  }

  pub fn max_results(mut self, max_results: usize) -> Self {
    self.max_results = Some(max_results);
    self
  }

  pub fn gate(mut self, gate: GateConfig) -> Self {
    self.gate = gate;
    self
  }

  pub fn config(&self) -> Result<ClassifierConfig, ConfigError> {
    let defaults = ClassifierConfig::default();
    ClassifierConfig::new(
      self.threshold.unwrap_or(defaults.threshold()),
      self.max_results.unwrap_or(defaults.max_results()),
    )
  }

  pub fn build<B: InferenceBackend>(
    self,
    backend: B,
  ) -> Result<WeatherClassifier<B>, ConfigError> {
    let config = self.config()?;
    Ok(WeatherClassifier::new(config, self.gate, backend, self.source))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builder_validates_threshold() {
    let err = ClassifierBuilder::default().threshold(2.0).config().unwrap_err();
    assert_eq!(err, ConfigError::Threshold(2.0));
  }

  #[test]
  fn builder_falls_back_to_defaults() {
    let config = ClassifierBuilder::default().max_results(2).config().unwrap();
    assert_eq!(config.threshold(), 0.5);
    assert_eq!(config.max_results(), 2);
  }

  #[test]
  fn runtime_errors_map_onto_classify_errors() {
    let err: ClassifyError = RuntimeError::ModelNotReady(ModelLoadError::ModelPathError(
      "missing".to_string(),
    ))
    .into();
    assert!(matches!(err, ClassifyError::ModelNotReady(_)));

    let err: ClassifyError = RuntimeError::Inference(InferenceError::OutputLength {
      expected: 4,
      actual: 3,
    })
    .into();
    assert!(matches!(err, ClassifyError::Inference(_)));
  }
}
