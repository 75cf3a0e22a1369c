// 该文件是 Tianqi （天气识别） 项目的一部分。
// src/bin/weather_classify.rs - 天气图像分类命令行
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

use anyhow::Result;
use clap::Parser;
use serde_json::json;
use tracing::{info, warn};
use url::Url;

use tianqi::{
  ClassificationResult, ClassifierBuilder, ClassifyError, FromUrl,
  input::ImageFileInput,
  model::{ModelSource, TractBackend},
};

/// Tianqi 天气图像分类
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型文件路径，例如 file:///opt/tianqi/weather_model.onnx
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入图像，例如 image:///tmp/sky.jpg，可重复指定
  #[arg(long, value_name = "SOURCE", required = true)]
  pub input: Vec<Url>,
  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
  pub threshold: f32,
  /// 最多输出的类别数
  #[arg(long, default_value = "4", value_name = "COUNT")]
  pub max_results: usize,
  /// 以 JSON 行格式输出结果
  #[arg(long)]
  pub json: bool,
}

fn report(
  input: &Url,
  outcome: &Result<ClassificationResult, ClassifyError>,
) -> serde_json::Value {
  let timestamp = chrono::Utc::now().to_rfc3339();
  match outcome {
    Ok(result) => json!({
      "input": input.as_str(),
      "timestamp": timestamp,
      "inference_ms": result.inference_time.as_secs_f64() * 1000.0,
      "results": result
        .iter()
        .map(|c| json!({ "label": c.label_str(), "score": c.score }))
        .collect::<Vec<_>>(),
    }),
    Err(e) => json!({
      "input": input.as_str(),
      "timestamp": timestamp,
      "error": e.to_string(),
      "non_weather": matches!(e, ClassifyError::NonWeatherInput { .. }),
    }),
  }
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("置信度阈值: {}", args.threshold);
  info!("最大结果数: {}", args.max_results);

  let source = ModelSource::from_url(&args.model)?;
  let mut classifier = ClassifierBuilder::new(source)
    .threshold(args.threshold)
    .max_results(args.max_results)
    .build(TractBackend)?;

  for url in &args.input {
    let image = ImageFileInput::from_url(url)?;
    let outcome = classifier.classify(image.image());

    if args.json {
      println!("{}", report(url, &outcome));
      continue;
    }

    match outcome {
      Ok(result) => {
        println!(
          "{} (推理耗时: {:.2?}):",
          image.path().display(),
          result.inference_time
        );
        if result.is_empty() {
          println!("  没有类别超过阈值 {}", args.threshold);
        }
        for c in &result {
          println!("  - {}: {:.2}%", c.label_str(), c.score * 100.0);
        }
      }
      Err(ClassifyError::NonWeatherInput { white_fraction }) => {
        warn!("{} 不是天气相关图像", image.path().display());
        println!(
          "{}: 不是天气相关图像 (近白色像素比例 {:.1}%)",
          image.path().display(),
          white_fraction * 100.0
        );
      }
      Err(e) => return Err(e.into()),
    }
  }

  classifier.close();
  Ok(())
}
