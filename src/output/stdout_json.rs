// 该文件是 Huolong （火龙） 项目的一部分。
// src/output/stdout_json.rs - 标准输出 JSON 行
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

use std::io::Write;

use image::RgbImage;
use thiserror::Error;
use tracing::error;
use url::Url;

use crate::engine::AnalysisResult;
use crate::output::Render;
use crate::{FromUrl, FromUrlWithScheme};

#[derive(Error, Debug)]
pub enum StdoutJsonOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// `stdout:`，每个结果一行 JSON；`stdout:?pretty` 缩进输出
pub struct StdoutJsonOutput {
  pretty: bool,
}

impl FromUrlWithScheme for StdoutJsonOutput {
  const SCHEME: &'static str = "stdout";
}

impl FromUrl for StdoutJsonOutput {
  type Error = StdoutJsonOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!("URI 方案不匹配: 期望 '{}'，实际 '{}'", Self::SCHEME, url.scheme());
      return Err(StdoutJsonOutputError::SchemeMismatch);
    }
    Ok(StdoutJsonOutput {
      pretty: url.query_pairs().any(|(k, _)| k == "pretty"),
    })
  }
}

impl StdoutJsonOutput {
  pub fn write_to<W: Write>(&self, mut writer: W, result: &AnalysisResult) -> Result<(), StdoutJsonOutputError> {
    if self.pretty {
      serde_json::to_writer_pretty(&mut writer, result)?;
    } else {
      serde_json::to_writer(&mut writer, result)?;
    }
    writeln!(writer)?;
    Ok(())
  }
}

impl Render<RgbImage, AnalysisResult> for StdoutJsonOutput {
  type Error = StdoutJsonOutputError;

  fn render_result(&self, _frame: &RgbImage, result: &AnalysisResult) -> Result<(), Self::Error> {
    self.write_to(std::io::stdout().lock(), result)
  }
}
