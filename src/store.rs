// 该文件是 Huolong （火龙） 项目的一部分。
// src/store.rs - 数据目录与持久化日志
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

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use crate::{FromUrl, FromUrlWithScheme};

mod jsonl;
mod records;

pub use self::jsonl::JsonlLog;
pub use self::records::{CorrectionRecord, Prediction, ScanRecord};

#[derive(Error, Debug)]
pub enum StoreError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 数据根目录：
///
/// ```text
/// <root>/data/scans.jsonl
/// <root>/data/labels.jsonl
/// <root>/data/selftrain_queue.jsonl
/// <root>/models/price_model.json
/// <root>/uploads/auto/<YYYY-MM-DD>/<uuid>.png
/// ```
pub struct ScanStore {
  root: PathBuf,
  scans: JsonlLog<ScanRecord>,
  labels: JsonlLog<CorrectionRecord>,
}

impl FromUrlWithScheme for ScanStore {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for ScanStore {
  type Error = StoreError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!("URI 方案不匹配: 期望 '{}'，实际 '{}'", Self::SCHEME, url.scheme());
      return Err(StoreError::SchemeMismatch);
    }
    Ok(ScanStore::open(url.path()))
  }
}

impl ScanStore {
  pub fn open(root: impl Into<PathBuf>) -> Self {
    let root = root.into();
    let data = root.join("data");
    ScanStore {
      scans: JsonlLog::new(data.join("scans.jsonl")),
      labels: JsonlLog::new(data.join("labels.jsonl")),
      root,
    }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn scans(&self) -> &JsonlLog<ScanRecord> {
    &self.scans
  }

  pub fn labels(&self) -> &JsonlLog<CorrectionRecord> {
    &self.labels
  }

  pub fn model_path(&self) -> PathBuf {
    self.root.join("models").join("price_model.json")
  }

  pub fn upload_dir(&self) -> PathBuf {
    self.root.join("uploads")
  }

  pub fn selftrain_queue_path(&self) -> PathBuf {
    self.root.join("data").join("selftrain_queue.jsonl")
  }

  /// 日志中最后一条同 id 的记录
  pub fn find_scan(&self, id: Uuid) -> Result<Option<ScanRecord>, StoreError> {
    Ok(self.scans.read_all()?.into_iter().rev().find(|r| r.id == id))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn from_url_checks_scheme() {
    let ok = url::Url::parse("folder:///tmp/huolong").unwrap();
    let store = ScanStore::from_url(&ok).unwrap();
    assert_eq!(store.root(), Path::new("/tmp/huolong"));
    assert!(store.model_path().ends_with("models/price_model.json"));

    let bad = url::Url::parse("image:///tmp/a.png").unwrap();
    assert!(matches!(ScanStore::from_url(&bad), Err(StoreError::SchemeMismatch)));
  }
}
