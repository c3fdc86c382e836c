// 该文件是 Huolong （火龙） 项目的一部分。
// src/store/jsonl.rs - 只追加的 JSON Lines 日志
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

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use super::StoreError;

/// 每行一个 JSON 对象；同一进程内的追加串行化
pub struct JsonlLog<T> {
  path: PathBuf,
  lock: Mutex<()>,
  _record: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> JsonlLog<T> {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    JsonlLog {
      path: path.into(),
      lock: Mutex::new(()),
      _record: PhantomData,
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn append(&self, record: &T) -> Result<(), StoreError> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');

    let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
    file.write_all(line.as_bytes())?;
    Ok(())
  }

  /// 文件不存在视为空；无法解析的行跳过
  pub fn read_all(&self) -> Result<Vec<T>, StoreError> {
    if !self.path.exists() {
      return Ok(Vec::new());
    }
    let file = std::fs::File::open(&self.path)?;
    let mut records = Vec::new();
    for (no, line) in BufReader::new(file).lines().enumerate() {
      let line = line?;
      let line = line.trim();
      if line.is_empty() {
        continue;
      }
      match serde_json::from_str(line) {
        Ok(record) => records.push(record),
        Err(e) => warn!("{} 第 {} 行解析失败，已跳过: {}", self.path.display(), no + 1, e),
      }
    }
    Ok(records)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde::Deserialize;

  #[derive(Debug, PartialEq, Serialize, Deserialize)]
  struct Row {
    n: u32,
  }

  #[test]
  fn append_then_read_skips_garbage() {
    let dir = tempfile::tempdir().unwrap();
    let log = JsonlLog::<Row>::new(dir.path().join("nested/rows.jsonl"));
    assert!(log.read_all().unwrap().is_empty());

    log.append(&Row { n: 1 }).unwrap();
    let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
    writeln!(file, "{{ broken").unwrap();
    writeln!(file).unwrap();
    log.append(&Row { n: 2 }).unwrap();

    assert_eq!(log.read_all().unwrap(), vec![Row { n: 1 }, Row { n: 2 }]);
  }
}
