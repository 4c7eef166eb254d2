// 该文件是 Shanan （山南西风） 项目的一部分。
// src/label.rs - 标签表
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

use std::{collections::HashMap, path::Path};

use thiserror::Error;
use tracing::{info, warn};

/// 未知标签 id 的回退值
pub const UNKNOWN_LABEL: &str = "";

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("标签文件读取错误: {0}")]
  Io(#[from] std::io::Error),
}

/// 标签 id 到显示名称的映射，加载后不可变
#[derive(Debug, Clone, Default)]
pub struct LabelTable {
  labels: HashMap<u32, String>,
}

impl LabelTable {
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LabelError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let table = Self::parse(&text);
    info!("从 {} 加载了 {} 个标签", path.display(), table.len());
    Ok(table)
  }

  /// 每行 `<id> <名称>`；没有数字前缀的行以行号为 id，空名称的行被跳过
  pub fn parse(text: &str) -> Self {
    let mut labels = HashMap::new();

    for (index, line) in text.lines().enumerate() {
      let line = line.trim();
      if line.is_empty() {
        continue;
      }

      let (id, name) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => match head.parse::<u32>() {
          Ok(id) => (id, rest.trim()),
          Err(_) => (index as u32, line),
        },
        None => match line.parse::<u32>() {
          Ok(_) => {
            warn!("标签文件第 {} 行缺少名称，已跳过: {:?}", index + 1, line);
            continue;
          }
          Err(_) => (index as u32, line),
        },
      };

      if name.is_empty() {
        warn!("标签文件第 {} 行格式错误，已跳过: {:?}", index + 1, line);
        continue;
      }

      labels.insert(id, name.to_string());
    }

    Self { labels }
  }

  pub fn get(&self, id: u32) -> &str {
    self
      .labels
      .get(&id)
      .map(String::as_str)
      .unwrap_or(UNKNOWN_LABEL)
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }
}

impl FromIterator<(u32, String)> for LabelTable {
  fn from_iter<T: IntoIterator<Item = (u32, String)>>(iter: T) -> Self {
    Self {
      labels: iter.into_iter().collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_id_prefixed_lines() {
    let table = LabelTable::parse("0  person\n1  bicycle\n17  traffic light\n");
    assert_eq!(table.len(), 3);
    assert_eq!(table.get(0), "person");
    assert_eq!(table.get(17), "traffic light");
  }

  #[test]
  fn plain_lines_use_line_index() {
    let table = LabelTable::parse("person\nbicycle\ncar\n");
    assert_eq!(table.get(2), "car");
  }

  #[test]
  fn malformed_lines_are_skipped() {
    let table = LabelTable::parse("0 person\n\n42\n   \n3 dog\n");
    assert_eq!(table.len(), 2);
    assert_eq!(table.get(3), "dog");
    assert_eq!(table.get(42), UNKNOWN_LABEL);
  }

  #[test]
  fn unknown_id_falls_back() {
    let table = LabelTable::default();
    assert_eq!(table.get(99), UNKNOWN_LABEL);
  }

  #[test]
  fn missing_file_is_an_error() {
    let path = std::env::temp_dir().join("shanan-detect-no-such-labels.txt");
    assert!(matches!(LabelTable::from_file(path), Err(LabelError::Io(_))));
  }
}
