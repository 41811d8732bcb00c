/*
 * Copyright (c) Huawei Technologies Co., Ltd. 2025. All rights reserved.
 * Global Trust Authority is licensed under the Mulan PSL v2.
 * You can use this software according to the terms and conditions of the Mulan PSL v2.
 * You may obtain a copy of Mulan PSL v2 at:
 *     http://license.coscl.org.cn/MulanPSL2
 * THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR
 * PURPOSE.
 * See the Mulan PSL v2 for more details.
 */

use serde::Deserialize;
use std::path::PathBuf;

pub const ROOT_TARGET: &str = "root";

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    /// Base directory for log files when LOG_OUTPUT_DIR is not set
    #[serde(default = "default_log_root")]
    pub log_root: String,
    pub loggers: Vec<LoggerConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggerConfig {
    /// Module path the logger applies to, `root` for the root logger
    pub target_prefix: String,
    pub log_directory: String,
    pub log_file_name: String,
    pub max_file_size: u64,
    pub max_zip_count: u32,
    pub level: String,
}

fn default_log_root() -> String {
    ".".to_string()
}

impl LogConfig {
    pub fn from_yaml(path: impl Into<PathBuf>) -> Result<Self, Box<dyn std::error::Error>> {
        let config_str = std::fs::read_to_string(path.into())?;
        let config: LogConfig = serde_yaml::from_str(&config_str)?;
        Ok(config)
    }

    pub fn get_logger_config(&self, target: &str) -> Option<&LoggerConfig> {
        self.loggers.iter().find(|l| target.starts_with(&l.target_prefix))
    }

    pub fn get_root_config(&self) -> Option<&LoggerConfig> {
        self.loggers.iter().find(|l| l.target_prefix == ROOT_TARGET)
    }

    /// Loggers bound to a module path, i.e. everything except the root entry
    pub fn target_loggers(&self) -> impl Iterator<Item = &LoggerConfig> {
        self.loggers.iter().filter(|l| l.target_prefix != ROOT_TARGET)
    }
}
