//! 配置文件解析
//!
//! 每个非注释行声明一个实现类型名称；`#` 之后为注释，空行忽略。

use di_abstractions::ConfigResource;
use infrastructure_common::ServiceError;
use std::collections::HashSet;
use std::fmt;
use std::io::BufRead;
use tracing::debug;

/// 单行格式错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFault {
    /// 名称内含空格或制表符
    Syntax,
    /// 名称含有非法字符
    IllegalName,
}

impl fmt::Display for LineFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => f.write_str("Illegal configuration-file syntax"),
            Self::IllegalName => f.write_str("Illegal provider-type name"),
        }
    }
}

/// 去掉注释与首尾空白之后的行内容
fn declared_text(line: &str) -> &str {
    match line.find('#') {
        Some(index) => &line[..index],
        None => line,
    }
    .trim()
}

/// 解析单行，返回其中声明的名称；注释行和空行返回 `None`
pub fn parse_line(line: &str) -> Result<Option<&str>, LineFault> {
    let name = declared_text(line);
    if name.is_empty() {
        return Ok(None);
    }
    if name.contains(' ') || name.contains('\t') {
        return Err(LineFault::Syntax);
    }

    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map_or(false, |c| c.is_alphabetic() || c == '_');
    if !valid_start || !chars.all(|c| c.is_alphanumeric() || c == '.' || c == '_') {
        return Err(LineFault::IllegalName);
    }
    Ok(Some(name))
}

/// 解析整个配置资源
///
/// 返回本次扫描中首次出现的名称，按行顺序；`seen` 记录扫描中已排队的全部名称。
pub fn parse_resource(
    service: &str,
    resource: &ConfigResource,
    seen: &mut HashSet<String>,
) -> Result<Vec<String>, ServiceError> {
    let io_error = |source: std::io::Error| ServiceError::ResourceIo {
        service: service.to_string(),
        resource: resource.identity().to_string(),
        source,
    };

    let reader = resource.open().map_err(io_error)?;
    let mut names = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(io_error)?;
        let name = parse_line(&line).map_err(|fault| ServiceError::ConfigurationFormat {
            service: service.to_string(),
            resource: resource.identity().to_string(),
            line: index + 1,
            text: declared_text(&line).to_string(),
            reason: fault.to_string(),
        })?;

        if let Some(name) = name {
            if seen.insert(name.to_string()) {
                names.push(name.to_string());
            } else {
                debug!("{}: 重复声明已忽略 {} ({}:{})", service, name, resource, index + 1);
            }
        }
    }
    Ok(names)
}
