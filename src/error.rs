use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    IOError(#[from] std::io::Error),
    #[error("配置解析失败: {0}")]
    ConfigError(String),
    #[error("存在重复的节点名称: {0}")]
    DuplicateName(String),
    #[error("YAML 解析失败: {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error(transparent)]
    HttpError(#[from] reqwest::Error),
}

/// 链接编解码错误，由调用方就地处理，不会中断整体测速流程
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("不是 {0} 格式")]
    SchemeMismatch(&'static str),
    #[error("缺少必要参数: {0}")]
    MissingField(&'static str),
    #[error("端口格式不正确: {0}")]
    InvalidPort(String),
    #[error("链接格式错误: {0}")]
    Malformed(&'static str),
    #[error("base64 解码失败")]
    Base64(#[from] base64::DecodeError),
    #[error("JSON 解析失败: {0}")]
    Json(#[from] serde_json::Error),
}
