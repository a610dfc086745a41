//! URL 归一化
//!
//! 同一个站点可能以 `https://www.Example.com/blog/`、`example.com/blog`
//! 等多种形式出现，比较前统一成 `host[:port][/path]`。

use std::collections::HashMap;

use url::Url;

use crate::errors::{ReaccessError, Result};

/// 注册时拒绝的协议
const DANGEROUS_PROTOCOLS: &[&str] = &["javascript:", "data:", "file:", "vbscript:", "blob:"];

/// 归一化 URL，无法解析出 host 时返回 `None`
///
/// - 缺少协议时按 `http://` 解析
/// - host 小写并去掉开头的 `www.`
/// - 丢弃 80/443 端口，其他端口保留
/// - path 解码、小写、去掉末尾 `/`
/// - 忽略 query 和 fragment
pub fn normalize_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{}", raw)
    };
    let parsed = Url::parse(&candidate).ok()?;

    let host = parsed.host_str()?.to_lowercase();
    let mut normalized = host.strip_prefix("www.").unwrap_or(&host).to_string();
    if normalized.is_empty() {
        return None;
    }

    if let Some(port) = parsed.port().filter(|p| *p != 80 && *p != 443) {
        normalized.push_str(&format!(":{}", port));
    }

    let decoded = urlencoding::decode(parsed.path())
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| parsed.path().to_string());
    let path = decoded.to_lowercase();
    let path = path.trim_end_matches('/');
    if !path.is_empty() {
        if !path.starts_with('/') {
            normalized.push('/');
        }
        normalized.push_str(path);
    }

    Some(normalized)
}

/// 按别名表解析 URL
///
/// 先查完整的归一化结果，再查域名级别的别名（保留原路径）；
/// 都没有命中时返回归一化结果本身。
pub fn resolve_alias(raw: &str, aliases: &HashMap<String, String>) -> Option<String> {
    let normalized = normalize_url(raw)?;

    if let Some(target) = aliases.get(&normalized).filter(|t| !t.is_empty()) {
        return Some(target.clone());
    }

    let (domain, path) = match normalized.split_once('/') {
        Some((domain, rest)) if !rest.is_empty() => (domain, format!("/{}", rest)),
        Some((domain, _)) => (domain, String::new()),
        None => (normalized.as_str(), String::new()),
    };

    match aliases.get(domain).filter(|t| !t.is_empty()) {
        Some(canonical) if !path.is_empty() => {
            Some(format!("{}{}", canonical.trim_end_matches('/'), path))
        }
        Some(canonical) => Some(canonical.clone()),
        None => Some(normalized),
    }
}

/// 归一化结果的域名部分（`host[:port]`）
pub fn base_domain(normalized: &str) -> &str {
    normalized.split('/').next().unwrap_or(normalized)
}

/// 文章链接的去重键
///
/// 与 `normalize_url` 不同，这里保留 query 和 path 的大小写，
/// `?p=101` 和 `?p=102` 是两篇文章。协议和 host 小写，丢弃默认端口、
/// fragment 和 path 末尾的 `/`。
pub fn permalink_key(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw.trim()).ok()?;
    let host = parsed.host_str().filter(|h| !h.is_empty())?;

    let mut key = format!("{}://{}", parsed.scheme(), host);
    if let Some(port) = parsed.port() {
        key.push_str(&format!(":{}", port));
    }
    key.push_str(parsed.path().trim_end_matches('/'));
    if let Some(query) = parsed.query().filter(|q| !q.is_empty()) {
        key.push('?');
        key.push_str(query);
    }
    Some(key)
}

/// 校验并规范化站点展示地址
///
/// 只接受 http/https，缺少协议时补 `https://`，去掉末尾 `/`。
pub fn normalize_display_url(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ReaccessError::validation("站点 URL 不能为空"));
    }

    let lower = raw.to_lowercase();
    if let Some(proto) = DANGEROUS_PROTOCOLS.iter().find(|p| lower.starts_with(*p)) {
        return Err(ReaccessError::validation(format!(
            "不允许的 URL 协议: {}",
            proto
        )));
    }

    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };
    let parsed = Url::parse(&candidate)
        .map_err(|e| ReaccessError::validation(format!("无效的 URL '{}': {}", raw, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ReaccessError::validation(format!(
            "只允许 http:// 和 https://，收到 {}://",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ReaccessError::validation(format!("URL 缺少主机名: {}", raw)));
    }

    Ok(parsed.as_str().trim_end_matches('/').to_string())
}
