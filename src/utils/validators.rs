// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// 验证错误类型
#[derive(Error, Debug)]
pub enum ValidationError {
    /// URL无效
    #[error("Invalid URL")]
    InvalidUrl,
    /// 目标主机被拦截（SSRF防护）
    #[error("Blocked target host: {0}")]
    SsrfDetected(String),
}

/// 主机名字面量黑名单
///
/// 与DNS解析无关，始终拦截；爬虫对每个后续链接重新应用同一检查，
/// 防御首次校验后的DNS重绑定
static BLOCKED_HOSTS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "localhost",
        "0.0.0.0",
        "127.0.0.1",
        "::1",
        "[::1]",
        "169.254.169.254",
        "metadata.google.internal",
    ])
});

/// 检查IP地址是否安全
///
/// # 参数
///
/// * `ip` - IP地址
///
/// # 返回值
///
/// 如果IP地址是安全的则返回true，否则返回false
pub fn is_safe_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            !ipv4.is_loopback()
                && !ipv4.is_private()
                && !ipv4.is_link_local()
                && !ipv4.is_broadcast()
                && !ipv4.is_documentation()
                && !ipv4.is_unspecified()
        }
        IpAddr::V6(ipv6) => {
            if let Some(mapped) = ipv6.to_ipv4_mapped() {
                return is_safe_ip(IpAddr::V4(mapped));
            }
            // fc00::/7 (ULA) and fe80::/10 (link-local)
            let first = ipv6.segments()[0];
            !ipv6.is_loopback()
                && !ipv6.is_unspecified()
                && (first & 0xfe00) != 0xfc00
                && (first & 0xffc0) != 0xfe80
        }
    }
}

/// 纯同步的主机安全检查，不做DNS解析
///
/// 拦截黑名单字面量和不安全的IP字面量；域名在此通过，
/// 由`validate_url`再做解析确认
///
/// # 参数
///
/// * `url` - 已解析的URL
///
/// # 返回值
///
/// * `Ok(())` - 主机通过字面量检查
/// * `Err(ValidationError)` - 主机被拦截
pub fn check_host(url: &Url) -> Result<(), ValidationError> {
    let host = url.host_str().ok_or(ValidationError::InvalidUrl)?;
    let normalized = host.to_ascii_lowercase();

    if BLOCKED_HOSTS.contains(normalized.as_str()) {
        return Err(ValidationError::SsrfDetected(normalized));
    }

    // IPv6 literals appear bracketed in host_str
    let bare = normalized.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = bare.parse::<IpAddr>() {
        if !is_safe_ip(ip) {
            return Err(ValidationError::SsrfDetected(normalized));
        }
    }

    Ok(())
}

/// 判断爬虫是否可以跟进一个链接
///
/// 爬虫对每个发现的链接重新应用主机检查
pub fn is_safe_link(url: &Url) -> bool {
    (url.scheme() == "http" || url.scheme() == "https") && check_host(url).is_ok()
}

/// 验证URL
///
/// 检查scheme、主机字面量，并对域名做DNS解析确认，
/// 所有解析结果都必须是安全地址
///
/// # 参数
///
/// * `url` - URL字符串
///
/// # 返回值
///
/// * `Ok(Url)` - URL有效且目标安全
/// * `Err(ValidationError)` - URL无效或存在安全风险
pub async fn validate_url(url: &str) -> Result<Url, ValidationError> {
    let parsed = Url::parse(url).map_err(|_| ValidationError::InvalidUrl)?;

    // Check scheme
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ValidationError::InvalidUrl);
    }

    check_host(&parsed)?;

    // IP literals are fully covered by check_host; only domains need resolution
    let host = parsed.host_str().ok_or(ValidationError::InvalidUrl)?;
    if host.parse::<IpAddr>().is_ok() {
        return Ok(parsed);
    }

    let addrs = tokio::net::lookup_host((host, parsed.port_or_known_default().unwrap_or(443)))
        .await
        .map_err(|_| ValidationError::InvalidUrl)?
        .collect::<Vec<_>>();

    if addrs.is_empty() {
        return Err(ValidationError::InvalidUrl);
    }

    // Check all resolved IPs
    for addr in addrs {
        if !is_safe_ip(addr.ip()) {
            return Err(ValidationError::SsrfDetected(host.to_string()));
        }
    }

    Ok(parsed)
}
