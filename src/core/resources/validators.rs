//! File, memory and security validators

use super::manager::ResourceLimitsManager;
use super::types::{SecurityContext, ValidationOutcome, ViolationSeverity};
use crate::config::models::ResourceType;
use crate::utils::format_bytes;
use std::net::{IpAddr, Ipv4Addr};
use url::Url;

/// Characters that may not appear in a filename
const FORBIDDEN_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Longest accepted filename, in bytes
const MAX_FILENAME_LENGTH: usize = 255;

/// Extensions that trigger a warning
const DANGEROUS_EXTENSIONS: &[&str] = &[
    "exe", "bat", "cmd", "com", "scr", "pif", "vbs", "js", "jar", "msi", "dll", "ps1", "sh",
];

const ALLOWED_MIME_PREFIXES: &[&str] = &["text/", "image/", "audio/", "video/"];

const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/json",
    "application/pdf",
    "application/xml",
    "application/zip",
    "application/gzip",
    "application/x-tar",
    "application/octet-stream",
];

impl ResourceLimitsManager {
    /// Check a file size against the FileSize budget
    pub fn validate_file_size(&self, size: u64) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::new(Some(ResourceType::FileSize));
        let check = self.check_resource_usage(ResourceType::FileSize, size);

        if let Some(violation) = check.violation {
            match violation.severity {
                ViolationSeverity::Critical => outcome.error(format!(
                    "File size {} exceeds maximum allowed size of {}",
                    format_bytes(size),
                    format_bytes(violation.limit)
                )),
                ViolationSeverity::Warning => outcome.warning(format!(
                    "File size {} exceeds recommended size of {}",
                    format_bytes(size),
                    format_bytes(violation.limit)
                )),
            }
        }
        outcome
    }

    /// Check whether `additional` bytes fit in the Memory budget
    pub fn validate_memory_usage(&self, additional: u64) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::new(Some(ResourceType::Memory));
        let check = self.check_resource_usage(ResourceType::Memory, additional);
        let projected = check.current_usage.saturating_add(additional);

        if let Some(violation) = check.violation {
            match violation.severity {
                ViolationSeverity::Critical => outcome.error(format!(
                    "Memory usage would reach {}, exceeding the limit of {}",
                    format_bytes(projected),
                    format_bytes(violation.limit)
                )),
                ViolationSeverity::Warning => outcome.warning(format!(
                    "Memory usage would reach {}, above the recommended {}",
                    format_bytes(projected),
                    format_bytes(violation.limit)
                )),
            }
        }
        outcome
    }

    /// Check a filename, MIME type and URL against the security rules
    pub fn validate_security_constraints(&self, context: &SecurityContext) -> ValidationOutcome {
        validate_security(context)
    }
}

/// Stateless security checks
pub fn validate_security(context: &SecurityContext) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::new(None);

    if let Some(filename) = &context.filename {
        check_filename(filename, &mut outcome);
    }
    if let Some(mime_type) = &context.mime_type {
        check_mime_type(mime_type, &mut outcome);
    }
    if let Some(url) = &context.url {
        check_url(url, &mut outcome);
    }

    outcome
}

fn check_filename(filename: &str, outcome: &mut ValidationOutcome) {
    if filename.trim().is_empty() {
        outcome.error("Filename must not be empty".to_string());
        return;
    }

    if filename
        .chars()
        .any(|c| FORBIDDEN_FILENAME_CHARS.contains(&c) || c.is_control())
    {
        outcome.error(format!("Filename '{}' contains invalid characters", filename.escape_debug()));
    }

    if filename.len() > MAX_FILENAME_LENGTH {
        outcome.error(format!(
            "Filename is {} bytes long, maximum is {}",
            filename.len(),
            MAX_FILENAME_LENGTH
        ));
    }

    if let Some((_, extension)) = filename.rsplit_once('.') {
        let extension = extension.to_lowercase();
        if DANGEROUS_EXTENSIONS.contains(&extension.as_str()) {
            outcome.warning(format!("File extension '.{}' is potentially dangerous", extension));
        }
    }
}

fn check_mime_type(mime_type: &str, outcome: &mut ValidationOutcome) {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    let allowed = ALLOWED_MIME_PREFIXES
        .iter()
        .any(|prefix| essence.starts_with(prefix))
        || ALLOWED_MIME_TYPES.contains(&essence.as_str());

    if !allowed {
        outcome.warning(format!("MIME type '{}' is not in the allowed list", mime_type));
    }
}

fn check_url(url_str: &str, outcome: &mut ValidationOutcome) {
    let url = match Url::parse(url_str) {
        Ok(url) => url,
        Err(e) => {
            outcome.error(format!("Invalid URL '{}': {}", url_str, e));
            return;
        }
    };

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            outcome.error(format!("URL must use http:// or https:// scheme, got: {}", scheme));
            return;
        }
    }

    let Some(host) = url.host_str() else {
        outcome.error("URL must have a valid host".to_string());
        return;
    };

    let host_lower = host.trim_start_matches('[').trim_end_matches(']').to_lowercase();
    let is_local_name = host_lower == "localhost" || host_lower.ends_with(".localhost");
    let is_private_ip = host_lower
        .parse::<IpAddr>()
        .is_ok_and(|ip| is_private_or_internal_ip(&ip));

    if is_local_name || is_private_ip {
        outcome.warning(format!("URL host '{}' points to a private or local address", host));
    }
}

/// Check if an IP address is private, internal, or reserved
fn is_private_or_internal_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => is_private_ipv4(ipv4),
        IpAddr::V6(ipv6) => {
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                // Unique local (fc00::/7)
                || (ipv6.segments()[0] & 0xfe00) == 0xfc00
                // Link-local (fe80::/10)
                || (ipv6.segments()[0] & 0xffc0) == 0xfe80
                || ipv6.to_ipv4_mapped().is_some_and(|ipv4| is_private_ipv4(&ipv4))
        }
    }
}

fn is_private_ipv4(ipv4: &Ipv4Addr) -> bool {
    ipv4.is_loopback()
        || ipv4.is_private()
        || ipv4.is_link_local()
        || ipv4.is_unspecified()
        // Shared address space (100.64.0.0/10)
        || (ipv4.octets()[0] == 100 && (ipv4.octets()[1] & 0xC0) == 64)
}
