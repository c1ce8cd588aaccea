// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Utility functions for fwsync.

/// Last path segment of a URL, ignoring any query string or fragment.
///
/// # Examples
///
/// ```
/// use fwsync::utils::file_name_from_url;
///
/// let url = "https://updates.cdn-apple.com/x/iPhone10,3_16.7.2_20H115_Restore.ipsw?a=b";
/// assert_eq!(file_name_from_url(url), Some("iPhone10,3_16.7.2_20H115_Restore.ipsw"));
/// assert_eq!(file_name_from_url("https://example.com/"), None);
/// ```
pub fn file_name_from_url(url: &str) -> Option<&str> {
    let end = url.find(|c: char| c == '?' || c == '#').unwrap_or(url.len());
    let path = &url[..end];
    let name = path.rsplit('/').next()?;
    (!name.is_empty() && name != "." && name != "..").then_some(name)
}
