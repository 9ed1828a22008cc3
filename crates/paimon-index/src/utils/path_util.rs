// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use uuid::Uuid;

use crate::error::*;

/// A parsed `[scheme:][//authority]path` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub scheme: String,
    pub authority: String,
    pub path: String,
}

impl Path {
    pub fn to_uri_string(&self) -> String {
        let mut ret = String::new();
        if !self.scheme.is_empty() {
            ret.push_str(&self.scheme);
            ret.push(':');
        }
        if !self.authority.is_empty() {
            ret.push_str("//");
            ret.push_str(&self.authority);
        }
        ret.push_str(&self.path);
        ret
    }
}

/// Join two path fragments with exactly one separating slash.
pub fn join_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        return name.to_string();
    }
    if name.is_empty() {
        return path.to_string();
    }
    match (path.ends_with('/'), name.starts_with('/')) {
        (false, false) => format!("{path}/{name}"),
        (true, true) => format!("{path}{}", &name[1..]),
        _ => format!("{path}{name}"),
    }
}

/// Collapse duplicate slashes and trim one trailing slash (except for the
/// bare root).
fn normalize_inner_path(path: &str) -> String {
    let mut ret = String::with_capacity(path.len());
    let mut last_char = '\0';
    for c in path.chars() {
        if last_char == '/' && c == '/' {
            continue;
        }
        last_char = c;
        ret.push(c);
    }
    if ret.len() > 1 && ret.ends_with('/') {
        ret.pop();
    }
    ret
}

/// Parse a path string into its scheme / authority / path parts.
pub fn to_path(path: &str) -> Result<Path> {
    if path.is_empty() {
        return InvalidSnafu {
            message: "path is an empty string.".to_string(),
        }
        .fail();
    }
    let mut scheme = String::new();
    let mut authority = String::new();
    let mut start = 0usize;

    let colon = path.find(':');
    let slash = path.find('/');
    if let Some(colon) = colon {
        if slash.is_none() || colon < slash.unwrap() {
            scheme = path[..colon].to_string();
            start = colon + 1;
        }
    }

    if path[start..].starts_with("//") && path.len() - start > 2 {
        let auth_end = path[start + 2..]
            .find('/')
            .map(|i| start + 2 + i)
            .unwrap_or(path.len());
        authority = path[start + 2..auth_end].to_string();
        start = auth_end;
    }

    Ok(Path {
        scheme,
        authority,
        path: normalize_inner_path(&path[start..]),
    })
}

pub fn normalize_path(path: &str) -> Result<String> {
    Ok(to_path(path)?.to_uri_string())
}

pub fn parent_dir_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => trimmed[..idx].trim_end_matches('/').to_string(),
        None => String::new(),
    }
}

pub fn file_name(path: &str) -> String {
    let mut trimmed = path;
    if trimmed.len() > 1 && trimmed.ends_with('/') {
        trimmed = &trimmed[..trimmed.len() - 1];
    }
    match trimmed.rfind('/') {
        Some(idx) => trimmed[idx + 1..].to_string(),
        None => trimmed.to_string(),
    }
}

/// Derive a hidden sibling temp path: `.<name>.<uuid>.tmp` in the parent dir.
pub fn create_temp_path(path: &str) -> String {
    let uuid = Uuid::new_v4();
    join_path(
        &parent_dir_path(path),
        &format!(".{}.{}.tmp", file_name(path), uuid),
    )
}

#[cfg(test)]
mod path_util_tests {
    use super::*;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/a/b", "c"), "/a/b/c");
        assert_eq!(join_path("/a/b/", "c"), "/a/b/c");
        assert_eq!(join_path("/a/b/", "/c"), "/a/b/c");
        assert_eq!(join_path("/a/b", "/c"), "/a/b/c");
        assert_eq!(join_path("", "c"), "c");
        assert_eq!(join_path("/a", ""), "/a");
    }

    #[test]
    fn test_to_path() {
        let p = to_path("oss://bucket-1/warehouse//table").unwrap();
        assert_eq!(p.scheme, "oss");
        assert_eq!(p.authority, "bucket-1");
        assert_eq!(p.path, "/warehouse/table");
        assert_eq!(p.to_uri_string(), "oss://bucket-1/warehouse/table");

        let p = to_path("/warehouse/table/").unwrap();
        assert_eq!(p.scheme, "");
        assert_eq!(p.authority, "");
        assert_eq!(p.path, "/warehouse/table");

        assert_eq!(normalize_path("file:/a//b///c").unwrap(), "file:/a/b/c");
        assert!(to_path("").is_err());
    }

    #[test]
    fn test_name_and_parent() {
        assert_eq!(file_name("/a/b/c.data"), "c.data");
        assert_eq!(file_name("/a/b/"), "b");
        assert_eq!(parent_dir_path("/a/b/c.data"), "/a/b");
        assert_eq!(parent_dir_path("c.data"), "");
        assert_eq!(file_name("c.data"), "c.data");
    }

    #[test]
    fn test_create_temp_path() {
        let tmp = create_temp_path("/warehouse/t/idx.data");
        assert!(tmp.starts_with("/warehouse/t/.idx.data."));
        assert!(tmp.ends_with(".tmp"));
        // canonical uuid: 36 chars with dashes at 8/13/18/23
        let uuid_part = &tmp["/warehouse/t/.idx.data.".len()..tmp.len() - ".tmp".len()];
        assert_eq!(uuid_part.len(), 36);
        for idx in [8, 13, 18, 23] {
            assert_eq!(uuid_part.as_bytes()[idx], b'-');
        }
        assert_ne!(tmp, create_temp_path("/warehouse/t/idx.data"));
    }
}
